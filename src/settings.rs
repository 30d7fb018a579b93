// Application settings, persisted in their own namespace

use crate::backend::RawRecord;
use crate::error::ValidationError;
use crate::task::Priority;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Priority,
    DueDate,
    #[default]
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// User preferences; any missing key takes its default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub default_priority: Priority,
    pub show_completed_tasks: bool,
    pub sort_by: SortBy,
    pub sort_direction: SortDirection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            default_priority: Priority::Medium,
            show_completed_tasks: true,
            sort_by: SortBy::CreatedAt,
            sort_direction: SortDirection::Desc,
        }
    }
}

impl Settings {
    /// Decode restored settings; absent or undecodable data yields the defaults
    pub fn from_raw(raw: Option<RawRecord>) -> Self {
        let Some(raw) = raw else {
            return Settings::default();
        };

        match serde_json::from_value(raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Failed to decode settings, using defaults");
                Settings::default()
            }
        }
    }
}

/// Implements `FromStr`/`Display` over the serde names of a unit enum
macro_rules! named_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(ValidationError::new(format!("Unknown {}: {:?}", $label, other))),
                }
            }
        }
    };
}

named_enum!(Theme, "theme", { Light => "light", Dark => "dark", System => "system" });
named_enum!(SortBy, "sort field", {
    Priority => "priority",
    DueDate => "dueDate",
    CreatedAt => "createdAt",
    UpdatedAt => "updatedAt",
});
named_enum!(SortDirection, "sort direction", { Asc => "asc", Desc => "desc" });
