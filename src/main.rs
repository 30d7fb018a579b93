use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Context, Result, eyre};
use std::path::PathBuf;
use taskflow::{
    Backend, BackendKind, Config, Priority, SortBy, SortDirection, Strictness, Task, TaskDraft, TaskFilter,
    TaskPatch, TaskStore, Theme, sort_tasks,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Taskflow CLI - local to-do list with JSON-blob or SQLite persistence")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Directory holding the store (default: from config, else the user data directory)
    #[arg(short, long, global = true)]
    store_path: Option<PathBuf>,

    /// Persistence backend: blob or object-store
    #[arg(short, long, global = true)]
    backend: Option<BackendKind>,

    /// YAML config file (default: <config dir>/taskflow/config.yml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep stored records that fail validation instead of dropping them
    #[arg(long, global = true)]
    lenient: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        /// Task text
        #[arg(required = true)]
        text: Vec<String>,

        /// low, medium, high or urgent (default: from settings)
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Due date, e.g. 2026-11-01
        #[arg(short, long)]
        due: Option<String>,

        /// Comma separated tags
        #[arg(short, long)]
        tags: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,

        /// Estimated time in minutes
        #[arg(short, long)]
        estimate: Option<f64>,
    },

    /// List tasks
    List {
        /// all, active, completed or important
        #[arg(short, long, default_value = "all")]
        filter: TaskFilter,

        /// Override the sort field from settings
        #[arg(long)]
        sort: Option<SortBy>,

        /// Override the sort direction from settings
        #[arg(long)]
        direction: Option<SortDirection>,

        /// Show completed tasks even when settings hide them
        #[arg(short, long)]
        all: bool,
    },

    /// Toggle a task between done and not done
    Done { id: String },

    /// Toggle a task's importance
    Star { id: String },

    /// Edit fields of a task
    Edit {
        id: String,

        #[arg(long)]
        text: Option<String>,

        #[arg(short, long)]
        priority: Option<Priority>,

        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        #[arg(long)]
        clear_due: bool,

        /// Comma separated tags, replacing the current ones
        #[arg(long)]
        tags: Option<String>,

        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        #[arg(long)]
        clear_notes: bool,

        /// Estimated time in minutes
        #[arg(long)]
        estimate: Option<f64>,
    },

    /// Delete a task
    Rm { id: String },

    /// Delete every completed task
    ClearCompleted,

    /// Show task counts
    Stats,

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,

    /// Change one or more settings
    Set {
        #[arg(long)]
        theme: Option<Theme>,

        #[arg(long)]
        default_priority: Option<Priority>,

        #[arg(long)]
        show_completed: Option<bool>,

        #[arg(long)]
        sort_by: Option<SortBy>,

        #[arg(long)]
        sort_direction: Option<SortDirection>,
    },
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if cli.lenient {
        config.store.strictness = Strictness::Lenient;
    }

    let store_dir = match &cli.store_path {
        Some(path) => path.clone(),
        None => config.resolve_store_dir()?,
    };

    // Open store
    let backend = config.open_backend(&store_dir)?;
    let mut store = TaskStore::open(backend, config.store.clone())
        .with_context(|| format!("Failed to load tasks from {}", store_dir.display()))?;

    run(&mut store, cli.command)
}

fn run<B: Backend>(store: &mut TaskStore<B>, command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            text,
            priority,
            due,
            tags,
            notes,
            estimate,
        } => {
            let mut draft = TaskDraft::new(text.join(" "));
            draft.priority = priority;
            draft.due_date = due;
            draft.notes = notes;
            draft.estimated_time = estimate;
            if let Some(tags) = tags {
                draft = draft.with_tags(tags);
            }

            let task = store.add(draft)?;
            println!("{} {}", "Added".green(), render_task(&task));
        }
        Commands::List {
            filter,
            sort,
            direction,
            all,
        } => {
            let settings = store.settings().clone();
            let hide_completed = filter == TaskFilter::All && !settings.show_completed_tasks && !all;

            let mut tasks: Vec<Task> = store
                .query(filter)?
                .filter(|t| !(hide_completed && t.completed))
                .cloned()
                .collect();
            sort_tasks(
                &mut tasks,
                sort.unwrap_or(settings.sort_by),
                direction.unwrap_or(settings.sort_direction),
            );

            if tasks.is_empty() {
                println!("{}", "No tasks to display".dimmed());
            }
            for task in &tasks {
                println!("{}", render_task(task));
            }
            print_stats(store);
        }
        Commands::Done { id } => {
            let id = resolve_id(store, &id)?;
            let task = store.toggle_completion(&id)?;
            let verb = if task.completed { "Completed" } else { "Reopened" };
            println!("{} {}", verb.green(), render_task(&task));
        }
        Commands::Star { id } => {
            let id = resolve_id(store, &id)?;
            let task = store.toggle_importance(&id)?;
            let verb = if task.is_important { "Starred" } else { "Unstarred" };
            println!("{} {}", verb.green(), render_task(&task));
        }
        Commands::Edit {
            id,
            text,
            priority,
            due,
            clear_due,
            tags,
            notes,
            clear_notes,
            estimate,
        } => {
            let id = resolve_id(store, &id)?;
            let mut patch = TaskPatch::new();
            patch.text = text;
            patch.priority = priority;
            patch.tags = tags.map(Into::into);
            patch.estimated_time = estimate.map(Some);
            if clear_due {
                patch.due_date = Some(None);
            } else if due.is_some() {
                patch.due_date = Some(due);
            }
            if clear_notes {
                patch.notes = Some(None);
            } else if notes.is_some() {
                patch.notes = Some(notes);
            }

            let task = store.update(&id, patch)?;
            println!("{} {}", "Updated".green(), render_task(&task));
        }
        Commands::Rm { id } => {
            let id = resolve_id(store, &id)?;
            println!("{}", remove_task(store, &id)?);
        }
        Commands::ClearCompleted => {
            let count = store.clear_completed()?;
            println!("{} {} completed task(s)", "Cleared".green(), count);
        }
        Commands::Stats => print_stats(store),
        Commands::Settings { action } => match action.unwrap_or(SettingsAction::Show) {
            SettingsAction::Show => print_settings(store),
            SettingsAction::Set {
                theme,
                default_priority,
                show_completed,
                sort_by,
                sort_direction,
            } => {
                let mut settings = store.settings().clone();
                if let Some(theme) = theme {
                    settings.theme = theme;
                }
                if let Some(priority) = default_priority {
                    settings.default_priority = priority;
                }
                if let Some(show) = show_completed {
                    settings.show_completed_tasks = show;
                }
                if let Some(sort_by) = sort_by {
                    settings.sort_by = sort_by;
                }
                if let Some(direction) = sort_direction {
                    settings.sort_direction = direction;
                }
                store.save_settings(settings)?;
                print_settings(store);
            }
        },
    }

    Ok(())
}

/// Accept a full id, or a unique prefix or suffix of one
fn resolve_id<B: Backend>(store: &TaskStore<B>, given: &str) -> Result<String> {
    if store.get(given).is_some() {
        return Ok(given.to_string());
    }

    let matches: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| t.id.starts_with(given) || t.id.ends_with(given))
        .collect();

    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        // Unknown ids go to the store as-is so it reports them
        [] => Ok(given.to_string()),
        _ => Err(eyre!("Ambiguous id {:?} matches {} tasks", given, matches.len())),
    }
}

/// Remove `id` and describe the outcome; an unknown id is reported, not an error
fn remove_task<B: Backend>(store: &mut TaskStore<B>, id: &str) -> Result<String> {
    if store.get(id).is_none() {
        return Ok(format!("{} {}", "No such task".yellow(), id));
    }
    store.remove(id)?;
    Ok(format!("{} {}", "Deleted".green(), short_id(id)))
}

fn short_id(id: &str) -> &str {
    let count = id.chars().count();
    if count <= 8 {
        return id;
    }
    let start = id.char_indices().nth(count - 8).map(|(i, _)| i).unwrap_or(0);
    &id[start..]
}

fn render_priority(priority: Priority) -> ColoredString {
    match priority {
        Priority::Low => priority.as_str().blue(),
        Priority::Medium => priority.as_str().yellow(),
        Priority::High => priority.as_str().red(),
        Priority::Urgent => priority.as_str().red().bold(),
    }
}

fn render_task(task: &Task) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let star = if task.is_important { "★".yellow() } else { "☆".dimmed() };
    let text = if task.completed {
        task.text.strikethrough().dimmed()
    } else {
        task.text.normal()
    };

    let mut line = format!(
        "{} {} {}  {} ({})",
        check,
        star,
        short_id(&task.id).cyan(),
        text,
        render_priority(task.priority)
    );
    if let Some(due) = &task.due_date {
        line.push_str(&format!(" {}", format!("due {}", due).magenta()));
    }
    if !task.tags.is_empty() {
        let tags: Vec<String> = task.tags.iter().map(|tag| format!("#{}", tag)).collect();
        line.push_str(&format!(" {}", tags.join(" ").dimmed()));
    }
    if let Some(minutes) = task.estimated_time {
        line.push_str(&format!(" ~{}m", minutes));
    }
    line
}

fn print_stats<B: Backend>(store: &TaskStore<B>) {
    let stats = store.stats();
    let mut line = format!(
        "{} total, {} completed, {} pending",
        stats.total.to_string().bold(),
        stats.completed.to_string().green(),
        stats.pending.to_string().yellow()
    );
    if store.config().importance_enabled {
        line.push_str(&format!(", {} important", stats.important.to_string().cyan()));
    }
    println!("{}", line);
}

fn print_settings<B: Backend>(store: &TaskStore<B>) {
    let settings = store.settings();
    println!("theme:              {}", settings.theme);
    println!("default priority:   {}", settings.default_priority);
    println!("show completed:     {}", settings.show_completed_tasks);
    println!("sort by:            {}", settings.sort_by);
    println!("sort direction:     {}", settings.sort_direction);
}
