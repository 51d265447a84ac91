use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use eyre::{Result, bail, eyre};
use std::path::PathBuf;
use tasktrack::{
    Config, FilterUpdate, KeyValueStore, NewTag, NewTask, Priority, PriorityFilter, StatusFilter, Stats, Task,
    TaskStore, TaskUpdate,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasktrack")]
#[command(about = "tasktrack - personal task tracker with tags and filters")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        title: String,

        #[arg(short = 'D', long, default_value = "")]
        description: String,

        /// low, medium or high
        #[arg(short, long, default_value = "medium", value_parser = parse_priority)]
        priority: Priority,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_date)]
        due: Option<DateTime<Utc>>,

        /// Tag id or name, repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// List tasks matching the given criteria
    List {
        /// all, active or completed
        #[arg(long, value_parser = parse_status)]
        status: Option<StatusFilter>,

        /// all, low, medium or high
        #[arg(short, long, value_parser = parse_priority_filter)]
        priority: Option<PriorityFilter>,

        /// Tag id or name, repeatable; tasks with any of them match
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Case-insensitive text in title or description
        #[arg(short, long)]
        search: Option<String>,

        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle a task between done and not done
    Done { id: String },

    /// Change fields of a task
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short = 'D', long)]
        description: Option<String>,

        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<Priority>,

        #[arg(long, value_parser = parse_date, conflicts_with = "clear_due")]
        due: Option<DateTime<Utc>>,

        #[arg(long)]
        clear_due: bool,

        /// Replace the task's tags (tag id or name, repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Delete a task
    Rm { id: String },

    /// Put the given tasks first, in this order
    Reorder {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Show statistics over all tasks and the most recently created ones
    Stats {
        /// How many recent tasks to show
        #[arg(short, long, default_value_t = 5)]
        recent: usize,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// Create a tag
    Add {
        name: String,

        #[arg(short, long, default_value = "gray")]
        color: String,
    },

    /// List tags
    List,

    /// Delete a tag and remove it from every task
    Rm { id: String },
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    s.parse().map_err(|e: eyre::Report| e.to_string())
}

fn parse_priority_filter(s: &str) -> Result<PriorityFilter, String> {
    s.parse().map_err(|_| format!("Invalid priority filter: {}", s))
}

fn parse_status(s: &str) -> Result<StatusFilter, String> {
    s.parse().map_err(|_| format!("Invalid status: {}", s))
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    tasktrack::models::parse_due_date(s).map_err(|e| e.to_string())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exact id, or a unique prefix of one
fn resolve_task<K: KeyValueStore>(store: &TaskStore<K>, arg: &str) -> Result<String> {
    if store.task(arg).is_some() {
        return Ok(arg.to_string());
    }

    let matches: Vec<&Task> = store.all_tasks().iter().filter(|t| t.id.starts_with(arg)).collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => Err(eyre!("No task matches {}", arg)),
        _ => Err(eyre!("{} matches {} tasks, use a longer prefix", arg, matches.len())),
    }
}

/// Tag id, or a tag name compared case-insensitively
fn resolve_tag<K: KeyValueStore>(store: &TaskStore<K>, arg: &str) -> Result<String> {
    if store.tag(arg).is_some() {
        return Ok(arg.to_string());
    }

    store
        .tags()
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(arg))
        .map(|t| t.id.clone())
        .ok_or_else(|| eyre!("No tag named {}", arg))
}

fn resolve_tags<K: KeyValueStore>(store: &TaskStore<K>, args: &[String]) -> Result<Vec<String>> {
    args.iter().map(|arg| resolve_tag(store, arg)).collect()
}

fn print_task<K: KeyValueStore>(store: &TaskStore<K>, task: &Task, now: DateTime<Utc>) {
    let check = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let title = if task.completed {
        task.title.dimmed()
    } else {
        task.title.bold()
    };
    let priority = match task.priority {
        Priority::High => "high".red(),
        Priority::Medium => "medium".yellow(),
        Priority::Low => "low".blue(),
    };

    let mut line = format!("{} {} ({})", check, title, priority);

    if let Some(due) = task.due_date {
        let due_text = format!("due {}", due.format("%Y-%m-%d"));
        if task.is_overdue(now) {
            line.push_str(&format!(" {}", due_text.red().bold()));
        } else {
            line.push_str(&format!(" {}", due_text));
        }
    }

    for tag_id in &task.tags {
        let name = store.tag(tag_id).map(|t| t.name.as_str()).unwrap_or(tag_id.as_str());
        line.push_str(&format!(" {}", format!("#{}", name).cyan()));
    }

    println!("{}", line);
    if !task.description.is_empty() {
        println!("    {}", task.description);
    }
    println!("    {}", task.id.dimmed());
}

fn print_stats(stats: &Stats) {
    println!("{} {}", "Total:".bold(), stats.total);
    println!("{} {}", "Completed:".bold(), stats.completed);
    println!("{} {}", "Overdue:".bold(), stats.overdue.to_string().red());
    println!("{} {}", "High priority:".bold(), stats.high_priority);
    println!("{} {}%", "Completion rate:".bold(), stats.completion_rate);
    println!("{} {}", "Active:".bold(), stats.active);

    println!();
    println!("{}", "By priority".bold());
    for (priority, label) in [
        (Priority::High, "high".red()),
        (Priority::Medium, "medium".yellow()),
        (Priority::Low, "low".blue()),
    ] {
        println!(
            "  {:<8} {:>4} ({}%)",
            label,
            stats.by_priority.count(priority),
            stats.by_priority.share(priority, stats.total)
        );
    }
}

fn run<K: KeyValueStore>(store: &mut TaskStore<K>, command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            title,
            description,
            priority,
            due,
            tags,
        } => {
            if title.trim().is_empty() {
                bail!("Task title cannot be empty");
            }
            let tags = resolve_tags(store, &tags)?;
            let id = store.add_task(NewTask {
                title,
                description,
                completed: false,
                due_date: due,
                priority,
                tags,
            });
            println!("{} {}", "Added task".green(), id);
        }
        Commands::List {
            status,
            priority,
            tags,
            search,
            json,
        } => {
            let selected_tags = resolve_tags(store, &tags)?;
            store.update_filter(FilterUpdate {
                status,
                priority,
                selected_tags: Some(selected_tags),
                search_term: search,
            });

            if json {
                println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
                return Ok(());
            }

            let tasks = store.tasks();
            if tasks.is_empty() {
                println!("{}", "No tasks".dimmed());
            }
            let now = Utc::now();
            for task in &tasks {
                print_task(store, task, now);
            }
        }
        Commands::Done { id } => {
            let id = resolve_task(store, &id)?;
            store.toggle_task_completion(&id);
            if let Some(task) = store.task(&id) {
                let state = if task.completed { "done".green() } else { "not done".yellow() };
                println!("{} is {}", task.title, state);
            }
        }
        Commands::Edit {
            id,
            title,
            description,
            priority,
            due,
            clear_due,
            tags,
        } => {
            let id = resolve_task(store, &id)?;
            if title.as_deref().is_some_and(|t| t.trim().is_empty()) {
                bail!("Task title cannot be empty");
            }
            let due_date = if clear_due { Some(None) } else { due.map(Some) };
            let tags = if tags.is_empty() {
                None
            } else {
                Some(resolve_tags(store, &tags)?)
            };

            let update = TaskUpdate {
                title,
                description,
                completed: None,
                due_date,
                priority,
                tags,
            };
            if update.is_empty() {
                bail!("Nothing to change");
            }
            store.update_task(&id, update);
            println!("{} {}", "Updated task".green(), id);
        }
        Commands::Rm { id } => {
            let id = resolve_task(store, &id)?;
            store.delete_task(&id);
            println!("{} {}", "Deleted task".green(), id);
        }
        Commands::Reorder { ids } => {
            let ids = ids
                .iter()
                .map(|id| resolve_task(store, id))
                .collect::<Result<Vec<_>>>()?;
            store.reorder_tasks(&ids);
            println!("{}", "Reordered tasks".green());
        }
        Commands::Tag { command } => match command {
            TagCommands::Add { name, color } => {
                if name.trim().is_empty() {
                    bail!("Tag name cannot be empty");
                }
                let id = store.add_tag(NewTag::new(name, color));
                println!("{} {}", "Added tag".green(), id);
            }
            TagCommands::List => {
                for tag in store.tags() {
                    println!("{}  {} ({})", tag.id.dimmed(), tag.name.bold(), tag.color);
                }
            }
            TagCommands::Rm { id } => {
                let id = resolve_tag(store, &id)?;
                store.delete_tag(&id);
                println!("{} {}", "Deleted tag".green(), id);
            }
        },
        Commands::Stats { recent, json } => {
            let stats = store.stats();
            let recent_tasks = store.recent_tasks(recent);
            if json {
                let report = serde_json::json!({ "stats": stats, "recentTasks": recent_tasks });
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            print_stats(&stats);
            if !recent_tasks.is_empty() {
                println!();
                println!("{}", "Recent tasks".bold());
                let now = Utc::now();
                for task in &recent_tasks {
                    print_task(store, task, now);
                }
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = Some(data_dir);
    }

    let mut store = TaskStore::open(config.open_backend()?);
    run(&mut store, cli.command)
}
