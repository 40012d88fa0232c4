use anyhow::Result;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::db::Db;
use crate::error::Error;
use crate::models::format_duration;
use crate::ui;

/// Track tasks and the time spent on them.
#[derive(Parser, Debug)]
#[command(name = "tasktime", version, long_about = None)]
pub struct Cli {
    /// Database file or sqlite: URL (defaults to $TASKTIME_DATABASE_URL, then
    /// the user state directory)
    #[arg(global = true, long)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    Add { name: String },
    /// List tasks that are not completed
    List,
    /// Show a task with its work entries and total time
    Show { id: i64 },
    /// Mark a task as completed
    Done { id: i64 },
    /// Start a timer on a task
    Start { task_id: i64 },
    /// Stop the running timer of a task
    Stop { task_id: i64 },
    /// Print the total time tracked on a task
    Total { task_id: i64 },
    /// Open the interactive terminal UI (default)
    Tui,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load(self.database.as_deref())?;
        let db = Db::connect(&config).await?;

        match self.command.unwrap_or(Command::Tui) {
            Command::Add { name } => add(&db, &name).await,
            Command::List => list(&db).await,
            Command::Show { id } => show(&db, id).await,
            Command::Done { id } => done(&db, id).await,
            Command::Start { task_id } => start(&db, task_id).await,
            Command::Stop { task_id } => stop(&db, task_id).await,
            Command::Total { task_id } => total(&db, task_id).await,
            Command::Tui => ui::run_app(db).await,
        }
    }
}

async fn add(db: &Db, name: &str) -> Result<()> {
    let id = db.tasks().create(name).await?;
    println!("Added task {id}: {name}");
    Ok(())
}

async fn list(db: &Db) -> Result<()> {
    let tasks = db.tasks().find_all_non_completed_tasks().await?;
    if tasks.is_empty() {
        println!("No open tasks");
        return Ok(());
    }

    let now = Utc::now();
    for task in tasks {
        match db.work_entries().find_current_work_entry(task.id).await? {
            Some(entry) => println!(
                "{:>4}  {}  (running {})",
                task.id,
                task.name,
                format_duration(entry.elapsed(now))
            ),
            None => println!("{:>4}  {}", task.id, task.name),
        }
    }
    Ok(())
}

async fn show(db: &Db, id: i64) -> Result<()> {
    let task = db.tasks().find_by_id(id).await?;
    let status = if task.completed { "completed" } else { "open" };
    println!("Task {}: {} ({status})", task.id, task.name);
    if task.is_unknown() {
        return Ok(());
    }

    let entries = db.work_entries();
    let now = Utc::now();
    for entry in entries.find_work_entries(task.id).await? {
        let started = entry
            .started_on
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S");
        match entry.finished_on {
            Some(finished) => println!(
                "  {started} - {}  {}",
                finished.with_timezone(&Local).format("%H:%M:%S"),
                format_duration(entry.elapsed(now))
            ),
            None => println!(
                "  {started} - running  {}",
                format_duration(entry.elapsed(now))
            ),
        }
    }

    let total = entries.calculate_total_time(task.id).await?;
    println!("Total: {}", format_duration(total));
    Ok(())
}

async fn done(db: &Db, id: i64) -> Result<()> {
    let Some(task) = db.tasks().get(id).await? else {
        println!("No task with id {id}");
        return Ok(());
    };

    db.complete_task(task.id).await?;
    println!("Completed task {}: {}", task.id, task.name);
    Ok(())
}

async fn start(db: &Db, task_id: i64) -> Result<()> {
    let Some(task) = db.tasks().get(task_id).await? else {
        println!("No task with id {task_id}");
        return Ok(());
    };

    match db.work_entries().create_work_entry(task.id).await {
        Ok(_) => println!("Started timer on task {}: {}", task.id, task.name),
        Err(Error::WorkEntryAlreadyOpen { .. }) => {
            println!("Timer already running on task {}: {}", task.id, task.name)
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn stop(db: &Db, task_id: i64) -> Result<()> {
    let entries = db.work_entries();
    let Some(entry) = entries.find_current_work_entry(task_id).await? else {
        println!("No running timer on task {task_id}");
        return Ok(());
    };

    entries.finish_work_entry(entry.id).await?;
    let total = entries.calculate_total_time(task_id).await?;
    println!(
        "Stopped timer on task {task_id} (total {})",
        format_duration(total)
    );
    Ok(())
}

async fn total(db: &Db, task_id: i64) -> Result<()> {
    let total = db.work_entries().calculate_total_time(task_id).await?;
    println!("{}", format_duration(total));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["tasktime"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.database.is_none());
    }

    #[test]
    fn database_flag_is_global() {
        let cli =
            Cli::try_parse_from(["tasktime", "start", "3", "--database", "/tmp/t.db"]).unwrap();
        assert_eq!(cli.database.as_deref(), Some("/tmp/t.db"));
        assert!(matches!(cli.command, Some(Command::Start { task_id: 3 })));
    }

    #[test]
    fn ids_must_be_numbers() {
        assert!(Cli::try_parse_from(["tasktime", "done", "abc"]).is_err());
    }
}
