//! Handlers behind the CLI subcommands. Each one opens the database, runs a
//! single ledger operation and prints `key: value` lines.

use crate::config::load_config_or_default;
use crate::habits::NewHabit;
use crate::ledger::{Ledger, local_today};
use crate::logging::ndjson::mirror_completion;
use crate::migrations::{current_version, schema_snapshot};
use crate::storage::Database;
use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Where the database and configuration live for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub db: Option<PathBuf>,
    pub config_root: Option<PathBuf>,
}

pub fn default_ledger_db() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("habitledger").join("ledger.db");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("habitledger")
            .join("ledger.db");
    }
    PathBuf::from(".habitledger/ledger.db")
}

pub fn open_ledger(ctx: &Context) -> Result<Ledger> {
    let root = match &ctx.config_root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("resolve current directory")?,
    };
    let config = load_config_or_default(&root)?;
    let path = ctx.db.clone().unwrap_or_else(default_ledger_db);
    let db = Database::initialize(&path, config.storage.clone())
        .with_context(|| format!("open ledger database {}", path.display()))?;
    Ok(Ledger::open(&db, config)?)
}

pub fn migrate(ctx: &Context) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    ledger.migrate_schema()?;
    println!(
        "schema_version: {}",
        current_version(ledger.connection())?
    );
    Ok(())
}

pub fn record(
    ctx: &Context,
    owner: &str,
    habit_id: i64,
    day: Option<NaiveDate>,
    today: Option<NaiveDate>,
    log: Option<PathBuf>,
) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let today = today.unwrap_or_else(local_today);
    let day = day.unwrap_or(today);
    let outcome = ledger.record_completion_on(habit_id, owner, day, today)?;
    if let Some(path) = log {
        mirror_completion(&path, &outcome)
            .with_context(|| format!("write completion log {}", path.display()))?;
    }

    if outcome.recorded.inserted {
        println!("recorded: habit={habit_id} day={day}");
    } else {
        println!("already recorded: habit={habit_id} day={day}");
    }
    println!("streak: {}", outcome.strength.streak);
    println!(
        "strength: {} ({}, {})",
        outcome.strength.strength,
        outcome.strength.level.as_str(),
        outcome.strength.color.as_str()
    );
    if let Some(milestone) = outcome.milestone {
        println!("milestone: {} days ({milestone:?})", milestone.days());
    }
    Ok(())
}

pub fn streak(ctx: &Context, owner: &str, habit_id: i64, today: Option<NaiveDate>) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let today = today.unwrap_or_else(local_today);
    let summary = ledger.get_streak_summary_on(habit_id, owner, today)?;
    let strength = ledger.get_streak_and_strength_on(habit_id, owner, today)?;
    println!("current_streak: {}", summary.current);
    println!("best_streak: {}", summary.best);
    println!(
        "strength: {} ({}, {})",
        strength.strength,
        strength.level.as_str(),
        strength.color.as_str()
    );
    Ok(())
}

pub fn panel(ctx: &Context, owner: &str, today: Option<NaiveDate>) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let today = today.unwrap_or_else(local_today);
    let ids: Vec<i64> = ledger
        .list_active_habits(owner)?
        .iter()
        .map(|h| h.id)
        .collect();
    let progress = ledger.get_panel_progress_on(owner, &ids, today)?;
    println!("day: {today}");
    println!("completed: {}/{}", progress.completed, progress.total);
    println!("planned_total_max: {}", progress.planned_total_max);
    println!("percent: {}", progress.percent);
    Ok(())
}

pub fn window(ctx: &Context, owner: &str, from: NaiveDate, to: NaiveDate) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let stats = ledger.get_window_stats(owner, from, to)?;
    println!("window: {} .. {}", stats.start, stats.end);
    println!("days_active: {}", stats.days_active);
    println!("events: {}", stats.events);
    if !stats.distinct_completion_dates.is_empty() {
        println!("dates:");
        for day in &stats.distinct_completion_dates {
            println!("  - {day}");
        }
    }
    Ok(())
}

pub fn motivation(ctx: &Context, owner: &str, today: Option<NaiveDate>) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let today = today.unwrap_or_else(local_today);
    let (stats, tier) = ledger.get_motivation_on(owner, today)?;
    println!("max_streak: {}", stats.max_streak);
    println!(
        "completed_today: {}/{}",
        stats.completed_today, stats.total_habits
    );
    println!("days_active: {}", stats.days_active);
    println!("weekend: {}", stats.is_weekend);
    println!("tier: {}", serde_json::to_string(&tier)?);
    Ok(())
}

pub fn stats(ctx: &Context, today: Option<NaiveDate>) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let stats = ledger.get_system_stats_on(today.unwrap_or_else(local_today))?;
    println!("users: {} (admins: {})", stats.total_users, stats.admin_count);
    println!("habits: {} (active: {})", stats.total_habits, stats.active_habits);
    println!(
        "completions: {} (today: {})",
        stats.total_completions, stats.completions_today
    );
    Ok(())
}

pub fn habit_add(
    ctx: &Context,
    owner: &str,
    name: &str,
    desc: &str,
    category_id: Option<i64>,
    frequency: &str,
) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let id = ledger.create_habit(&NewHabit {
        owner: owner.to_string(),
        name: name.to_string(),
        short_desc: desc.to_string(),
        category_id,
        frequency: frequency.to_string(),
    })?;
    println!("created habit {id}");
    Ok(())
}

pub fn habit_list(ctx: &Context, owner: &str) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let habits = ledger.list_active_habits(owner)?;
    if habits.is_empty() {
        println!("No active habits for {owner}");
        return Ok(());
    }
    for habit in habits {
        println!("{}: {} [{}]", habit.id, habit.name, habit.frequency);
    }
    Ok(())
}

pub fn habit_set_active(ctx: &Context, owner: &str, habit_id: i64, active: bool) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    ledger.set_habit_active(habit_id, owner, active)?;
    let state = if active { "active" } else { "paused" };
    println!("habit {habit_id}: {state}");
    Ok(())
}

pub fn habit_delete(ctx: &Context, owner: &str, habit_id: i64) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let outcome = ledger.delete_habit(habit_id, owner)?;
    println!(
        "deleted habit {habit_id} (completions removed: {})",
        outcome.completions_removed
    );
    Ok(())
}

pub fn schema(ctx: &Context) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    println!("schema_version: {}", current_version(ledger.connection())?);
    for object in schema_snapshot(ledger.connection())? {
        println!("{object}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(dir: &tempfile::TempDir) -> Context {
        Context {
            db: Some(dir.path().join("state").join("ledger.db")),
            config_root: Some(dir.path().to_path_buf()),
        }
    }

    #[test]
    fn open_ledger_creates_database_under_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let ledger = open_ledger(&ctx).unwrap();
        assert!(dir.path().join("state").join("ledger.db").exists());
        assert!(current_version(ledger.connection()).unwrap() >= 1);
    }

    #[test]
    fn open_ledger_reports_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".habitledger")).unwrap();
        std::fs::write(
            dir.path().join(".habitledger").join("config.toml"),
            "version = 9\n",
        )
        .unwrap();
        assert!(open_ledger(&context(&dir)).is_err());
    }

    #[test]
    fn record_writes_ndjson_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let id = open_ledger(&ctx)
            .unwrap()
            .create_habit(&NewHabit::daily("a", "Walk"))
            .unwrap();
        let log = dir.path().join("completions.ndjson");
        let today = NaiveDate::from_ymd_opt(2026, 3, 2);
        record(&ctx, "a", id, None, today, Some(log.clone())).unwrap();
        record(&ctx, "a", id, None, today, Some(log.clone())).unwrap();

        let body = std::fs::read_to_string(&log).unwrap();
        let inserted: Vec<bool> = body
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["inserted"] == true)
            .collect();
        assert_eq!(inserted, vec![true, false]);
    }
}
