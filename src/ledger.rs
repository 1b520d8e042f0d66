//! Entry point for callers: records completions and answers the analytics
//! questions the progress pages ask. One `Ledger` wraps one connection; open
//! one per thread.

use crate::analytics::aggregate::{
    PanelProgress, SystemStats, WindowStats, percent_complete, system_stats, window_stats,
};
use crate::analytics::motivation::{
    Milestone, MotivationStats, MotivationTier, milestone_for, motivation_stats,
};
use crate::analytics::ratchet::ensure_and_get_planned_max;
use crate::analytics::strength::StrengthResult;
use crate::analytics::streak::{StreakSummary, current_streak_for, summary_for};
use crate::completions::Recorded;
use crate::completions::store::{completed_on, record};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::habits::{self, DeleteOutcome, Habit, NewHabit};
use crate::migrations::run_migrations;
use crate::storage::{Database, require_owner};
use crate::storage::retry::with_retry;
use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub recorded: Recorded,
    pub strength: StrengthResult,
    pub milestone: Option<Milestone>,
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct Ledger {
    conn: Connection,
    config: LedgerConfig,
}

impl Ledger {
    pub fn open(db: &Database, config: LedgerConfig) -> LedgerResult<Self> {
        Ok(Self {
            conn: db.connect()?,
            config,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Re-runs schema convergence on this connection.
    pub fn migrate_schema(&self) -> LedgerResult<()> {
        with_retry(&self.config.retry, "migrate_schema", || {
            run_migrations(&self.conn)
        })
    }

    pub fn record_completion(&self, habit_id: i64, owner: &str) -> LedgerResult<CompletionOutcome> {
        let today = local_today();
        self.record_completion_on(habit_id, owner, today, today)
    }

    /// Logs `habit_id` as done on `day` and returns the figures as of `today`.
    pub fn record_completion_on(
        &self,
        habit_id: i64,
        owner: &str,
        day: NaiveDate,
        today: NaiveDate,
    ) -> LedgerResult<CompletionOutcome> {
        if day > today {
            return Err(LedgerError::invalid(format!(
                "cannot record {day}; it is after {today}"
            )));
        }
        self.require_habit(habit_id, owner)?;
        let recorded = with_retry(&self.config.retry, "record_completion", || {
            record(&self.conn, habit_id, owner, day)
        })?;
        let strength = self.get_streak_and_strength_on(habit_id, owner, today)?;
        let milestone = if recorded.inserted {
            milestone_for(strength.streak)
        } else {
            None
        };
        tracing::info!(
            habit_id,
            owner,
            day = %day,
            inserted = recorded.inserted,
            streak = strength.streak,
            strength = strength.strength,
            "completion recorded"
        );
        Ok(CompletionOutcome {
            recorded,
            strength,
            milestone,
        })
    }

    pub fn get_streak_and_strength(&self, habit_id: i64, owner: &str) -> LedgerResult<StrengthResult> {
        self.get_streak_and_strength_on(habit_id, owner, local_today())
    }

    pub fn get_streak_and_strength_on(
        &self,
        habit_id: i64,
        owner: &str,
        today: NaiveDate,
    ) -> LedgerResult<StrengthResult> {
        let streak = current_streak_for(&self.conn, habit_id, owner, today)?;
        Ok(self.config.strength.evaluate(streak))
    }

    pub fn get_streak_summary_on(
        &self,
        habit_id: i64,
        owner: &str,
        today: NaiveDate,
    ) -> LedgerResult<StreakSummary> {
        summary_for(&self.conn, habit_id, owner, today)
    }

    pub fn get_panel_progress(&self, owner: &str, active_habit_ids: &[i64]) -> LedgerResult<PanelProgress> {
        self.get_panel_progress_on(owner, active_habit_ids, local_today())
    }

    pub fn get_panel_progress_on(
        &self,
        owner: &str,
        active_habit_ids: &[i64],
        today: NaiveDate,
    ) -> LedgerResult<PanelProgress> {
        let done = completed_on(&self.conn, owner, today)?;
        let completed = active_habit_ids
            .iter()
            .filter(|id| done.contains(*id))
            .count() as u32;
        let total = u32::try_from(active_habit_ids.len())
            .map_err(|_| LedgerError::invalid("too many active habits"))?;
        let planned_total_max = with_retry(&self.config.retry, "planned_max", || {
            ensure_and_get_planned_max(&self.conn, owner, today, total)
        })?;
        Ok(PanelProgress {
            completed,
            total,
            planned_total_max,
            percent: percent_complete(completed, planned_total_max),
        })
    }

    pub fn get_window_stats(
        &self,
        owner: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<WindowStats> {
        window_stats(&self.conn, owner, start, end)
    }

    pub fn get_motivation(&self, owner: &str) -> LedgerResult<(MotivationStats, MotivationTier)> {
        self.get_motivation_on(owner, local_today())
    }

    pub fn get_motivation_on(
        &self,
        owner: &str,
        today: NaiveDate,
    ) -> LedgerResult<(MotivationStats, MotivationTier)> {
        let ids: Vec<i64> = habits::list_active(&self.conn, owner)?
            .iter()
            .map(|h| h.id)
            .collect();
        let stats = motivation_stats(&self.conn, owner, &ids, today)?;
        Ok((stats, MotivationTier::select(&stats)))
    }

    pub fn get_system_stats(&self) -> LedgerResult<SystemStats> {
        self.get_system_stats_on(local_today())
    }

    pub fn get_system_stats_on(&self, today: NaiveDate) -> LedgerResult<SystemStats> {
        system_stats(&self.conn, today)
    }

    pub fn create_habit(&self, habit: &NewHabit) -> LedgerResult<i64> {
        let id = with_retry(&self.config.retry, "create_habit", || {
            habits::create(&self.conn, habit)
        })?;
        tracing::debug!(habit_id = id, owner = %habit.owner, "habit created");
        Ok(id)
    }

    pub fn list_active_habits(&self, owner: &str) -> LedgerResult<Vec<Habit>> {
        habits::list_active(&self.conn, owner)
    }

    pub fn set_habit_active(&self, habit_id: i64, owner: &str, active: bool) -> LedgerResult<()> {
        with_retry(&self.config.retry, "set_habit_active", || {
            habits::set_active(&self.conn, habit_id, owner, active)
        })
    }

    /// Deletes the habit; its completions follow the configured policy.
    pub fn delete_habit(&self, habit_id: i64, owner: &str) -> LedgerResult<DeleteOutcome> {
        let policy = self.config.on_delete;
        let outcome = with_retry(&self.config.retry, "delete_habit", || {
            habits::delete(&self.conn, habit_id, owner, policy)
        })?;
        tracing::info!(
            habit_id,
            owner,
            ?policy,
            completions_removed = outcome.completions_removed,
            "habit deleted"
        );
        Ok(outcome)
    }

    fn require_habit(&self, habit_id: i64, owner: &str) -> LedgerResult<Habit> {
        require_owner(owner)?;
        habits::get(&self.conn, habit_id, owner)?
            .ok_or_else(|| LedgerError::NotFound(format!("habit {habit_id} for owner {owner}")))
    }
}
