//! Milestone detection and motivation tier selection. Renderers map a tier to
//! their own copy.

use crate::analytics::streak::current_streak_for;
use crate::completions::store::{completed_on, count_distinct_days_in_range};
use crate::error::LedgerResult;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const MILESTONE_DAYS: [u32; 5] = [7, 21, 30, 66, 100];

/// Days counted back from today (inclusive) for `days_active`.
pub const ACTIVITY_WINDOW_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Milestone {
    FirstWeek,
    ThreeWeeks,
    OneMonth,
    Automatic,
    Legend,
}

impl Milestone {
    pub fn days(self) -> u32 {
        match self {
            Milestone::FirstWeek => 7,
            Milestone::ThreeWeeks => 21,
            Milestone::OneMonth => 30,
            Milestone::Automatic => 66,
            Milestone::Legend => 100,
        }
    }
}

/// The milestone reached exactly at `streak`, if any.
pub fn milestone_for(streak: u32) -> Option<Milestone> {
    match streak {
        7 => Some(Milestone::FirstWeek),
        21 => Some(Milestone::ThreeWeeks),
        30 => Some(Milestone::OneMonth),
        66 => Some(Milestone::Automatic),
        100 => Some(Milestone::Legend),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotivationStats {
    pub max_streak: u32,
    pub total_habits: u32,
    pub completed_today: u32,
    pub days_active: u32,
    pub is_weekend: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum MotivationTier {
    Milestone { milestone: Milestone },
    Weekend,
    Welcome,
    Strong,
    Building,
    Encouragement,
}

impl MotivationTier {
    pub fn select(stats: &MotivationStats) -> Self {
        if let Some(milestone) = milestone_for(stats.max_streak) {
            return MotivationTier::Milestone { milestone };
        }
        if stats.is_weekend && stats.days_active >= 5 {
            return MotivationTier::Weekend;
        }
        if stats.max_streak == 0 || stats.total_habits == 0 {
            return MotivationTier::Welcome;
        }
        if stats.max_streak >= 7 {
            return MotivationTier::Strong;
        }
        if stats.max_streak >= 2 {
            return MotivationTier::Building;
        }
        if stats.days_active <= 2 {
            return MotivationTier::Encouragement;
        }
        MotivationTier::Welcome
    }
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn motivation_stats(
    conn: &Connection,
    owner: &str,
    active_habit_ids: &[i64],
    today: NaiveDate,
) -> LedgerResult<MotivationStats> {
    let mut max_streak = 0;
    for habit_id in active_habit_ids {
        max_streak = max_streak.max(current_streak_for(conn, *habit_id, owner, today)?);
    }
    let done_today = completed_on(conn, owner, today)?;
    let completed_today = active_habit_ids
        .iter()
        .filter(|id| done_today.contains(*id))
        .count() as u32;
    let window_start = today
        .checked_sub_days(Days::new(ACTIVITY_WINDOW_DAYS - 1))
        .unwrap_or(today);
    let days_active = count_distinct_days_in_range(conn, owner, window_start, today)? as u32;

    Ok(MotivationStats {
        max_streak,
        total_habits: active_habit_ids.len() as u32,
        completed_today,
        days_active,
        is_weekend: is_weekend(today),
    })
}
