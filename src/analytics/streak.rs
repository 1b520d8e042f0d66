//! Consecutive-day streaks over a habit's completion days.
//!
//! The pure functions accept days in any order and with duplicates.

use crate::completions::store::days_for_habit;
use crate::error::LedgerResult;
use chrono::{Days, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub current: u32,
    pub best: u32,
}

/// Run of consecutive days ending today, or yesterday when today is not
/// logged yet. Days after `today` are ignored.
pub fn current_streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut sorted: Vec<NaiveDate> = days.iter().copied().filter(|d| *d <= today).collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();

    let Some(&latest) = sorted.first() else {
        return 0;
    };
    let Some(yesterday) = today.checked_sub_days(Days::new(1)) else {
        return u32::from(latest == today);
    };
    if latest != today && latest != yesterday {
        return 0;
    }

    let mut streak = 0;
    let mut expected = latest;
    for day in sorted {
        if day != expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive days anywhere in the history.
pub fn best_streak(days: &[NaiveDate]) -> u32 {
    let mut sorted = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in sorted {
        run = match prev.and_then(|p| p.succ_opt()) {
            Some(next) if next == day => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(day);
    }
    best
}

pub fn summarize(days: &[NaiveDate], today: NaiveDate) -> StreakSummary {
    StreakSummary {
        current: current_streak(days, today),
        best: best_streak(days),
    }
}

pub fn current_streak_for(
    conn: &Connection,
    habit_id: i64,
    owner: &str,
    today: NaiveDate,
) -> LedgerResult<u32> {
    Ok(current_streak(&days_for_habit(conn, habit_id, owner)?, today))
}

pub fn best_streak_for(conn: &Connection, habit_id: i64, owner: &str) -> LedgerResult<u32> {
    Ok(best_streak(&days_for_habit(conn, habit_id, owner)?))
}

pub fn summary_for(
    conn: &Connection,
    habit_id: i64,
    owner: &str,
    today: NaiveDate,
) -> LedgerResult<StreakSummary> {
    Ok(summarize(&days_for_habit(conn, habit_id, owner)?, today))
}
