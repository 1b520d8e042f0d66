use crate::ledger::CompletionOutcome;
use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub fn mirror_completion(path: &Path, outcome: &CompletionOutcome) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    let event = &outcome.recorded.event;
    let line = json!({
        "ts": Utc::now().to_rfc3339(),
        "event": "completion_recorded",
        "habit": event.habit_id,
        "owner": event.owner,
        "day": event.day.to_string(),
        "inserted": outcome.recorded.inserted,
        "streak": outcome.strength.streak,
        "strength": outcome.strength.strength,
    });
    writeln!(f, "{}", line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::strength::StrengthCurve;
    use crate::completions::{CompletionEvent, Recorded};
    use chrono::NaiveDate;

    #[test]
    fn appends_one_line_per_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("completions.ndjson");
        let outcome = CompletionOutcome {
            recorded: Recorded {
                event: CompletionEvent {
                    habit_id: 4,
                    owner: "a".to_string(),
                    day: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                },
                inserted: true,
            },
            strength: StrengthCurve::default().evaluate(1),
            milestone: None,
        };
        mirror_completion(&path, &outcome).unwrap();
        mirror_completion(&path, &outcome).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = body
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "completion_recorded");
        assert_eq!(lines[0]["habit"], 4);
        assert_eq!(lines[0]["day"], "2026-03-02");
        assert_eq!(lines[1]["streak"], 1);
    }
}
