//! Sessions command handler.
//!
//! Groups one run's executions into conversation sessions, most recent first.

use super::{find_run, load_dataset};
use crate::error::Result;
use crate::hierarchy::{build_sessions, SessionGroup};
use crate::model::Dataset;
use crate::output::{make_score_bar, print_count, print_header, print_table, GRAY, RESET};
use crate::schema::ColumnDescriptor;
use std::path::Path;

const SCORE_BAR_WIDTH: usize = 10;

/// Print the session groups of a run.
pub fn sessions_command(path: &Path, run_id: &str) -> Result<()> {
    let dataset = load_dataset(path)?;
    let sessions = run_sessions(&dataset, run_id)?;

    print_header(&format!("Sessions of {}", run_id));
    if sessions.is_empty() {
        println!("{GRAY}No executions in this run.{RESET}");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = sessions.iter().map(session_row).collect();
    print_table(&session_columns(), &rows);
    println!();
    for session in &sessions {
        println!(
            "{:<24} {} {:.2}",
            session.session_id,
            make_score_bar(session.avg_score, SCORE_BAR_WIDTH),
            session.avg_score
        );
    }
    println!();
    print_count(sessions.len(), "session");
    Ok(())
}

pub(crate) fn run_sessions(dataset: &Dataset, run_id: &str) -> Result<Vec<SessionGroup>> {
    let (_, run) = find_run(dataset, run_id)?;
    Ok(build_sessions(run.executions()))
}

fn session_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("sessionId", "Session"),
        ColumnDescriptor::new("timestamp", "Started"),
        ColumnDescriptor::new("messageCount", "Messages"),
        ColumnDescriptor::new("avgScore", "Avg Score"),
        ColumnDescriptor::new("firstMessage", "First Message"),
    ]
}

fn session_row(session: &SessionGroup) -> Vec<String> {
    vec![
        session.session_id.clone(),
        session
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string()),
        session.message_count.to_string(),
        format!("{:.2}", session.avg_score),
        session.first_message.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{dataset, sample_dataset};
    use serde_json::json;

    #[test]
    fn test_run_sessions_grouped() {
        let data = sample_dataset();
        let sessions = run_sessions(&data, "r1").unwrap();
        assert_eq!(sessions.len(), 1);
        let row = session_row(&sessions[0]);
        assert_eq!(
            row,
            vec!["s1", "2025-01-01 10:00", "2", "0.75", "hi"]
        );
    }

    #[test]
    fn test_executions_without_session_stand_alone() {
        let data = dataset(json!({
            "workflows": [{"id": "w", "runs": [{"id": "r", "runs": [
                {"id": "a", "input": "first"},
                {"id": "b"}
            ]}]}]
        }));
        let sessions = run_sessions(&data, "r").unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(sessions.len(), 2);
        assert!(ids.contains(&"exec_a"));
        assert!(ids.contains(&"exec_b"));
        let b = sessions.iter().find(|s| s.session_id == "exec_b").unwrap();
        assert_eq!(session_row(b)[1], "-");
        assert_eq!(session_row(b)[4], "No input");
    }
}
