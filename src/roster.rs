// 👥 User Roster - who to reconcile, and under which upstream identities

use anyhow::{Context as AnyhowContext, Result};
use serde::Deserialize;
use std::path::Path;

/// One roster user. Either identity may be absent; a user with neither
/// still goes through the run and lands in the per-user counts at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterUser {
    pub username: String,
    pub credly_username: Option<String>,
    pub ms_transcript_id: Option<String>,
}

/// Raw CSV row - all columns optional so a row with a blank identity cell
/// deserializes cleanly.
#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    credly_username: Option<String>,
    #[serde(default)]
    ms_transcript_id: Option<String>,
}

fn non_empty(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Load the roster CSV (`username, credly_username, ms_transcript_id`).
/// A missing file is fatal; rows without a username are skipped with a warning.
pub fn load_roster<P: AsRef<Path>>(path: P) -> Result<Vec<RosterUser>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("Failed to open roster CSV: {:?}", path.as_ref()))?;

    let mut users = Vec::new();
    for (idx, row) in reader.deserialize::<RosterRow>().enumerate() {
        let row = row.with_context(|| format!("Failed to parse roster CSV row {}", idx + 1))?;
        match non_empty(row.username) {
            Some(username) => users.push(RosterUser {
                username,
                credly_username: non_empty(row.credly_username),
                ms_transcript_id: non_empty(row.ms_transcript_id),
            }),
            None => log::warn!("Roster row {} skipped: username missing", idx + 1),
        }
    }
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_roster_optional_identities() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "username,credly_username,ms_transcript_id").unwrap();
        writeln!(file, "alice,alice-credly,tr-123").unwrap();
        writeln!(file, "bob,bob-credly,").unwrap();
        writeln!(file, "carol,,").unwrap();
        file.flush().unwrap();

        let users = load_roster(file.path()).unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].credly_username.as_deref(), Some("alice-credly"));
        assert_eq!(users[0].ms_transcript_id.as_deref(), Some("tr-123"));
        assert_eq!(users[1].ms_transcript_id, None);
        assert_eq!(users[2].credly_username, None);
        assert_eq!(users[2].ms_transcript_id, None);
    }

    #[test]
    fn test_load_roster_skips_rows_without_username() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "username,credly_username,ms_transcript_id").unwrap();
        writeln!(file, ",ghost,").unwrap();
        writeln!(file, "alice,,").unwrap();
        file.flush().unwrap();

        let users = load_roster(file.path()).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
    }

    #[test]
    fn test_load_roster_missing_file_is_fatal() {
        assert!(load_roster("/nonexistent/users.csv").is_err());
    }
}
