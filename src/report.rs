// 🧾 Report Emitter - summary and detail CSV tables
// Emission happens only after the whole roster is processed; there is no
// partial-report recovery path.

use crate::aggregate::SummaryRow;
use crate::engine::MatchedCredential;
use anyhow::{Context as AnyhowContext, Result};
use std::fs;
use std::path::Path;

pub const SUMMARY_FILE: &str = "summary_report.csv";
pub const DETAIL_FILE: &str = "detailed_report.csv";

/// Write the summary table `(badge_name, source, platform, cert_count)`
pub fn write_summary<P: AsRef<Path>>(path: P, rows: &[SummaryRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to create summary report: {:?}", path.as_ref()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write summary report: {:?}", path.as_ref()))?;
    Ok(())
}

/// Write the detail table
/// `(username, badge_id, badge_name, expires_at, source, platform)`
pub fn write_detail<P: AsRef<Path>>(path: P, credentials: &[MatchedCredential]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to create detail report: {:?}", path.as_ref()))?;
    for credential in credentials {
        writer.serialize(credential)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write detail report: {:?}", path.as_ref()))?;
    Ok(())
}

/// Write both report tables into `output_dir`, creating it if needed.
/// Detail rows are the expiring partition, as upstream consumers expect.
pub fn write_reports<P: AsRef<Path>>(
    output_dir: P,
    summary: &[SummaryRow],
    detail: &[MatchedCredential],
) -> Result<()> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;
    write_summary(output_dir.join(SUMMARY_FILE), summary)?;
    write_detail(output_dir.join(DETAIL_FILE), detail)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Platform, Source};
    use chrono::{TimeZone, Utc};

    fn sample_summary() -> Vec<SummaryRow> {
        vec![
            SummaryRow {
                badge_name: "Cloud Practitioner".to_string(),
                source: Source::parse("whitelist"),
                platform: Platform::Credly,
                cert_count: 2,
            },
            SummaryRow {
                badge_name: "Microsoft Certified: Azure Fundamentals".to_string(),
                source: Source::Azure,
                platform: Platform::Microsoft,
                cert_count: 1,
            },
        ]
    }

    fn sample_detail() -> Vec<MatchedCredential> {
        vec![MatchedCredential {
            username: "alice".to_string(),
            badge_id: "AZ-900".to_string(),
            badge_name: "Microsoft Certified: Azure Fundamentals".to_string(),
            expires_at: Some(Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()),
            source: Source::Azure,
            platform: Platform::Microsoft,
        }]
    }

    #[test]
    fn test_summary_headers_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUMMARY_FILE);
        write_summary(&path, &sample_summary()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("badge_name,source,platform,cert_count"));
        assert_eq!(lines.next(), Some("Cloud Practitioner,whitelist,CREDLY,2"));
        assert_eq!(
            lines.next(),
            Some("Microsoft Certified: Azure Fundamentals,AZURE,MICROSOFT,1")
        );
    }

    #[test]
    fn test_detail_headers_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DETAIL_FILE);
        write_detail(&path, &sample_detail()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("username,badge_id,badge_name,expires_at,source,platform")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("alice,AZ-900,Microsoft Certified: Azure Fundamentals,2027-01-01T"));
        assert!(row.ends_with("AZURE,MICROSOFT"));
    }

    #[test]
    fn test_reports_are_idempotent() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();

        write_reports(dir_a.path(), &sample_summary(), &sample_detail()).unwrap();
        write_reports(dir_b.path(), &sample_summary(), &sample_detail()).unwrap();

        for file in [SUMMARY_FILE, DETAIL_FILE] {
            let a = std::fs::read(dir_a.path().join(file)).unwrap();
            let b = std::fs::read(dir_b.path().join(file)).unwrap();
            assert_eq!(a, b, "{} must be byte-identical across runs", file);
        }
    }

    #[test]
    fn test_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("output");
        write_reports(&nested, &sample_summary(), &[]).unwrap();

        assert!(nested.join(SUMMARY_FILE).exists());
        assert!(nested.join(DETAIL_FILE).exists());
    }
}
