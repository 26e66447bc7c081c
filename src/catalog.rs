// 📋 Allow/Deny Catalog - Curated list of recognized certifications
// Loaded once, passed by reference into the reconciliation engine.
// No hidden module-level state.

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::Path;

// ============================================================================
// PLATFORM
// ============================================================================

/// Platform - the literal upstream system that issued a credential.
///
/// Only CREDLY and MICROSOFT ever appear on raw fetched data; AZURE exists
/// as a catalog/resolved value. Keep this distinct from `Source`: platform is
/// structural, source is a business-policy label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "CREDLY")]
    Credly,
    #[serde(rename = "MICROSOFT")]
    Microsoft,
    #[serde(rename = "AZURE")]
    Azure,
}

impl Platform {
    /// Upper-case wire/report name
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Credly => "CREDLY",
            Platform::Microsoft => "MICROSOFT",
            Platform::Azure => "AZURE",
        }
    }

    /// Parse a catalog cell (case-insensitive, padding tolerated)
    pub fn parse(raw: &str) -> Option<Platform> {
        match raw.trim().to_uppercase().as_str() {
            "CREDLY" => Some(Platform::Credly),
            "MICROSOFT" => Some(Platform::Microsoft),
            "AZURE" => Some(Platform::Azure),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SOURCE
// ============================================================================

/// Source - the resolved business label attributed to a credential.
///
/// May differ from the issuing platform (a Microsoft-issued certification can
/// carry the AZURE sub-brand label). Free-text labels from the catalog
/// ("whitelist", "Collection: ...") are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Azure,
    Microsoft,
    Credly,
    Label(String),
}

impl Source {
    /// Parse a catalog cell; anything that is not a fixed variant name
    /// becomes a free-text label.
    pub fn parse(raw: &str) -> Source {
        match raw.trim().to_uppercase().as_str() {
            "AZURE" => Source::Azure,
            "MICROSOFT" => Source::Microsoft,
            "CREDLY" => Source::Credly,
            _ => Source::Label(raw.to_string()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Azure => f.write_str("AZURE"),
            Source::Microsoft => f.write_str("MICROSOFT"),
            Source::Credly => f.write_str("CREDLY"),
            Source::Label(label) => f.write_str(label),
        }
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Source::parse(&raw))
    }
}

// ============================================================================
// CATALOG ENTRY
// ============================================================================

/// One recognized certification in the curated catalog.
/// Immutable once loaded; duplicates are legal (first match wins downstream).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Badge template id (trimmed on load, upstream padding is inconsistent)
    pub cert_id: String,
    pub cert_name: String,
    /// Free-text source label ("whitelist", "Collection: ...") or sub-brand
    pub source: Source,
    pub platform: Platform,
}

/// Raw CSV row before validation - every column optional so a malformed
/// row is skipped with a warning instead of aborting the load.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(default)]
    cert_id: Option<String>,
    #[serde(default)]
    cert_name: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    platform: Option<String>,
}

/// A `{cert_id, cert_name}` reference as it appears in YAML allow/deny
/// configuration (whitelist/blacklist items).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertRef {
    #[serde(default)]
    pub cert_id: Option<String>,
    #[serde(default)]
    pub cert_name: Option<String>,
}

impl CertRef {
    /// Trimmed id, if present and non-empty
    pub fn id(&self) -> Option<&str> {
        self.cert_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.cert_name.as_deref().filter(|s| !s.is_empty())
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// Ordered collection of recognized certifications.
///
/// Iteration order is load order; the engine takes the FIRST entry that
/// matches a credential (first-match, not best-match), so duplicate or
/// conflicting rows are tolerated without error.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog { entries: Vec::new() }
    }

    /// Load from a CSV with columns `cert_id, cert_name, source, platform`.
    ///
    /// Rows missing id or name are skipped with a warning; an unreadable
    /// file is fatal.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())
            .with_context(|| format!("Failed to open catalog CSV: {:?}", path.as_ref()))?;

        let mut catalog = Catalog::new();
        for (idx, row) in reader.deserialize::<CatalogRow>().enumerate() {
            let row = row
                .with_context(|| format!("Failed to parse catalog CSV row {}", idx + 1))?;
            catalog.push_row(row, idx + 1);
        }
        Ok(catalog)
    }

    /// Load the `whitelist:` entries of a YAML config (e.g. credly.yml).
    /// Each valid item becomes an entry with source "whitelist" on CREDLY.
    pub fn from_yaml_whitelist<P: AsRef<Path>>(path: P) -> Result<Self> {
        #[derive(Deserialize)]
        struct WhitelistConfig {
            #[serde(default)]
            whitelist: Option<Vec<CertRef>>,
        }

        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read catalog config: {:?}", path.as_ref()))?;
        let config: WhitelistConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse catalog config: {:?}", path.as_ref()))?;

        let mut catalog = Catalog::new();
        for item in config.whitelist.unwrap_or_default() {
            match (item.id(), item.name()) {
                (Some(id), Some(name)) => catalog.push(CatalogEntry {
                    cert_id: id.to_string(),
                    cert_name: name.to_string(),
                    source: Source::Label("whitelist".to_string()),
                    platform: Platform::Credly,
                }),
                _ => log::warn!(
                    "Whitelist entry is invalid, cert_name or cert_id is missing: {:?}",
                    item
                ),
            }
        }
        Ok(catalog)
    }

    fn push_row(&mut self, row: CatalogRow, line: usize) {
        let cert_id = row.cert_id.as_deref().map(str::trim).unwrap_or("");
        let cert_name = row.cert_name.as_deref().unwrap_or("");
        if cert_id.is_empty() || cert_name.is_empty() {
            log::warn!("Catalog row {} skipped: cert_id or cert_name missing", line);
            return;
        }

        let platform = match row.platform.as_deref().and_then(Platform::parse) {
            Some(platform) => platform,
            None => {
                log::warn!(
                    "Catalog row {} skipped: unknown platform {:?}",
                    line,
                    row.platform
                );
                return;
            }
        };

        self.push(CatalogEntry {
            cert_id: cert_id.to_string(),
            cert_name: cert_name.to_string(),
            source: Source::parse(row.source.as_deref().unwrap_or("")),
            platform,
        });
    }

    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    /// Append all entries of another catalog, preserving order.
    pub fn merge(&mut self, other: Catalog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry matching the credential: id-or-name equality AND platform
    /// equality. Both ids are trimmed at the comparison site.
    pub fn find_match(
        &self,
        badge_id: &str,
        badge_name: &str,
        platform: Platform,
    ) -> Option<&CatalogEntry> {
        let badge_id = badge_id.trim();
        self.entries.iter().find(|entry| {
            (badge_id == entry.cert_id.trim() || badge_name == entry.cert_name)
                && platform == entry.platform
        })
    }
}

// ============================================================================
// AZURE ALLOW/DENY LISTS
// ============================================================================

/// Separate Azure allow/deny configuration for Microsoft source resolution.
///
/// The Microsoft transcript API does not distinguish the Azure sub-brand
/// from general Microsoft certifications; these lists are the override
/// authority (YAML keys `whitelist` / `blacklist`).
#[derive(Debug, Clone, Default)]
pub struct AzureLists {
    allow: Vec<CertRef>,
    deny: Vec<CertRef>,
}

impl AzureLists {
    pub fn new(allow: Vec<CertRef>, deny: Vec<CertRef>) -> Self {
        AzureLists { allow, deny }
    }

    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        #[derive(Deserialize)]
        struct AzureConfig {
            #[serde(default)]
            whitelist: Option<Vec<CertRef>>,
            #[serde(default)]
            blacklist: Option<Vec<CertRef>>,
        }

        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read Azure list config: {:?}", path.as_ref()))?;
        let config: AzureConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse Azure list config: {:?}", path.as_ref()))?;

        Ok(AzureLists::new(
            Self::validated(config.whitelist.unwrap_or_default(), "whitelist"),
            Self::validated(config.blacklist.unwrap_or_default(), "blacklist"),
        ))
    }

    fn validated(items: Vec<CertRef>, list_name: &str) -> Vec<CertRef> {
        items
            .into_iter()
            .filter(|item| {
                let valid = item.id().is_some() || item.name().is_some();
                if !valid {
                    log::warn!("Azure {} entry skipped: cert_id and cert_name both missing", list_name);
                }
                valid
            })
            .collect()
    }

    /// Exact-match lookup against the allow-list (trimmed id or verbatim name)
    pub fn allow_contains(&self, badge_id: &str, badge_name: &str) -> bool {
        Self::contains(&self.allow, badge_id, badge_name)
    }

    /// Exact-match lookup against the deny-list
    pub fn deny_contains(&self, badge_id: &str, badge_name: &str) -> bool {
        Self::contains(&self.deny, badge_id, badge_name)
    }

    fn contains(list: &[CertRef], badge_id: &str, badge_name: &str) -> bool {
        let badge_id = badge_id.trim();
        list.iter().any(|item| {
            item.id().map_or(false, |id| id == badge_id)
                || item.name().map_or(false, |name| name == badge_name)
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry(id: &str, name: &str, source: &str, platform: Platform) -> CatalogEntry {
        CatalogEntry {
            cert_id: id.to_string(),
            cert_name: name.to_string(),
            source: Source::parse(source),
            platform,
        }
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!(Platform::parse(" credly "), Some(Platform::Credly));
        assert_eq!(Platform::parse("MICROSOFT"), Some(Platform::Microsoft));
        assert_eq!(Platform::parse("Azure"), Some(Platform::Azure));
        assert_eq!(Platform::parse("GITHUB"), None);
    }

    #[test]
    fn test_source_parse_fixed_and_label() {
        assert_eq!(Source::parse("AZURE"), Source::Azure);
        assert_eq!(Source::parse("azure"), Source::Azure);
        assert_eq!(
            Source::parse("Collection: AWS Certification Program"),
            Source::Label("Collection: AWS Certification Program".to_string())
        );
        assert_eq!(Source::parse("whitelist").to_string(), "whitelist");
    }

    #[test]
    fn test_find_match_by_trimmed_id() {
        let mut catalog = Catalog::new();
        catalog.push(entry("123", "Cloud Practitioner", "whitelist", Platform::Credly));

        // Trailing space on the fetched badge id must still match
        let matched = catalog.find_match("123 ", "Some Other Name", Platform::Credly);
        assert!(matched.is_some());
        assert_eq!(matched.unwrap().source, Source::Label("whitelist".to_string()));
    }

    #[test]
    fn test_find_match_by_name_when_id_differs() {
        let mut catalog = Catalog::new();
        catalog.push(entry("123", "Cloud Practitioner", "whitelist", Platform::Credly));

        let matched = catalog.find_match("999", "Cloud Practitioner", Platform::Credly);
        assert!(matched.is_some());
    }

    #[test]
    fn test_find_match_requires_platform_equality() {
        let mut catalog = Catalog::new();
        catalog.push(entry("123", "Cloud Practitioner", "whitelist", Platform::Microsoft));

        assert!(catalog.find_match("123", "Cloud Practitioner", Platform::Credly).is_none());
    }

    #[test]
    fn test_first_match_wins_on_duplicates() {
        let mut catalog = Catalog::new();
        catalog.push(entry("123", "Cloud Practitioner", "first", Platform::Credly));
        catalog.push(entry("123", "Cloud Practitioner", "second", Platform::Credly));

        let matched = catalog.find_match("123", "Cloud Practitioner", Platform::Credly).unwrap();
        assert_eq!(matched.source, Source::Label("first".to_string()));
    }

    #[test]
    fn test_merge_appends_in_order() {
        let mut catalog = Catalog::new();
        catalog.push(entry("1", "From CSV", "csv", Platform::Credly));
        let mut extra = Catalog::new();
        extra.push(entry("2", "From YAML", "whitelist", Platform::Credly));

        catalog.merge(extra);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[1].cert_name, "From YAML");
    }

    #[test]
    fn test_csv_load_skips_malformed_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cert_id,cert_name,source,platform").unwrap();
        writeln!(file, " 123 ,Cloud Practitioner,whitelist,CREDLY").unwrap();
        writeln!(file, ",Missing Id,whitelist,CREDLY").unwrap();
        writeln!(file, "456,,whitelist,CREDLY").unwrap();
        writeln!(file, "789,Bad Platform,whitelist,GITHUB").unwrap();
        file.flush().unwrap();

        let catalog = Catalog::from_csv(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        // Padding trimmed on load
        assert_eq!(catalog.entries()[0].cert_id, "123");
    }

    #[test]
    fn test_csv_load_missing_file_is_fatal() {
        assert!(Catalog::from_csv("/nonexistent/certs.csv").is_err());
    }

    #[test]
    fn test_yaml_whitelist_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "whitelist:").unwrap();
        writeln!(file, "  - cert_id: '123'").unwrap();
        writeln!(file, "    cert_name: Cloud Practitioner").unwrap();
        writeln!(file, "  - cert_name: Orphan Name").unwrap();
        file.flush().unwrap();

        let catalog = Catalog::from_yaml_whitelist(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].platform, Platform::Credly);
        assert_eq!(catalog.entries()[0].source, Source::Label("whitelist".to_string()));
    }

    #[test]
    fn test_yaml_whitelist_null_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "whitelist:").unwrap();
        file.flush().unwrap();

        let catalog = Catalog::from_yaml_whitelist(file.path()).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_azure_lists_lookup() {
        let lists = AzureLists::new(
            vec![CertRef {
                cert_id: Some("AZ-900".to_string()),
                cert_name: Some("Microsoft Certified: Azure Fundamentals".to_string()),
            }],
            vec![CertRef {
                cert_id: None,
                cert_name: Some("Microsoft 365 Certified: Fundamentals".to_string()),
            }],
        );

        assert!(lists.allow_contains("AZ-900 ", "anything"));
        assert!(lists.allow_contains("other", "Microsoft Certified: Azure Fundamentals"));
        assert!(!lists.allow_contains("MS-900", "Microsoft 365 Certified: Fundamentals"));
        assert!(lists.deny_contains("MS-900", "Microsoft 365 Certified: Fundamentals"));
    }

    #[test]
    fn test_azure_lists_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "whitelist:").unwrap();
        writeln!(file, "  - cert_id: AZ-104").unwrap();
        writeln!(file, "blacklist:").unwrap();
        writeln!(file, "  - cert_name: 'Microsoft 365 Certified: Fundamentals'").unwrap();
        file.flush().unwrap();

        let lists = AzureLists::from_yaml(file.path()).unwrap();
        assert!(lists.allow_contains("AZ-104", ""));
        assert!(lists.deny_contains("", "Microsoft 365 Certified: Fundamentals"));
    }
}
