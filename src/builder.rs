// 🏗️ Catalog Builder - turns a Credly YAML config into the catalog CSV
// Sources: explicit whitelist entries plus badge templates fetched from
// configured collection/organization URLs, minus the blacklist.

use crate::catalog::{CatalogEntry, CertRef, Platform, Source};
use crate::fetch::CREDLY_PER_PAGE;
use anyhow::{Context as AnyhowContext, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

// ============================================================================
// BUILDER CONFIG
// ============================================================================

/// credly.yml layout. Every key is optional and may be null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub whitelist: Option<Vec<CertRef>>,
    #[serde(default)]
    pub blacklist: Option<Vec<CertRef>>,
    /// Credly collection URLs (badge templates fetched per collection)
    #[serde(default)]
    pub collections: Option<Vec<String>>,
    /// Credly organization URLs
    #[serde(default)]
    pub organizations: Option<Vec<String>>,
}

impl BuilderConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read builder config: {:?}", path.as_ref()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse builder config: {:?}", path.as_ref()))
    }
}

/// Human-ish label for a collection/organization URL: its final path segment.
pub fn label_from_url(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
}

// ============================================================================
// CATALOG BUILDER
// ============================================================================

#[derive(Debug, Deserialize)]
struct TemplatePage {
    #[serde(default)]
    data: Option<Vec<TemplateItem>>,
    #[serde(default)]
    metadata: Option<TemplatePageMeta>,
}

#[derive(Debug, Deserialize)]
struct TemplateItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TemplatePageMeta {
    current_page: u32,
    total_pages: u32,
}

/// Fetches badge templates from Credly and assembles the catalog entry list.
/// A failed page fetch aborts that URL with an error log; the rest of the
/// config still contributes.
pub struct CatalogBuilder {
    http: reqwest::blocking::Client,
    per_page: u32,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        CatalogBuilder {
            http: reqwest::blocking::Client::new(),
            per_page: CREDLY_PER_PAGE,
        }
    }

    pub fn build(&self, config: &BuilderConfig) -> Vec<CatalogEntry> {
        let mut entries = Vec::new();

        for item in config.whitelist.as_deref().unwrap_or_default() {
            match (item.id(), item.name()) {
                (Some(id), Some(name)) => entries.push(CatalogEntry {
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

        for url in config.collections.as_deref().unwrap_or_default() {
            let source = format!("Collection: {}", label_from_url(url));
            entries.extend(self.badge_templates_of(url, &source));
        }

        for url in config.organizations.as_deref().unwrap_or_default() {
            let source = format!("Organization: {}", label_from_url(url));
            entries.extend(self.badge_templates_of(url, &source));
        }

        self.apply_blacklist(entries, config.blacklist.as_deref().unwrap_or_default())
    }

    /// Paginated badge template fetch for one collection/organization URL
    fn badge_templates_of(&self, url: &str, source: &str) -> Vec<CatalogEntry> {
        let mut entries = Vec::new();
        let mut page = 1u32;

        loop {
            let paginated_url = format!("{}.json?page={}&per={}", url, page, self.per_page);
            let body: TemplatePage = match self
                .http
                .get(&paginated_url)
                .send()
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.json())
            {
                Ok(body) => body,
                Err(err) => {
                    log::error!("Failed to fetch badges from {}: {}", paginated_url, err);
                    break;
                }
            };

            let data = match body.data {
                Some(data) if !data.is_empty() => data,
                _ => {
                    log::warn!(
                        "{} : Returned no badges or data might be missing",
                        paginated_url
                    );
                    break;
                }
            };

            for item in data {
                match (item.id, item.name) {
                    (Some(id), Some(name)) if !id.trim().is_empty() && !name.is_empty() => {
                        entries.push(CatalogEntry {
                            cert_id: id.trim().to_string(),
                            cert_name: name,
                            source: Source::Label(source.to_string()),
                            platform: Platform::Credly,
                        });
                    }
                    _ => {}
                }
            }

            match body.metadata {
                Some(meta) if meta.current_page < meta.total_pages => page += 1,
                _ => break,
            }
        }

        entries
    }

    /// Remove entries whose id or name appears in the blacklist
    fn apply_blacklist(
        &self,
        entries: Vec<CatalogEntry>,
        blacklist: &[CertRef],
    ) -> Vec<CatalogEntry> {
        if blacklist.is_empty() {
            return entries;
        }
        let ids: HashSet<&str> = blacklist.iter().filter_map(CertRef::id).collect();
        let names: HashSet<&str> = blacklist.iter().filter_map(CertRef::name).collect();

        entries
            .into_iter()
            .filter(|entry| {
                !ids.contains(entry.cert_id.as_str()) && !names.contains(entry.cert_name.as_str())
            })
            .collect()
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the assembled entries as the catalog CSV
/// (`cert_id, cert_name, source, platform`).
pub fn write_catalog_csv<P: AsRef<Path>>(path: P, entries: &[CatalogEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to create catalog CSV: {:?}", path.as_ref()))?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write catalog CSV: {:?}", path.as_ref()))?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
