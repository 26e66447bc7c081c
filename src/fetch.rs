// 🌐 Credential Fetchers - one per upstream badge platform
// Blocking reqwest clients (no Tokio runtime required).
//
// Contract: a non-success HTTP status yields an empty list plus a warning
// diagnostic; transport errors surface as Err and are recovered locally by
// the reconciliation engine (that identity contributes zero credentials).

use crate::catalog::Platform;
use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

/// Default page size for Credly pagination
pub const CREDLY_PER_PAGE: u32 = 48;

const CREDLY_BASE_URL: &str = "https://www.credly.com";
const MICROSOFT_BASE_URL: &str = "https://learn.microsoft.com";

// ============================================================================
// RAW CREDENTIAL
// ============================================================================

/// One credential as reported by an upstream platform, before reconciliation.
/// `platform` is fixed by which fetcher produced the record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCredential {
    pub badge_id: String,
    pub badge_name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub platform: Platform,
}

// ============================================================================
// FETCHER TRAIT
// ============================================================================

/// Fetches the normalized credential list for one upstream identity.
/// Two concrete implementations exist (Credly, Microsoft); the engine only
/// sees this seam so tests can substitute canned fetchers.
pub trait CredentialFetcher {
    /// Which platform this fetcher's credentials are issued under
    fn platform(&self) -> Platform;

    fn fetch(&self, identity: &str) -> Result<Vec<RawCredential>>;
}

/// Lenient expiry parsing: RFC 3339 first, then plain date. Upstream emits
/// both; anything else is logged and treated as no expiry.
fn parse_expiry(raw: &str, badge_id: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    log::warn!("Unparseable expiry {:?} on credential {}", raw, badge_id);
    None
}

// ============================================================================
// CREDLY
// ============================================================================

#[derive(Debug, Deserialize)]
struct CredlyBadgesPage {
    #[serde(default)]
    data: Option<Vec<CredlyBadge>>,
    #[serde(default)]
    metadata: Option<CredlyPageMeta>,
}

#[derive(Debug, Deserialize)]
struct CredlyBadge {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    badge_template: Option<CredlyBadgeTemplate>,
}

#[derive(Debug, Deserialize)]
struct CredlyBadgeTemplate {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredlyPageMeta {
    current_page: u32,
    total_pages: u32,
}

/// Credly badge fetcher: `GET {base}/users/{handle}/badges.json?page=N&per=48`,
/// following `metadata.current_page/total_pages` until the last page.
pub struct CredlyFetcher {
    http: reqwest::blocking::Client,
    base_url: String,
    per_page: u32,
}

impl CredlyFetcher {
    pub fn new() -> Self {
        Self::with_base_url(CREDLY_BASE_URL.to_string())
    }

    /// Custom base URL (tests point this at a local mock server)
    pub fn with_base_url(base_url: String) -> Self {
        CredlyFetcher {
            http: reqwest::blocking::Client::new(),
            base_url,
            per_page: CREDLY_PER_PAGE,
        }
    }
}

impl Default for CredlyFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialFetcher for CredlyFetcher {
    fn platform(&self) -> Platform {
        Platform::Credly
    }

    fn fetch(&self, identity: &str) -> Result<Vec<RawCredential>> {
        let mut credentials = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/users/{}/badges.json?page={}&per={}",
                self.base_url, identity, page, self.per_page
            );
            let response = self
                .http
                .get(&url)
                .send()
                .with_context(|| format!("Failed to fetch badges from {}", url))?;

            if !response.status().is_success() {
                log::warn!(
                    "Failed to fetch badges for user {}: HTTP {}",
                    identity,
                    response.status()
                );
                return Ok(Vec::new());
            }

            let body: CredlyBadgesPage = response
                .json()
                .with_context(|| format!("Failed to decode badges from {}", url))?;

            let data = match body.data {
                Some(data) if !data.is_empty() => data,
                _ => {
                    log::warn!("{} : Returned no badges or data might be missing", url);
                    break;
                }
            };

            for badge in data {
                let id = badge.id.unwrap_or_default();
                let name = badge
                    .badge_template
                    .and_then(|template| template.name)
                    .unwrap_or_default();
                if id.is_empty() || name.is_empty() {
                    log::warn!("Credly badge skipped for {}: id or name missing", identity);
                    continue;
                }
                let expires_at = badge
                    .expires_at
                    .as_deref()
                    .and_then(|raw| parse_expiry(raw, &id));
                credentials.push(RawCredential {
                    badge_id: id,
                    badge_name: name,
                    expires_at,
                    platform: Platform::Credly,
                });
            }

            match body.metadata {
                Some(meta) if meta.current_page < meta.total_pages => page += 1,
                _ => break,
            }
        }

        Ok(credentials)
    }
}

// ============================================================================
// MICROSOFT
// ============================================================================

#[derive(Debug, Deserialize)]
struct MsTranscript {
    #[serde(default)]
    certifications: Vec<MsCertification>,
}

#[derive(Debug, Deserialize)]
struct MsCertification {
    #[serde(default, rename = "certificationNumber")]
    certification_number: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    expiration: Option<String>,
}

/// Microsoft transcript fetcher: `GET {base}/api/profiles/transcript/{id}`.
/// The transcript API reports certifications as
/// `{certificationNumber, name, expiration}` entries.
pub struct MicrosoftFetcher {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl MicrosoftFetcher {
    pub fn new() -> Self {
        Self::with_base_url(MICROSOFT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        MicrosoftFetcher {
            http: reqwest::blocking::Client::new(),
            base_url,
        }
    }
}

impl Default for MicrosoftFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialFetcher for MicrosoftFetcher {
    fn platform(&self) -> Platform {
        Platform::Microsoft
    }

    fn fetch(&self, identity: &str) -> Result<Vec<RawCredential>> {
        let url = format!("{}/api/profiles/transcript/{}", self.base_url, identity);
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("Failed to fetch transcript from {}", url))?;

        if !response.status().is_success() {
            log::warn!(
                "Failed to fetch transcript {}: HTTP {}",
                identity,
                response.status()
            );
            return Ok(Vec::new());
        }

        let body: MsTranscript = response
            .json()
            .with_context(|| format!("Failed to decode transcript from {}", url))?;

        let mut credentials = Vec::new();
        for cert in body.certifications {
            let id = cert.certification_number.unwrap_or_default();
            let name = cert.name.unwrap_or_default();
            if id.is_empty() || name.is_empty() {
                log::warn!(
                    "Transcript entry skipped for {}: certificationNumber or name missing",
                    identity
                );
                continue;
            }
            let expires_at = cert.expiration.as_deref().and_then(|raw| parse_expiry(raw, &id));
            credentials.push(RawCredential {
                badge_id: id,
                badge_name: name,
                expires_at,
                platform: Platform::Microsoft,
            });
        }
        Ok(credentials)
    }
}

// ============================================================================
// TESTS
// ============================================================================
