// cert-recon - Core Library
// Reconciles badge-platform credentials against a curated certification
// catalog and emits aggregate + per-user reports.

pub mod catalog;        // Allow/Deny Catalog + Azure lists
pub mod roster;         // User roster CSV
pub mod fetch;          // Credential Fetchers (Credly, Microsoft)
pub mod engine;         // Reconciliation Engine - the decision rules
pub mod aggregate;      // Aggregator - counts and report partitions
pub mod report;         // Report Emitter - CSV tables
pub mod builder;        // Catalog Builder - credly.yml → catalog CSV

// Re-export commonly used types
pub use catalog::{AzureLists, Catalog, CatalogEntry, CertRef, Platform, Source};
pub use roster::{load_roster, RosterUser};
pub use fetch::{
    CredentialFetcher, CredlyFetcher, MicrosoftFetcher, RawCredential, CREDLY_PER_PAGE,
};
pub use engine::{MatchedCredential, ReconciliationEngine, AZURE_NAME_MARKER};
pub use aggregate::{AggregateKey, Aggregator, SummaryRow};
pub use report::{write_detail, write_reports, write_summary, DETAIL_FILE, SUMMARY_FILE};
pub use builder::{label_from_url, write_catalog_csv, BuilderConfig, CatalogBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
