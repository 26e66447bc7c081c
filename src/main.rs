use anyhow::Result;
use std::env;
use std::path::Path;

use cert_recon::{
    load_roster, write_catalog_csv, write_reports, Aggregator, AzureLists, BuilderConfig,
    Catalog, CatalogBuilder, CredlyFetcher, MicrosoftFetcher, ReconciliationEngine,
};

const DEFAULT_CERTS_FILE: &str = "certs.csv";
const DEFAULT_USERS_FILE: &str = "users.csv";
const DEFAULT_AZURE_FILE: &str = "azure.yml";
const DEFAULT_CREDLY_CONFIG: &str = "credly.yml";
const DEFAULT_OUTPUT_DIR: &str = "output";

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("build-catalog") => run_build_catalog(
            args.get(2).map(String::as_str).unwrap_or(DEFAULT_CREDLY_CONFIG),
            args.get(3).map(String::as_str).unwrap_or(DEFAULT_CERTS_FILE),
        ),
        Some("reconcile") | None => run_reconcile(
            args.get(2).map(String::as_str).unwrap_or(DEFAULT_CERTS_FILE),
            args.get(3).map(String::as_str).unwrap_or(DEFAULT_USERS_FILE),
            args.get(4).map(String::as_str).unwrap_or(DEFAULT_OUTPUT_DIR),
        ),
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Usage: cert-recon [reconcile [certs.csv [users.csv [output_dir]]]]");
            eprintln!("       cert-recon build-catalog [credly.yml [certs.csv]]");
            std::process::exit(2);
        }
    }
}

fn run_reconcile(certs_file: &str, users_file: &str, output_dir: &str) -> Result<()> {
    println!("📋 Loading catalog from {}...", certs_file);
    let mut catalog = Catalog::from_csv(certs_file)?;

    // Curated YAML whitelist entries join the catalog when present.
    // Duplicates with the CSV are legal (first match wins).
    if Path::new(DEFAULT_CREDLY_CONFIG).exists() {
        catalog.merge(Catalog::from_yaml_whitelist(DEFAULT_CREDLY_CONFIG)?);
    }
    println!("✓ Loaded {} catalog entries", catalog.len());

    // Azure allow/deny lists are optional; without them resolution falls
    // back to the name-substring heuristic.
    let azure = if Path::new(DEFAULT_AZURE_FILE).exists() {
        println!("📋 Loading Azure lists from {}...", DEFAULT_AZURE_FILE);
        AzureLists::from_yaml(DEFAULT_AZURE_FILE)?
    } else {
        AzureLists::default()
    };

    println!("👥 Loading roster from {}...", users_file);
    let users = load_roster(users_file)?;
    println!("✓ Loaded {} users", users.len());

    let engine = ReconciliationEngine::new(catalog, azure);
    let credly = CredlyFetcher::new();
    let microsoft = MicrosoftFetcher::new();
    let mut aggregator = Aggregator::new();

    println!("\n⚖️  Reconciling credentials...");
    engine.reconcile(&users, &credly, &microsoft, &mut aggregator);

    for (username, count) in aggregator.user_counts() {
        println!("  {} → {} recognized certification(s)", username, count);
    }
    println!(
        "✓ {} matched, {} expiring",
        aggregator.matched().len(),
        aggregator.expiring().len()
    );

    // Reports are written only after the whole roster has been processed
    println!("\n🧾 Writing reports to {}/...", output_dir);
    write_reports(output_dir, &aggregator.summary_rows(), aggregator.expiring())?;

    println!("✅ Reports generated successfully.");
    Ok(())
}

fn run_build_catalog(config_file: &str, certs_file: &str) -> Result<()> {
    println!("🏗️  Building catalog from {}...", config_file);
    let config = BuilderConfig::from_yaml_file(config_file)?;

    let entries = CatalogBuilder::new().build(&config);
    println!("✓ Assembled {} catalog entries", entries.len());

    write_catalog_csv(certs_file, &entries)?;
    println!("✅ Certificates written to {}", certs_file);
    Ok(())
}
