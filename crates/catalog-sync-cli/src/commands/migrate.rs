use anyhow::{Context, Result};
use catalog_sync::{ItemFailure, Migration, MigrationReport};

/// Print per-item failures to stderr.
pub fn print_failures(failures: &[ItemFailure]) {
    for failure in failures {
        eprintln!("failed: {failure}");
    }
}

/// Run the migration and print results to stdout, failures to stderr.
pub async fn run(migration: &Migration<'_>) -> Result<()> {
    println!("Migrating catalog...");

    let report = migration.run().await.context("migration aborted")?;

    print_failures(&report.products.failures);
    print_failures(&report.categories.failures);
    for (category, sku) in &report.categories.unmapped {
        eprintln!("unmapped: {sku} in category {category}");
    }

    println!("{}", summary(&report));
    Ok(())
}

pub fn summary(report: &MigrationReport) -> String {
    let products = &report.products;
    let categories = &report.categories;
    format!(
        "Products: {} created, {} updated, {} failed, {} skipped.\n\
         Collections: {} created, {} failed, {} unmapped SKUs.\n\
         Destination products mapped: {} before, {} after.",
        products.created,
        products.updated,
        products.failed,
        products.skipped,
        categories.created,
        categories.failed,
        categories.unmapped.len(),
        report.mapped_before,
        report.mapped_after,
    )
}
