mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_sync::{FixedDelay, Migration, MigrationSettings, Normalizer};
use catalog_sync_http::{
    MagentoConfig, MagentoSource, ShopifyConfig, ShopifyDestination, SnapshotStore,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{Credentials, SyncSettings};

#[derive(Parser)]
#[command(name = "catalog-sync")]
#[command(about = "Copy a Magento catalog into a Shopify store")]
struct Cli {
    /// Skip this many leading products (resume a partial run)
    #[arg(long)]
    start_at: Option<usize>,
    /// Directory for JSON snapshots of source responses
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Settings file (defaults to ~/.config/catalog-sync/settings.toml)
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, mut settings: SyncSettings) -> SyncSettings {
        if let Some(start_at) = self.start_at {
            settings.start_at = start_at;
        }
        if let Some(data_dir) = &self.data_dir {
            settings.data_dir = data_dir.clone();
        }
        settings
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("catalog_sync=info,catalog_sync_http=info,catalog_sync_cli=info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = cli.apply(config::load_settings(cli.settings.as_deref()));
    let credentials = Credentials::from_env().context("incomplete environment")?;

    let mut magento = MagentoConfig::new(&credentials.magento_url, &credentials.magento_token);
    magento.timeout = settings.timeout();
    let mut shopify = ShopifyConfig::new(&credentials.shopify_url, &credentials.shopify_token);
    shopify.timeout = settings.timeout();

    let source = MagentoSource::new(&magento, SnapshotStore::new(&settings.data_dir))
        .context("failed to set up source client")?;
    let destination =
        ShopifyDestination::new(&shopify).context("failed to set up destination client")?;
    let throttle = FixedDelay::new(settings.delay());
    let normalizer = Normalizer::new(&credentials.magento_url, &credentials.image_folder);

    tracing::info!(
        start_at = settings.start_at,
        data_dir = %settings.data_dir.display(),
        excluded_category = ?credentials.excluded_category,
        "starting migration"
    );

    let migration = Migration::new(
        &source,
        &destination,
        &throttle,
        normalizer,
        MigrationSettings {
            start_at: settings.start_at,
            page_size: settings.page_size,
            excluded_category: credentials.excluded_category,
        },
    );

    commands::migrate::run(&migration).await
}
