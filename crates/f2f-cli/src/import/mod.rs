//! WooCommerce import command handlers.
//!
//! Every pass fetches the full WooCommerce list for its entity, compares it
//! against the stored rows and writes only what changed. Per-item failures are
//! logged, counted and skipped; a failure to fetch the list aborts the run.
//! Each run is recorded in `import_runs` with one `import_run_entities` row
//! per pass.

mod catalog;
mod orders;

use clap::Subcommand;
use f2f_woo::{ClientOptions, ImageFolder, ImageUploader, SyncReport, WooClient};

/// Sub-commands available under `import`.
#[derive(Debug, Subcommand)]
pub enum ImportCommands {
    /// Check WooCommerce credentials and print the WordPress version
    Ping,
    /// Import product categories and their parent links
    Categories {
        /// Compare without writing to the database or uploading images
        #[arg(long)]
        dry_run: bool,
    },
    /// Import producers
    Producers {
        #[arg(long)]
        dry_run: bool,
    },
    /// Import products (run categories and producers first)
    Products {
        #[arg(long)]
        dry_run: bool,
    },
    /// Import orders and place them into shipments
    Orders {
        #[arg(long)]
        dry_run: bool,
    },
    /// Run every pass in dependency order
    All {
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImportEntity {
    Categories,
    Producers,
    Products,
    Orders,
}

impl ImportEntity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Producers => "producers",
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }
}

impl ImportCommands {
    /// Passes to run, in order, and whether the run is a dry run.
    /// `None` for commands that do not import.
    pub(crate) fn plan(&self) -> Option<(Vec<ImportEntity>, bool)> {
        match *self {
            Self::Ping => None,
            Self::Categories { dry_run } => Some((vec![ImportEntity::Categories], dry_run)),
            Self::Producers { dry_run } => Some((vec![ImportEntity::Producers], dry_run)),
            Self::Products { dry_run } => Some((vec![ImportEntity::Products], dry_run)),
            Self::Orders { dry_run } => Some((vec![ImportEntity::Orders], dry_run)),
            Self::All { dry_run } => Some((
                vec![
                    ImportEntity::Categories,
                    ImportEntity::Producers,
                    ImportEntity::Products,
                    ImportEntity::Orders,
                ],
                dry_run,
            )),
        }
    }
}

/// Shared handles for one import run.
pub(crate) struct ImportContext<'a> {
    pub pool: &'a sqlx::PgPool,
    pub client: &'a WooClient,
    pub uploader: Option<&'a ImageUploader>,
    pub dry_run: bool,
}

impl ImportContext<'_> {
    /// Re-uploads a WooCommerce image and returns the stored URL.
    ///
    /// Without an upload endpoint the WooCommerce URL is kept as-is. A failed
    /// upload is recorded on the report and yields `None`; the item itself is
    /// still written and keeps the image it already had.
    pub(crate) async fn reupload_image(
        &self,
        report: &mut SyncReport,
        item_name: &str,
        woo_id: i64,
        source_url: Option<&str>,
        folder: ImageFolder,
    ) -> Option<String> {
        let source_url = source_url?;
        if self.dry_run {
            return None;
        }
        let Some(uploader) = self.uploader else {
            return Some(source_url.to_owned());
        };

        let filename = f2f_woo::upload_filename(woo_id, source_url);
        match uploader.upload_from_url(source_url, folder, &filename).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(item = item_name, source_url, error = %e, "image re-upload failed");
                report.image_failed(item_name, e);
                None
            }
        }
    }
}

pub(crate) async fn run_import_ping(config: &f2f_core::AppConfig) -> anyhow::Result<()> {
    let client = build_woo_client(config)?;
    let version = client.ping().await?;
    println!("woocommerce: ok (WordPress {version})");
    Ok(())
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &f2f_core::AppConfig,
    command: &ImportCommands,
) -> anyhow::Result<()> {
    let Some((entities, dry_run)) = command.plan() else {
        return run_import_ping(config).await;
    };

    let client = build_woo_client(config)?;
    let uploader = match config.image_upload_url.as_deref() {
        Some(url) => Some(
            ImageUploader::new(url, config.woo_request_timeout_secs, &config.woo_user_agent)
                .map_err(|e| anyhow::anyhow!("failed to build image uploader: {e}"))?,
        ),
        None => {
            tracing::warn!("F2F_IMAGE_UPLOAD_URL is not set; WooCommerce image URLs are kept as-is");
            None
        }
    };
    let ctx = ImportContext {
        pool,
        client: &client,
        uploader: uploader.as_ref(),
        dry_run,
    };

    let run = f2f_db::create_import_run(pool, "cli", dry_run).await?;
    if let Err(e) = f2f_db::start_import_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
        return Err(e.into());
    }
    tracing::info!(run_id = run.id, public_id = %run.public_id, dry_run, "import run started");

    match run_passes(&ctx, run.id, &entities).await {
        Ok(()) => {
            f2f_db::complete_import_run(pool, run.id).await?;
            tracing::info!(run_id = run.id, "import run completed");
            Ok(())
        }
        Err(e) => {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            Err(e)
        }
    }
}

async fn run_passes(
    ctx: &ImportContext<'_>,
    run_id: i64,
    entities: &[ImportEntity],
) -> anyhow::Result<()> {
    for &entity in entities {
        let mut progress = move |processed: usize, total: usize, current: &str| {
            tracing::info!(
                entity = entity.as_str(),
                processed,
                total,
                current,
                "import progress"
            );
        };

        let report = match entity {
            ImportEntity::Categories => catalog::sync_categories(ctx, &mut progress).await?,
            ImportEntity::Producers => catalog::sync_producers(ctx, &mut progress).await?,
            ImportEntity::Products => catalog::sync_products(ctx, &mut progress).await?,
            ImportEntity::Orders => orders::sync_orders(ctx, &mut progress).await?,
        };

        f2f_db::record_import_entity(
            ctx.pool,
            run_id,
            entity.as_str(),
            count_i32(report.success),
            count_i32(report.errors),
            &report.details,
        )
        .await?;
        print_report(entity, &report, ctx.dry_run);
    }
    Ok(())
}

fn build_woo_client(config: &f2f_core::AppConfig) -> anyhow::Result<WooClient> {
    let woo = config.woo.as_ref().ok_or_else(|| {
        anyhow::anyhow!("F2F_WOO_BASE_URL is not set; WooCommerce import is unavailable")
    })?;
    WooClient::new(woo, &ClientOptions::from_app_config(config))
        .map_err(|e| anyhow::anyhow!("failed to build WooCommerce client: {e}"))
}

fn print_report(entity: ImportEntity, report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "dry-run: " } else { "" };
    println!(
        "{prefix}{}: {} ok, {} errors",
        entity.as_str(),
        report.success,
        report.errors
    );
    for line in &report.details {
        println!("  {line}");
    }
}

fn count_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = f2f_db::fail_import_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark import run as failed"
        );
    }
}
