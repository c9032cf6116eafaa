//! `shipments` command handlers.

use clap::Subcommand;
use f2f_core::ShipmentSummary;

/// Sub-commands available under `shipments`.
#[derive(Debug, Subcommand)]
pub enum ShipmentCommands {
    /// List the most recent shipments
    List {
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Print the pick list of a shipment
    Summary {
        id: i64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Recompute counters of one shipment, or of every shipment from today on
    Refresh { id: Option<i64> },
    /// Attach an order to the shipment of its planned shipping date
    Assign { order_id: String },
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: ShipmentCommands) -> anyhow::Result<()> {
    match command {
        ShipmentCommands::List { limit } => run_list(pool, limit).await,
        ShipmentCommands::Summary { id, json } => run_summary(pool, id, json).await,
        ShipmentCommands::Refresh { id: Some(id) } => {
            let shipment = f2f_db::refresh_shipment_counts(pool, id).await?;
            println!(
                "shipment {} ({}): {} orders, {} products, {}",
                shipment.id,
                shipment.date,
                shipment.order_count,
                shipment.product_count,
                shipment.product_amount
            );
            Ok(())
        }
        ShipmentCommands::Refresh { id: None } => {
            let today = chrono::Utc::now().date_naive();
            let outcome = f2f_db::refresh_upcoming_shipments(pool, today).await?;
            println!(
                "refreshed {} shipment(s) from {today}, {} failed",
                outcome.refreshed, outcome.failed
            );
            if outcome.failed > 0 {
                anyhow::bail!("{} shipment(s) could not be refreshed", outcome.failed);
            }
            Ok(())
        }
        ShipmentCommands::Assign { order_id } => {
            let shipment = f2f_db::ensure_order_in_shipment(pool, &order_id).await?;
            println!(
                "order {order_id} is in shipment {} ({}), now {} orders",
                shipment.id, shipment.date, shipment.order_count
            );
            Ok(())
        }
    }
}

async fn run_list(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let shipments = f2f_db::list_shipments(pool, limit).await?;
    if shipments.is_empty() {
        println!("no shipments");
        return Ok(());
    }
    println!("{:>6}  {:<10}  {:>6}  {:>8}  {:>12}", "id", "date", "orders", "products", "amount");
    for s in shipments {
        println!(
            "{:>6}  {:<10}  {:>6}  {:>8}  {:>12}",
            s.id, s.date, s.order_count, s.product_count, s.product_amount
        );
    }
    Ok(())
}

async fn run_summary(pool: &sqlx::PgPool, id: i64, json: bool) -> anyhow::Result<()> {
    let summary = f2f_db::shipment_summary(pool, id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", format_summary(&summary));
    }
    Ok(())
}

/// Plain-text pick list; bundle components are indented under their bundle.
pub(crate) fn format_summary(summary: &ShipmentSummary) -> String {
    let mut out = format!(
        "{} orders, {} products, {}\n",
        summary.order_count, summary.product_count, summary.product_amount
    );
    for item in &summary.items {
        let variant = [item.size.as_deref(), item.unit.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if item.is_bundle_item {
            out.push_str(&format!(
                "    - {} {} x {}\n",
                item.name, variant, item.total_quantity
            ));
        } else {
            out.push_str(&format!(
                "{:<40} {:<10} {:>8} {:>10} {:>12}  {} orders: {}\n",
                item.name,
                variant,
                item.total_quantity,
                item.average_price,
                item.total_value,
                item.order_count,
                item.customers.join(", ")
            ));
        }
    }
    out
}
