//! `email` command handlers.

use clap::Subcommand;
use f2f_core::{EmailTemplate, EmailTrigger};
use f2f_notify::{Notifier, ResendClient};

const SEND_TIMEOUT_SECS: u64 = 30;

/// Sub-commands available under `email`.
#[derive(Debug, Subcommand)]
pub enum EmailCommands {
    /// List stored templates and whether they are enabled
    List,
    /// Send the stored template of a trigger as a test email
    Test {
        /// Trigger name, e.g. order_placed
        trigger: EmailTrigger,
        /// Recipient address (defaults to a placeholder address)
        #[arg(long)]
        to: Option<String>,
        /// Name rendered into {{name}}
        #[arg(long)]
        name: Option<String>,
    },
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &f2f_core::AppConfig,
    command: EmailCommands,
) -> anyhow::Result<()> {
    match command {
        EmailCommands::List => run_email_list(pool).await,
        EmailCommands::Test { trigger, to, name } => {
            run_email_test(pool, config, trigger, to.as_deref(), name.as_deref()).await
        }
    }
}

async fn run_email_list(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let rows = f2f_db::list_email_templates(pool).await?;
    if rows.is_empty() {
        println!("no email templates stored; run `f2f-cli db seed`");
        return Ok(());
    }
    for row in rows {
        let state = if row.enabled { "enabled" } else { "disabled" };
        println!("{:<18} {:<9} {}", row.trigger, state, row.subject);
    }
    Ok(())
}

async fn run_email_test(
    pool: &sqlx::PgPool,
    config: &f2f_core::AppConfig,
    trigger: EmailTrigger,
    to: Option<&str>,
    name: Option<&str>,
) -> anyhow::Result<()> {
    let api_key = config
        .resend_api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("F2F_RESEND_API_KEY is not set; cannot send email"))?;

    let row = f2f_db::get_email_template(pool, trigger)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no email template stored for trigger {trigger}"))?;
    let template = EmailTemplate::try_from(row)?;

    let client = ResendClient::with_base_url(api_key, SEND_TIMEOUT_SECS, &config.resend_base_url)?;
    let notifier = Notifier::new(client, config.from_email.clone());
    let id = notifier.send_test(&template, to, name).await?;

    println!("test email for {trigger} sent (message id {id})");
    Ok(())
}
