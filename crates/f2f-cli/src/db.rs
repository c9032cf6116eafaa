//! `db` command handlers.

pub(crate) async fn run_db_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    f2f_db::health_check(pool).await?;
    println!("database: ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = f2f_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Seeds templates from `F2F_EMAIL_TEMPLATES_PATH`; stored templates are kept.
pub(crate) async fn run_db_seed(
    pool: &sqlx::PgPool,
    config: &f2f_core::AppConfig,
) -> anyhow::Result<()> {
    let file = f2f_core::load_email_templates(&config.email_templates_path)?;
    let inserted = f2f_db::seed_email_templates(pool, &file.templates).await?;
    tracing::info!(
        path = %config.email_templates_path.display(),
        inserted,
        total = file.templates.len(),
        "email templates seeded"
    );
    println!(
        "seeded {inserted} of {} email templates",
        file.templates.len()
    );
    Ok(())
}
