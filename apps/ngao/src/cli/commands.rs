//! # CLI Command Implementations

use ngao::api;
use ngao::config::{Backend, Config};
use ngao::seed::Seed;
use ngao_core::{Engine, EntityKind, EntityRef, NewOfficer, NgaoError, Role, UserId};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Load the config file and environment, then apply `--database`.
pub fn load_config(path: Option<&Path>, database: Option<PathBuf>) -> Result<Config, NgaoError> {
    let mut config = Config::load(path)?;
    if let Some(database) = database {
        config.storage.backend = Backend::Redb;
        config.storage.path = database;
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), NgaoError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| NgaoError::Serialization(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn backend_label(config: &Config) -> String {
    match config.storage.backend {
        Backend::Memory => "memory".to_string(),
        Backend::Redb => format!("redb ({})", config.storage.path.display()),
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

pub async fn cmd_server(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), NgaoError> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let engine = config.open_engine()?;

    println!("NGAO MIS Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.server.host);
    println!("  Port:     {}", config.server.port);
    println!("  Storage:  {}", backend_label(&config));
    println!(
        "  Auth:     {}",
        if config.security.api_key().is_some() { "api key" } else { "disabled" }
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /health              - Health check");
    println!("  GET  /incidents           - Incidents visible to the officer");
    println!("  POST /incidents           - Report an incident");
    println!("  POST /registrations/...   - Birth, death and marriage registration");
    println!("  POST /national-id         - National ID applications");
    println!("  POST /messages            - Direct messages and announcements");
    println!("  GET  /stats               - Dashboard");
    println!();
    println!("Every request except /health needs an {} header.", api::OFFICER_HEADER);
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    api::run_server(&addr, engine, &config.security).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the first account as a superuser.
pub fn cmd_init(
    config: &Config,
    json_mode: bool,
    email: String,
    first_name: String,
    last_name: String,
    phone: String,
    role: &str,
) -> Result<(), NgaoError> {
    let mut engine = config.open_engine()?;
    let officer = engine.bootstrap_superuser(
        NewOfficer {
            email,
            first_name,
            last_name,
            phone,
            badge_number: None,
            role: role.parse::<Role>()?,
            admin_unit: None,
        },
        chrono::Utc::now(),
    )?;
    tracing::info!(event = "superuser_created", officer = %officer.id, role = %officer.role);

    if json_mode {
        return print_json(&officer);
    }
    println!("Created superuser {} ({})", officer.full_name(), officer.email);
    println!("  Officer id: {}", officer.id);
    println!("  Storage:    {}", backend_label(config));
    if config.storage.backend == Backend::Memory {
        println!("  Note: the memory backend keeps nothing after this command exits.");
    }
    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

pub fn cmd_seed(
    config: &Config,
    json_mode: bool,
    file: &Path,
    officer: u64,
) -> Result<(), NgaoError> {
    let seed = Seed::from_file(file)?;
    let mut engine = config.open_engine()?;
    let report = seed.apply(&mut engine, UserId(officer), chrono::Utc::now())?;
    tracing::info!(
        event = "seed_applied",
        units_created = report.units_created,
        units_skipped = report.units_skipped,
        officers_created = report.officers_created.len(),
    );

    if json_mode {
        return print_json(&report);
    }
    println!("Seed applied from {}", file.display());
    println!("  Units created:    {}", report.units_created);
    println!("  Units skipped:    {}", report.units_skipped);
    println!("  Officers created: {}", report.officers_created.len());
    Ok(())
}

// =============================================================================
// STATS COMMAND
// =============================================================================

pub fn cmd_stats(config: &Config, json_mode: bool, officer: u64) -> Result<(), NgaoError> {
    let engine = config.open_engine()?;
    let dashboard = engine.dashboard(UserId(officer))?;

    if json_mode {
        return print_json(&dashboard);
    }
    println!("NGAO Dashboard");
    println!("==============");
    match dashboard.scope {
        Some(unit) => println!("Scope: {}", engine.admin_unit(unit)?.name),
        None => println!("Scope: national"),
    }
    println!();
    println!("Incidents:      {}", dashboard.total_incidents);
    println!("  Open:         {}", dashboard.open_incidents);
    for (status, count) in &dashboard.incidents_by_status {
        println!("  {status:<13} {count}");
    }
    println!("Responses:      {}", dashboard.responses);
    for (kind, statuses) in &dashboard.registrations {
        println!("Registrations ({kind}):");
        for (status, count) in statuses {
            println!("  {status:<13} {count}");
        }
    }
    Ok(())
}

// =============================================================================
// HISTORY COMMAND
// =============================================================================

pub fn cmd_history(
    config: &Config,
    json_mode: bool,
    kind: &str,
    id: u64,
    officer: u64,
) -> Result<(), NgaoError> {
    let engine: Engine = config.open_engine()?;
    let entity = EntityRef::new(EntityKind::from_slug(kind)?, id);
    let history = engine.history(UserId(officer), entity)?;

    if json_mode {
        return print_json(&history);
    }
    println!("History of {entity}");
    if history.is_empty() {
        println!("  (no transitions)");
    }
    for record in &history {
        println!(
            "  {}  {} -> {}  by {}{}",
            record.at.format("%Y-%m-%d %H:%M:%S"),
            record.from.as_deref().unwrap_or("-"),
            record.to,
            record.actor,
            record.note.as_deref().map(|n| format!("  ({n})")).unwrap_or_default(),
        );
    }
    Ok(())
}
