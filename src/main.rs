// src/main.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dbworker_client::config::CONFIG;
use dbworker_client::gateway::{ApiClient, ExportFormat, FileUpload};
use dbworker_client::oplog::OperationLog;

#[derive(Parser)]
#[command(
    name = "dbworker",
    about = "Client for the db_worker database administration backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the configured database servers
    Servers,
    /// Execute a query against a selected server
    Query {
        /// Id of the target server
        #[arg(long)]
        server_id: i64,
        /// Query text
        query: String,
    },
    /// Import a file into a table
    Import {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        table: String,
        #[arg(long, default_value = "public")]
        schema: String,
        #[arg(long)]
        server_id: i64,
    },
    /// Export data to a file format
    Export {
        /// JSON file with the rows to export
        #[arg(long)]
        input: PathBuf,
        /// excel, json or csv
        #[arg(long)]
        format: ExportFormat,
        /// Output path; defaults to the filename the backend suggests
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Preview a file's structure before import
    Preview {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = CONFIG.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("db_worker backend: {}", CONFIG.full_host());

    let log = Arc::new(OperationLog::new());
    let gateway = ApiClient::from_config()?.with_failure_sink(log.clone());

    let cli = Cli::parse();
    match cli.command {
        Command::Servers => cmd_servers(&gateway, &log).await?,
        Command::Query { server_id, query } => cmd_query(&gateway, &log, server_id, &query).await?,
        Command::Import {
            file,
            table,
            schema,
            server_id,
        } => cmd_import(&gateway, &log, &file, &table, &schema, server_id).await?,
        Command::Export { input, format, out } => {
            cmd_export(&gateway, &log, &input, format, out).await?
        }
        Command::Preview { file } => cmd_preview(&gateway, &log, &file).await?,
    }

    // Render the operation log the way the process view would.
    for entry in log.snapshot() {
        println!(
            "[{}] {:<7} {:<8} {:<10} {}: {}",
            entry.time, entry.status, entry.server, entry.duration, entry.action, entry.message
        );
    }

    Ok(())
}

async fn cmd_servers(gateway: &ApiClient, log: &OperationLog) -> anyhow::Result<()> {
    let id = log.add_log("loading", "Servers", "Fetching server list", None, None)?;
    let started = Instant::now();

    match gateway.list_servers().await {
        Ok(servers) => {
            for server in &servers {
                println!(
                    "{:>3}  {:<20} {}:{}/{} ({})",
                    server.id, server.name, server.host, server.port, server.database,
                    server.server_type
                );
            }
            log.change_log(
                id,
                "success",
                "Servers",
                &format!("{} servers configured", servers.len()),
                Some(&elapsed_secs(started)),
            )?;
        }
        Err(err) => {
            // Read-style operation: degrade instead of aborting.
            warn!("server list unavailable");
            log.change_log(id, "error", "Servers", &err.to_string(), Some(&elapsed_secs(started)))?;
        }
    }

    Ok(())
}

async fn cmd_query(
    gateway: &ApiClient,
    log: &OperationLog,
    server_id: i64,
    query: &str,
) -> anyhow::Result<()> {
    // The selected server is picked out of the fetched list, descriptor and all.
    let servers = gateway
        .list_servers()
        .await
        .context("failed to fetch server list")?;
    let server = servers
        .into_iter()
        .find(|s| s.id == server_id)
        .with_context(|| format!("no server with id {server_id}"))?;

    let id = log.add_log(
        "loading",
        "Query",
        "Executing query",
        Some(&server.name),
        None,
    )?;
    let started = Instant::now();

    match gateway.execute_query(query, &server).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result.data)?);
            let message = result
                .message
                .clone()
                .unwrap_or_else(|| format!("{} rows", result.data.len()));
            // The backend reports its own status (success/error) and timing.
            log.change_log(id, &result.status, "Query", &message, result.time.as_deref())?;
        }
        Err(err) => {
            log.change_log(id, "error", "Query", &err.to_string(), Some(&elapsed_secs(started)))?;
        }
    }

    Ok(())
}

async fn cmd_import(
    gateway: &ApiClient,
    log: &OperationLog,
    file: &PathBuf,
    table: &str,
    schema: &str,
    server_id: i64,
) -> anyhow::Result<()> {
    let upload = FileUpload::from_path(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let id = log.add_log("loading", "Import", "Uploading file", None, None)?;
    let started = Instant::now();

    match gateway.import_file(upload, table, schema, server_id).await {
        Ok(result) => {
            println!(
                "imported into {}.{} on '{}'",
                schema, table, result.server
            );
            log.change_log(
                id,
                "success",
                "Import",
                result.message.as_deref().unwrap_or("Import finished"),
                Some(&elapsed_secs(started)),
            )?;
            Ok(())
        }
        Err(err) => {
            // Ingestion failures abort the command.
            log.change_log(id, "error", "Import", &err.to_string(), Some(&elapsed_secs(started)))?;
            Err(err.into())
        }
    }
}

async fn cmd_export(
    gateway: &ApiClient,
    log: &OperationLog,
    input: &PathBuf,
    format: ExportFormat,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let data: serde_json::Value =
        serde_json::from_str(&raw).context("input is not valid JSON")?;

    let id = log.add_log("loading", "Export", "Exporting data", None, None)?;
    let started = Instant::now();

    match gateway.export_data(&data, format).await {
        Ok(payload) => {
            let path = out.unwrap_or_else(|| {
                PathBuf::from(
                    payload
                        .filename
                        .clone()
                        .unwrap_or_else(|| format!("export.{format}")),
                )
            });
            tokio::fs::write(&path, &payload.content)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "wrote {} bytes ({}) to {}",
                payload.content.len(),
                payload.mime,
                path.display()
            );
            log.change_log(
                id,
                "success",
                "Export",
                &format!("Saved {}", path.display()),
                Some(&elapsed_secs(started)),
            )?;
        }
        Err(err) => {
            log.change_log(id, "error", "Export", &err.to_string(), Some(&elapsed_secs(started)))?;
        }
    }

    Ok(())
}

async fn cmd_preview(gateway: &ApiClient, log: &OperationLog, file: &PathBuf) -> anyhow::Result<()> {
    let upload = FileUpload::from_path(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let id = log.add_log("loading", "Preview", "Reading file structure", None, None)?;
    let started = Instant::now();

    match gateway.preview_import_file(upload).await {
        Ok(preview) => {
            println!("{}", preview.headers.join(" | "));
            for row in preview.rows.iter().take(10) {
                println!("{}", row.join(" | "));
            }
            log.change_log(
                id,
                "success",
                "Preview",
                &format!(
                    "{} columns, {} rows",
                    preview.headers.len(),
                    preview.rows.len()
                ),
                Some(&elapsed_secs(started)),
            )?;
            Ok(())
        }
        Err(err) => {
            // Same policy as import: the caller must see ingestion failures.
            log.change_log(id, "error", "Preview", &err.to_string(), Some(&elapsed_secs(started)))?;
            Err(err.into())
        }
    }
}

fn elapsed_secs(started: Instant) -> String {
    format!("{:.3}", started.elapsed().as_secs_f64())
}
