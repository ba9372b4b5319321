use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use civic_common::{AppConfig, GeoPoint, Issue, IssueStatus};
use civic_engine::aggregation::{
    department_stats, status_summary, unresolved_by_department, DepartmentCount, DepartmentStats,
    StatusSummary,
};
use civic_engine::board::IssueBoard;
use civic_engine::ranking::{rank_by_priority, DepartmentFilter};
use civic_engine::store::{IssueRepository, SupabaseStore};
use civic_engine::traits::{Geocoder, NoopGeocoder};
use civic_engine::transitions::StatusManager;
use locationiq_client::LocationIqClient;

#[derive(Parser)]
#[command(name = "civic-report", about = "Civic issue leaderboard and priority report")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print leaderboard, status summary and priority list as JSON.
    Report {
        /// Department to rank ("All" for every department).
        #[arg(long, default_value = "All")]
        department: String,

        /// Place name to centre the priority list on.
        #[arg(long)]
        near: Option<String>,

        /// Override the configured priority radius.
        #[arg(long)]
        radius_km: Option<f64>,
    },
    /// Move an issue to a new status.
    SetStatus {
        #[arg(long)]
        id: i64,

        /// Submitted, Acknowledged, "Work in Progress" or Completed.
        #[arg(long)]
        status: String,
    },
}

#[derive(Serialize)]
struct Report<'a> {
    center: Option<GeoPoint>,
    radius_km: f64,
    summary: StatusSummary,
    unresolved_by_department: Vec<DepartmentCount>,
    leaderboard: Vec<DepartmentStats>,
    priority: Vec<PriorityRow<'a>>,
}

#[derive(Serialize)]
struct PriorityRow<'a> {
    id: i64,
    title: &'a str,
    department: &'a str,
    status: IssueStatus,
    upvotes: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("civic=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let store = SupabaseStore::new(&config.supabase_url, &config.supabase_anon_key)?;
    let repo = IssueRepository::new(Arc::new(store));

    match cli.command {
        Command::Report {
            department,
            near,
            radius_km,
        } => {
            let geocoder = build_geocoder(&config)?;
            report(&repo, geocoder.as_ref(), &config, &department, near.as_deref(), radius_km).await
        }
        Command::SetStatus { id, status } => set_status(repo, id, &status).await,
    }
}

fn build_geocoder(config: &AppConfig) -> Result<Arc<dyn Geocoder>> {
    match config.locationiq_api_key.as_deref() {
        Some(key) => Ok(Arc::new(LocationIqClient::new(&config.locationiq_base_url, key)?)),
        None => {
            warn!("LOCATIONIQ_API_KEY not set, location filtering disabled");
            Ok(Arc::new(NoopGeocoder))
        }
    }
}

async fn report(
    repo: &IssueRepository,
    geocoder: &dyn Geocoder,
    config: &AppConfig,
    department: &str,
    near: Option<&str>,
    radius_km: Option<f64>,
) -> Result<()> {
    let issues = repo.fetch_issues().await;
    if issues.is_empty() {
        warn!("No issue data available");
    }

    let center = match near.map(str::trim).filter(|n| !n.is_empty()) {
        Some(place) => match geocoder.resolve(place).await {
            Ok(found) => found,
            Err(e) => {
                warn!(place, error = %e, "Location lookup failed, ignoring location filter");
                None
            }
        },
        None => None,
    };

    let radius_km = radius_km.unwrap_or(config.priority_radius_km);
    let ranked: Vec<Issue> =
        rank_by_priority(&issues, &DepartmentFilter::from(department), center, radius_km);

    let report = Report {
        center,
        radius_km,
        summary: status_summary(&issues),
        unresolved_by_department: unresolved_by_department(&issues),
        leaderboard: department_stats(&issues),
        priority: ranked
            .iter()
            .map(|issue| PriorityRow {
                id: issue.id,
                title: &issue.title,
                department: &issue.department,
                status: issue.status,
                upvotes: issue.upvotes,
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn set_status(repo: IssueRepository, id: i64, status: &str) -> Result<()> {
    let target = status
        .parse::<IssueStatus>()
        .context("expected one of Submitted, Acknowledged, \"Work in Progress\", Completed")?;

    let mut board = IssueBoard::new(repo.fetch_issues().await);
    let manager = StatusManager::new(repo);
    let updated = manager.transition(&mut board, id, target).await?;

    info!(issue_id = updated.id, status = %updated.status, "Status updated");
    println!("{}", serde_json::to_string_pretty(&updated)?);
    Ok(())
}
