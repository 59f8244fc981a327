use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod audits;
mod config;
mod error;
mod models;
mod position;
mod queries;
mod report;
mod session;
mod skills;
mod transport;
mod xp;

use aggregate::Dashboard;
use config::Config;
use error::DashboardError;
use session::{SessionController, SessionState, SessionStore, SnapshotOutcome};
use transport::GraphQlClient;

#[derive(Parser)]
#[command(name = "progress-dashboard")]
#[command(about = "Student progress dashboard for the learning platform GraphQL API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange credentials for a token and store the session
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Profile summary and event position
    Profile,
    /// Audit ratio and byte counters
    AuditStats,
    /// Top technical skills and technologies
    Skills,
    /// Cumulative XP series
    Xp {
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Passed and failed audits
    Audits {
        /// List every valid audit, most recent first
        #[arg(long)]
        all: bool,
    },
    /// Position in the configured event
    Position,
    /// Load everything and print the dashboard
    Dashboard,
    /// Write the dashboard as markdown
    Report {
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let store = SessionStore::new(config.session_file.clone());
    let mut controller = SessionController::restore(store, config.expiry_policy)
        .context("failed to read the stored session")?;
    let client = GraphQlClient::new(&config).context("failed to build the HTTP client")?;
    let dashboard = Dashboard::new(client, config.event_id);

    match cli.command {
        Commands::Login { username, password } => {
            dashboard
                .login(&mut controller, &username, &password)
                .await?;
            println!("Logged in as {username}.");
        }
        Commands::Logout => {
            controller.logout()?;
            println!("Logged out.");
        }
        Commands::Whoami => match controller.state() {
            SessionState::LoggedIn(session) => println!("{}", session.display_name),
            _ => println!("Not logged in."),
        },
        Commands::Profile => {
            let ctx = controller.require_context()?;
            let (profile, position) = dashboard.fetch_profile_and_position(&ctx).await;
            let profile = checked(&mut controller, profile)?;
            let position = checked(&mut controller, position)?;
            let mut output = String::new();
            report::write_profile(&mut output, profile.as_ref(), &position);
            print!("{output}");
        }
        Commands::AuditStats => {
            let ctx = controller.require_context()?;
            let stats = checked(&mut controller, dashboard.fetch_audit_stats(&ctx).await)?;
            let mut output = String::new();
            report::write_audit_stats(&mut output, &stats);
            print!("{output}");
        }
        Commands::Skills => {
            let ctx = controller.require_context()?;
            let skills = checked(&mut controller, dashboard.fetch_skills(&ctx).await)?;
            let mut output = String::new();
            report::write_skills(&mut output, &skills);
            print!("{output}");
        }
        Commands::Xp { csv } => {
            let ctx = controller.require_context()?;
            let series = checked(&mut controller, dashboard.fetch_xp(&ctx).await)?;
            match csv {
                Some(path) => {
                    report::write_xp_csv(&path, &series)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Wrote {} XP points to {}.", series.len(), path.display());
                }
                None => {
                    let mut output = String::new();
                    report::write_xp(&mut output, &series);
                    print!("{output}");
                }
            }
        }
        Commands::Audits { all } => {
            let ctx = controller.require_context()?;
            let data = checked(&mut controller, dashboard.fetch_audits(&ctx).await)?;
            let mut output = String::new();
            if all {
                report::write_all_audits(&mut output, &data);
            } else {
                report::write_audits(&mut output, &data, report::DASHBOARD_AUDITS);
            }
            print!("{output}");
        }
        Commands::Position => {
            let ctx = controller.require_context()?;
            let (profile, position) = dashboard.fetch_profile_and_position(&ctx).await;
            if checked(&mut controller, profile)?.is_none() {
                bail!("no profile returned for the signed-in user");
            }
            match checked(&mut controller, position)? {
                Some(position) => println!("{position}"),
                None => println!("Not registered in event {}.", config.event_id),
            }
        }
        Commands::Dashboard => {
            let report = load_report(&dashboard, &mut controller).await?;
            print!("{report}");
        }
        Commands::Report { out } => {
            let report = load_report(&dashboard, &mut controller).await?;
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Surfaces an expired token through the configured policy.
fn checked<T>(
    controller: &mut SessionController,
    result: Result<T, DashboardError>,
) -> anyhow::Result<T> {
    match result {
        Err(DashboardError::SessionExpired) => {
            let logged_out = controller.handle_expired()?;
            if logged_out {
                bail!("session expired; stored session cleared, run `login` again");
            }
            bail!("session expired; run `login` again");
        }
        other => Ok(other?),
    }
}

async fn load_report(
    dashboard: &Dashboard,
    controller: &mut SessionController,
) -> anyhow::Result<String> {
    let ctx = controller.require_context()?;
    info!("Loading dashboard under session epoch {}", controller.epoch());
    let snapshot = dashboard.load(&ctx).await;

    match controller.accept(snapshot)? {
        SnapshotOutcome::Applied => {}
        SnapshotOutcome::Stale => bail!("session changed while loading; try again"),
        SnapshotOutcome::LoggedOut => {
            bail!("session expired; stored session cleared, run `login` again")
        }
    }

    let snapshot = controller
        .snapshot()
        .context("dashboard snapshot missing after load")?;
    Ok(report::build_report(
        &ctx.session.display_name,
        chrono::Utc::now(),
        snapshot,
    ))
}
