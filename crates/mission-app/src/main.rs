//! Mission planner - plan, edit and upload DJI waypoint missions

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mission_app::config::Config;
use mission_app::console_map::ConsoleMap;
use mission_app::persistence::init_database;
use mission_app::session::EditSession;
use mission_app::state::AppState;
use mission_core::{EditAction, InsertChaining, Mission};
use mission_sdk::{
    upload_mission, ComponentKind, DroneLink, SimulatedOperator, SimulatedSdk, WaypointMission,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "missions", author, version, about, long_about = None)]
struct Cli {
    /// SQLite database path (overrides MISSIONS_DB_PATH)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List missions, oldest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create an empty mission
    New {
        #[arg(long)]
        name: Option<String>,
    },
    /// Show a mission as drawn on the map
    Show {
        /// Mission ID or unambiguous prefix
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a mission and its points
    Delete { id: String },
    /// Apply editing gestures, e.g. `select:0 insert-after pan:40.69,-74.04 confirm done`
    Edit {
        id: String,
        actions: Vec<String>,
        /// File with one gesture per line; `#` starts a comment
        #[arg(long)]
        script: Option<PathBuf>,
        /// `chained` or `single` (overrides MISSIONS_INSERT_CHAINING)
        #[arg(long)]
        chaining: Option<InsertChaining>,
    },
    /// Register with the SDK and connect to the (simulated) aircraft
    Connect {
        /// Bridge app IP for debug builds
        #[arg(long)]
        bridge: Option<String>,
    },
    /// Upload a mission to the connected aircraft
    Upload {
        id: String,
        #[arg(long)]
        bridge: Option<String>,
        /// Waypoint altitude in meters
        #[arg(long)]
        altitude: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("mission_app=debug".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let db = init_database(&config.db_path, config.db_max_connections).await?;
    let state = AppState::with_database(db).await?;

    match cli.command {
        Command::List { json } => list(&state, json)?,
        Command::New { name } => {
            let mission = state.create_mission(name).await;
            println!("{}", mission.id);
        }
        Command::Show { id, json } => show(&state, &config, &id, json)?,
        Command::Delete { id } => {
            let mission = state.find_mission(&id)?;
            state.delete_mission(mission.id).await?;
            println!("Deleted {}", mission.title());
        }
        Command::Edit {
            id,
            actions,
            script,
            chaining,
        } => {
            let chaining = chaining.unwrap_or(config.insert_chaining);
            edit(&state, &id, actions, script, chaining).await?;
        }
        Command::Connect { bridge } => {
            let link = connect_aircraft(&config, bridge).await?;
            print_components(&link).await;
            link.disconnect().await?;
        }
        Command::Upload {
            id,
            bridge,
            altitude,
        } => {
            if let Some(altitude) = altitude {
                config.default_altitude_m = altitude;
            }
            let mission = state.find_mission(&id)?;
            upload(&config, &mission, bridge).await?;
        }
    }

    Ok(())
}

fn list(state: &AppState, json: bool) -> Result<()> {
    let missions = state.list_missions();
    if json {
        println!("{}", serde_json::to_string_pretty(&missions)?);
        return Ok(());
    }

    if missions.is_empty() {
        println!("No missions");
    }
    for mission in missions {
        println!(
            "{}  {:<24}  {} points",
            mission.id,
            mission.title(),
            mission.len()
        );
    }
    Ok(())
}

fn show(state: &AppState, config: &Config, id: &str, json: bool) -> Result<()> {
    let mission = state.find_mission(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&mission)?);
        return Ok(());
    }

    let session = EditSession::open(mission, ConsoleMap::new(), config.insert_chaining);
    print!("{}", session.surface().render(session.mission(), session.editor()));
    Ok(())
}

async fn edit(
    state: &AppState,
    id: &str,
    mut actions: Vec<String>,
    script: Option<PathBuf>,
    chaining: InsertChaining,
) -> Result<()> {
    let mission = state.find_mission(id)?;

    if let Some(path) = script {
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        actions.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }

    let mut session = EditSession::open(mission, ConsoleMap::new(), chaining);
    for (n, raw) in actions.iter().enumerate() {
        let action: EditAction = raw
            .parse()
            .with_context(|| format!("gesture {} ({:?})", n + 1, raw))?;
        let outcome = session
            .apply(action)
            .with_context(|| format!("gesture {} ({:?})", n + 1, raw))?;
        if outcome.mutated() {
            state.persist_mission(session.mission()).await;
        }
    }

    print!("{}", session.surface().render(session.mission(), session.editor()));
    Ok(())
}

async fn connect_aircraft(config: &Config, bridge: Option<String>) -> Result<DroneLink> {
    let link = DroneLink::spawn(SimulatedSdk::new(), config.link_config());
    let bridge = bridge.or_else(|| config.bridge_ip.clone());

    println!("Registering...");
    link.init_sdk(bridge).await?;
    println!("{}", link.status());

    let status = link
        .wait_for(|s| s.is_ready() || s.is_error_state() || s.is_disconnected())
        .await?;
    if !status.is_ready() {
        bail!("{}", status);
    }
    println!("{}", status);
    Ok(link)
}

async fn print_components(link: &DroneLink) {
    let mut components = link.subscribe_components();
    let settled = components.wait_for(|c| c.is_available(ComponentKind::FlightController));
    if tokio::time::timeout(Duration::from_secs(2), settled).await.is_err() {
        println!("Flight controller not reported yet");
    }

    for (kind, index, availability) in link.components().iter() {
        println!("  {}[{}]: {:?}", kind, index, availability);
    }
}

async fn upload(config: &Config, mission: &Mission, bridge: Option<String>) -> Result<()> {
    let waypoint_mission = WaypointMission::from_mission(mission, &config.waypoint_defaults());
    waypoint_mission.check_parameters()?;

    let link = connect_aircraft(config, bridge).await?;
    let mut operator = SimulatedOperator::new();
    upload_mission(&mut operator, &waypoint_mission).await?;
    println!(
        "Uploaded {} ({} waypoints), ready to execute",
        mission.title(),
        waypoint_mission.waypoints.len()
    );

    link.disconnect().await?;
    Ok(())
}
