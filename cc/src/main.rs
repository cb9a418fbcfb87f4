use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use commandcoord::catalog::{Catalog, CatalogEntry};
use commandcoord::cli::{Cli, Command, OutputFormat, get_log_path};
use commandcoord::coordinator::{
    BroadcastPublisher, Coordinator, FanoutPublisher, JsonlPublisher, StatusSnapshot, TracingPublisher,
};
use commandcoord::robot::sim::Simulator;
use commandcoord::robot::{Pose, RobotIo};
use commandcoord::{CommandService, Config, CoordReply, LawId, Scenario, Status};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_stderr: bool) -> Result<()> {
    // Priority: CLI --log-level > config file > INFO
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if to_stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        let log_path = get_log_path();
        if let Some(log_dir) = log_path.parent() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;
        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref(), cli.log_stderr)
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(tick_hz = config.coordinator.tick_hz, drive_hz = config.robot.drive_hz, "commandcoord loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            scenario,
            duration,
            status_log,
        } => cmd_run(&config, &scenario, duration, status_log.as_ref()).await,
        Command::Validate { scenario } => cmd_validate(&config, &scenario),
        Command::List { format } => cmd_list(&format),
    }
}

async fn cmd_run(config: &Config, path: &Path, duration: Option<f64>, status_log: Option<&PathBuf>) -> Result<()> {
    debug!(?path, ?duration, ?status_log, "cmd_run: called");
    let scenario = Scenario::load(path)?;

    let io = RobotIo::new(config.robot.drive_buffer);
    let catalog = Catalog::new(io.clone(), config.robot.clone());
    let problems = scenario.validate(&catalog);
    if !problems.is_empty() {
        print_problems(&problems);
        return Err(eyre!("Scenario {} is invalid", path.display()));
    }

    let broadcast_publisher = Arc::new(BroadcastPublisher::new(config.coordinator.status_buffer));
    let mut status_rx = broadcast_publisher.subscribe();
    let mut fanout = FanoutPublisher::new()
        .with(broadcast_publisher)
        .with(Arc::new(TracingPublisher));
    if let Some(log) = status_log {
        let jsonl = JsonlPublisher::create(log).context(format!("Failed to open status log {}", log.display()))?;
        fanout = fanout.with(Arc::new(jsonl));
    }

    let coordinator = Arc::new(Coordinator::new(config.coordinator.clone(), Arc::new(fanout)));
    let service = CommandService::new(Arc::clone(&coordinator), catalog);

    let (sim_tx, sim_rx) = mpsc::channel(1);
    let simulator = Simulator::new(io, config.robot.clone(), Pose::default());
    let sim_task = tokio::spawn(simulator.run(sim_rx));
    let evaluator = coordinator.spawn();

    println!(
        "{} {} ({} steps)",
        "Running".bold(),
        scenario.name,
        scenario.steps.len()
    );

    let start = Instant::now();
    let deadline = duration.map(|secs| start + Duration::from_secs_f64(secs.max(0.0)));
    let mut steps = scenario.steps.iter().peekable();
    let mut seen: BTreeMap<LawId, Status> = BTreeMap::new();
    // Snapshots up to this tick may predate the last executed step; the
    // pass in flight when a step runs counts as stale too
    let mut settled_after = 0;

    let reason = loop {
        let next_step = steps.peek().map(|step| start + step.offset());

        tokio::select! {
            _ = sleep_until(next_step.unwrap_or(start)), if next_step.is_some() => {
                if let Some(step) = steps.next() {
                    let reply = service.execute(step.command.clone());
                    print_reply(start.elapsed(), &reply);
                    settled_after = coordinator.metrics().ticks + 1;
                }
            }
            received = status_rx.recv() => match received {
                Ok(snapshot) => {
                    print_transitions(start.elapsed(), &snapshot, &mut seen);
                    let settled = steps.peek().is_none() && snapshot.tick > settled_after;
                    if settled && (snapshot.is_empty() || snapshot.all_terminal()) {
                        break "every control law finished";
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Status subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break "status channel closed",
            },
            _ = sleep_until(deadline.unwrap_or(start)), if deadline.is_some() => {
                break "duration elapsed";
            }
            _ = tokio::signal::ctrl_c() => {
                break "interrupted";
            }
        }
    };
    info!(reason, "Scenario run ending");

    evaluator.stop().await;
    let _ = sim_tx.send(()).await;
    if let Err(e) = sim_task.await {
        warn!(error = %e, "Simulator task ended abnormally");
    }

    let snapshot = coordinator.snapshot();
    let metrics = coordinator.metrics();
    println!("\n{} ({})", "Finished".bold(), reason);
    for entry in &snapshot.entries {
        println!("  {:<16} {}", format!("{}:{}", entry.id.get(), entry.name), paint(entry.status));
    }
    println!(
        "  ticks {}  terminations {}  publish failures {}",
        metrics.ticks, metrics.terminations_applied, metrics.publish_failures
    );

    Ok(())
}

fn cmd_validate(config: &Config, path: &Path) -> Result<()> {
    debug!(?path, "cmd_validate: called");
    let scenario = Scenario::load(path)?;
    let catalog = Catalog::new(RobotIo::new(config.robot.drive_buffer), config.robot.clone());

    let problems = scenario.validate(&catalog);
    if !problems.is_empty() {
        print_problems(&problems);
        return Err(eyre!("{} problem(s) in {}", problems.len(), path.display()));
    }

    println!("{} {} ({} steps)", "✓".green(), path.display(), scenario.steps.len());
    Ok(())
}

fn cmd_list(format: &OutputFormat) -> Result<()> {
    debug!(%format, "cmd_list: called");
    let laws = Catalog::control_laws();
    let tests = Catalog::condition_tests();

    match format {
        OutputFormat::Json => {
            let listing = serde_json::json!({
                "control-laws": laws,
                "condition-tests": tests,
            });
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Text => {
            println!("{}", "Control laws:".bold());
            print_entries(&laws);
            println!("\n{}", "Condition tests:".bold());
            print_entries(&tests);
        }
    }
    Ok(())
}

fn print_entries(entries: &[CatalogEntry]) {
    for entry in entries {
        println!("  {:<16} {}", entry.name.cyan(), entry.description);
        for param in &entry.params {
            let bounds = match (param.min, param.max) {
                (Some(min), Some(max)) => format!("[{:.3}, {:.3}]", min, max),
                (Some(min), None) => format!(">= {:.3}", min),
                _ => String::new(),
            };
            let required = if param.required { "required" } else { "optional" };
            println!(
                "      {:<10} {:<7} {:<9} {:<18} {}",
                param.name,
                param.value_type.to_string(),
                required,
                bounds,
                param.description.dimmed()
            );
        }
    }
}

fn print_problems(problems: &[String]) {
    for problem in problems {
        eprintln!("{} {}", "✗".red(), problem);
    }
}

fn paint(status: Status) -> colored::ColoredString {
    match status {
        Status::Executing => status.as_str().yellow(),
        Status::Success => status.as_str().green(),
        Status::Failure => status.as_str().red(),
        Status::Unknown => status.as_str().dimmed(),
    }
}

fn print_reply(elapsed: Duration, reply: &CoordReply) {
    let at = format!("{:>7.2}s", elapsed.as_secs_f64());
    match reply {
        CoordReply::LawRegistered { id } => println!("{} registered law {}", at, id),
        CoordReply::TestRegistered { id } => println!("{} registered test {}", at, id),
        CoordReply::Destroyed { removed } => println!("{} destroyed: {}", at, removed),
        CoordReply::Ok => println!("{} ok", at),
        CoordReply::Status { snapshot } => println!("{} status {}", at, snapshot.summary()),
        CoordReply::Error { message } => println!("{} {} {}", at, "error:".red(), message),
    }
}

/// Print laws whose status changed, appeared or disappeared since `seen`
fn print_transitions(elapsed: Duration, snapshot: &StatusSnapshot, seen: &mut BTreeMap<LawId, Status>) {
    let at = format!("{:>7.2}s", elapsed.as_secs_f64());

    for entry in &snapshot.entries {
        if seen.get(&entry.id) != Some(&entry.status) {
            println!("{} {:<16} {}", at, format!("{}:{}", entry.id.get(), entry.name), paint(entry.status));
            seen.insert(entry.id, entry.status);
        }
    }

    seen.retain(|id, _| {
        let present = snapshot.get(*id).is_some();
        if !present {
            println!("{} {:<16} {}", at, format!("{}", id.get()), "destroyed".dimmed());
        }
        present
    });
}
