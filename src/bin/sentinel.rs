use std::sync::Arc;

use clap::Parser;
use sentinel::{
    Registry, Scheduler,
    config::{build_engine, read_config_file},
    util::get_log_level,
};
use tracing::{debug, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(name = "sentinel", about = "Polling health monitor")]
struct Args {
    /// Config file
    #[arg(short, long, default_value = "config.json")]
    file: String,

    /// Draw a live table of the latest results
    #[arg(long)]
    dashboard: bool,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_target("sentinel", get_log_level());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;
    let mut registry = Registry::with_builtins();
    let console = if args.dashboard {
        Some(redirect_console(&mut registry)?)
    } else {
        None
    };

    let engine = Arc::new(build_engine(&config, &registry).await?);
    let scheduler = Scheduler::new(Arc::clone(&engine), config.interval()?)?;
    debug!(
        "monitoring {} checks every {:?}",
        engine.check_names().len(),
        scheduler.interval()
    );

    if let Some(console) = console {
        spawn_dashboard(&engine, console).await?;
    }

    scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    println!("\n[!] Sentinel stopped by user.");
    Ok(())
}

/// Receiver half of the console feed while the dashboard owns the terminal
#[cfg(feature = "dashboard")]
type ConsoleFeed = tokio::sync::mpsc::UnboundedReceiver<String>;

#[cfg(not(feature = "dashboard"))]
type ConsoleFeed = ();

/// Make `console` alerts print above the dashboard instead of writing to
/// stdout directly.
#[cfg(feature = "dashboard")]
fn redirect_console(registry: &mut Registry) -> anyhow::Result<ConsoleFeed> {
    use sentinel::{alerts::ConsoleAlert, dashboard};

    let (tx, rx) = dashboard::console_channel();
    registry.register_alert("console", move |_| {
        Ok(Arc::new(ConsoleAlert::with_writer(dashboard::ConsoleLines::new(tx.clone()))))
    });
    Ok(rx)
}

#[cfg(not(feature = "dashboard"))]
fn redirect_console(_registry: &mut Registry) -> anyhow::Result<ConsoleFeed> {
    anyhow::bail!("sentinel was built without the `dashboard` feature")
}

#[cfg(feature = "dashboard")]
async fn spawn_dashboard(
    engine: &Arc<sentinel::MonitoringEngine>,
    console: ConsoleFeed,
) -> anyhow::Result<()> {
    let dashboard = sentinel::dashboard::Dashboard::inline(engine.cache())
        .await?
        .with_console(console);
    tokio::spawn(dashboard.run(engine.subscribe()));
    Ok(())
}

#[cfg(not(feature = "dashboard"))]
async fn spawn_dashboard(
    _engine: &Arc<sentinel::MonitoringEngine>,
    _console: ConsoleFeed,
) -> anyhow::Result<()> {
    anyhow::bail!("sentinel was built without the `dashboard` feature")
}
