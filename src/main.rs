//! kademlia-routing - Main entry point
//!
//! Fills a routing table with random peers from concurrent tasks and reports
//! the resulting bucket layout.

use anyhow::{Context, Result};
use kademlia_routing::{run_simulation, CliArgs, ReportDisplay, SimulationConfig};
use tracing::{debug, error, info};

/// Set up panic handler for unexpected errors
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();

        if let Some(location) = panic_info.location() {
            error!(
                "PANIC occurred at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        } else {
            error!("PANIC occurred at unknown location");
        }
        let payload = panic_info.payload();
        if let Some(s) = payload.downcast_ref::<&str>() {
            error!("Panic message: {}", s);
        } else if let Some(s) = payload.downcast_ref::<String>() {
            error!("Panic message: {}", s);
        } else {
            error!("Panic message: unknown");
        }
        error!("Backtrace:\n{:?}", backtrace);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_panic_handler();

    let args = CliArgs::parse_args();
    init_logging(&args);
    info!("kademlia-routing starting");
    debug!("CLI arguments: {:?}", args);

    let config = SimulationConfig::from_args(&args).context("Failed to build configuration")?;
    config.validate().context("Invalid configuration")?;

    let display = ReportDisplay::new(config.quiet, config.json);
    display.print_status(&format!(
        "Routing table: k={}, max depth {}, ping timeout {}ms",
        config.routing.bucket_size, config.routing.max_split_depth, config.routing.ping_timeout_ms
    ))?;
    display.print_status(&format!(
        "Inserting {} random contacts ({} tasks, {:.0}% alive)",
        config.contacts,
        config.concurrency,
        config.alive_ratio * 100.0
    ))?;

    let report = match run_simulation(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!("Simulation failed: {:#}", e);
            return Err(e);
        }
    };

    display.print_report(&report)?;

    info!("kademlia-routing finished");
    Ok(())
}

/// Initialize logging based on verbosity settings
fn init_logging(args: &CliArgs) {
    let level = args.log_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if args.is_verbose() {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    debug!("Logging initialized with level {:?}", level);
}
