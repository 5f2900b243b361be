use pass_pager::config::AppConfig;
use pass_pager::logging;
use pass_pager::module::dapnet::DapnetClient;
use pass_pager::module::geometry::TleGeometryProvider;
use pass_pager::module::scheduled;
use pass_pager::module::tle::TleFetcher;
use pass_pager::module::tracker::PassTracker;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

/// Pager notifications for satellite passes over a ground station
#[derive(Parser, Debug)]
#[command(name = "pass-pager", version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Keep running, one cycle per interval, until Ctrl-C
    #[arg(short, long)]
    watch: bool,

    /// Cadence of watch mode in seconds (defaults to the tolerance window)
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = AppConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    // Initialize logging
    let _logging_guard = logging::init_logging(&config.log_dir, "pass-pager", &config.log_level)?;

    tracing::info!("pass-pager {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Observer {:.4}, {:.4} ({} m), tracking {} (catalog {})",
        config.observer.latitude,
        config.observer.longitude,
        config.observer.altitude_m,
        config.tracking.object_name,
        config.tracking.catalog_number
    );

    let fetcher = TleFetcher::new(&config.tle, &config.tracking)?;
    let provider = TleGeometryProvider::new(fetcher, config.observer.observer());
    let notifier = DapnetClient::new(&config.gateway)?;
    let tracker = PassTracker::new(&config, provider, notifier);

    if args.watch {
        let interval = args.interval_secs.unwrap_or(config.tracking.tolerance_secs);
        scheduled::watch(&tracker, interval).await;
    } else {
        tracing::info!("============= NEW CYCLE =============");
        tracker.run_cycle(Utc::now()).await;
        tracing::info!("============= END CYCLE =============");
    }

    Ok(())
}
