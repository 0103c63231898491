use angora_watch::Pipeline;
use clap::Parser;
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging, showing per-listing progress unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!(
        "Watching {} for \"{}\" below {}{}",
        config.endpoint,
        config.keyword,
        config.currency_marker,
        config.price_ceiling
    );

    let pipeline = match Pipeline::from_config(&config, args.dry_run) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            ::log::error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let start_time = std::time::Instant::now();
    match pipeline.run().await {
        Ok(summary) => {
            if summary.notified == 0 {
                ::log::info!("No new listings found");
            } else {
                ::log::info!("{} new listing(s) sent", summary.notified);
            }
            if summary.failed > 0 {
                ::log::warn!(
                    "{} alert(s) could not be delivered and will be retried next run",
                    summary.failed
                );
            }
            ::log::info!(
                "Run complete in {:.2} seconds",
                start_time.elapsed().as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("Run aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
