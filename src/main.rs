use clap::Parser;
use doc_harvest::{Harvest, WebDriverAgent};
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();
    let print_json = args.json;

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!(
        "Harvesting {} documents into {}",
        config.extension,
        config.output_dir.display()
    );
    ::log::info!("Using WebDriver at {}", config.webdriver_url);

    let agent = WebDriverAgent::from_config(&config);
    let start_time = std::time::Instant::now();

    let report = match Harvest::new(config).run(&agent).await {
        Ok(report) => report,
        Err(e) => {
            ::log::error!("Run aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!(
        "Processed {} links in {:.2} seconds",
        report.links,
        start_time.elapsed().as_secs_f64()
    );

    if print_json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => ::log::error!("Failed to serialize report: {}", e),
        }
    }

    ExitCode::SUCCESS
}
