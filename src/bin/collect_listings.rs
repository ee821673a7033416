use anyhow::Result;
use consultant_scraper_lib::{collector, logger, CollectorConfig};
use log::{error, info};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = CollectorConfig::from_env()?;
    logger::init(&config.log_file)?;

    info!("Starting listing collector...");
    for (country, output_file) in config.targets() {
        info!("Collecting listings for {}", country);
        // A failed country run shouldn't stop the remaining ones.
        if let Err(e) = collector::run(&config, country, output_file) {
            error!("Collector run for {} failed: {:#}", country, e);
        }
    }
    Ok(())
}
