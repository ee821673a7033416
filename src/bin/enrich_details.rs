use anyhow::Result;
use consultant_scraper_lib::{enricher, logger, EnricherConfig};
use log::info;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = EnricherConfig::from_env()?;
    logger::init(&config.log_file)?;

    info!("Starting detail enricher...");
    enricher::run(&config)?;
    Ok(())
}
