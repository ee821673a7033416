use std::path::Path;

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::backup_manager;
use crate::config::EnricherConfig;
use crate::delay_manager;
use crate::extractor::{self, DetailFields};
use crate::input_loader::{self, InputRow};
use crate::records::{EnrichedColumns, EnrichedRecord};
use crate::session::{Session, SessionError};

// Backup cadence and proactive session renewal, in processed rows. The
// browser leaks memory over hundreds of page loads, so it is retired on a
// schedule even when nothing has gone wrong.
const SAVE_EVERY: usize = 100;
const RESTART_BROWSER_EVERY: usize = 500;

/// Fetches the detail fields for one input row. The live implementation owns
/// the browser session; tests substitute a scripted fetcher.
pub(crate) trait DetailFetcher {
    fn fetch(&mut self, row: &InputRow) -> Result<DetailFields, SessionError>;
    /// Replace a lost session with a fresh one.
    fn recover(&mut self) -> Result<(), SessionError>;
    /// Scheduled session renewal between rows.
    fn refresh(&mut self) -> Result<(), SessionError>;
    /// Politeness pause after a row.
    fn rest(&mut self) {}
}

/// Enrich every row of the configured input table and write the final output.
pub fn run(config: &EnricherConfig) -> Result<()> {
    let rows = input_loader::load_rows(&config.input_file, &config.country_1, &config.country_2)?;
    let columns = EnrichedColumns::derive(&config.country_1, &config.country_2);

    let mut fetcher = LiveFetcher::launch()?;
    let results = run_rows(
        &mut fetcher,
        &rows,
        &columns,
        &config.backup_file,
        SAVE_EVERY,
        RESTART_BROWSER_EVERY,
    )?;
    drop(fetcher);

    backup_manager::save_enriched(&config.output_file, &columns, &results)?;
    info!(
        "Done! Total saved: {} -> {}",
        results.len(),
        config.output_file.display()
    );
    Ok(())
}

/// The sequential row loop. A failed row is logged, triggers a backup flush
/// and is dropped from the results; it never aborts the run. Only a failed
/// session relaunch (nothing left to drive the browser with) is fatal.
pub(crate) fn run_rows<F: DetailFetcher>(
    fetcher: &mut F,
    rows: &[InputRow],
    columns: &EnrichedColumns,
    backup_file: &Path,
    save_every: usize,
    restart_every: usize,
) -> Result<Vec<EnrichedRecord>> {
    let total = rows.len();
    let mut results: Vec<EnrichedRecord> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        info!("[{}/{}] Processing: {}", i + 1, total, row.name);

        match fetcher.fetch(row) {
            Ok(fields) => results.push(build_record(row, fields)),
            Err(e) => {
                error!("Error for {}: {}", row.name, e);
                if matches!(e, SessionError::Lost(_)) {
                    warn!("Restoring browser after lost session...");
                    fetcher
                        .recover()
                        .context("failed to relaunch browser after lost session")?;
                }
                backup_manager::save_enriched(backup_file, columns, &results)
                    .context("failed to write backup after row error")?;
                info!("Backup saved after error at row {}", i + 1);
                fetcher.rest();
                continue;
            }
        }

        if (i + 1) % save_every == 0 {
            backup_manager::save_enriched(backup_file, columns, &results)?;
            info!("Saved partial data at {} entries", i + 1);
        }
        if (i + 1) % restart_every == 0 {
            info!("Restarting browser to clear memory...");
            fetcher
                .refresh()
                .context("failed to relaunch browser on schedule")?;
        }
        fetcher.rest();
    }

    Ok(results)
}

fn build_record(row: &InputRow, fields: DetailFields) -> EnrichedRecord {
    EnrichedRecord {
        name: row.name.clone(),
        link: row.link.clone(),
        country_1: row.country_1.clone(),
        country_2: row.country_2.clone(),
        index: row.index.clone(),
        about: fields.about,
        headquarters: fields.headquarters,
        website: fields.website,
        email: fields.email,
        phone: fields.phone,
    }
}

struct LiveFetcher {
    session: Session,
}

impl LiveFetcher {
    fn launch() -> Result<Self, SessionError> {
        Ok(LiveFetcher {
            session: Session::launch()?,
        })
    }
}

impl DetailFetcher for LiveFetcher {
    fn fetch(&mut self, row: &InputRow) -> Result<DetailFields, SessionError> {
        if !self.session.is_alive() {
            warn!("Session lost. Creating a new browser...");
            self.session = Session::launch()?;
        }
        self.session.goto(&row.link)?;
        delay_manager::page_settle_delay();
        let html = self.session.page_html()?;
        Ok(extractor::extract_details(&html))
    }

    fn recover(&mut self) -> Result<(), SessionError> {
        self.session = Session::launch()?;
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), SessionError> {
        self.recover()
    }

    fn rest(&mut self) {
        delay_manager::row_delay();
    }
}
