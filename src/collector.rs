use std::collections::HashSet;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use scraper::{Html, Selector};
use url::Url;

use crate::backup_manager;
use crate::config::CollectorConfig;
use crate::delay_manager;
use crate::records::ListingRecord;
use crate::session::{Session, SessionError, SETUP_WAIT};

const COUNTRY_SELECT: &str = "#select_country";
const SHOW_MORE_XPATH: &str = r#"//button[span[text()="Show More"]]"#;
const NAME_ATTRIBUTE: &str = "data-listing-name";

// The filter form reloads the result list in place; give it a moment.
const FILTER_SETTLE: Duration = Duration::from_secs(3);

/// A results page that can be expanded. The live implementation drives the
/// browser; tests substitute a scripted page.
pub(crate) trait ListingPage {
    fn scroll_to_bottom(&mut self) -> Result<(), SessionError>;
    fn card_count(&mut self) -> Result<usize, SessionError>;
    /// Click the show-more control. Ok(false) means the control is gone and
    /// the listing is exhausted.
    fn click_show_more(&mut self) -> Result<bool, SessionError>;
}

/// Pacing and bounds for the expansion loop. Defaults mirror the site's
/// observed behavior; tests zero the delays.
pub(crate) struct ExpansionTuning {
    pub max_clicks: u32,
    pub scroll_settle: Duration,
    pub click_settle: Duration,
    pub poll_retries: u32,
    pub poll_delay: Duration,
    pub rest_every: u32,
    pub rest_for: Duration,
}

impl Default for ExpansionTuning {
    fn default() -> Self {
        ExpansionTuning {
            max_clicks: 75,
            scroll_settle: Duration::from_secs(2),
            click_settle: Duration::from_secs(1),
            poll_retries: 6,
            poll_delay: Duration::from_secs(3),
            rest_every: 30,
            rest_for: Duration::from_secs(10),
        }
    }
}

/// Collect all listings for one country into `output_file`.
pub fn run(config: &CollectorConfig, country: &str, output_file: &Path) -> Result<()> {
    let session = Session::launch()?;
    session.goto(&config.main_site)?;

    // Fatal setup steps: a missing filter control or apply button aborts the
    // whole run for this country.
    session
        .select_by_text(COUNTRY_SELECT, country, SETUP_WAIT)
        .with_context(|| format!("couldn't select {} in the country filter", country))?;
    info!("Country {} selected.", country);
    thread::sleep(FILTER_SETTLE);

    session
        .click_by_id(&config.apply_filter, SETUP_WAIT)
        .context("couldn't click the apply-filters control")?;
    info!("Apply-filters control clicked.");
    thread::sleep(FILTER_SETTLE);

    session
        .wait_for(&config.card_selector, SETUP_WAIT)
        .context("no listing cards appeared after applying filters")?;

    let tuning = ExpansionTuning::default();
    let mut page = LivePage {
        session: &session,
        card_selector: &config.card_selector,
        click_settle: tuning.click_settle,
    };
    let clicks = expand_listings(&mut page, &tuning);
    info!("Expansion finished after {} clicks.", clicks);

    let html = session.page_html()?;
    let records = collect_cards(&html, &config.card_selector, &config.main_site, country)?;
    info!("Total cards: {}", records.len());

    if records.is_empty() {
        warn!("No data collected, skipping file save.");
        return Ok(());
    }
    backup_manager::save_listings(output_file, &records)?;
    Ok(())
}

/// Click show-more until the listing is exhausted, growth stops, an error
/// occurs or the click cap is reached. Returns the number of successful
/// clicks; every exit path leaves the rendered cards intact for harvesting.
pub(crate) fn expand_listings<P: ListingPage>(page: &mut P, tuning: &ExpansionTuning) -> u32 {
    let mut clicks = 0;
    while clicks < tuning.max_clicks {
        match expand_once(page, tuning, clicks) {
            Ok(true) => {
                clicks += 1;
                if clicks % tuning.rest_every == 0 {
                    delay_manager::load_shedding_pause(tuning.rest_for);
                }
            }
            Ok(false) => break,
            Err(e) => {
                error!("Click #{} failed: {}", clicks + 1, e);
                break;
            }
        }
    }
    clicks
}

/// One expansion iteration. Ok(false) means exhaustion (control gone or no
/// growth after polling), not an error.
fn expand_once<P: ListingPage>(
    page: &mut P,
    tuning: &ExpansionTuning,
    clicks: u32,
) -> Result<bool, SessionError> {
    page.scroll_to_bottom()?;
    thread::sleep(tuning.scroll_settle);

    let before = page.card_count()?;

    if !page.click_show_more()? {
        warn!("Show-more control isn't available anymore, exiting.");
        return Ok(false);
    }
    info!("Click #{} on show-more done.", clicks + 1);

    let grew = delay_manager::poll_until(tuning.poll_retries, tuning.poll_delay, || {
        match page.card_count() {
            Ok(count) if count > before => true,
            Ok(count) => {
                info!("Still {} cards", count);
                false
            }
            Err(e) => {
                warn!("Card count failed while waiting: {}", e);
                false
            }
        }
    });
    if !grew {
        warn!("No new cards loaded after waiting, stopping.");
        return Ok(false);
    }
    Ok(true)
}

/// Harvest listing records from the fully expanded page. Cards missing either
/// attribute are skipped with a warning; duplicate links (cards re-rendered by
/// repeated expansion) are kept once, first occurrence wins.
pub(crate) fn collect_cards(
    html: &str,
    card_selector: &str,
    base_url: &str,
    country: &str,
) -> Result<Vec<ListingRecord>> {
    let selector = Selector::parse(card_selector)
        .map_err(|e| anyhow!("invalid listing card selector '{}': {}", card_selector, e))?;
    let base =
        Url::parse(base_url).with_context(|| format!("invalid site URL '{}'", base_url))?;

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for card in document.select(&selector) {
        let name = card.value().attr(NAME_ATTRIBUTE);
        let href = card.value().attr("href");
        let (Some(name), Some(href)) = (name, href) else {
            warn!("Problem with a card: missing name or link attribute, skipping.");
            continue;
        };
        let link = match base.join(href) {
            Ok(url) => url.to_string(),
            Err(_) => href.to_string(),
        };
        if !seen.insert(link.clone()) {
            continue;
        }
        records.push(ListingRecord {
            name: name.trim().to_string(),
            link,
            country: country.to_string(),
        });
    }
    Ok(records)
}

struct LivePage<'a> {
    session: &'a Session,
    card_selector: &'a str,
    click_settle: Duration,
}

impl ListingPage for LivePage<'_> {
    fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.session.scroll_to_bottom()
    }

    fn card_count(&mut self) -> Result<usize, SessionError> {
        self.session.count(self.card_selector)
    }

    fn click_show_more(&mut self) -> Result<bool, SessionError> {
        self.session
            .js_click_first_xpath(SHOW_MORE_XPATH, self.click_settle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_tuning(max_clicks: u32) -> ExpansionTuning {
        ExpansionTuning {
            max_clicks,
            scroll_settle: Duration::ZERO,
            click_settle: Duration::ZERO,
            poll_retries: 1,
            poll_delay: Duration::ZERO,
            rest_every: u32::MAX,
            rest_for: Duration::ZERO,
        }
    }

    struct FakePage {
        cards: usize,
        grow_by: usize,
        button_present: bool,
        fail_counts: bool,
    }

    impl ListingPage for FakePage {
        fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
            Ok(())
        }

        fn card_count(&mut self) -> Result<usize, SessionError> {
            if self.fail_counts {
                return Err(SessionError::Lost("connection is closed".to_string()));
            }
            Ok(self.cards)
        }

        fn click_show_more(&mut self) -> Result<bool, SessionError> {
            if !self.button_present {
                return Ok(false);
            }
            self.cards += self.grow_by;
            Ok(true)
        }
    }

    #[test]
    fn expansion_stops_at_click_cap_even_with_endless_growth() {
        let mut page = FakePage {
            cards: 20,
            grow_by: 20,
            button_present: true,
            fail_counts: false,
        };
        assert_eq!(expand_listings(&mut page, &fast_tuning(75)), 75);
    }

    #[test]
    fn expansion_stops_when_control_is_gone() {
        let mut page = FakePage {
            cards: 20,
            grow_by: 20,
            button_present: false,
            fail_counts: false,
        };
        assert_eq!(expand_listings(&mut page, &fast_tuning(75)), 0);
    }

    #[test]
    fn expansion_stops_when_cards_stop_growing() {
        let mut page = FakePage {
            cards: 20,
            grow_by: 0,
            button_present: true,
            fail_counts: false,
        };
        assert_eq!(expand_listings(&mut page, &fast_tuning(75)), 0);
    }

    #[test]
    fn expansion_aborts_on_session_error() {
        let mut page = FakePage {
            cards: 20,
            grow_by: 20,
            button_present: true,
            fail_counts: true,
        };
        assert_eq!(expand_listings(&mut page, &fast_tuning(75)), 0);
    }

    fn card(name: &str, href: &str) -> String {
        format!(
            r#"<a class="listing-card" data-listing-name="{}" href="{}">{}</a>"#,
            name, href, name
        )
    }

    #[test]
    fn collect_cards_absolutizes_relative_links() {
        let html = format!("<html><body>{}</body></html>", card("Acme", "/listing/acme"));
        let records =
            collect_cards(&html, "a.listing-card", "https://x.example/search", "United States")
                .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Acme");
        assert_eq!(records[0].link, "https://x.example/listing/acme");
        assert_eq!(records[0].country, "United States");
    }

    #[test]
    fn collect_cards_skips_cards_with_missing_attributes() {
        let html = format!(
            r#"<html><body>{}<a class="listing-card" href="/no-name">x</a></body></html>"#,
            card("Acme", "/listing/acme")
        );
        let records =
            collect_cards(&html, "a.listing-card", "https://x.example/", "United States").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn collect_cards_dedups_by_link() {
        let html = format!(
            "<html><body>{}{}{}</body></html>",
            card("Acme", "/listing/acme"),
            card("Acme again", "/listing/acme"),
            card("Other", "/listing/other"),
        );
        let records =
            collect_cards(&html, "a.listing-card", "https://x.example/", "United States").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Acme");
        assert_eq!(records[1].name, "Other");
    }

    #[test]
    fn collect_cards_rejects_invalid_selector() {
        assert!(collect_cards("<html></html>", "][", "https://x.example/", "US").is_err());
    }
}
