use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Runtime::RemoteObject;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use log::debug;
use serde_json::json;
use thiserror::Error;

/// Default wait window for locating page controls, matching the site's
/// slowest observed render times.
pub const SETUP_WAIT: Duration = Duration::from_secs(15);

// Sleeps in this tool run up to ten seconds; keep the browser's own idle
// watchdog well clear of them.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// What went wrong at the browser boundary. Callers branch on these variants
/// to decide between "recreate the session", "treat as exhausted" and "give
/// up"; they never inspect error text.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("browser session lost: {0}")]
    Lost(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("could not launch browser: {0}")]
    Launch(String),
    #[error("browser call failed for {0}: {1}")]
    Protocol(String, String),
}

/// Map an opaque driver error onto the taxonomy. The underlying crate
/// surfaces everything as `anyhow::Error`, so message inspection is
/// unavoidable, but it is confined to this one function.
fn classify(what: &str, err: anyhow::Error) -> SessionError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("connection is closed")
        || lower.contains("disconnect")
        || lower.contains("websocket")
    {
        SessionError::Lost(msg)
    } else if lower.contains("never came") || lower.contains("timed out") || lower.contains("timeout")
    {
        SessionError::Timeout(what.to_string())
    } else if lower.contains("no element found") || lower.contains("element was not found") {
        SessionError::ElementNotFound(what.to_string())
    } else {
        SessionError::Protocol(what.to_string(), msg)
    }
}

const SELECT_BY_TEXT_FN: &str = r#"
function (wanted) {
    for (const option of this.options) {
        if (option.text.trim() === wanted) {
            this.value = option.value;
            this.dispatchEvent(new Event('change', { bubbles: true }));
            return true;
        }
    }
    return false;
}"#;

// Plain clicks get intercepted by overlays on this site; dispatching the
// click from script sidesteps hit testing entirely.
const JS_CLICK_FN: &str = "function () { this.click(); }";

/// One live browser-automation session: a headless Chrome process and the
/// single tab the job drives. Exclusively owned by the running job; dropping
/// it tears the browser down, and a replacement is a fresh `launch()`.
pub struct Session {
    browser: Browser,
    tab: Arc<Tab>,
}

impl Session {
    pub fn launch() -> Result<Self, SessionError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((1920, 1080)))
            .args(vec![OsStr::new("--disable-gpu")])
            .idle_browser_timeout(IDLE_TIMEOUT)
            .build()
            .map_err(|e| SessionError::Launch(e.to_string()))?;
        let browser = Browser::new(options).map_err(|e| SessionError::Launch(e.to_string()))?;
        let tab = browser.new_tab().map_err(|e| classify("new tab", e))?;
        tab.set_default_timeout(SETUP_WAIT);
        Ok(Session { browser, tab })
    }

    /// Cheap liveness probe: the browser process can die (or the DevTools
    /// connection drop) between rows without any call having failed yet.
    pub fn is_alive(&self) -> bool {
        self.browser.get_version().is_ok()
    }

    pub fn goto(&self, url: &str) -> Result<(), SessionError> {
        self.tab.navigate_to(url).map_err(|e| classify(url, e))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| classify(url, e))?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    /// Block until at least one element matches `selector`.
    pub fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), SessionError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| classify(selector, e))?;
        Ok(())
    }

    /// All elements currently matching `selector`; an empty page is an empty
    /// list, not an error.
    pub fn find_all(&self, selector: &str) -> Result<Vec<Element<'_>>, SessionError> {
        match self.tab.find_elements(selector) {
            Ok(elements) => Ok(elements),
            Err(e) => match classify(selector, e) {
                SessionError::ElementNotFound(_) => Ok(Vec::new()),
                other => Err(other),
            },
        }
    }

    pub fn count(&self, selector: &str) -> Result<usize, SessionError> {
        Ok(self.find_all(selector)?.len())
    }

    pub fn scroll_to_bottom(&self) -> Result<(), SessionError> {
        self.tab
            .evaluate("window.scrollTo(0, document.body.scrollHeight);", false)
            .map_err(|e| classify("scroll to bottom", e))?;
        Ok(())
    }

    /// Pick an option from a `<select>` by its visible text.
    pub fn select_by_text(
        &self,
        selector: &str,
        text: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| classify(selector, e))?;
        let picked = element
            .call_js_fn(SELECT_BY_TEXT_FN, vec![json!(text)], false)
            .map_err(|e| classify(selector, e))?;
        if is_true(&picked) {
            Ok(())
        } else {
            Err(SessionError::ElementNotFound(format!(
                "option '{}' in {}",
                text, selector
            )))
        }
    }

    /// Wait for the element with the given id and click it.
    pub fn click_by_id(&self, id: &str, timeout: Duration) -> Result<(), SessionError> {
        let selector = format!("#{}", id);
        let element = self
            .tab
            .wait_for_element_with_custom_timeout(&selector, timeout)
            .map_err(|e| classify(&selector, e))?;
        element.click().map_err(|e| classify(&selector, e))?;
        Ok(())
    }

    /// Find the first element matching `xpath`, scroll it into view, pause for
    /// `settle`, then click it via script execution. Returns false when no
    /// element matches.
    pub fn js_click_first_xpath(
        &self,
        xpath: &str,
        settle: Duration,
    ) -> Result<bool, SessionError> {
        let elements = match self.tab.find_elements_by_xpath(xpath) {
            Ok(elements) => elements,
            Err(e) => match classify(xpath, e) {
                SessionError::ElementNotFound(_) => return Ok(false),
                other => return Err(other),
            },
        };
        let Some(element) = elements.first() else {
            return Ok(false);
        };
        element.scroll_into_view().map_err(|e| classify(xpath, e))?;
        std::thread::sleep(settle);
        element
            .call_js_fn(JS_CLICK_FN, Vec::new(), false)
            .map_err(|e| classify(xpath, e))?;
        Ok(true)
    }

    /// Snapshot of the page's current HTML.
    pub fn page_html(&self) -> Result<String, SessionError> {
        self.tab
            .get_content()
            .map_err(|e| classify("page content", e))
    }
}

fn is_true(result: &RemoteObject) -> bool {
    result.value == Some(serde_json::Value::Bool(true))
}
