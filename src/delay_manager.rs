use std::time::Duration;
use std::thread;
use rand::Rng;
use log::info;

/// Settle time after navigating to a detail page, before reading its DOM.
pub fn page_settle_delay() {
    let mut rng = rand::thread_rng();
    let secs = rng.gen_range(3.0..=5.0);
    thread::sleep(Duration::from_secs_f64(secs));
}

/// Politeness pause between rows.
pub fn row_delay() {
    let mut rng = rand::thread_rng();
    let secs = rng.gen_range(0.8..=1.5);
    thread::sleep(Duration::from_secs_f64(secs));
}

/// Longer pause taken periodically during listing expansion; the results page
/// keeps every loaded card in the DOM and needs breathing room.
pub fn load_shedding_pause(duration: Duration) {
    info!("Pausing {}s to reduce memory pressure...", duration.as_secs());
    thread::sleep(duration);
}

/// Sleep `delay`, check `condition`, repeat up to `retries` times. Returns
/// true as soon as the condition holds, false once the attempts are spent.
/// The results page exposes no count or total, so bounded polling for growth
/// is the only reliable signal that a click actually loaded more cards.
pub fn poll_until<F>(retries: u32, delay: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for attempt in 1..=retries {
        thread::sleep(delay);
        if condition() {
            return true;
        }
        info!("Waiting... ({}/{})", attempt, retries);
    }
    false
}
