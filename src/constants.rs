//! Shared constants used across the application.

/// User agent presented by the browser.
///
/// A current desktop Chrome string; forum frontends serve degraded markup to
/// unknown agents.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// User agent for plain HTTP image downloads.
pub const IMAGE_FETCH_USER_AGENT: &str = BROWSER_USER_AGENT;

/// Default navigation timeout in seconds.
pub const DEFAULT_NAV_TIMEOUT_SECS: u64 = 60;

/// Default image download timeout in seconds.
pub const IMAGE_FETCH_TIMEOUT_SECS: u64 = 30;

/// Number of characters of an answer shown in the CSV summary columns.
pub const SUMMARY_TEXT_CHARS: usize = 200;
