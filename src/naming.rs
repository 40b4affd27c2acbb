//! Deterministic names for everything written to disk.
//!
//! A topic URL always maps to the same base name so checkpoint and result files
//! from an earlier run are found again on resume.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::profile::SiteProfile;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap());
static DASHES_AND_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());
static NON_SNAPSHOT_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());
static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

/// Longest alt-text prefix kept in an image filename.
const MAX_ALT_CHARS: usize = 50;
const MAX_SLUG_CHARS: usize = 80;
const DEFAULT_IMAGE_EXT: &str = ".jpg";

/// Base name for all output files of a topic, e.g. `sap_community_supply_chain_management_q_a`.
#[must_use]
pub fn base_filename(topic_url: &str, profile: &SiteProfile) -> String {
    let fallback = format!("{}_data", profile.name_prefix);

    let Ok(parsed) = Url::parse(topic_url) else {
        return fallback;
    };

    let section = parsed.path().split('/').find(|part| {
        !part.is_empty()
            && !profile
                .boilerplate_segments
                .iter()
                .any(|b| b.as_str() == *part)
    });

    match section {
        Some(section) => {
            let clean = UNSAFE_FILENAME_CHARS.replace_all(section, "_");
            let clean = DASHES_AND_SPACES.replace_all(&clean, "_");
            format!("{}_{clean}", profile.name_prefix)
        }
        None => fallback,
    }
}

/// Per-thread directory name for downloaded images.
///
/// Uses the last two meaningful path segments (title slug and message id), so
/// threads of the same board never share an image directory.
#[must_use]
pub fn thread_slug(thread_url: &str, profile: &SiteProfile) -> String {
    let path = Url::parse(thread_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| thread_url.to_string());

    let parts: Vec<&str> = path
        .split('/')
        .filter(|part| {
            !part.is_empty()
                && !profile.boilerplate_segments.iter().any(|b| b.as_str() == *part)
                && !is_route_marker(part)
        })
        .collect();

    let tail = &parts[parts.len().saturating_sub(2)..];
    let joined = tail.join("_");
    let slug: String = NON_SLUG_CHARS
        .replace_all(&joined, "_")
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect();

    if slug.is_empty() {
        "thread".to_string()
    } else {
        slug
    }
}

/// LIA route segments such as `qaq-p` or `m-p`.
fn is_route_marker(segment: &str) -> bool {
    segment.len() <= 6 && segment.ends_with("-p")
}

/// Filesystem-safe rendering of a URL for diagnostic snapshot names.
#[must_use]
pub fn snapshot_name(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    NON_SNAPSHOT_CHARS.replace_all(stripped, "_").into_owned()
}

/// Image filename built from its container, alt text, ordinal and the source extension.
///
/// `container` tells apart images of the question (`q`) and of each answer
/// (`a1`, `a2`, ...), which share one directory per thread.
#[must_use]
pub fn image_filename(container: &str, alt: &str, index: usize, src: &str) -> String {
    let sanitized = UNSAFE_FILENAME_CHARS.replace_all(alt, "_");
    let truncated: String = sanitized.chars().take(MAX_ALT_CHARS).collect();
    format!("{container}_{truncated}_{index}{}", image_extension(src))
}

/// Extension (with dot) of the URL path, or `.jpg`.
fn image_extension(src: &str) -> String {
    let path = Url::parse(src)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| src.split(['?', '#']).next().unwrap_or_default().to_string());

    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{ext}")
        }
        _ => DEFAULT_IMAGE_EXT.to_string(),
    }
}
