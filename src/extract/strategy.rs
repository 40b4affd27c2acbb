//! Ordered fallback evaluation.
//!
//! Forum markup drifts, so every field is looked up through a list of
//! strategies tried in order until one yields a usable value.

use scraper::{ElementRef, Html, Selector};
use tracing::trace;

/// Parse a CSS selector, logging and skipping it when it is invalid.
#[must_use]
pub fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!(selector = css, "Invalid selector skipped: {e:?}");
            None
        }
    }
}

/// Evaluates strategies in order and keeps the first acceptable result.
pub struct FirstMatch<'a, S> {
    strategies: &'a [S],
}

impl<'a, S> FirstMatch<'a, S> {
    #[must_use]
    pub const fn new(strategies: &'a [S]) -> Self {
        Self { strategies }
    }

    /// First `Some` produced by `eval`, in strategy order.
    pub fn find<T>(&self, mut eval: impl FnMut(&S) -> Option<T>) -> Option<T> {
        self.strategies.iter().find_map(|s| eval(s))
    }

    /// First non-empty vector produced by `eval`; empty when none matched.
    pub fn find_non_empty<T>(&self, mut eval: impl FnMut(&S) -> Vec<T>) -> Vec<T> {
        self.find(|s| {
            let found = eval(s);
            (!found.is_empty()).then_some(found)
        })
        .unwrap_or_default()
    }
}

/// Whitespace-normalized text of an element, as a browser's `innerText` would trim it.
#[must_use]
pub fn element_text(element: &ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// All elements of `document` matching `css`.
#[must_use]
pub fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    parse_selector(css)
        .map(|selector| document.select(&selector).collect())
        .unwrap_or_default()
}

/// First element below `scope` matching `css`.
#[must_use]
pub fn select_first_in<'a>(scope: &ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = parse_selector(css)?;
    let found = scope.select(&selector).next();
    if found.is_none() {
        trace!(selector = css, "No match in scope");
    }
    found
}

/// First element of `document` matching `css`.
#[must_use]
pub fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = parse_selector(css)?;
    document.select(&selector).next()
}
