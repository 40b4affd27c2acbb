//! Forum Q&A harvester library.
//!
//! Crawls the paginated question lists of a community forum with a real
//! browser, extracts every thread with its answers and images, and keeps the
//! results on disk as JSON and CSV, split by whether a thread has an accepted
//! answer. Progress is checkpointed so interrupted crawls resume where they
//! stopped.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod checkpoint;
pub mod config;
pub mod constants;
pub mod crawl;
pub mod diagnostics;
pub mod extract;
pub mod fs_utils;
pub mod images;
pub mod models;
pub mod naming;
pub mod profile;
pub mod render;
pub mod sink;
