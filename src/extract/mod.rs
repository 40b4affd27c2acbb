//! HTML extraction: thread links on list pages, thread content on detail pages.

pub mod links;
pub mod strategy;
pub mod thread;

pub use links::{list_page_url, thread_links};
pub use thread::{extract_thread, ExtractedAnswer, ExtractedThread, PendingImage};
