//! The crawl loop: list pages, thread pages, persistence after every thread.
//!
//! One [`Crawler`] drives one [`PageRenderer`] strictly sequentially. Nothing in
//! a page or thread iteration is allowed to end the run; failures are logged
//! and the loop moves on. The run ends when the page range is exhausted, a list
//! page yields no thread links, or the question quota is reached.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::checkpoint::CheckpointStore;
use crate::diagnostics::{Diagnostics, SnapshotKind};
use crate::extract::{extract_thread, list_page_url, thread_links, ExtractedAnswer};
use crate::images::ImageFetcher;
use crate::models::{Answer, Classification, ThreadContent, ThreadRecord};
use crate::naming::{base_filename, thread_slug};
use crate::profile::SiteProfile;
use crate::render::PageRenderer;
use crate::sink::ResultSink;

pub mod retry;

pub use retry::{load_detail_page, load_list_page, CrawlTiming};

/// What to crawl.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub topic_url: String,
    /// Last list page index to visit (1-based, inclusive).
    pub max_pages: u32,
    /// Stop after this many threads were processed in this run.
    pub max_questions: Option<usize>,
    /// Continue from the checkpoint and keep earlier results.
    pub resume: bool,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PagesExhausted,
    NoMoreThreads,
    QuotaReached,
}

/// Collections accumulated during a run.
#[derive(Debug, Default)]
pub struct RunState {
    pub accepted: Vec<ThreadRecord>,
    pub unaccepted: Vec<ThreadRecord>,
    known_urls: HashSet<String>,
    processed: usize,
}

impl RunState {
    /// State holding records of earlier runs. They count as known, not as processed.
    #[must_use]
    pub fn seeded(accepted: Vec<ThreadRecord>, unaccepted: Vec<ThreadRecord>) -> Self {
        let known_urls = accepted
            .iter()
            .chain(&unaccepted)
            .map(|r| r.url.clone())
            .collect();
        Self {
            accepted,
            unaccepted,
            known_urls,
            processed: 0,
        }
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.known_urls.contains(url)
    }

    /// Threads processed in this run.
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.processed
    }

    #[must_use]
    pub fn quota_reached(&self, max_questions: Option<usize>) -> bool {
        max_questions.is_some_and(|max| self.processed >= max)
    }

    /// Add a freshly processed record to the collection it belongs to.
    pub fn push(&mut self, record: ThreadRecord) -> Classification {
        let classification = record.classification();
        self.known_urls.insert(record.url.clone());
        self.processed += 1;
        match classification {
            Classification::Accepted => self.accepted.push(record),
            Classification::Unaccepted => self.unaccepted.push(record),
        }
        classification
    }
}

/// Result of a run.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub accepted: Vec<ThreadRecord>,
    pub unaccepted: Vec<ThreadRecord>,
    /// Threads processed in this run, excluding records carried over by resume.
    pub processed: usize,
    pub stop: StopReason,
}

pub struct Crawler {
    profile: SiteProfile,
    timing: CrawlTiming,
    output_dir: PathBuf,
    fetcher: ImageFetcher,
    diagnostics: Diagnostics,
}

impl Crawler {
    #[must_use]
    pub fn new(
        profile: SiteProfile,
        timing: CrawlTiming,
        output_dir: impl Into<PathBuf>,
        fetcher: ImageFetcher,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            profile,
            timing,
            output_dir: output_dir.into(),
            fetcher,
            diagnostics,
        }
    }

    /// Name shared by the checkpoint and result files of `topic_url`.
    #[must_use]
    pub fn base_name(&self, topic_url: &str) -> String {
        base_filename(topic_url, &self.profile)
    }

    /// Crawl one topic. Always returns what was collected.
    #[instrument(skip(self, renderer, params), fields(topic = %params.topic_url))]
    pub async fn run<R>(&self, renderer: &mut R, params: &RunParams) -> CrawlOutcome
    where
        R: PageRenderer + ?Sized,
    {
        let base = self.base_name(&params.topic_url);
        let checkpoints = CheckpointStore::new(&self.output_dir);
        let sink = ResultSink::new(&self.output_dir, &base);

        let (start_page, mut state) = if params.resume {
            let (last_completed, last_url) = checkpoints.load(&base).await;
            let (accepted, unaccepted) = sink.load_existing().await;
            info!(
                last_completed,
                last_url = %last_url,
                accepted = accepted.len(),
                unaccepted = unaccepted.len(),
                "Resuming"
            );
            (last_completed.saturating_add(1), RunState::seeded(accepted, unaccepted))
        } else {
            (1, RunState::default())
        };

        info!(base = %base, start_page, max_pages = params.max_pages, "Starting crawl");
        let mut stop = StopReason::PagesExhausted;

        'pages: for page in start_page..=params.max_pages {
            let list_url = list_page_url(&params.topic_url, &self.profile.page_param, page);
            self.save_checkpoint(&checkpoints, &base, page - 1, &list_url).await;

            renderer.wait(self.timing.courtesy_delay(page)).await;
            info!(page, url = %list_url, "Loading list page");
            if !load_list_page(renderer, &list_url, page, &self.timing, &self.profile).await {
                warn!(page, attempts = self.timing.list_attempts, "Skipping list page");
                continue;
            }

            let html = match renderer.content().await {
                Ok(html) => html,
                Err(e) => {
                    warn!(page, "Failed to read list page: {e}");
                    continue;
                }
            };
            let links = thread_links(&html, &list_url, &self.profile);
            info!(page, links = links.len(), "Thread links found");

            if links.is_empty() {
                info!(page, "No thread links, end of pagination");
                stop = StopReason::NoMoreThreads;
                break;
            }

            let mut last_url = list_url;
            let mut cut_short = false;
            for link in links {
                if state.quota_reached(params.max_questions) {
                    cut_short = true;
                    break;
                }
                if state.contains(&link) {
                    debug!(url = %link, "Already collected, skipping");
                    continue;
                }

                self.visit_thread(renderer, &link, page, &mut state, &sink)
                    .await;
                self.save_checkpoint(&checkpoints, &base, page - 1, &link)
                    .await;
                last_url = link;
            }

            if !cut_short {
                self.save_checkpoint(&checkpoints, &base, page, &last_url)
                    .await;
                info!(page, processed = state.processed(), "List page complete");
            }

            if state.quota_reached(params.max_questions) {
                info!(processed = state.processed(), "Question quota reached");
                stop = StopReason::QuotaReached;
                break 'pages;
            }
        }

        info!(
            accepted = state.accepted.len(),
            unaccepted = state.unaccepted.len(),
            processed = state.processed(),
            stop = ?stop,
            "Crawl finished"
        );

        CrawlOutcome {
            processed: state.processed(),
            accepted: state.accepted,
            unaccepted: state.unaccepted,
            stop,
        }
    }

    async fn visit_thread<R>(
        &self,
        renderer: &mut R,
        url: &str,
        page: u32,
        state: &mut RunState,
        sink: &ResultSink,
    ) where
        R: PageRenderer + ?Sized,
    {
        info!(page, url, "Visiting thread");

        if let Err(e) = load_detail_page(renderer, url, &self.timing).await {
            warn!(url, "Skipping thread: {e}");
            self.snapshot_current(renderer, SnapshotKind::NavigationError, url)
                .await;
            return;
        }

        match self.harvest_thread(renderer, url, page, state, sink).await {
            Ok(Classification::Accepted) => {}
            Ok(Classification::Unaccepted) => {
                self.snapshot_current(renderer, SnapshotKind::NoAccepted, url)
                    .await;
            }
            Err(e) => {
                error!(url, "Failed to process thread: {e:#}");
                self.snapshot_current(renderer, SnapshotKind::ExtractionError, url)
                    .await;
            }
        }
    }

    async fn harvest_thread<R>(
        &self,
        renderer: &mut R,
        url: &str,
        page: u32,
        state: &mut RunState,
        sink: &ResultSink,
    ) -> Result<Classification>
    where
        R: PageRenderer + ?Sized,
    {
        let html = renderer
            .content()
            .await
            .context("Failed to read thread page")?;
        let page_title = renderer.title().await.unwrap_or_default();
        let extracted = extract_thread(&html, &page_title, &self.profile);
        // Relative image sources resolve against where the page ended up.
        let base_url = match renderer.current_url().await {
            Ok(current) if !current.is_empty() => current,
            _ => url.to_string(),
        };

        let image_dir = self
            .output_dir
            .join("images")
            .join(thread_slug(url, &self.profile));

        let question_images = self
            .fetcher
            .fetch_all(&extracted.question_images, "q", &base_url, &image_dir)
            .await;
        let mut responses = Vec::with_capacity(extracted.answers.len());
        for answer in extracted.answers {
            responses.push(self.resolve_answer(answer, &base_url, &image_dir).await);
        }

        let record = ThreadRecord::new(
            page,
            url.to_string(),
            ThreadContent {
                system: extracted.system,
                title: extracted.title,
                question: extracted.question,
                question_images,
                tags: extracted.tags,
                responses,
            },
        );
        info!(
            url,
            title = %record.title,
            responses = record.total_responses,
            accepted = record.accepted_responses.len(),
            "Thread processed"
        );

        let classification = state.push(record);
        sink.flush(&state.accepted, &state.unaccepted)
            .await
            .context("Failed to save results")?;
        Ok(classification)
    }

    async fn resolve_answer(
        &self,
        answer: ExtractedAnswer,
        base_url: &str,
        image_dir: &Path,
    ) -> Answer {
        let container = format!("a{}", answer.number);
        let images = self
            .fetcher
            .fetch_all(&answer.images, &container, base_url, image_dir)
            .await;
        Answer {
            response_number: answer.number,
            text: answer.text,
            is_accepted: answer.is_accepted,
            author: answer.author,
            date: answer.date,
            images,
        }
    }

    async fn snapshot_current<R>(&self, renderer: &mut R, kind: SnapshotKind, url: &str)
    where
        R: PageRenderer + ?Sized,
    {
        if !self.diagnostics.is_enabled() {
            return;
        }
        match renderer.content().await {
            Ok(html) => {
                self.diagnostics.snapshot(kind, url, &html).await;
            }
            Err(e) => debug!(url, "No page content to snapshot: {e}"),
        }
    }

    async fn save_checkpoint(&self, store: &CheckpointStore, base: &str, page: u32, url: &str) {
        if let Err(e) = store.save(base, page, url).await {
            warn!(page, url, "Failed to save checkpoint: {e:#}");
        }
    }
}
