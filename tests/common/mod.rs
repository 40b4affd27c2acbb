//! Shared helpers for crawl integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use forum_qa_harvester::crawl::{CrawlTiming, Crawler};
use forum_qa_harvester::diagnostics::Diagnostics;
use forum_qa_harvester::images::ImageFetcher;
use forum_qa_harvester::profile::SiteProfile;
use forum_qa_harvester::render::{PageRenderer, RenderError};

pub const TOPIC: &str = "https://community.sap.com/t5/scm-q-a/qa-p/scm-questions";
pub const ORIGIN: &str = "https://community.sap.com";

/// What a scripted navigation does.
#[derive(Debug, Clone)]
pub enum Step {
    Load { title: String, html: String },
    /// Loads, but the browser ends up at `final_url`.
    Redirect {
        final_url: String,
        title: String,
        html: String,
    },
    Fail,
}

impl Step {
    pub fn page(title: &str, html: impl Into<String>) -> Self {
        Self::Load {
            title: title.to_string(),
            html: html.into(),
        }
    }

    pub fn redirect(final_url: &str, html: impl Into<String>) -> Self {
        Self::Redirect {
            final_url: final_url.to_string(),
            title: "SAP Community".to_string(),
            html: html.into(),
        }
    }

    pub fn blocked() -> Self {
        Self::page("403 Forbidden", "<html><body>Access Denied</body></html>")
    }
}

/// In-memory renderer serving scripted pages by URL.
///
/// Each URL has a queue of steps; the last step repeats once the others are
/// used up. Unknown URLs fail to navigate.
#[derive(Debug, Default)]
pub struct ScriptedRenderer {
    scripts: HashMap<String, VecDeque<Step>>,
    current: Option<(String, String, String)>,
    pub visits: Vec<String>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&mut self, url: &str, steps: Vec<Step>) -> &mut Self {
        self.scripts.insert(url.to_string(), steps.into());
        self
    }

    pub fn serve_page(&mut self, url: &str, html: impl Into<String>) -> &mut Self {
        self.serve(url, vec![Step::page("SAP Community", html)])
    }

    /// Navigations to `url` so far.
    pub fn visit_count(&self, url: &str) -> usize {
        self.visits.iter().filter(|v| v.as_str() == url).count()
    }

    /// Navigations to thread pages so far, in order.
    pub fn thread_visits(&self) -> Vec<String> {
        self.visits
            .iter()
            .filter(|v| v.contains("/qaq-p/"))
            .cloned()
            .collect()
    }

    /// Navigations to list pages so far, in order.
    pub fn list_visits(&self) -> Vec<String> {
        self.visits
            .iter()
            .filter(|v| v.starts_with(TOPIC))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), RenderError> {
        self.visits.push(url.to_string());

        let Some(queue) = self.scripts.get_mut(url) else {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: "no scripted page".to_string(),
            });
        };
        let step = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match step {
            Some(Step::Load { title, html }) => {
                self.current = Some((url.to_string(), title, html));
                Ok(())
            }
            Some(Step::Redirect {
                final_url,
                title,
                html,
            }) => {
                self.current = Some((final_url, title, html));
                Ok(())
            }
            Some(Step::Fail) | None => Err(RenderError::Timeout {
                url: url.to_string(),
                timeout: Duration::from_secs(5),
            }),
        }
    }

    async fn title(&mut self) -> Result<String, RenderError> {
        Ok(self
            .current
            .as_ref()
            .map(|(_, title, _)| title.clone())
            .unwrap_or_default())
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.current
            .as_ref()
            .map(|(_, _, html)| html.clone())
            .ok_or_else(|| RenderError::Protocol("no page loaded".to_string()))
    }

    async fn current_url(&mut self) -> Result<String, RenderError> {
        Ok(self
            .current
            .as_ref()
            .map(|(url, _, _)| url.clone())
            .unwrap_or_else(|| "about:blank".to_string()))
    }
}

pub fn list_url(page: u32) -> String {
    format!("{TOPIC}?page={page}")
}

pub fn thread_path(id: u32) -> String {
    format!("/t5/scm-q-a/question-{id}/qaq-p/{id}")
}

pub fn thread_url(id: u32) -> String {
    format!("{ORIGIN}{}", thread_path(id))
}

/// A list page linking to the given thread ids, in order.
pub fn list_html(ids: &[u32]) -> String {
    let links: String = ids
        .iter()
        .map(|id| format!(r#"<li><a href="{}">Question {id}</a></li>"#, thread_path(*id)))
        .collect();
    format!("<html><body><ul>{links}</ul></body></html>")
}

/// A list page without any thread links.
pub fn empty_list_html() -> String {
    "<html><body><p>No results</p></body></html>".to_string()
}

/// A thread page with one answer, accepted or not.
pub fn thread_html(id: u32, accepted: bool) -> String {
    let class = if accepted {
        "MessageView lia-message-view-qanda-answer lia-accepted-solution"
    } else {
        "MessageView lia-message-view-qanda-answer"
    };
    format!(
        r#"<html>
          <head><title>Question {id} | SAP Community</title></head>
          <body>
            <div class="lia-message-subject"><h1>Question {id}</h1></div>
            <div id="bodyDisplay"><p>Body of question {id}</p></div>
            <div class="{class}">
              <a class="lia-user-name-link">expert</a>
              <div class="lia-message-body"><p>Answer to {id}</p></div>
            </div>
          </body>
        </html>"#
    )
}

pub fn crawler(output_dir: &Path) -> Crawler {
    Crawler::new(
        SiteProfile::sap_community(),
        CrawlTiming::immediate(),
        output_dir,
        ImageFetcher::new().expect("image client"),
        Diagnostics::disabled(),
    )
}

pub fn crawler_with_diagnostics(output_dir: &Path, diagnostics_dir: &Path) -> Crawler {
    Crawler::new(
        SiteProfile::sap_community(),
        CrawlTiming::immediate(),
        output_dir,
        ImageFetcher::new().expect("image client"),
        Diagnostics::new(true, diagnostics_dir),
    )
}
