//! Content extraction from a rendered thread page.
//!
//! Every field degrades independently: a selector that matches nothing leaves
//! that field empty and extraction carries on with the rest of the record.

use scraper::{ElementRef, Html};
use tracing::debug;

use super::strategy::{
    element_text, parse_selector, select_all, select_first, select_first_in, FirstMatch,
};
use crate::profile::SiteProfile;

/// An `<img>` found in the page that has not been downloaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub src: String,
    pub alt: String,
    /// Position among the `<img>` elements of its container.
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedAnswer {
    pub number: usize,
    pub text: String,
    pub is_accepted: bool,
    pub author: String,
    pub date: String,
    pub images: Vec<PendingImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedThread {
    pub title: String,
    pub question: String,
    pub question_images: Vec<PendingImage>,
    pub tags: Vec<String>,
    pub system: String,
    pub answers: Vec<ExtractedAnswer>,
}

impl ExtractedThread {
    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_accepted).count()
    }
}

/// Extract a thread from the rendered HTML of its detail page.
///
/// `page_title` is the document title reported by the renderer; the document's
/// own `<title>` is used when it is empty.
#[must_use]
pub fn extract_thread(html: &str, page_title: &str, profile: &SiteProfile) -> ExtractedThread {
    let document = Html::parse_document(html);

    let title = extract_title(&document, page_title, profile);
    let body = FirstMatch::new(&profile.body_selectors).find(|css| select_first(&document, css));
    let (question, question_images) = match body {
        Some(element) => (element_text(&element), pending_images(&element)),
        None => {
            debug!("No question body matched");
            (String::new(), Vec::new())
        }
    };

    let thread = ExtractedThread {
        title,
        question,
        question_images,
        tags: extract_tags(&document, profile),
        system: extract_system(&document, profile),
        answers: extract_answers(&document, profile),
    };

    debug!(
        title = %thread.title,
        answers = thread.answers.len(),
        accepted = thread.accepted_count(),
        tags = thread.tags.len(),
        "Thread extracted"
    );
    thread
}

fn extract_title(document: &Html, page_title: &str, profile: &SiteProfile) -> String {
    let from_dom = FirstMatch::new(&profile.title_selectors).find(|css| {
        let text = element_text(&select_first(document, css)?);
        (!text.is_empty()).then_some(text)
    });
    if let Some(title) = from_dom {
        return title;
    }

    let page_title = if page_title.trim().is_empty() {
        select_first(document, "title")
            .map(|t| element_text(&t))
            .unwrap_or_default()
    } else {
        page_title.to_string()
    };

    let stripped = page_title
        .split_once(profile.title_suffix.as_str())
        .map_or(page_title.as_str(), |(head, _)| head);
    stripped.trim().to_string()
}

fn extract_tags(document: &Html, profile: &SiteProfile) -> Vec<String> {
    let from_meta: Vec<String> = select_all(document, &profile.tag_meta_selector)
        .iter()
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToString::to_string)
        .collect();
    if !from_meta.is_empty() {
        return from_meta;
    }

    select_all(document, &profile.tag_link_selector)
        .iter()
        .map(element_text)
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn extract_system(document: &Html, profile: &SiteProfile) -> String {
    let from_meta = select_first(document, &profile.section_meta_selector)
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(system) = from_meta {
        return system.to_string();
    }

    FirstMatch::new(&profile.breadcrumb_selectors)
        .find(|css| {
            let crumbs = select_all(document, css);
            if crumbs.len() < 2 {
                return None;
            }
            let text = element_text(&crumbs[crumbs.len() - 2]);
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_default()
}

fn extract_answers(document: &Html, profile: &SiteProfile) -> Vec<ExtractedAnswer> {
    select_all(document, &profile.answer_selector)
        .iter()
        .enumerate()
        .map(|(i, element)| extract_answer(element, i + 1, profile))
        .collect()
}

fn extract_answer(
    element: &ElementRef<'_>,
    number: usize,
    profile: &SiteProfile,
) -> ExtractedAnswer {
    let body_text = FirstMatch::new(&profile.answer_body_selectors)
        .find(|css| select_first_in(element, css))
        .map(|body| element_text(&body))
        .unwrap_or_default();
    let text = if body_text.is_empty() {
        element_text(element)
    } else {
        body_text
    };

    let class_attr = element.value().attr("class").unwrap_or_default();

    ExtractedAnswer {
        number,
        text,
        is_accepted: profile.is_accepted_class(class_attr),
        author: select_first_in(element, &profile.author_selector)
            .map(|e| element_text(&e))
            .unwrap_or_default(),
        date: select_first_in(element, &profile.date_selector)
            .map(|e| element_text(&e))
            .unwrap_or_default(),
        images: pending_images(element),
    }
}

/// `<img>` elements below `scope`, with their ordinal among all images there.
fn pending_images(scope: &ElementRef<'_>) -> Vec<PendingImage> {
    let Some(selector) = parse_selector("img") else {
        return Vec::new();
    };

    scope
        .select(&selector)
        .enumerate()
        .filter_map(|(index, img)| {
            let src = img.value().attr("src")?.trim();
            if src.is_empty() {
                return None;
            }
            let alt = img
                .value()
                .attr("alt")
                .filter(|a| !a.is_empty())
                .map_or_else(|| format!("image_{index}"), ToString::to_string);
            Some(PendingImage {
                src: src.to_string(),
                alt,
                index,
            })
        })
        .collect()
}
