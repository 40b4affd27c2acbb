//! Records produced by a crawl.
//!
//! These are the shapes written to the JSON result files, so field names are
//! part of the on-disk format.

use serde::{Deserialize, Serialize};

/// A downloaded image referenced by a question or an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Absolute URL the image was fetched from.
    pub original_url: String,
    /// Where the bytes were written.
    pub local_path: String,
    pub alt_text: String,
    pub filename: String,
}

/// One answer block of a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// 1-based position on the page.
    pub response_number: usize,
    pub text: String,
    pub is_accepted: bool,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// Which result collection a thread belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Accepted,
    Unaccepted,
}

/// A fully processed thread.
///
/// `accepted_responses` and `non_accepted_responses` are always derived from
/// `all_responses`; construct through [`ThreadRecord::new`] to keep them in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub page_number: u32,
    pub system: String,
    pub title: String,
    pub question: String,
    #[serde(default)]
    pub question_images: Vec<ImageRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub url: String,
    pub total_responses: usize,
    #[serde(default)]
    pub all_responses: Vec<Answer>,
    #[serde(default)]
    pub accepted_responses: Vec<Answer>,
    #[serde(default)]
    pub non_accepted_responses: Vec<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_accepted_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_response: Option<String>,
}

/// The parts of a thread that come from the page itself, before images are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadContent {
    pub system: String,
    pub title: String,
    pub question: String,
    pub question_images: Vec<ImageRef>,
    pub tags: Vec<String>,
    pub responses: Vec<Answer>,
}

impl ThreadRecord {
    /// Assemble a record and derive the accepted / non-accepted split.
    #[must_use]
    pub fn new(page_number: u32, url: String, content: ThreadContent) -> Self {
        let (accepted, others): (Vec<Answer>, Vec<Answer>) = content
            .responses
            .iter()
            .cloned()
            .partition(|r| r.is_accepted);

        let (primary_accepted_response, primary_response) = if let Some(first) = accepted.first() {
            (Some(first.text.clone()), None)
        } else {
            (
                None,
                Some(others.first().map(|r| r.text.clone()).unwrap_or_default()),
            )
        };

        Self {
            page_number,
            system: content.system,
            title: content.title,
            question: content.question,
            question_images: content.question_images,
            tags: content.tags,
            url,
            total_responses: content.responses.len(),
            all_responses: content.responses,
            accepted_responses: accepted,
            non_accepted_responses: others,
            primary_accepted_response,
            primary_response,
        }
    }

    #[must_use]
    pub fn classification(&self) -> Classification {
        if self.accepted_responses.is_empty() {
            Classification::Unaccepted
        } else {
            Classification::Accepted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(n: usize, accepted: bool) -> Answer {
        Answer {
            response_number: n,
            text: format!("answer {n}"),
            is_accepted: accepted,
            author: String::new(),
            date: String::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn test_record_with_accepted_answer() {
        let content = ThreadContent {
            responses: vec![answer(1, false), answer(2, true)],
            ..Default::default()
        };
        let record = ThreadRecord::new(3, "https://example.com/t".to_string(), content);

        assert_eq!(record.classification(), Classification::Accepted);
        assert_eq!(record.total_responses, 2);
        assert_eq!(record.accepted_responses.len(), 1);
        assert_eq!(record.non_accepted_responses.len(), 1);
        assert_eq!(record.primary_accepted_response.as_deref(), Some("answer 2"));
        assert!(record.primary_response.is_none());
    }

    #[test]
    fn test_record_without_answers_is_unaccepted() {
        let record = ThreadRecord::new(1, "u".to_string(), ThreadContent::default());

        assert_eq!(record.classification(), Classification::Unaccepted);
        assert_eq!(record.total_responses, 0);
        assert_eq!(record.primary_response.as_deref(), Some(""));
    }

    #[test]
    fn test_optional_fields_skipped_in_json() {
        let content = ThreadContent {
            responses: vec![answer(1, true)],
            ..Default::default()
        };
        let record = ThreadRecord::new(1, "u".to_string(), content);
        let json = serde_json::to_value(&record).unwrap();

        assert!(json.get("primary_response").is_none());
        assert_eq!(json["primary_accepted_response"], "answer 1");
    }
}
