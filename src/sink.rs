//! Result files: two JSON collections and a flattened CSV export.
//!
//! Every flush rewrites all three files from the full in-memory state. Once
//! [`ResultSink::flush`] returns, the flushed records are on disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::SUMMARY_TEXT_CHARS;
use crate::fs_utils::write_atomic;
use crate::models::{Answer, ThreadRecord};

/// One CSV row. Field order is column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvRow {
    pub page_number: u32,
    pub system: String,
    pub title: String,
    pub question: String,
    pub question_images: String,
    pub total_responses: usize,
    pub accepted_responses: String,
    pub other_responses: String,
    pub all_responses_summary: String,
    pub tags: String,
    pub url: String,
    pub has_accepted_answer: &'static str,
}

#[derive(Debug, Clone)]
pub struct ResultSink {
    dir: PathBuf,
    base: String,
}

impl ResultSink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, base: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base: base.into(),
        }
    }

    #[must_use]
    pub fn accepted_path(&self) -> PathBuf {
        self.dir.join(format!("{}_accepted.json", self.base))
    }

    #[must_use]
    pub fn unaccepted_path(&self) -> PathBuf {
        self.dir.join(format!("{}_no_accepted.json", self.base))
    }

    #[must_use]
    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(format!("{}.csv", self.base))
    }

    /// Rewrite every result file from the two collections.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing any file fails.
    pub async fn flush(&self, accepted: &[ThreadRecord], unaccepted: &[ThreadRecord]) -> Result<()> {
        write_atomic(&self.accepted_path(), &to_pretty_json(accepted)?).await?;
        write_atomic(&self.unaccepted_path(), &to_pretty_json(unaccepted)?).await?;

        let rows = csv_rows(accepted, unaccepted);
        if rows.is_empty() {
            debug!("No rows to export yet");
        } else {
            let bytes = to_csv(&rows)?;
            write_atomic(&self.csv_path(), &bytes).await?;
        }

        info!(
            accepted = accepted.len(),
            unaccepted = unaccepted.len(),
            rows = rows.len(),
            "Results flushed"
        );
        Ok(())
    }

    /// Records written by earlier runs, `(accepted, unaccepted)`.
    ///
    /// Missing or unreadable files contribute nothing.
    pub async fn load_existing(&self) -> (Vec<ThreadRecord>, Vec<ThreadRecord>) {
        let accepted = read_records(&self.accepted_path()).await;
        let unaccepted = read_records(&self.unaccepted_path()).await;
        (accepted, unaccepted)
    }
}

async fn read_records(path: &Path) -> Vec<ThreadRecord> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), "Failed to read existing results: {e}");
            return Vec::new();
        }
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        warn!(path = %path.display(), "Ignoring unreadable results file: {e}");
        Vec::new()
    })
}

fn to_pretty_json(records: &[ThreadRecord]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records
        .serialize(&mut ser)
        .context("Failed to encode result records")?;
    Ok(buf)
}

fn to_csv(rows: &[CsvRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Failed to encode CSV row")?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV: {}", e.error()))
}

/// Flatten both collections, accepted first. An unaccepted record whose URL
/// already has a row is left out.
#[must_use]
pub fn csv_rows(accepted: &[ThreadRecord], unaccepted: &[ThreadRecord]) -> Vec<CsvRow> {
    let mut rows: Vec<CsvRow> = accepted.iter().map(|r| flatten(r, true)).collect();
    let mut urls: HashSet<String> = rows.iter().map(|r| r.url.clone()).collect();

    for record in unaccepted {
        if urls.insert(record.url.clone()) {
            rows.push(flatten(record, false));
        }
    }
    rows
}

fn flatten(record: &ThreadRecord, accepted: bool) -> CsvRow {
    let all = join_summaries(record.all_responses.iter());
    let (accepted_responses, other_responses) = if accepted {
        (
            join_summaries(record.all_responses.iter().filter(|r| r.is_accepted)),
            join_summaries(record.all_responses.iter().filter(|r| !r.is_accepted)),
        )
    } else {
        (String::new(), all.clone())
    };

    CsvRow {
        page_number: record.page_number,
        system: record.system.clone(),
        title: record.title.clone(),
        question: record.question.clone(),
        question_images: record
            .question_images
            .iter()
            .map(|img| img.filename.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        total_responses: record.total_responses,
        accepted_responses,
        other_responses,
        all_responses_summary: all,
        tags: record.tags.join("; "),
        url: record.url.clone(),
        has_accepted_answer: if accepted { "Yes" } else { "No" },
    }
}

fn join_summaries<'a>(answers: impl Iterator<Item = &'a Answer>) -> String {
    answers.map(summarize).collect::<Vec<_>>().join(" | ")
}

/// `[author] <first 200 chars>...`, with an image count when there are images.
#[must_use]
pub fn summarize(answer: &Answer) -> String {
    let author = if answer.author.is_empty() {
        "Unknown"
    } else {
        answer.author.as_str()
    };
    let text: String = answer.text.chars().take(SUMMARY_TEXT_CHARS).collect();
    let mut summary = format!("[{author}] {text}...");
    if !answer.images.is_empty() {
        summary.push_str(&format!(" [{} image(s)]", answer.images.len()));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageRef, ThreadContent};

    fn answer(n: usize, text: &str, accepted: bool, author: &str) -> Answer {
        Answer {
            response_number: n,
            text: text.to_string(),
            is_accepted: accepted,
            author: author.to_string(),
            date: String::new(),
            images: Vec::new(),
        }
    }

    fn record(url: &str, responses: Vec<Answer>) -> ThreadRecord {
        ThreadRecord::new(
            1,
            url.to_string(),
            ThreadContent {
                system: "SCM".to_string(),
                title: "Title".to_string(),
                question: "Question?".to_string(),
                tags: vec!["MM".to_string(), "SD".to_string()],
                responses,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_summary_format() {
        let mut a = answer(1, "Use MIGO", false, "");
        assert_eq!(summarize(&a), "[Unknown] Use MIGO...");

        a.author = "alice".to_string();
        a.images.push(ImageRef {
            original_url: "u".to_string(),
            local_path: "p".to_string(),
            alt_text: "a".to_string(),
            filename: "a_0.png".to_string(),
        });
        assert_eq!(summarize(&a), "[alice] Use MIGO... [1 image(s)]");
    }

    #[test]
    fn test_summary_truncates_by_chars() {
        let a = answer(1, &"ä".repeat(250), false, "bob");
        let summary = summarize(&a);
        assert_eq!(summary.chars().filter(|c| *c == 'ä').count(), 200);
    }

    #[test]
    fn test_rows_accepted_first_and_deduped() {
        let accepted = vec![record(
            "https://x.test/t/1",
            vec![answer(1, "no", false, "a"), answer(2, "yes", true, "b")],
        )];
        let unaccepted = vec![
            record("https://x.test/t/2", vec![answer(1, "maybe", false, "c")]),
            record("https://x.test/t/1", vec![]),
        ];

        let rows = csv_rows(&accepted, &unaccepted);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].has_accepted_answer, "Yes");
        assert_eq!(rows[0].accepted_responses, "[b] yes...");
        assert_eq!(rows[0].other_responses, "[a] no...");
        assert_eq!(rows[0].all_responses_summary, "[a] no... | [b] yes...");
        assert_eq!(rows[0].tags, "MM; SD");

        assert_eq!(rows[1].has_accepted_answer, "No");
        assert_eq!(rows[1].accepted_responses, "");
        assert_eq!(rows[1].other_responses, "[c] maybe...");
    }

    #[tokio::test]
    async fn test_flush_writes_files_and_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = ResultSink::new(dir.path(), "board");
        let accepted = vec![record("https://x.test/t/1", vec![answer(1, "yes", true, "b")])];
        let unaccepted = vec![record("https://x.test/t/2", vec![])];

        sink.flush(&accepted, &unaccepted).await.unwrap();
        let first_csv = std::fs::read(sink.csv_path()).unwrap();
        sink.flush(&accepted, &unaccepted).await.unwrap();
        assert_eq!(std::fs::read(sink.csv_path()).unwrap(), first_csv);

        let csv_text = String::from_utf8(first_csv).unwrap();
        assert!(csv_text.starts_with(
            "page_number,system,title,question,question_images,total_responses,\
             accepted_responses,other_responses,all_responses_summary,tags,url,has_accepted_answer"
        ));

        let json = std::fs::read_to_string(sink.accepted_path()).unwrap();
        assert!(json.contains("\n    {"));
        assert!(json.contains("\"primary_accepted_response\": \"yes\""));

        let (a, u) = sink.load_existing().await;
        assert_eq!(a, accepted);
        assert_eq!(u, unaccepted);
    }

    #[tokio::test]
    async fn test_flush_empty_skips_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = ResultSink::new(dir.path(), "empty");
        sink.flush(&[], &[]).await.unwrap();

        assert!(sink.accepted_path().exists());
        assert!(sink.unaccepted_path().exists());
        assert!(!sink.csv_path().exists());
    }

    #[tokio::test]
    async fn test_load_existing_tolerates_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = ResultSink::new(dir.path(), "board");
        std::fs::write(sink.accepted_path(), "garbage").unwrap();
        let (a, u) = sink.load_existing().await;
        assert!(a.is_empty());
        assert!(u.is_empty());
    }
}
