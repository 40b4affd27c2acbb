//! Thread link discovery on list pages.

use std::collections::HashSet;

use scraper::Html;
use tracing::debug;
use url::Url;

use super::strategy::{select_all, FirstMatch};
use crate::profile::SiteProfile;

/// Address of list page `index` of a topic.
///
/// Any existing page parameter on the topic URL is replaced.
#[must_use]
pub fn list_page_url(topic_url: &str, page_param: &str, index: u32) -> String {
    let Ok(mut url) = Url::parse(topic_url) else {
        return format!("{topic_url}?{page_param}={index}");
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != page_param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(page_param, &index.to_string());
    }
    url.to_string()
}

/// Raw `href` values found by the first link strategy that matches anything.
#[must_use]
pub fn discover_hrefs(html: &str, profile: &SiteProfile) -> Vec<String> {
    let document = Html::parse_document(html);

    FirstMatch::new(&profile.thread_link_selectors).find_non_empty(|css| {
        let hrefs: Vec<String> = select_all(&document, css)
            .iter()
            .filter_map(|a| a.value().attr("href"))
            .map(ToString::to_string)
            .collect();
        debug!(selector = %css, found = hrefs.len(), "Link strategy evaluated");
        hrefs
    })
}

/// Absolute, unique thread URLs in first-seen order.
///
/// Relative links are resolved against `base`. Profile links, board index pages
/// and anything not matching the thread pattern are dropped, including links
/// back to the list page itself.
#[must_use]
pub fn filter_thread_links(hrefs: &[String], base: &Url, profile: &SiteProfile) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in hrefs {
        let Some(url) = absolutize(href, base) else {
            continue;
        };
        if url.path() == base.path() || profile.board_url_pattern.is_match(url.path()) {
            continue;
        }
        let absolute = url.to_string();

        if profile
            .excluded_link_markers
            .iter()
            .any(|marker| absolute.contains(marker.as_str()))
        {
            continue;
        }

        if !profile.thread_url_pattern.is_match(&absolute) {
            continue;
        }

        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }

    links
}

/// Discover and filter thread links of a rendered list page.
#[must_use]
pub fn thread_links(html: &str, page_url: &str, profile: &SiteProfile) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let hrefs = discover_hrefs(html, profile);
    filter_thread_links(&hrefs, &base, profile)
}

fn absolutize(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://community.sap.com/t5/scm-q-a/qa-p/scm-questions?page=1").unwrap()
    }

    #[test]
    fn test_list_page_url() {
        assert_eq!(
            list_page_url("https://community.sap.com/t5/scm-q-a/qa-p/scm-questions", "page", 3),
            "https://community.sap.com/t5/scm-q-a/qa-p/scm-questions?page=3"
        );
        assert_eq!(
            list_page_url("https://forum.example.com/board?sort=new&page=9", "page", 2),
            "https://forum.example.com/board?sort=new&page=2"
        );
    }

    #[test]
    fn test_filter_mixed_links() {
        let profile = SiteProfile::sap_community();
        let hrefs: Vec<String> = [
            "/t5/scm-q-a/first/qaq-p/1",
            "https://community.sap.com/t5/user/viewprofilepage/user-id/42",
            "/t5/scm-q-a/bd-p/scm-board",
            "https://community.sap.com/t5/scm-q-a/second/qaq-p/2",
            "/t5/scm-q-a/first/qaq-p/1",
            "/t5/scm-q-a/first/qaq-p/1#M5",
            "/t5/scm-q-a/qa-p/scm-questions?page=2",
            "/t5/technology-q-a/qa-p/technology-questions",
            "https://community.sap.com/t5/crm-and-cx-q-a/qa-p/crm-questions/",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let links = filter_thread_links(&hrefs, &base(), &profile);
        assert_eq!(
            links,
            vec![
                "https://community.sap.com/t5/scm-q-a/first/qaq-p/1".to_string(),
                "https://community.sap.com/t5/scm-q-a/second/qaq-p/2".to_string(),
            ]
        );
    }

    #[test]
    fn test_discover_uses_first_matching_strategy() {
        let profile = SiteProfile::sap_community();
        let html = r#"
            <a class="question-title" href="/questions/9">t</a>
            <a href="/t5/x/other/qaq-p/1">q</a>
        "#;
        let hrefs = discover_hrefs(html, &profile);
        assert_eq!(hrefs, vec!["/t5/x/other/qaq-p/1".to_string()]);
    }

    #[test]
    fn test_discover_falls_back_to_title_anchors() {
        let profile = SiteProfile::sap_community();
        let html = r#"<a class="question-title" href="/questions/9">t</a><a href="/other">o</a>"#;
        assert_eq!(discover_hrefs(html, &profile), vec!["/questions/9".to_string()]);
    }

    #[test]
    fn test_discover_falls_back_to_section_links() {
        let profile = SiteProfile::sap_community();
        let html = r#"<a href="/t5/scm-q-a/bd-p/board">b</a><a href="/about">a</a>"#;
        assert_eq!(discover_hrefs(html, &profile), vec!["/t5/scm-q-a/bd-p/board".to_string()]);
    }

    #[test]
    fn test_no_links_yields_empty() {
        let profile = SiteProfile::sap_community();
        let links = thread_links("<html><body>Nothing here</body></html>", base().as_str(), &profile);
        assert!(links.is_empty());
    }

    #[test]
    fn test_skips_javascript_and_anchor_hrefs() {
        let profile = SiteProfile::sap_community();
        let hrefs = vec!["#top".to_string(), "javascript:void(0)".to_string()];
        assert!(filter_thread_links(&hrefs, &base(), &profile).is_empty());
    }
}
