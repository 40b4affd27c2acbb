//! Site-specific selectors, URL patterns and markers.
//!
//! Everything the crawler knows about a forum's markup lives here. The default
//! profile targets SAP Community (Khoros/LIA markup).

use regex::Regex;

/// Selectors and patterns for one forum.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Prefix of every output file name.
    pub name_prefix: String,
    /// Topic path segments that carry no meaning (`t5`, `qa-p`, ...).
    pub boilerplate_segments: Vec<String>,

    /// List page: ordered link-discovery strategies, first non-empty wins.
    pub thread_link_selectors: Vec<String>,
    /// List page: a discovered link must match this to be a thread.
    pub thread_url_pattern: Regex,
    /// List page: substrings of links that are never threads (user profiles).
    pub excluded_link_markers: Vec<String>,
    /// List page: paths of board and category index pages, which also match
    /// `thread_url_pattern` but hold no thread.
    pub board_url_pattern: Regex,
    /// Query parameter carrying the list page index.
    pub page_param: String,

    /// Detail page: title strategies.
    pub title_selectors: Vec<String>,
    /// Suffix stripped from `<title>` when no title element matched.
    pub title_suffix: String,
    /// Detail page: question body containers.
    pub body_selectors: Vec<String>,
    /// Meta tags carrying one tag each in `content`.
    pub tag_meta_selector: String,
    /// DOM tag links, used when no tag meta is present.
    pub tag_link_selector: String,
    /// Meta tag carrying the category / product area.
    pub section_meta_selector: String,
    /// Breadcrumb link lists; the second-to-last entry is the category.
    pub breadcrumb_selectors: Vec<String>,
    /// One element per answer.
    pub answer_selector: String,
    pub answer_body_selectors: Vec<String>,
    /// An answer is accepted when its class list contains any of these.
    pub accepted_classes: Vec<String>,
    pub author_selector: String,
    pub date_selector: String,

    /// A list page whose title contains any of these was blocked.
    pub blocked_title_markers: Vec<String>,
}

impl SiteProfile {
    /// Markup of community.sap.com Q&A boards.
    #[must_use]
    pub fn sap_community() -> Self {
        Self {
            name_prefix: "sap_community".to_string(),
            boilerplate_segments: strings(&["t5", "qa-p", "ct-p"]),

            thread_link_selectors: strings(&[
                "a[href*='/qaq-p/'], a[href*='/qaa-p/'], a[href*='/qa-p/']",
                "a.question-title",
                "a[href*='/t5/']",
            ]),
            thread_url_pattern: Regex::new(r"/t5/.+/(?:qaq|qaa|qa)-p/").unwrap(),
            excluded_link_markers: strings(&["/user/viewprofilepage"]),
            board_url_pattern: Regex::new(r"^/t5/[^/]+/(?:qa|bd|ct)-p/[^/]+/?$").unwrap(),
            page_param: "page".to_string(),

            title_selectors: strings(&[
                ".lia-message-subject h1",
                ".lia-message-subject .lia-message-subject-content",
                ".lia-message-subject",
                "h1.PageTitle",
                "h1",
            ]),
            title_suffix: " | SAP Community".to_string(),
            body_selectors: strings(&[
                "#bodyDisplay",
                "div.lia-message-body",
                "div.question-body",
                "div.thread-body",
                "div.msgBody",
                "div.pure-u-1-1",
            ]),
            tag_meta_selector: r#"meta[property="article:tag"]"#.to_string(),
            tag_link_selector: "a.topic-tag, .lia-tag, .lia-tags a".to_string(),
            section_meta_selector: r#"meta[property="article:section"]"#.to_string(),
            breadcrumb_selectors: strings(&[
                ".lia-breadcrumb-navigation a",
                ".breadcrumb a",
                "nav a",
                ".lia-component-common-widget-breadcrumb a",
            ]),
            answer_selector: ".MessageView.lia-message-view-qanda-answer".to_string(),
            answer_body_selectors: strings(&[".lia-message-body", "[id^=\"bodyDisplay\"]"]),
            accepted_classes: strings(&["lia-accepted-solution", "lia-list-row-thread-solved"]),
            author_selector: ".lia-user-name-link, .lia-user-name".to_string(),
            date_selector: ".lia-message-posted-on, .DateTime".to_string(),

            blocked_title_markers: strings(&["403", "Forbidden", "Access Denied"]),
        }
    }

    /// Whether a class attribute marks an accepted answer.
    #[must_use]
    pub fn is_accepted_class(&self, class_attr: &str) -> bool {
        self.accepted_classes
            .iter()
            .any(|marker| class_attr.contains(marker.as_str()))
    }

    /// Whether a page title indicates a blocked or forbidden response.
    #[must_use]
    pub fn is_blocked_title(&self, title: &str) -> bool {
        self.blocked_title_markers
            .iter()
            .any(|marker| title.contains(marker.as_str()))
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::sap_community()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
