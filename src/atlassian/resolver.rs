//! Extracts canonical page ids and issue keys from Confluence and Jira URLs.
//!
//! Patterns are tried in a fixed order and the first structural match wins:
//!
//! 1. `/wiki/spaces/{SPACE}/pages/{id}[/{title}]`
//! 2. `/wiki/display/{SPACE}/{title}?pageId={id}`
//! 3. `/wiki/pages/viewpage.action?pageId={id}`
//! 4. `/browse/{KEY}`
//! 5. `/jira/software[/c]/projects/{PROJECT}/boards/{n}?selectedIssue={KEY}`
//!
//! Path segments are matched case-sensitively. Nothing here touches the network.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static ISSUE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*-[0-9]+$").expect("valid issue key regex"));

/// A resource identified by a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    ConfluencePage { page_id: String },
    JiraIssue { issue_key: String },
}

type Matcher = fn(&[&str], &Url) -> Option<ResourceRef>;

const MATCHERS: [Matcher; 5] = [
    match_spaces_page,
    match_display_page,
    match_viewpage_action,
    match_browse,
    match_board_selected_issue,
];

/// Resolve a Confluence or Jira URL to its canonical identifier.
///
/// Returns `None` when the URL cannot be parsed, is not http(s), or matches
/// none of the known shapes.
pub fn resolve(raw: &str) -> Option<ResourceRef> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();

    MATCHERS.iter().find_map(|matcher| matcher(&segments, &url))
}

/// Page id of a Confluence URL, or `None` for anything else.
pub fn confluence_page_id(raw: &str) -> Option<String> {
    match resolve(raw)? {
        ResourceRef::ConfluencePage { page_id } => Some(page_id),
        ResourceRef::JiraIssue { .. } => None,
    }
}

/// Issue key of a Jira URL, or `None` for anything else.
pub fn jira_issue_key(raw: &str) -> Option<String> {
    match resolve(raw)? {
        ResourceRef::JiraIssue { issue_key } => Some(issue_key),
        ResourceRef::ConfluencePage { .. } => None,
    }
}

pub fn is_issue_key(candidate: &str) -> bool {
    ISSUE_KEY.is_match(candidate)
}

pub fn is_page_id(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit())
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn page_ref(page_id: String) -> Option<ResourceRef> {
    is_page_id(&page_id).then_some(ResourceRef::ConfluencePage { page_id })
}

fn issue_ref(issue_key: String) -> Option<ResourceRef> {
    is_issue_key(&issue_key).then_some(ResourceRef::JiraIssue { issue_key })
}

fn match_spaces_page(segments: &[&str], _url: &Url) -> Option<ResourceRef> {
    match segments {
        ["wiki", "spaces", _space, "pages", id, ..] => page_ref(id.to_string()),
        _ => None,
    }
}

fn match_display_page(segments: &[&str], url: &Url) -> Option<ResourceRef> {
    match segments {
        ["wiki", "display", _space, ..] => page_ref(query_param(url, "pageId")?),
        _ => None,
    }
}

fn match_viewpage_action(segments: &[&str], url: &Url) -> Option<ResourceRef> {
    match segments {
        ["wiki", "pages", "viewpage.action"] => page_ref(query_param(url, "pageId")?),
        _ => None,
    }
}

fn match_browse(segments: &[&str], _url: &Url) -> Option<ResourceRef> {
    match segments {
        ["browse", key] => issue_ref(key.to_string()),
        _ => None,
    }
}

fn match_board_selected_issue(segments: &[&str], url: &Url) -> Option<ResourceRef> {
    let rest = match segments {
        ["jira", "software", "projects", rest @ ..] => rest,
        ["jira", "software", "c", "projects", rest @ ..] => rest,
        _ => return None,
    };
    match rest {
        [_project, "boards", _board, ..] => issue_ref(query_param(url, "selectedIssue")?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str) -> Option<ResourceRef> {
        Some(ResourceRef::ConfluencePage { page_id: id.into() })
    }

    fn issue(key: &str) -> Option<ResourceRef> {
        Some(ResourceRef::JiraIssue { issue_key: key.into() })
    }

    #[test]
    fn test_confluence_shapes_agree() {
        let urls = [
            "https://acme.atlassian.net/wiki/spaces/ENG/pages/123456/Design+Doc",
            "https://acme.atlassian.net/wiki/display/ENG/Design+Doc?pageId=123456",
            "https://acme.atlassian.net/wiki/pages/viewpage.action?pageId=123456",
        ];
        for url in urls {
            assert_eq!(resolve(url), page("123456"), "{}", url);
        }
    }

    #[test]
    fn test_spaces_page_without_slug() {
        assert_eq!(
            resolve("https://acme.atlassian.net/wiki/spaces/ENG/pages/987"),
            page("987")
        );
        assert_eq!(
            resolve("https://acme.atlassian.net/wiki/spaces/ENG/pages/987/"),
            page("987")
        );
    }

    #[test]
    fn test_jira_shapes_agree() {
        let urls = [
            "https://acme.atlassian.net/browse/PROJ-42",
            "https://acme.atlassian.net/jira/software/projects/PROJ/boards/7?selectedIssue=PROJ-42",
            "https://acme.atlassian.net/jira/software/c/projects/PROJ/boards/7?selectedIssue=PROJ-42",
        ];
        for url in urls {
            assert_eq!(resolve(url), issue("PROJ-42"), "{}", url);
        }
    }

    #[test]
    fn test_query_params_ignore_order_and_extras() {
        assert_eq!(
            resolve("https://acme.atlassian.net/wiki/pages/viewpage.action?src=contextnavpagetreemode&pageId=55"),
            page("55")
        );
        assert_eq!(
            resolve("https://acme.atlassian.net/jira/software/projects/AB2/boards/1?quickFilter=3&selectedIssue=AB2-9"),
            issue("AB2-9")
        );
    }

    #[test]
    fn test_non_atlassian_url_not_recognized() {
        assert_eq!(resolve("https://example.com/foo"), None);
        assert_eq!(resolve("https://example.com/"), None);
        assert_eq!(resolve("not a url"), None);
        assert_eq!(resolve(""), None);
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        assert_eq!(resolve("ftp://acme.atlassian.net/browse/PROJ-1"), None);
        assert_eq!(resolve("file:///wiki/spaces/ENG/pages/1"), None);
    }

    #[test]
    fn test_path_segments_case_sensitive() {
        assert_eq!(resolve("https://acme.atlassian.net/Wiki/spaces/ENG/pages/1/x"), None);
        assert_eq!(resolve("https://acme.atlassian.net/BROWSE/PROJ-1"), None);
        assert_eq!(resolve("https://acme.atlassian.net/browse/proj-1"), None);
    }

    #[test]
    fn test_missing_or_invalid_identifiers() {
        assert_eq!(resolve("https://acme.atlassian.net/wiki/spaces/ENG/pages/abc/Title"), None);
        assert_eq!(resolve("https://acme.atlassian.net/wiki/display/ENG/Title"), None);
        assert_eq!(resolve("https://acme.atlassian.net/wiki/pages/viewpage.action?pageId="), None);
        assert_eq!(resolve("https://acme.atlassian.net/browse/PROJ"), None);
        assert_eq!(resolve("https://acme.atlassian.net/jira/software/projects/PROJ/boards/7"), None);
        assert_eq!(
            resolve("https://acme.atlassian.net/jira/software/projects/PROJ/boards/7?selectedIssue=garbage"),
            None
        );
    }

    #[test]
    fn test_pageid_only_counts_on_known_paths() {
        assert_eq!(resolve("https://example.com/somewhere?pageId=123"), None);
        assert_eq!(resolve("https://example.com/jira/issues?selectedIssue=PROJ-1"), None);
    }

    #[test]
    fn test_custom_domain_with_known_path() {
        assert_eq!(resolve("https://wiki.internal.example/browse/OPS-7"), issue("OPS-7"));
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(resolve("  https://acme.atlassian.net/browse/PROJ-42\n"), issue("PROJ-42"));
    }

    #[test]
    fn test_product_scoped_helpers() {
        let page_url = "https://acme.atlassian.net/wiki/spaces/ENG/pages/123456/Design+Doc";
        let issue_url = "https://acme.atlassian.net/browse/PROJ-42";

        assert_eq!(confluence_page_id(page_url), Some("123456".into()));
        assert_eq!(confluence_page_id(issue_url), None);
        assert_eq!(jira_issue_key(issue_url), Some("PROJ-42".into()));
        assert_eq!(jira_issue_key(page_url), None);
    }

    #[test]
    fn test_issue_key_validation() {
        assert!(is_issue_key("PROJ-42"));
        assert!(is_issue_key("A1_B-1"));
        assert!(!is_issue_key("proj-42"));
        assert!(!is_issue_key("1PROJ-42"));
        assert!(!is_issue_key("PROJ-"));
        assert!(!is_issue_key("PROJ-42x"));
    }
}
