//! Query-string filters over the saved test-case library.

use crate::entity::{Priority, Status, TestCase};

/// Parsed search filter from a query string.
///
/// Filters can be specified in the query string using prefixes:
/// - `status:draft` - Filter by status
/// - `priority:high` - Filter by priority
/// - `tag:regression` - Filter by tag (can specify multiple)
///
/// Everything else is free text matched against title and description.
#[derive(Debug, Default, Clone)]
pub struct SearchFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    /// Case must carry all of these tags.
    pub tags: Vec<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none() && self.tags.is_empty()
    }
}

/// Parse a raw query string into (remaining free text, filters).
/// Unparseable filter values are kept as free text.
pub fn parse_query(raw: &str) -> (String, SearchFilter) {
    let mut filter = SearchFilter::default();
    let mut remaining = Vec::new();

    for token in raw.split_whitespace() {
        if let Some(value) = token.strip_prefix("status:") {
            match value.parse::<Status>() {
                Ok(status) => filter.status = Some(status),
                Err(_) => remaining.push(token),
            }
        } else if let Some(value) = token.strip_prefix("priority:") {
            match value.parse::<Priority>() {
                Ok(priority) => filter.priority = Some(priority),
                Err(_) => remaining.push(token),
            }
        } else if let Some(value) = token.strip_prefix("tag:") {
            filter.tags.push(value.to_string());
        } else {
            remaining.push(token);
        }
    }

    (remaining.join(" "), filter)
}

/// Apply a parsed query to one case.
pub fn matches(case: &TestCase, text: &str, filter: &SearchFilter) -> bool {
    if let Some(status) = filter.status {
        if case.status != status {
            return false;
        }
    }
    if let Some(priority) = filter.priority {
        if case.priority != priority {
            return false;
        }
    }
    for tag in &filter.tags {
        if !case.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return false;
        }
    }

    if text.is_empty() {
        return true;
    }
    let needle = text.to_lowercase();
    case.title.to_lowercase().contains(&needle)
        || case.description.to_lowercase().contains(&needle)
}

/// Search the library with a raw query string.
pub fn search<'a>(cases: &'a [TestCase], raw: &str) -> Vec<&'a TestCase> {
    let (text, filter) = parse_query(raw);
    cases
        .iter()
        .filter(|c| matches(c, &text, &filter))
        .collect()
}
