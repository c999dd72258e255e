use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MAX_TITLE_CHARS: usize = 256;
pub const MAX_DESCRIPTION_CHARS: usize = 4000;

const DEFAULT_TITLE: &str = "Update";
const ELLIPSIS: &str = "...";

/// A formatted, length-bounded message ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub url: Option<String>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub footer: String,
}

impl Notification {
    pub fn new(
        title: &str,
        link: &str,
        description: &str,
        footer: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let title = if title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            title
        };

        Self {
            title: truncate(title, MAX_TITLE_CHARS),
            url: (!link.is_empty()).then(|| link.to_string()),
            description: truncate(description, MAX_DESCRIPTION_CHARS),
            timestamp,
            footer: footer.to_string(),
        }
    }
}

/// Cut `s` to at most `max` characters, ending in `...` when cut and
/// `max` leaves room for it.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max < ELLIPSIS.len() {
        return s.chars().take(max).collect();
    }
    let keep = max - ELLIPSIS.len();
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
