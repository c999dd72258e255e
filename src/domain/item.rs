use crate::domain::Fingerprint;

/// A candidate notification produced by one poll of a source.
///
/// Items are never stored; only their [`Fingerprint`] reaches the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub source_tag: String,
    pub title: String,
    pub link: String,
    pub description: String,
    /// Source-qualified natural key the fingerprint is derived from.
    pub identity_seed: String,
}

impl Item {
    pub fn new(source_tag: &str, identity_seed: String) -> Self {
        Self {
            source_tag: source_tag.to_string(),
            title: String::new(),
            link: String::new(),
            description: String::new(),
            identity_seed,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.identity_seed)
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}
