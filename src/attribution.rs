//! Source attribution for chat answers.
//!
//! Reduces the matches returned with an answer to the distinct documents
//! they came from, in the order the backend ranked them.

use crate::models::Match;

/// Separator used when rendering a [`SourceSet`] on one line.
pub const SOURCE_SEPARATOR: &str = ", ";

/// Distinct, non-empty source identifiers in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    ids: Vec<String>,
}

impl SourceSet {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    /// Joined display string, or `None` when there is nothing to attribute.
    pub fn render(&self) -> Option<String> {
        if self.ids.is_empty() {
            None
        } else {
            Some(self.ids.join(SOURCE_SEPARATOR))
        }
    }

    fn insert(&mut self, id: &str) {
        // Result sets are top_k sized, a linear scan is fine.
        if !self.ids.iter().any(|seen| seen == id) {
            self.ids.push(id.to_string());
        }
    }
}

/// Collect the source identifiers of `matches`.
pub fn aggregate(matches: &[Match]) -> SourceSet {
    let mut set = SourceSet::default();
    for id in matches.iter().filter_map(Match::source_id) {
        set.insert(id);
    }
    set
}
