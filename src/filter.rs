use crate::data_types::Measurement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which categories are visible.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "categories")]
pub enum CategoryFilter {
    #[default]
    All,
    None,
    Subset(BTreeSet<String>),
}

impl CategoryFilter {
    pub fn subset<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Subset(categories.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Subset(set) => set.contains(category),
        }
    }

    /// Flips one category, as a checkbox would. Toggling from `All` needs to
    /// know the full category list to produce the complementary subset.
    pub fn toggle(&mut self, category: &str, known: &[String]) {
        let mut set: BTreeSet<String> = match std::mem::take(self) {
            Self::All => known.iter().cloned().collect(),
            Self::None => BTreeSet::new(),
            Self::Subset(set) => set,
        };
        if !set.remove(category) {
            set.insert(category.to_string());
        }
        *self = if set.is_empty() {
            Self::None
        } else if known.iter().all(|k| set.contains(k)) && set.len() == known.len() {
            Self::All
        } else {
            Self::Subset(set)
        };
    }
}

/// Category filter plus an optional trailing time window.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotFilter {
    pub categories: CategoryFilter,
    /// Keep only points at or after `latest - window_ms`.
    pub window_ms: Option<i64>,
}

impl SnapshotFilter {
    pub fn is_pass_through(&self) -> bool {
        self.categories == CategoryFilter::All && self.window_ms.is_none()
    }

    /// Applies the filter to a chronologically sorted slice. Order is kept.
    pub fn apply(&self, points: &[Measurement]) -> Vec<Measurement> {
        if matches!(self.categories, CategoryFilter::None) {
            return Vec::new();
        }
        let windowed = match (self.window_ms, points.last()) {
            (Some(w), Some(last)) => {
                let cutoff = last.timestamp.saturating_sub(w);
                let start = points.partition_point(|m| m.timestamp < cutoff);
                &points[start..]
            }
            _ => points,
        };
        windowed
            .iter()
            .filter(|m| self.categories.allows(&m.category))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_walks_through_all_states() {
        let known = vec!["a".to_string(), "b".to_string()];
        let mut f = CategoryFilter::All;
        f.toggle("a", &known);
        assert_eq!(f, CategoryFilter::subset(["b"]));
        f.toggle("b", &known);
        assert_eq!(f, CategoryFilter::None);
        f.toggle("a", &known);
        f.toggle("b", &known);
        assert_eq!(f, CategoryFilter::All);
    }
}
