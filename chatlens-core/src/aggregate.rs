// Category aggregation for chart display

use crate::types::{AnnotatedMessage, Category, CategoryCounts, Message};

/// Tally categorized records.
///
/// Returns an empty mapping when no record carries a category yet, i.e.
/// classification has not run for this batch. Unclassified records are
/// ignored; categories with no records are absent.
pub fn aggregate(records: &[AnnotatedMessage]) -> CategoryCounts {
    let mut counts = CategoryCounts::new();
    for category in records.iter().filter_map(|r| r.category) {
        counts.increment(category);
    }
    counts
}

pub fn count_categories(categories: &[Category]) -> CategoryCounts {
    let mut counts = CategoryCounts::new();
    for category in categories {
        counts.increment(*category);
    }
    counts
}

/// Attach categories to messages, position by position.
///
/// Extra messages (or categories) beyond the shorter side stay unclassified
/// (or are dropped).
pub fn annotate(
    messages: impl IntoIterator<Item = Message>,
    categories: &[Category],
) -> Vec<AnnotatedMessage> {
    messages
        .into_iter()
        .enumerate()
        .map(|(i, message)| AnnotatedMessage {
            message,
            category: categories.get(i).copied(),
        })
        .collect()
}
