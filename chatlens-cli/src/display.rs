//! Console rendering of an analysis report

use chatlens_core::config::TaxonomyConfig;
use chatlens_core::export::Page;
use chatlens_core::{CategoryCounts, KeywordEntry};

const BAR_WIDTH: usize = 30;
const PREVIEW_CHARS: usize = 40;

pub fn keyword_lines(entries: &[KeywordEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["   No matching data".to_string()];
    }
    let mut lines = vec![format!("   {:>3}  {:>6}  {:>6}  keyword", "#", "count", "%")];
    lines.extend(entries.iter().enumerate().map(|(i, entry)| {
        format!(
            "   {:>3}  {:>6}  {:>6.1}  {}",
            i + 1,
            entry.count,
            entry.percentage,
            entry.keyword
        )
    }));
    lines
}

/// One line per present category with a proportional bar
pub fn category_lines(counts: &CategoryCounts, taxonomy: &TaxonomyConfig) -> Vec<String> {
    if counts.is_empty() {
        return vec!["   No matching data".to_string()];
    }
    let total = counts.total().max(1);
    counts
        .iter()
        .map(|(category, count)| {
            let filled = count * BAR_WIDTH / total;
            format!(
                "   {:>5}  {:<30}  {}",
                count,
                "█".repeat(filled.max(1)),
                taxonomy.label(category)
            )
        })
        .collect()
}

pub fn page_lines(page: &Page<'_>, taxonomy: &TaxonomyConfig, page_size: usize) -> Vec<String> {
    let mut lines: Vec<String> = page
        .records
        .iter()
        .map(|record| {
            let label = record.category.map(|c| taxonomy.label(c)).unwrap_or("-");
            format!(
                "   {}  {:<10}  [{}] {}",
                record.message.timestamp.format("%Y-%m-%d %H:%M"),
                record.message.user_id,
                label,
                preview(&record.message.text)
            )
        })
        .collect();

    let first = if page.total_records == 0 {
        0
    } else {
        (page.number - 1) * page_size + 1
    };
    let last = first.saturating_sub(1) + page.records.len();
    lines.push(format!(
        "   Page {} / {} (showing {}-{} of {})",
        page.number, page.total_pages, first, last, page.total_records
    ));
    lines
}

fn preview(text: &str) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() > PREVIEW_CHARS {
        let head: String = single_line.chars().take(PREVIEW_CHARS).collect();
        format!("{head}…")
    } else {
        single_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlens_core::export::paginate;
    use chatlens_core::{AnnotatedMessage, Category, Message};
    use chrono::NaiveDate;

    fn records(n: u32) -> Vec<AnnotatedMessage> {
        (0..n)
            .map(|i| {
                let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
                    .unwrap()
                    .and_hms_opt(9, i, 0)
                    .unwrap();
                AnnotatedMessage::with_category(Message::new(ts, "u1", "ログインできない"), Category::ErrorTrouble)
            })
            .collect()
    }

    #[test]
    fn test_empty_sections_say_no_data() {
        assert_eq!(keyword_lines(&[]), vec!["   No matching data"]);
        assert_eq!(
            category_lines(&CategoryCounts::new(), &TaxonomyConfig::default()),
            vec!["   No matching data"]
        );
    }

    #[test]
    fn test_page_footer_range() {
        let records = records(25);
        let page = paginate(&records, 2, 20);
        let lines = page_lines(&page, &TaxonomyConfig::default(), 20);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines.last().unwrap(), "   Page 2 / 2 (showing 21-25 of 25)");
        assert!(lines[0].contains("[エラー/トラブル]"));
    }

    #[test]
    fn test_empty_page_footer() {
        let page = paginate(&[], 1, 20);
        let lines = page_lines(&page, &TaxonomyConfig::default(), 20);
        assert_eq!(lines, vec!["   Page 1 / 1 (showing 0-0 of 0)"]);
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "あ".repeat(50);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 1);
        assert_eq!(preview("a\nb"), "a b");
    }
}
