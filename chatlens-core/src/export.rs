//! CSV/JSON export and pagination of annotated records

use crate::config::TaxonomyConfig;
use crate::types::{AnalysisReport, AnnotatedMessage, Category};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::io::Write;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write records as CSV with a UTF-8 BOM so spreadsheet tools detect the
/// encoding. The category column holds the taxonomy label, empty when a
/// record is unclassified.
pub fn write_records_csv<W: Write>(
    mut writer: W,
    records: &[AnnotatedMessage],
    taxonomy: &TaxonomyConfig,
) -> Result<()> {
    writer.write_all(UTF8_BOM)?;
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["timestamp", "user_id", "message", "category"])?;

    for record in records {
        let timestamp = record.message.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let label = record.category.map(|c| taxonomy.label(c)).unwrap_or("");
        csv_writer.write_record([
            timestamp.as_str(),
            record.message.user_id.as_str(),
            record.message.text.as_str(),
            label,
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn save_records_csv(
    path: impl AsRef<Path>,
    records: &[AnnotatedMessage],
    taxonomy: &TaxonomyConfig,
) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_records_csv(std::io::BufWriter::new(file), records, taxonomy)
}

/// `chat_analysis_YYYYMMDD.csv`
pub fn default_export_name(date: NaiveDate) -> String {
    format!("chat_analysis_{}.csv", date.format("%Y%m%d"))
}

pub fn save_report_json(report: &AnalysisReport, path: impl AsRef<Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| anyhow!("Failed to serialize report: {}", e))?;
    std::fs::write(path.as_ref(), json)
        .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
    Ok(())
}

/// Records for the listing view: optionally one category only, newest
/// first. Records sharing a timestamp keep their batch order.
pub fn listing(records: &[AnnotatedMessage], category: Option<Category>) -> Vec<AnnotatedMessage> {
    let mut selected: Vec<AnnotatedMessage> = records
        .iter()
        .filter(|r| category.is_none() || r.category == category)
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.message.timestamp.cmp(&a.message.timestamp));
    selected
}

/// One page of records for listing
#[derive(Debug)]
pub struct Page<'a> {
    /// 1-based, clamped into `1..=total_pages`
    pub number: usize,
    pub total_pages: usize,
    pub total_records: usize,
    pub records: &'a [AnnotatedMessage],
}

pub fn paginate(records: &[AnnotatedMessage], page: usize, page_size: usize) -> Page<'_> {
    let page_size = page_size.max(1);
    let total_pages = records.len().div_ceil(page_size).max(1);
    let number = page.clamp(1, total_pages);

    let start = ((number - 1) * page_size).min(records.len());
    let end = (start + page_size).min(records.len());

    Page {
        number,
        total_pages,
        total_records: records.len(),
        records: &records[start..end],
    }
}
