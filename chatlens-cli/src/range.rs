use anyhow::Result;
use chatlens_core::DateRange;
use chrono::NaiveDate;

/// Date window for a run.
///
/// `all` disables filtering. Otherwise a missing end defaults to `today` and
/// a missing start to `default_days` before the end.
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    all: bool,
    default_days: i64,
    today: NaiveDate,
) -> Result<Option<DateRange>> {
    if all {
        return Ok(None);
    }
    let end = end.unwrap_or(today);
    let range = match start {
        Some(start) => DateRange::new(start, end)?,
        None => DateRange::ending_at(end, default_days),
    };
    Ok(Some(range))
}
