//! Run mode selection. A run started before noon Beijing time is the
//! morning "full" edition, anything later is the evening "lite" edition.

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use common::Limits;

/// UTC+8, Asia/Shanghai has no daylight saving time.
const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Article bodies are scraped and summarized by the AI service
    Full,
    /// Titles and links only, no scraping and no AI call
    Lite,
}

impl Mode {
    pub fn at(instant: DateTime<Utc>) -> Self {
        if beijing_time(instant).hour() < 12 {
            Mode::Full
        } else {
            Mode::Lite
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Full => "早报",
            Mode::Lite => "晚报",
        }
    }

    pub fn max_per_source(self, limits: &Limits) -> usize {
        match self {
            Mode::Full => limits.max_per_source_full,
            Mode::Lite => limits.max_per_source_lite,
        }
    }

    pub fn fetches_bodies(self) -> bool {
        matches!(self, Mode::Full)
    }
}

/// Calendar date of the report (`YYYY-MM-DD`, Beijing time).
pub fn report_date(instant: DateTime<Utc>) -> String {
    beijing_time(instant).format("%Y-%m-%d").to_string()
}

fn beijing_time(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    // east_opt only rejects offsets of a day or more
    let offset = FixedOffset::east_opt(BEIJING_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    instant.with_timezone(&offset)
}
