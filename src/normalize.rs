use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::PipelineError;
use crate::models::{
    DailyBrief, FaqRecord, KbArticleRecord, MetricSample, QualitySignalEvent, RiskRow,
    SentimentRecord, TicketRecord, TrendRecord, TrendState,
};
use crate::tables::{self, Cell, TableReader, FIRST_DATA_ROW};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

pub fn parse_bool(cell: &Cell) -> bool {
    match cell {
        Cell::Bool(flag) => *flag,
        Cell::Text(text) => text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub fn parse_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Cell::Number(number) => number.is_finite().then_some(*number),
        Cell::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
        }
    }
}

/// Naive timestamps are read in `offset`; numeric cells are epoch milliseconds.
pub fn parse_datetime(cell: &Cell, offset: FixedOffset) -> Option<DateTime<Utc>> {
    match cell {
        Cell::Number(millis) if millis.is_finite() => {
            DateTime::<Utc>::from_timestamp_millis(*millis as i64)
        }
        Cell::Text(text) => parse_datetime_text(text.trim(), offset),
        _ => None,
    }
}

fn parse_datetime_text(text: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Fixed-point text with halves rounded up, so `2.25` renders as `2.3`.
pub fn to_fixed(value: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let rounded = round_half_up(value * scale) / scale;
    format!("{rounded:.decimals$}")
}

pub fn format_date(value: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    value
        .map(|instant| instant.with_timezone(&offset).format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn format_local_date(value: Option<NaiveDate>) -> String {
    value
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn format_time(value: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    value
        .map(|instant| instant.with_timezone(&offset).format("%I:%M %p").to_string())
        .unwrap_or_else(|| "08:00 AM".to_string())
}

pub struct Row<'a> {
    cells: &'a [Cell],
    offset: FixedOffset,
}

impl<'a> Row<'a> {
    pub fn new(cells: &'a [Cell], offset: FixedOffset) -> Self {
        Self { cells, offset }
    }

    pub fn cell(&self, index: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.cells.get(index).unwrap_or(&EMPTY)
    }

    pub fn is_blank(&self, index: usize) -> bool {
        self.cell(index).is_empty()
    }

    pub fn text(&self, index: usize) -> String {
        self.cell(index).to_string()
    }

    pub fn flag(&self, index: usize) -> bool {
        parse_bool(self.cell(index))
    }

    pub fn number(&self, index: usize) -> Option<f64> {
        parse_number(self.cell(index))
    }

    /// Numeric cell value, zero when empty or malformed.
    pub fn amount(&self, index: usize) -> f64 {
        self.number(index).unwrap_or(0.0)
    }

    pub fn count(&self, index: usize) -> i64 {
        self.amount(index).round() as i64
    }

    pub fn datetime(&self, index: usize) -> Option<DateTime<Utc>> {
        parse_datetime(self.cell(index), self.offset)
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.datetime(index)
            .map(|instant| instant.with_timezone(&self.offset).date_naive())
    }

    pub fn list(&self, index: usize) -> Vec<String> {
        split_list(&self.text(index))
    }
}

pub trait FromRow: Sized {
    const TABLE: &'static str;
    const COLUMNS: usize;

    fn from_row(row: &Row<'_>) -> Self;
}

/// Reads every data row of `T::TABLE`, dropping rows whose key column is empty.
pub fn load<T: FromRow>(
    reader: &dyn TableReader,
    offset: FixedOffset,
) -> Result<Vec<T>, PipelineError> {
    let rows = reader.read_rows(T::TABLE, FIRST_DATA_ROW, T::COLUMNS)?;
    Ok(rows
        .iter()
        .map(|cells| Row::new(cells, offset))
        .filter(|row| !row.is_blank(0))
        .map(|row| T::from_row(&row))
        .collect())
}

/// The brief table carries a single row; a header-only table yields defaults.
pub fn load_brief(
    reader: &dyn TableReader,
    offset: FixedOffset,
) -> Result<DailyBrief, PipelineError> {
    let rows = reader.read_rows(tables::DAILY_BRIEF, FIRST_DATA_ROW, 5)?;
    let Some(cells) = rows.first() else {
        return Ok(DailyBrief::default());
    };
    let row = Row::new(cells, offset);
    Ok(DailyBrief {
        text: row.text(0),
        win: row.text(1),
        risk: row.text(2),
        action: row.text(3),
        generated_at: row.datetime(4),
    })
}

impl FromRow for TicketRecord {
    const TABLE: &'static str = tables::TICKETS;
    const COLUMNS: usize = 7;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            id: row.text(0),
            summary: row.text(1),
            panel: row.text(2),
            resolved: row.flag(3),
            knowledge_found: row.flag(4),
            opened_at: row.datetime(5),
        }
    }
}

impl FromRow for SentimentRecord {
    const TABLE: &'static str = tables::SENTIMENT;
    const COLUMNS: usize = 7;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            ticket_id: row.text(0),
            score: row.amount(1),
            keywords: row.list(2),
            revenue_risk: row.flag(3),
            sla_risk: row.flag(4),
            reputation_risk: row.flag(5),
            ai_reasoning: row.text(6),
        }
    }
}

impl FromRow for RiskRow {
    const TABLE: &'static str = tables::RISK_SCORES;
    const COLUMNS: usize = 4;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            panel_name: row.text(0),
            score: row.amount(1),
            score_24h_ago: row.amount(2),
        }
    }
}

impl FromRow for MetricSample {
    const TABLE: &'static str = tables::DAILY_METRICS;
    const COLUMNS: usize = 5;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            date: row.date(0),
            total_tickets: row.count(1),
            resolved_count: row.count(2),
            critical_count: row.count(3),
            avg_sentiment: row.amount(4),
        }
    }
}

impl FromRow for QualitySignalEvent {
    const TABLE: &'static str = tables::QUALITY_SIGNALS;
    const COLUMNS: usize = 7;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            id: row.text(0),
            signal_type: row.text(1),
            redundant_reply_count: row.count(2),
            description: row.text(3),
            sentiment_before: row.amount(4),
            sentiment_after: row.amount(5),
            before_text: row.text(4),
            after_text: row.text(5),
            flagged_date: row.date(6),
        }
    }
}

impl FromRow for TrendRecord {
    const TABLE: &'static str = tables::TRENDS;
    const COLUMNS: usize = 11;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            id: row.text(0),
            title: row.text(1),
            state: TrendState::from(row.text(2).as_str()),
            ticket_count: row.amount(3),
            ticket_ids: row.list(4),
            root_cause: row.text(5),
            confidence: row.amount(6),
            needs_escalation: row.flag(7),
            growth_percentage: row.amount(8),
            first_seen: row.datetime(9),
            last_seen: row.datetime(10),
        }
    }
}

impl FromRow for KbArticleRecord {
    const TABLE: &'static str = tables::KB_ARTICLES;
    const COLUMNS: usize = 10;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            kb_id: row.text(0),
            title: row.text(1),
            problem_statement: row.text(2),
            resolution_steps: row.text(3),
            keywords: row.list(4),
            frequency: row.amount(6),
            panels_affected: row.list(7),
            priority_score: row.amount(8),
            priority_level: row.text(9),
        }
    }
}

impl FromRow for FaqRecord {
    const TABLE: &'static str = tables::KB_FAQS;
    const COLUMNS: usize = 5;

    fn from_row(row: &Row<'_>) -> Self {
        Self {
            question: row.text(1),
            answer: row.text(2),
            panel: row.text(3),
            keywords: row.list(4),
        }
    }
}
