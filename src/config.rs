use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Reporting offset used by the source sheets.
pub const DEFAULT_UTC_OFFSET: &str = "+05:30";

pub const OFFSET_ENV: &str = "SUPPORT_INTEL_UTC_OFFSET";
pub const DATA_DIR_ENV: &str = "SUPPORT_INTEL_DATA_DIR";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Inputs every pipeline stage receives instead of reading the clock.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl RequestContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            offset: default_offset(),
        }
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.offset).date_naive()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub offset: FixedOffset,
    pub data_dir: Option<PathBuf>,
    pub database_url: Option<String>,
}

impl Settings {
    /// CLI flags win over the environment.
    pub fn load(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let offset = match std::env::var(OFFSET_ENV) {
            Ok(value) => parse_offset(&value)
                .with_context(|| format!("{OFFSET_ENV} must look like +05:30, got {value:?}"))?,
            Err(_) => default_offset(),
        };
        let data_dir = data_dir.or_else(|| std::env::var(DATA_DIR_ENV).ok().map(PathBuf::from));
        let database_url = std::env::var(DATABASE_URL_ENV).ok();

        Ok(Self {
            offset,
            data_dir,
            database_url,
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }

    pub fn request_context(&self, now: DateTime<Utc>) -> RequestContext {
        RequestContext::new(now).with_offset(self.offset)
    }
}

pub fn default_offset() -> FixedOffset {
    parse_offset(DEFAULT_UTC_OFFSET).unwrap_or_else(|| Utc.fix())
}

/// Accepts `Z`, `UTC`, `+HH:MM`, `-HH:MM` and `+HHMM`.
pub fn parse_offset(text: &str) -> Option<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
