use tracing::debug;

use crate::config::RequestContext;
use crate::models::{MetricCard, MetricSample, MetricValue};
use crate::normalize::{round_half_up, to_fixed};
use crate::tables::format_number;

pub const WINDOW_DAYS: usize = 7;
pub const RESOLVED_FLOOR: f64 = 80.0;
pub const SENTIMENT_FLOOR: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Stable,
}

impl Direction {
    pub fn between(today: f64, yesterday: f64) -> Self {
        if today > yesterday {
            Direction::Up
        } else if today < yesterday {
            Direction::Down
        } else {
            Direction::Stable
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Warning,
    Error,
    Neutral,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Warning => "warning",
            Status::Error => "error",
            Status::Neutral => "neutral",
        }
    }
}

/// How a metric's movement maps onto a card status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Polarity {
    RisingIsBad { bad: Status },
    AtLeast(f64),
}

impl Polarity {
    pub fn status(self, today: f64, yesterday: f64) -> Status {
        match self {
            Polarity::RisingIsBad { bad } => {
                if today > yesterday {
                    bad
                } else {
                    Status::Success
                }
            }
            Polarity::AtLeast(floor) => {
                if today >= floor {
                    Status::Success
                } else {
                    Status::Warning
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    TotalTickets,
    ResolvedPercent,
    CriticalLoad,
    AvgSentiment,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::TotalTickets,
        Metric::ResolvedPercent,
        Metric::CriticalLoad,
        Metric::AvgSentiment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::TotalTickets => "Total Tickets",
            Metric::ResolvedPercent => "Resolved %",
            Metric::CriticalLoad => "Critical Load",
            Metric::AvgSentiment => "Avg Sentiment",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Metric::TotalTickets => "#135bec",
            Metric::ResolvedPercent => "#10b981",
            Metric::CriticalLoad => "#ef4444",
            Metric::AvgSentiment => "#f59e0b",
        }
    }

    pub fn polarity(self) -> Polarity {
        match self {
            Metric::TotalTickets => Polarity::RisingIsBad {
                bad: Status::Warning,
            },
            Metric::ResolvedPercent => Polarity::AtLeast(RESOLVED_FLOOR),
            Metric::CriticalLoad => Polarity::RisingIsBad { bad: Status::Error },
            Metric::AvgSentiment => Polarity::AtLeast(SENTIMENT_FLOOR),
        }
    }

    pub fn value(self, sample: &MetricSample) -> f64 {
        match self {
            Metric::TotalTickets => sample.total_tickets as f64,
            Metric::ResolvedPercent => resolved_percent(sample),
            Metric::CriticalLoad => sample.critical_count as f64,
            Metric::AvgSentiment => sample.avg_sentiment,
        }
    }

    fn render(self, value: f64) -> String {
        match self {
            Metric::AvgSentiment => to_fixed(value, 1),
            _ => format_number(value),
        }
    }

    fn card(
        self,
        window: &[MetricSample],
        today: &MetricSample,
        yesterday: &MetricSample,
    ) -> MetricCard {
        let current = self.value(today);
        let previous = self.value(yesterday);

        let (value, trend) = match self {
            Metric::TotalTickets | Metric::CriticalLoad => (
                MetricValue::Count(current as i64),
                signed(current - previous),
            ),
            Metric::ResolvedPercent => {
                let delta = current - previous;
                let sign = if delta > 0.0 { "+" } else { "" };
                (
                    MetricValue::Text(format!("{}%", format_number(current))),
                    format!("{sign}{}%", to_fixed(delta, 1)),
                )
            }
            Metric::AvgSentiment => {
                let shown_today = round_half_up(current * 10.0) / 10.0;
                let shown_yesterday = round_half_up(previous * 10.0) / 10.0;
                let delta = round_half_up((shown_today - shown_yesterday) * 10.0) / 10.0;
                (MetricValue::Text(to_fixed(current, 1)), signed(delta))
            }
        };

        MetricCard {
            label: self.label().to_string(),
            value,
            trend,
            trend_direction: Direction::between(current, previous).as_str().to_string(),
            status: self.polarity().status(current, previous).as_str().to_string(),
            sparkline_data: self.sparkline(window),
            sparkline_color: self.color().to_string(),
        }
    }

    pub fn sparkline(self, window: &[MetricSample]) -> String {
        window
            .iter()
            .map(|sample| self.render(self.value(sample)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub fn resolved_percent(sample: &MetricSample) -> f64 {
    if sample.total_tickets > 0 {
        round_half_up(sample.resolved_count as f64 / sample.total_tickets as f64 * 100.0)
    } else {
        0.0
    }
}

pub fn signed(delta: f64) -> String {
    if delta > 0.0 {
        format!("+{}", format_number(delta))
    } else {
        format_number(delta)
    }
}

/// Up to [`WINDOW_DAYS`] most recent samples, ascending by date, none after today.
pub fn rolling_window(samples: &[MetricSample], ctx: &RequestContext) -> Vec<MetricSample> {
    let today = ctx.today();
    let mut window: Vec<MetricSample> = samples
        .iter()
        .filter(|sample| sample.date.map_or(true, |date| date <= today))
        .cloned()
        .collect();
    window.sort_by_key(|sample| sample.date);
    let start = window.len().saturating_sub(WINDOW_DAYS);
    window.split_off(start)
}

pub fn metric_cards(samples: &[MetricSample], ctx: &RequestContext) -> Vec<MetricCard> {
    let window = rolling_window(samples, ctx);
    let Some(today) = window.last() else {
        debug!("no metric history, using default cards");
        return default_cards();
    };
    let yesterday = window
        .len()
        .checked_sub(2)
        .map_or(today, |index| &window[index]);

    debug!(samples = samples.len(), window = window.len(), "metric window selected");
    Metric::ALL
        .into_iter()
        .map(|metric| metric.card(&window, today, yesterday))
        .collect()
}

/// Neutral cards served when there is no history to compare.
pub fn default_cards() -> Vec<MetricCard> {
    let card = |metric: Metric, value: MetricValue, trend: &str, sparkline: &str| MetricCard {
        label: metric.label().to_string(),
        value,
        trend: trend.to_string(),
        trend_direction: Direction::Stable.as_str().to_string(),
        status: Status::Neutral.as_str().to_string(),
        sparkline_data: sparkline.to_string(),
        sparkline_color: metric.color().to_string(),
    };

    vec![
        card(Metric::TotalTickets, MetricValue::Count(0), "0", "0"),
        card(
            Metric::ResolvedPercent,
            MetricValue::Text("0%".to_string()),
            "0%",
            "0",
        ),
        card(Metric::CriticalLoad, MetricValue::Count(0), "0", "0"),
        card(
            Metric::AvgSentiment,
            MetricValue::Text("5.0".to_string()),
            "0",
            "5",
        ),
    ]
}
