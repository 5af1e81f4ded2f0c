use crate::config::RequestContext;
use crate::models::{TrendCard, TrendRecord};
use crate::normalize::{format_date, round_half_up};

/// Confidence arrives as a 0-1 fraction and goes out as a whole percentage.
pub fn confidence_percent(fraction: f64) -> f64 {
    round_half_up(fraction * 100.0)
}

pub fn trend_cards(records: &[TrendRecord], ctx: &RequestContext) -> Vec<TrendCard> {
    records
        .iter()
        .map(|record| TrendCard {
            trend_id: record.id.clone(),
            title: record.title.clone(),
            state: record.state.clone(),
            ticket_count: record.ticket_count,
            ticket_ids: record.ticket_ids.clone(),
            root_cause: record.root_cause.clone(),
            confidence: confidence_percent(record.confidence),
            needs_escalation: record.needs_escalation,
            growth_percentage: record.growth_percentage,
            first_seen: format_date(record.first_seen, ctx.offset),
            last_seen: format_date(record.last_seen, ctx.offset),
        })
        .collect()
}
