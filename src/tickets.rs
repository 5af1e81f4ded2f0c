use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::RequestContext;
use crate::models::{CriticalTicket, SentimentRecord, TicketRecord, TicketSentiment};
use crate::normalize::format_date;

pub const CRITICAL_SCORE_CEILING: f64 = 3.0;
/// Effective score for a ticket with no sentiment analysis.
pub const UNMATCHED_SCORE: f64 = 10.0;
pub const CRITICAL_FEED_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactTag {
    Revenue,
    Sla,
    Reputation,
}

impl ImpactTag {
    pub const ALL: [ImpactTag; 3] = [ImpactTag::Revenue, ImpactTag::Sla, ImpactTag::Reputation];

    pub fn label(self) -> &'static str {
        match self {
            ImpactTag::Revenue => "Revenue Risk",
            ImpactTag::Sla => "SLA Risk",
            ImpactTag::Reputation => "Reputation Risk",
        }
    }

    fn applies(self, sentiment: &SentimentRecord) -> bool {
        match self {
            ImpactTag::Revenue => sentiment.revenue_risk,
            ImpactTag::Sla => sentiment.sla_risk,
            ImpactTag::Reputation => sentiment.reputation_risk,
        }
    }
}

/// Ticket id to its sentiment analysis, built once per request.
///
/// A later row with the same ticket id replaces the earlier one; the
/// overwrite is reported but not rejected.
pub fn index_sentiment(records: &[SentimentRecord]) -> HashMap<&str, &SentimentRecord> {
    let mut index: HashMap<&str, &SentimentRecord> = HashMap::with_capacity(records.len());
    for record in records {
        if index.insert(record.ticket_id.as_str(), record).is_some() {
            warn!(ticket_id = %record.ticket_id, "duplicate sentiment row, keeping the latest");
        }
    }
    index
}

pub fn effective_score(sentiment: Option<&SentimentRecord>) -> f64 {
    match sentiment {
        Some(record) => record.score,
        None => UNMATCHED_SCORE,
    }
}

pub fn is_critical(ticket: &TicketRecord, sentiment: Option<&SentimentRecord>) -> bool {
    !ticket.resolved && effective_score(sentiment) <= CRITICAL_SCORE_CEILING
}

pub fn sentiment_label(sentiment: Option<&SentimentRecord>) -> &'static str {
    let Some(record) = sentiment else {
        return "Unknown";
    };
    if record.score <= 3.0 {
        "Highly Frustrated"
    } else if record.score <= 5.0 {
        "Frustrated"
    } else {
        "Neutral"
    }
}

pub fn impact_tags(sentiment: Option<&SentimentRecord>) -> Vec<String> {
    let Some(record) = sentiment else {
        return Vec::new();
    };
    ImpactTag::ALL
        .into_iter()
        .filter(|tag| tag.applies(record))
        .map(|tag| tag.label().to_string())
        .collect()
}

/// Whole hours elapsed since `opened_at`, floored; zero when the date is absent.
pub fn aging_hours(ticket: &TicketRecord, ctx: &RequestContext) -> i64 {
    ticket
        .opened_at
        .map(|opened| (ctx.now - opened).num_milliseconds().div_euclid(3_600_000))
        .unwrap_or(0)
}

pub fn aging_bucket(hours: i64) -> String {
    let days = hours.div_euclid(24);
    if days > 0 {
        format!("{days}d")
    } else {
        format!("{hours}h")
    }
}

pub fn aging_color(hours: i64) -> &'static str {
    if hours > 48 {
        "red"
    } else if hours > 24 {
        "amber"
    } else {
        "slate"
    }
}

/// Unresolved tickets whose effective sentiment is at or below the critical
/// ceiling, in source order, capped at [`CRITICAL_FEED_LIMIT`].
pub fn critical_tickets(
    tickets: &[TicketRecord],
    sentiment: &[SentimentRecord],
    ctx: &RequestContext,
) -> Vec<CriticalTicket> {
    let index = index_sentiment(sentiment);

    let feed: Vec<CriticalTicket> = tickets
        .iter()
        .filter_map(|ticket| {
            let matched = index.get(ticket.id.as_str()).copied();
            is_critical(ticket, matched).then(|| build_ticket(ticket, matched, ctx))
        })
        .take(CRITICAL_FEED_LIMIT)
        .collect();

    debug!(
        tickets = tickets.len(),
        sentiment = index.len(),
        critical = feed.len(),
        "critical ticket feed built"
    );
    feed
}

fn build_ticket(
    ticket: &TicketRecord,
    sentiment: Option<&SentimentRecord>,
    ctx: &RequestContext,
) -> CriticalTicket {
    let hours = aging_hours(ticket, ctx);
    CriticalTicket {
        ticket_id: ticket.id.clone(),
        summary: ticket.summary.clone(),
        panel: ticket.panel.clone(),
        resolved: false,
        ikc_found: ticket.knowledge_found,
        date: format_date(ticket.opened_at, ctx.offset),
        aging: aging_bucket(hours),
        aging_color: aging_color(hours).to_string(),
        sentiment: TicketSentiment {
            score: sentiment.map_or(0.0, |record| record.score),
            label: sentiment_label(sentiment).to_string(),
            keywords: sentiment
                .map(|record| record.keywords.clone())
                .unwrap_or_default(),
        },
        ai_reasoning: sentiment
            .map(|record| record.ai_reasoning.clone())
            .unwrap_or_default(),
        impact: impact_tags(sentiment),
    }
}
