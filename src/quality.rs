use chrono::NaiveDate;
use tracing::debug;

use crate::config::RequestContext;
use crate::models::{
    Coaching, DailyBrief, FlaggedEvent, QualityPayload, QualitySignalEvent, QualitySignals,
    SentimentRecord,
};
use crate::normalize::{format_local_date, round_half_up};

/// Mean used when no sentiment row carries a positive score.
pub const DEFAULT_MEAN_SENTIMENT: f64 = 5.0;
/// Drop between before and after scores that flags a reply.
pub const SENTIMENT_DROP_THRESHOLD: f64 = 3.0;
pub const CHURN_RISK: &str = "Churn Risk";
pub const FLAGGED_LIMIT: usize = 10;
pub const COACHING_PENDING: &str = "Analysis pending";

/// Mean of the positive sentiment scores on a 0-100 scale, rounded.
pub fn quality_score(records: &[SentimentRecord]) -> i64 {
    let scores: Vec<f64> = records
        .iter()
        .map(|record| record.score)
        .filter(|score| *score > 0.0)
        .collect();

    let mean = if scores.is_empty() {
        DEFAULT_MEAN_SENTIMENT
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    round_half_up(mean / 10.0 * 100.0) as i64
}

pub fn latest_reporting_date(events: &[QualitySignalEvent], ctx: &RequestContext) -> NaiveDate {
    events
        .iter()
        .filter_map(|event| event.flagged_date)
        .max()
        .unwrap_or_else(|| ctx.today())
}

pub fn redundant_replies(events: &[QualitySignalEvent], reporting_date: NaiveDate) -> i64 {
    events
        .iter()
        .filter(|event| event.flagged_date == Some(reporting_date))
        .map(|event| event.redundant_reply_count)
        .sum()
}

/// Churn-risk events qualify unconditionally; others need a large enough drop.
pub fn is_process_flagged(event: &QualitySignalEvent) -> bool {
    if event.signal_type == CHURN_RISK {
        return true;
    }
    event.sentiment_before - event.sentiment_after >= SENTIMENT_DROP_THRESHOLD
}

pub fn advice(event: &QualitySignalEvent) -> String {
    format!(
        "Sentiment went from {} to {} after support reply. Investigate reply quality.",
        event.before_text, event.after_text
    )
}

pub fn process_flagged(events: &[QualitySignalEvent]) -> Vec<FlaggedEvent> {
    events
        .iter()
        .filter(|event| is_process_flagged(event))
        .take(FLAGGED_LIMIT)
        .map(|event| FlaggedEvent {
            id: event.id.clone(),
            signal_type: event.signal_type.clone(),
            redundant_count: event.redundant_reply_count,
            description: event.description.clone(),
            sentiment_before: event.sentiment_before,
            sentiment_after: event.sentiment_after,
            flagged_date: format_local_date(event.flagged_date),
            advice: advice(event),
        })
        .collect()
}

fn or_pending(value: &str) -> String {
    if value.is_empty() {
        COACHING_PENDING.to_string()
    } else {
        value.to_string()
    }
}

pub fn coaching(brief: &DailyBrief) -> Coaching {
    Coaching {
        win: or_pending(&brief.win),
        risk: or_pending(&brief.risk),
        action: or_pending(&brief.action),
    }
}

pub fn quality_payload(
    sentiment: &[SentimentRecord],
    events: &[QualitySignalEvent],
    brief: &DailyBrief,
    ctx: &RequestContext,
) -> QualityPayload {
    let reporting_date = latest_reporting_date(events, ctx);
    let signals = QualitySignals {
        score: quality_score(sentiment),
        redundant_replies: redundant_replies(events, reporting_date),
        process_flagged: process_flagged(events),
    };
    debug!(
        %reporting_date,
        events = events.len(),
        flagged = signals.process_flagged.len(),
        "quality signals computed"
    );

    QualityPayload {
        quality_signals: signals,
        coaching: coaching(brief),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{FromRow, Row};
    use crate::tables::Cell;
    use chrono::{TimeZone, Utc};

    fn ctx() -> RequestContext {
        RequestContext::new(Utc.with_ymd_and_hms(2026, 3, 10, 6, 0, 0).unwrap())
    }

    fn scored(score: f64) -> SentimentRecord {
        SentimentRecord {
            ticket_id: "T1".to_string(),
            score,
            keywords: Vec::new(),
            revenue_risk: false,
            sla_risk: false,
            reputation_risk: false,
            ai_reasoning: String::new(),
        }
    }

    fn event(day: Option<u32>, kind: &str, count: i64, before: f64, after: f64) -> QualitySignalEvent {
        QualitySignalEvent {
            id: format!("Q{count}"),
            signal_type: kind.to_string(),
            redundant_reply_count: count,
            description: "customer repeated the question".to_string(),
            sentiment_before: before,
            sentiment_after: after,
            before_text: before.to_string(),
            after_text: after.to_string(),
            flagged_date: day.and_then(|day| NaiveDate::from_ymd_opt(2026, 3, day)),
        }
    }

    #[test]
    fn score_is_mean_of_positive_scores() {
        let records: Vec<SentimentRecord> =
            [2.0, 4.0, 6.0, 8.0].into_iter().map(scored).collect();
        assert_eq!(quality_score(&records), 50);

        let with_noise = vec![scored(9.0), scored(0.0), scored(-3.0)];
        assert_eq!(quality_score(&with_noise), 90);
    }

    #[test]
    fn score_defaults_to_midpoint() {
        assert_eq!(quality_score(&[]), 50);
        assert_eq!(quality_score(&[scored(0.0)]), 50);
    }

    #[test]
    fn redundant_replies_only_count_latest_day() {
        let events = vec![
            event(Some(1), "Redundant Reply", 5, 6.0, 6.0),
            event(Some(2), "Redundant Reply", 3, 6.0, 6.0),
            event(None, "Redundant Reply", 7, 6.0, 6.0),
        ];
        let latest = latest_reporting_date(&events, &ctx());
        assert_eq!(latest, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(redundant_replies(&events, latest), 3);
    }

    #[test]
    fn undated_events_fall_back_to_today() {
        let events = vec![event(None, "Redundant Reply", 4, 6.0, 6.0)];
        let latest = latest_reporting_date(&events, &ctx());
        assert_eq!(latest, ctx().today());
        assert_eq!(redundant_replies(&events, latest), 0);
    }

    #[test]
    fn flags_large_drops_and_churn_risk() {
        let events = vec![
            event(Some(1), "Tone", 0, 8.0, 5.0),
            event(Some(1), "Tone", 1, 8.0, 6.0),
            event(Some(1), CHURN_RISK, 2, 4.0, 9.0),
        ];
        let flagged = process_flagged(&events);
        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0].id, "Q0");
        assert_eq!(flagged[1].signal_type, CHURN_RISK);
        assert_eq!(flagged[0].flagged_date, "2026-03-01");
        assert_eq!(
            flagged[0].advice,
            "Sentiment went from 8 to 5 after support reply. Investigate reply quality."
        );
    }

    #[test]
    fn blank_after_score_counts_as_zero() {
        let cells: Vec<Cell> = ["Q1", "Tone", "1", "d", "8", "", "2026-03-09"]
            .into_iter()
            .map(Cell::from)
            .collect();
        let event = QualitySignalEvent::from_row(&Row::new(&cells, ctx().offset));
        assert_eq!(event.sentiment_after, 0.0);
        assert!(is_process_flagged(&event));

        let flagged = process_flagged(&[event]);
        assert_eq!(flagged[0].sentiment_before, 8.0);
        assert_eq!(flagged[0].sentiment_after, 0.0);
        assert_eq!(
            flagged[0].advice,
            "Sentiment went from 8 to  after support reply. Investigate reply quality."
        );
    }

    #[test]
    fn flagged_list_is_capped() {
        let events: Vec<QualitySignalEvent> = (0..12)
            .map(|n| event(Some(1), CHURN_RISK, n, 5.0, 5.0))
            .collect();
        let flagged = process_flagged(&events);
        assert_eq!(flagged.len(), FLAGGED_LIMIT);
        assert_eq!(flagged[9].redundant_count, 9);
    }

    #[test]
    fn coaching_defaults_to_pending() {
        let brief = DailyBrief {
            win: "Fast refunds".to_string(),
            ..DailyBrief::default()
        };
        let coaching = coaching(&brief);
        assert_eq!(coaching.win, "Fast refunds");
        assert_eq!(coaching.risk, COACHING_PENDING);
        assert_eq!(coaching.action, COACHING_PENDING);
    }
}
