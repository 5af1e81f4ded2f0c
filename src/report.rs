use std::str::FromStr;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::RequestContext;
use crate::error::PipelineError;
use crate::knowledge::knowledge_payload;
use crate::metrics::metric_cards;
use crate::models::{
    BriefLine, DashboardPayload, FaqRecord, KbArticleRecord, KnowledgePayload, MetricCard,
    MetricSample, QualityPayload, QualitySignalEvent, RiskRow, SentimentRecord, TicketRecord,
    TrendCard, TrendRecord,
};
use crate::normalize::{format_time, load, load_brief};
use crate::quality::quality_payload;
use crate::risk::score_panels;
use crate::tables::{self, TableReader};
use crate::tickets::critical_tickets;
use crate::trends::trend_cards;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Dashboard,
    Trends,
    Quality,
    Metrics,
    Knowledge,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Dashboard => "getDashboard",
            Action::Trends => "getTrends",
            Action::Quality => "getQualityData",
            Action::Metrics => "getMetrics",
            Action::Knowledge => "getKB",
        }
    }

    /// Source tables the action reads.
    pub fn tables(self) -> &'static [&'static str] {
        match self {
            Action::Dashboard => &[
                tables::DAILY_BRIEF,
                tables::RISK_SCORES,
                tables::TICKETS,
                tables::SENTIMENT,
                tables::DAILY_METRICS,
            ],
            Action::Trends => &[tables::TRENDS],
            Action::Quality => &[
                tables::DAILY_BRIEF,
                tables::SENTIMENT,
                tables::QUALITY_SIGNALS,
            ],
            Action::Metrics => &[tables::DAILY_METRICS],
            Action::Knowledge => &[tables::KB_ARTICLES, tables::KB_FAQS],
        }
    }
}

impl FromStr for Action {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "getDashboard" => Ok(Action::Dashboard),
            "getTrends" => Ok(Action::Trends),
            "getQualityData" => Ok(Action::Quality),
            "getMetrics" => Ok(Action::Metrics),
            "getKB" => Ok(Action::Knowledge),
            other => Err(PipelineError::UnknownAction(other.to_string())),
        }
    }
}

/// One of the five payloads, or an error object. Callers tell them apart by shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Dashboard(DashboardPayload),
    Trends { trends: Vec<TrendCard> },
    Quality(QualityPayload),
    Metrics { metrics: Vec<MetricCard> },
    Knowledge(KnowledgePayload),
    Error { error: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Serves one request against a snapshot of the source tables.
///
/// Never fails: unknown actions and any read or computation error come back
/// as an error payload.
pub fn respond(action: &str, reader: &dyn TableReader, ctx: &RequestContext) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("request", action, %request_id);
    let _guard = span.enter();
    let started = Instant::now();

    let result = action
        .parse::<Action>()
        .and_then(|action| run(action, reader, ctx));

    match result {
        Ok(response) => {
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "request served");
            response
        }
        Err(err @ PipelineError::UnknownAction(_)) => {
            warn!("{err}");
            Response::error(err.to_string())
        }
        Err(err) => {
            error!(error = %err, "request failed");
            Response::error(err.to_string())
        }
    }
}

pub fn run(
    action: Action,
    reader: &dyn TableReader,
    ctx: &RequestContext,
) -> Result<Response, PipelineError> {
    debug!(action = action.as_str(), now = %ctx.now, "running pipeline");
    let response = match action {
        Action::Dashboard => Response::Dashboard(build_dashboard(reader, ctx)?),
        Action::Trends => Response::Trends {
            trends: trend_cards(&load::<TrendRecord>(reader, ctx.offset)?, ctx),
        },
        Action::Quality => Response::Quality(build_quality(reader, ctx)?),
        Action::Metrics => Response::Metrics {
            metrics: metric_cards(&load::<MetricSample>(reader, ctx.offset)?, ctx),
        },
        Action::Knowledge => Response::Knowledge(knowledge_payload(
            &load::<KbArticleRecord>(reader, ctx.offset)?,
            &load::<FaqRecord>(reader, ctx.offset)?,
        )),
    };
    Ok(response)
}

pub fn brief_lines(text: &str) -> Vec<BriefLine> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| BriefLine {
            text: line.to_string(),
        })
        .collect()
}

pub fn build_dashboard(
    reader: &dyn TableReader,
    ctx: &RequestContext,
) -> Result<DashboardPayload, PipelineError> {
    let brief = load_brief(reader, ctx.offset)?;
    let risk_rows = load::<RiskRow>(reader, ctx.offset)?;
    let tickets = load::<TicketRecord>(reader, ctx.offset)?;
    let sentiment = load::<SentimentRecord>(reader, ctx.offset)?;
    let samples = load::<MetricSample>(reader, ctx.offset)?;

    Ok(DashboardPayload {
        daily_brief: brief_lines(&brief.text),
        risk_scores: score_panels(&risk_rows),
        critical_tickets: critical_tickets(&tickets, &sentiment, ctx),
        metrics: metric_cards(&samples, ctx),
        generated_at: format_time(brief.generated_at, ctx.offset),
    })
}

pub fn build_quality(
    reader: &dyn TableReader,
    ctx: &RequestContext,
) -> Result<QualityPayload, PipelineError> {
    let brief = load_brief(reader, ctx.offset)?;
    let sentiment = load::<SentimentRecord>(reader, ctx.offset)?;
    let events = load::<QualitySignalEvent>(reader, ctx.offset)?;
    Ok(quality_payload(&sentiment, &events, &brief, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{Cell, MemoryTables};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn ctx() -> RequestContext {
        RequestContext::new(Utc.with_ymd_and_hms(2026, 3, 10, 6, 30, 0).unwrap())
    }

    fn header(columns: usize) -> Vec<Cell> {
        (0..columns).map(|n| Cell::from(format!("col{n}").as_str())).collect()
    }

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|cell| Cell::from(*cell)).collect()
    }

    fn snapshot() -> MemoryTables {
        MemoryTables::new()
            .with_table(
                tables::DAILY_BRIEF,
                vec![
                    header(5),
                    row(&[
                        "Billing backlog grew\n\n  Login errors resolved  ",
                        "Quick refunds",
                        "",
                        "Review macros",
                        "2026-03-10 09:15",
                    ]),
                ],
            )
            .with_table(
                tables::RISK_SCORES,
                vec![header(4), row(&["Billing", "75", "50"]), row(&["Login", "40", "35"])],
            )
            .with_table(
                tables::TICKETS,
                vec![
                    header(7),
                    row(&["T1", "Refund stuck", "Billing", "FALSE", "true", "2026-03-09 12:00"]),
                    row(&["T2", "Cannot login", "Login", "TRUE", "false", "2026-03-08"]),
                    row(&["T3", "Slow page", "Web", "false", "false", "2026-03-10"]),
                    row(&["", "orphan", "Web", "false", "false", ""]),
                ],
            )
            .with_table(
                tables::SENTIMENT,
                vec![
                    header(7),
                    row(&["T1", "2", "refund, angry", "TRUE", "", "", "Threatened chargeback"]),
                    row(&["T2", "1", "", "", "", "", ""]),
                    row(&["T3", "6", "", "", "", "", ""]),
                ],
            )
            .with_table(
                tables::DAILY_METRICS,
                vec![
                    header(5),
                    row(&["2026-03-08", "100", "80", "5", "6.2"]),
                    row(&["2026-03-09", "90", "81", "7", "5.8"]),
                ],
            )
            .with_table(
                tables::QUALITY_SIGNALS,
                vec![
                    header(7),
                    row(&["Q1", "Redundant Reply", "5", "Repeated ask", "7", "6", "2026-03-08"]),
                    row(&["Q2", "Redundant Reply", "3", "Repeated ask", "8", "4", "2026-03-09"]),
                    row(&["Q3", "Churn Risk", "", "Asked to cancel", "5", "5", "2026-03-09"]),
                ],
            )
            .with_table(
                tables::TRENDS,
                vec![
                    header(11),
                    row(&[
                        "TR1",
                        "Refund delays",
                        "NEW",
                        "4",
                        "T1, T9",
                        "Gateway",
                        "0.42",
                        "TRUE",
                        "12.5",
                        "2026-03-01",
                        "2026-03-09",
                    ]),
                ],
            )
            .with_table(
                tables::KB_ARTICLES,
                vec![
                    header(10),
                    row(&[
                        "KB-1",
                        "Reset password",
                        "Users locked out",
                        "Use reset link",
                        "login, reset",
                        "",
                        "12",
                        "Login",
                        "8",
                        "High",
                    ]),
                ],
            )
            .with_table(
                tables::KB_FAQS,
                vec![
                    header(5),
                    row(&["F1", "How to refund?", "Open billing", "Billing", "refund"]),
                ],
            )
    }

    #[test]
    fn unknown_action_yields_exact_error() {
        let response = respond("foo", &snapshot(), &ctx());
        assert!(response.is_error());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "error": "Invalid action: foo" })
        );
    }

    #[test]
    fn every_action_reads_only_tables_it_needs() {
        for action in ["getDashboard", "getTrends", "getQualityData", "getMetrics", "getKB"] {
            let parsed: Action = action.parse().unwrap();
            assert_eq!(parsed.as_str(), action);

            let full = snapshot();
            let mut partial = MemoryTables::new();
            for table in parsed.tables() {
                let rows = full.read_rows(table, 1, 11).unwrap();
                partial.insert(*table, rows);
            }
            assert!(!respond(action, &partial, &ctx()).is_error(), "{action}");
        }
    }

    #[test]
    fn missing_table_becomes_error_payload() {
        let response = respond("getTrends", &MemoryTables::new(), &ctx());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "error": "missing table: Trends_Cache(SI)" })
        );
    }

    #[test]
    fn dashboard_combines_all_components() {
        let response = respond("getDashboard", &snapshot(), &ctx());
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value["dailyBrief"],
            json!([{ "text": "Billing backlog grew" }, { "text": "Login errors resolved" }])
        );
        assert_eq!(value["generatedAt"], "09:15 AM");

        assert_eq!(value["riskScores"][0]["name"], "Billing");
        assert_eq!(value["riskScores"][0]["score"], 75);
        assert_eq!(value["riskScores"][0]["level"], "High Risk");
        assert_eq!(value["riskScores"][0]["hasJumped"], true);
        assert_eq!(value["riskScores"][1]["level"], "Nominal");

        let tickets = value["criticalTickets"].as_array().unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(
            tickets[0],
            json!({
                "ticket_id": "T1",
                "summary": "Refund stuck",
                "panel": "Billing",
                "resolved": false,
                "ikc_found": true,
                "date": "2026-03-09",
                "aging": "1d",
                "agingColor": "slate",
                "sentiment": {
                    "score": 2,
                    "label": "Highly Frustrated",
                    "keywords": ["refund", "angry"]
                },
                "ai_reasoning": "Threatened chargeback",
                "impact": ["Revenue Risk"]
            })
        );

        let metrics = value["metrics"].as_array().unwrap();
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[0]["value"], 90);
        assert_eq!(metrics[0]["trend"], "-10");
        assert_eq!(metrics[1]["value"], "90%");
        assert_eq!(metrics[1]["trend"], "+10.0%");
        assert_eq!(metrics[3]["trend"], "-0.4");
    }

    #[test]
    fn quality_scopes_redundant_replies_to_latest_day() {
        let value = serde_json::to_value(respond("getQualityData", &snapshot(), &ctx())).unwrap();
        let signals = &value["qualitySignals"];
        assert_eq!(signals["score"], 30);
        assert_eq!(signals["redundant_replies"], 3);

        let flagged = signals["process_flagged"].as_array().unwrap();
        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0]["id"], "Q2");
        assert_eq!(flagged[1]["signal_type"], "Churn Risk");
        assert_eq!(flagged[1]["redundant_count"], 0);

        assert_eq!(
            value["coaching"],
            json!({ "win": "Quick refunds", "risk": "Analysis pending", "action": "Review macros" })
        );
    }

    #[test]
    fn trends_and_metrics_wrap_their_lists() {
        let trends = serde_json::to_value(respond("getTrends", &snapshot(), &ctx())).unwrap();
        assert_eq!(
            trends["trends"][0],
            json!({
                "trend_id": "TR1",
                "title": "Refund delays",
                "state": "NEW",
                "ticket_count": 4,
                "ticket_ids": ["T1", "T9"],
                "root_cause": "Gateway",
                "confidence": 42,
                "needs_escalation": true,
                "growth_percentage": 12.5,
                "first_seen": "2026-03-01",
                "last_seen": "2026-03-09"
            })
        );

        let metrics = serde_json::to_value(respond("getMetrics", &snapshot(), &ctx())).unwrap();
        assert_eq!(metrics["metrics"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn knowledge_base_lists_articles_and_faqs() {
        let value = serde_json::to_value(respond("getKB", &snapshot(), &ctx())).unwrap();
        assert_eq!(value["articles"][0]["kb_id"], "KB-1");
        assert_eq!(value["articles"][0]["keywords"], json!(["login", "reset"]));
        assert_eq!(value["articles"][0]["frequency"], 12);
        assert_eq!(value["articles"][0]["priority_score"], 8);
        assert_eq!(value["faqs"][0]["question"], "How to refund?");
    }

    #[test]
    fn empty_tables_produce_default_filled_dashboard() {
        let empty = MemoryTables::new()
            .with_table(tables::DAILY_BRIEF, vec![header(5)])
            .with_table(tables::RISK_SCORES, vec![header(4)])
            .with_table(tables::TICKETS, vec![header(7)])
            .with_table(tables::SENTIMENT, vec![header(7)])
            .with_table(tables::DAILY_METRICS, vec![header(5)]);

        let value = serde_json::to_value(respond("getDashboard", &empty, &ctx())).unwrap();
        assert_eq!(value["dailyBrief"], json!([]));
        assert_eq!(value["criticalTickets"], json!([]));
        assert_eq!(value["generatedAt"], "08:00 AM");
        assert_eq!(value["metrics"][3]["value"], "5.0");
    }
}
