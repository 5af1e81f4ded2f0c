use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};

// Source records, one per non-empty table row.

#[derive(Debug, Clone)]
pub struct TicketRecord {
    pub id: String,
    pub summary: String,
    pub panel: String,
    pub resolved: bool,
    pub knowledge_found: bool,
    pub opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct SentimentRecord {
    pub ticket_id: String,
    /// 1-10, lower is worse. Empty or malformed cells read as 0.
    pub score: f64,
    pub keywords: Vec<String>,
    pub revenue_risk: bool,
    pub sla_risk: bool,
    pub reputation_risk: bool,
    pub ai_reasoning: String,
}

#[derive(Debug, Clone)]
pub struct RiskRow {
    pub panel_name: String,
    pub score: f64,
    pub score_24h_ago: f64,
}

#[derive(Debug, Clone)]
pub struct MetricSample {
    pub date: Option<NaiveDate>,
    pub total_tickets: i64,
    pub resolved_count: i64,
    pub critical_count: i64,
    pub avg_sentiment: f64,
}

#[derive(Debug, Clone)]
pub struct QualitySignalEvent {
    pub id: String,
    pub signal_type: String,
    pub redundant_reply_count: i64,
    pub description: String,
    pub sentiment_before: f64,
    pub sentiment_after: f64,
    /// Cell text of the before/after scores, used verbatim in advice strings.
    pub before_text: String,
    pub after_text: String,
    pub flagged_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrendState {
    New,
    Recurring,
    Escalating,
    Declining,
    Other(String),
}

impl TrendState {
    pub fn as_str(&self) -> &str {
        match self {
            TrendState::New => "NEW",
            TrendState::Recurring => "RECURRING",
            TrendState::Escalating => "ESCALATING",
            TrendState::Declining => "DECLINING",
            TrendState::Other(value) => value,
        }
    }
}

impl From<&str> for TrendState {
    fn from(value: &str) -> Self {
        match value {
            "NEW" => TrendState::New,
            "RECURRING" => TrendState::Recurring,
            "ESCALATING" => TrendState::Escalating,
            "DECLINING" => TrendState::Declining,
            other => TrendState::Other(other.to_string()),
        }
    }
}

impl Serialize for TrendState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TrendRecord {
    pub id: String,
    pub title: String,
    pub state: TrendState,
    pub ticket_count: f64,
    pub ticket_ids: Vec<String>,
    pub root_cause: String,
    /// Stored upstream as a 0-1 fraction.
    pub confidence: f64,
    pub needs_escalation: bool,
    pub growth_percentage: f64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct DailyBrief {
    pub text: String,
    pub win: String,
    pub risk: String,
    pub action: String,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct KbArticleRecord {
    pub kb_id: String,
    pub title: String,
    pub problem_statement: String,
    pub resolution_steps: String,
    pub keywords: Vec<String>,
    pub frequency: f64,
    pub panels_affected: Vec<String>,
    pub priority_score: f64,
    pub priority_level: String,
}

#[derive(Debug, Clone)]
pub struct FaqRecord {
    pub question: String,
    pub answer: String,
    pub panel: String,
    pub keywords: Vec<String>,
}

// Response shapes. Field names are consumed verbatim by the dashboard UI.

/// Integral values go out as JSON integers, non-finite values as null.
pub fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !value.is_finite() {
        serializer.serialize_none()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketSentiment {
    #[serde(serialize_with = "serialize_number")]
    pub score: f64,
    pub label: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriticalTicket {
    pub ticket_id: String,
    pub summary: String,
    pub panel: String,
    pub resolved: bool,
    pub ikc_found: bool,
    pub date: String,
    pub aging: String,
    #[serde(rename = "agingColor")]
    pub aging_color: String,
    pub sentiment: TicketSentiment,
    pub ai_reasoning: String,
    pub impact: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCard {
    pub name: String,
    #[serde(serialize_with = "serialize_number")]
    pub score: f64,
    #[serde(rename = "score24hAgo", serialize_with = "serialize_number")]
    pub score_24h_ago: f64,
    pub level: String,
    pub description: String,
    pub color: String,
    pub has_jumped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(i64),
    Text(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCard {
    pub label: String,
    pub value: MetricValue,
    pub trend: String,
    pub trend_direction: String,
    pub status: String,
    pub sparkline_data: String,
    pub sparkline_color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlaggedEvent {
    pub id: String,
    pub signal_type: String,
    pub redundant_count: i64,
    pub description: String,
    #[serde(serialize_with = "serialize_number")]
    pub sentiment_before: f64,
    #[serde(serialize_with = "serialize_number")]
    pub sentiment_after: f64,
    pub flagged_date: String,
    pub advice: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualitySignals {
    pub score: i64,
    pub redundant_replies: i64,
    pub process_flagged: Vec<FlaggedEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Coaching {
    pub win: String,
    pub risk: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityPayload {
    pub quality_signals: QualitySignals,
    pub coaching: Coaching,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendCard {
    pub trend_id: String,
    pub title: String,
    pub state: TrendState,
    #[serde(serialize_with = "serialize_number")]
    pub ticket_count: f64,
    pub ticket_ids: Vec<String>,
    pub root_cause: String,
    #[serde(serialize_with = "serialize_number")]
    pub confidence: f64,
    pub needs_escalation: bool,
    #[serde(serialize_with = "serialize_number")]
    pub growth_percentage: f64,
    pub first_seen: String,
    pub last_seen: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KbArticle {
    pub kb_id: String,
    pub title: String,
    pub problem_statement: String,
    pub resolution_steps: String,
    pub keywords: Vec<String>,
    pub panels_affected: Vec<String>,
    #[serde(serialize_with = "serialize_number")]
    pub priority_score: f64,
    pub priority_level: String,
    #[serde(serialize_with = "serialize_number")]
    pub frequency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
    pub panel: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgePayload {
    pub articles: Vec<KbArticle>,
    pub faqs: Vec<Faq>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BriefLine {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub daily_brief: Vec<BriefLine>,
    pub risk_scores: Vec<RiskCard>,
    pub critical_tickets: Vec<CriticalTicket>,
    pub metrics: Vec<MetricCard>,
    pub generated_at: String,
}
