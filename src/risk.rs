use crate::models::{RiskCard, RiskRow};

/// Points gained within 24h that count as a jump.
pub const JUMP_THRESHOLD: f64 = 20.0;
pub const JUMP_MESSAGE: &str = "Risk jumped >20pts in last 24h.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    HighRisk,
    Elevated,
    Nominal,
}

impl RiskLevel {
    /// Tiers use strictly-greater-than, so 70 is Elevated and 40 is Nominal.
    pub fn classify(score: f64) -> Self {
        if score > 70.0 {
            RiskLevel::HighRisk
        } else if score > 40.0 {
            RiskLevel::Elevated
        } else {
            RiskLevel::Nominal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::HighRisk => "High Risk",
            RiskLevel::Elevated => "Elevated",
            RiskLevel::Nominal => "Nominal",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RiskLevel::HighRisk => "High volume of critical tickets.",
            RiskLevel::Elevated => "Moderate issues detected.",
            RiskLevel::Nominal => "Status within expected parameters.",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskLevel::HighRisk => "border-l-red-500",
            RiskLevel::Elevated => "border-l-amber-500",
            RiskLevel::Nominal => "border-l-emerald-500",
        }
    }
}

pub fn has_jumped(score: f64, score_24h_ago: f64) -> bool {
    score - score_24h_ago > JUMP_THRESHOLD
}

pub fn score_panel(row: &RiskRow) -> RiskCard {
    let level = RiskLevel::classify(row.score);
    let jumped = has_jumped(row.score, row.score_24h_ago);

    RiskCard {
        name: row.panel_name.clone(),
        score: row.score,
        score_24h_ago: row.score_24h_ago,
        level: level.label().to_string(),
        description: if jumped {
            JUMP_MESSAGE.to_string()
        } else {
            level.description().to_string()
        },
        color: level.color().to_string(),
        has_jumped: jumped,
    }
}

/// Scores each panel independently, keeping source order.
pub fn score_panels(rows: &[RiskRow]) -> Vec<RiskCard> {
    rows.iter().map(score_panel).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(score: f64, score_24h_ago: f64) -> RiskRow {
        RiskRow {
            panel_name: "Billing".to_string(),
            score,
            score_24h_ago,
        }
    }

    #[test]
    fn levels_follow_strict_tiers() {
        assert_eq!(RiskLevel::classify(40.0), RiskLevel::Nominal);
        assert_eq!(RiskLevel::classify(40.5), RiskLevel::Elevated);
        assert_eq!(RiskLevel::classify(70.0), RiskLevel::Elevated);
        assert_eq!(RiskLevel::classify(71.0), RiskLevel::HighRisk);
    }

    #[test]
    fn jump_is_independent_of_level() {
        assert!(has_jumped(35.0, 10.0));
        assert!(!has_jumped(90.0, 70.0));
        assert!(has_jumped(90.0, 69.0));
        assert!(!has_jumped(10.0, 80.0));
    }

    #[test]
    fn jump_message_overrides_tier_description() {
        let card = score_panel(&sample_row(30.0, 5.0));
        assert_eq!(card.level, "Nominal");
        assert!(card.has_jumped);
        assert_eq!(card.description, JUMP_MESSAGE);
        assert_eq!(card.color, "border-l-emerald-500");
    }

    #[test]
    fn steady_high_panel_uses_tier_description() {
        let card = score_panel(&sample_row(85.0, 80.0));
        assert_eq!(card.level, "High Risk");
        assert!(!card.has_jumped);
        assert_eq!(card.description, "High volume of critical tickets.");
    }

    #[test]
    fn panels_keep_source_order() {
        let mut second = sample_row(50.0, 50.0);
        second.panel_name = "Login".to_string();
        let cards = score_panels(&[sample_row(10.0, 10.0), second]);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].name, "Login");
        assert_eq!(cards[1].level, "Elevated");
    }
}
