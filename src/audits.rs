use serde::Deserialize;
use tracing::debug;

use crate::models::{AuditData, AuditEdge, AuditRatio, AuditStats};

/// Ratio at which the gauge is full.
pub const RATIO_GAUGE_MAX: f64 = 2.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStatsRow {
    pub audit_ratio: Option<f64>,
    pub total_up: Option<f64>,
    pub total_down: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditNode {
    pub group: Option<AuditEdge>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRow {
    #[serde(default)]
    pub valid_audits: Vec<AuditNode>,
    #[serde(default)]
    pub failed_audits: Vec<AuditNode>,
}

/// One decimal, rounded from the exact decimal value of `raw`: 1.15 is
/// stored as 1.1499.. and gives 1.1, an exact tie like 1.25 rounds up.
pub fn round_ratio(raw: f64) -> f64 {
    let scaled = raw * 10.0;
    let exact_tie = raw.mul_add(10.0, -scaled) == 0.0 && scaled.fract().abs() == 0.5;
    if exact_tie {
        return scaled.round() / 10.0;
    }
    format!("{raw:.1}").parse().unwrap_or(raw)
}

/// A zero or missing ratio means the user has no audit history yet.
pub fn audit_stats(row: Option<AuditStatsRow>) -> AuditStats {
    let Some(row) = row else {
        return AuditStats::default();
    };

    let audit_ratio = match row.audit_ratio {
        Some(ratio) if ratio != 0.0 && ratio.is_finite() => AuditRatio::Value(round_ratio(ratio)),
        _ => AuditRatio::Unavailable,
    };

    AuditStats {
        audit_ratio,
        total_up: row.total_up.unwrap_or(0.0),
        total_down: row.total_down.unwrap_or(0.0),
    }
}

/// Reshapes the two grade-filtered lists; no client-side grading.
pub fn audit_data(row: Option<AuditRow>) -> AuditData {
    let row = row.unwrap_or_default();
    AuditData {
        valid_audits: edges(row.valid_audits),
        failed_audits: edges(row.failed_audits),
    }
}

fn edges(nodes: Vec<AuditNode>) -> Vec<AuditEdge> {
    nodes
        .into_iter()
        .filter_map(|node| {
            if node.group.is_none() {
                debug!("Skipping audit without a group");
            }
            node.group
        })
        .collect()
}

/// Gauge fill in `[0, 1]`; out-of-range ratios are clamped here, not in the data.
pub fn ratio_fraction(ratio: AuditRatio) -> f64 {
    ratio
        .value()
        .map(|v| (v / RATIO_GAUGE_MAX).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// Byte counters are displayed in thousands with two decimals.
pub fn format_kilo(amount: f64) -> String {
    if amount == 0.0 {
        return "0.00".to_string();
    }
    format!("{:.2}", amount / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ratio_is_rounded_to_one_decimal() {
        let stats = audit_stats(Some(AuditStatsRow {
            audit_ratio: Some(3.14159),
            total_up: Some(1200.0),
            total_down: None,
        }));
        assert_eq!(stats.audit_ratio, AuditRatio::Value(3.1));
        assert_eq!(stats.audit_ratio.to_string(), "3.1");
        assert_eq!(stats.total_up, 1200.0);
        assert_eq!(stats.total_down, 0.0);
    }

    #[test]
    fn rounding_follows_decimal_value() {
        assert_eq!(round_ratio(1.15), 1.1);
        assert_eq!(round_ratio(1.25), 1.3);
        assert_eq!(round_ratio(2.05), 2.0);
        assert_eq!(round_ratio(0.96), 1.0);
        assert_eq!(round_ratio(3.14159), 3.1);
    }

    #[test]
    fn missing_ratio_is_unavailable() {
        let stats = audit_stats(Some(AuditStatsRow::default()));
        assert_eq!(stats.audit_ratio.to_string(), "No data available");

        let stats = audit_stats(Some(AuditStatsRow {
            audit_ratio: Some(0.0),
            ..Default::default()
        }));
        assert_eq!(stats.audit_ratio, AuditRatio::Unavailable);

        assert_eq!(audit_stats(None), AuditStats::default());
    }

    #[test]
    fn audit_lists_are_reshaped_in_order() {
        let row: AuditRow = serde_json::from_value(json!({
            "validAudits": [
                { "group": { "captainLogin": "amina", "path": "/bahrain/bh-module/go-reloaded" } },
                { "group": null },
                { "group": { "captainLogin": "yousif", "path": "/bahrain/bh-module/ascii-art" } }
            ],
            "failedAudits": [
                { "group": { "captainLogin": "noor", "path": "/bahrain/bh-module/groupie-tracker" } }
            ]
        }))
        .unwrap();

        let data = audit_data(Some(row));
        assert_eq!(data.valid_audits.len(), 2);
        assert_eq!(data.valid_audits[1].captain_login, "yousif");
        assert_eq!(data.failed_audits[0].project(), "groupie-tracker");
        assert_eq!(audit_data(None), AuditData::default());
    }

    #[test]
    fn gauge_fraction_is_clamped() {
        assert_eq!(ratio_fraction(AuditRatio::Value(1.0)), 0.5);
        assert_eq!(ratio_fraction(AuditRatio::Value(3.4)), 1.0);
        assert_eq!(ratio_fraction(AuditRatio::Value(-1.0)), 0.0);
        assert_eq!(ratio_fraction(AuditRatio::Unavailable), 0.0);
    }

    #[test]
    fn kilo_formatting() {
        assert_eq!(format_kilo(0.0), "0.00");
        assert_eq!(format_kilo(1_234_567.0), "1234.57");
    }
}
