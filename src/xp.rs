use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{null_as_default, XpPoint, XpSeries};

/// Raw amounts are in bytes-like units; the chart shows thousands.
pub const XP_DISPLAY_DIVISOR: f64 = 1000.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpTransaction {
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// Running total over rows already ordered by creation time. One point per
/// row; the index is a transaction ordinal, not a time axis.
pub fn accumulate_xp(transactions: &[XpTransaction]) -> XpSeries {
    let mut cumulative = 0.0;
    transactions
        .iter()
        .map(|tx| {
            cumulative += tx.amount / XP_DISPLAY_DIVISOR;
            XpPoint {
                xp: cumulative,
                created_at: tx.created_at,
            }
        })
        .collect()
}

pub fn total_xp(series: &[XpPoint]) -> f64 {
    series.last().map(|point| point.xp).unwrap_or(0.0)
}
