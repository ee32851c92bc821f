use serde::{Deserialize, Deserializer, Serialize};

use super::{Cents, MonthKey};

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Anything keyed by calendar month.
pub trait Monthly {
    fn month(&self) -> MonthKey;
}

/// One month of company-wide (or single-client) metrics.
///
/// Monetary fields are in currency units. `net_mrr` may be negative.
/// Missing or null numbers deserialize as zero / `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetricRow {
    pub month: MonthKey,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clients_entered: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clients_left: i64,
    /// Balance tracked independently of entered/left, when the source has it.
    #[serde(default)]
    pub clients_balance: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries_cash: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exits_churn: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub net_mrr: f64,
    #[serde(default)]
    pub avg_ticket: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub goal_amount: f64,
    #[serde(default)]
    pub goal_pct: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub goal_gap: f64,
    /// Point-in-time count at month end.
    #[serde(default)]
    pub active_contracts: Option<i64>,
    /// Weighting denominator for the average ticket.
    #[serde(default)]
    pub sales_count: Option<i64>,
}

impl MonthlyMetricRow {
    /// A month with no activity.
    pub fn empty(month: MonthKey) -> Self {
        Self {
            month,
            clients_entered: 0,
            clients_left: 0,
            clients_balance: None,
            entries_cash: 0.0,
            exits_churn: 0.0,
            net_mrr: 0.0,
            avg_ticket: None,
            goal_amount: 0.0,
            goal_pct: None,
            goal_gap: 0.0,
            active_contracts: None,
            sales_count: None,
        }
    }

    /// Per-row client balance: the tracked value if present, else entered - left.
    pub fn balance(&self) -> i64 {
        self.clients_balance
            .unwrap_or(self.clients_entered - self.clients_left)
    }
}

impl Monthly for MonthlyMetricRow {
    fn month(&self) -> MonthKey {
        self.month
    }
}

/// One month of acquisition-funnel figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelRow {
    pub month: MonthKey,
    #[serde(default, deserialize_with = "null_as_default")]
    pub invested: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub saldo: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ltv_total: f64,
    /// `None` means undefined (nothing invested), not zero.
    #[serde(default)]
    pub roas: Option<f64>,
}

impl Monthly for FunnelRow {
    fn month(&self) -> MonthKey {
        self.month
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    NoGoal,
    InProgress,
    Reached,
}

impl GoalStatus {
    pub fn from_pct(goal_pct: Option<f64>) -> Self {
        match goal_pct {
            None => GoalStatus::NoGoal,
            Some(pct) if pct >= 100.0 => GoalStatus::Reached,
            Some(_) => GoalStatus::InProgress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::NoGoal => "no goal",
            GoalStatus::InProgress => "in progress",
            GoalStatus::Reached => "reached",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single-client metrics for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub month: MonthKey,
    pub clients_entered: i64,
    pub clients_left: i64,
    pub clients_balance: i64,
    pub entries: f64,
    pub exits: f64,
    pub net: f64,
    pub avg_ticket: Option<f64>,
    pub sales_count: i64,
    pub goal_amount: f64,
    pub goal_pct: Option<f64>,
    pub goal_status: GoalStatus,
}

impl DashboardMetrics {
    pub fn from_row(row: &MonthlyMetricRow) -> Self {
        Self {
            month: row.month,
            clients_entered: row.clients_entered,
            clients_left: row.clients_left,
            clients_balance: row.balance(),
            entries: row.entries_cash,
            exits: row.exits_churn,
            net: row.net_mrr,
            avg_ticket: row.avg_ticket,
            sales_count: row.sales_count.unwrap_or(0),
            goal_amount: row.goal_amount,
            goal_pct: row.goal_pct,
            goal_status: GoalStatus::from_pct(row.goal_pct),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseByCategory {
    pub category: String,
    pub total: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub month: MonthKey,
    pub total: Cents,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_nulls_and_missing_fields_default() {
        let row: MonthlyMetricRow = serde_json::from_str(
            r#"{"month":"2025-03-01","entries_cash":null,"net_mrr":-120.5,"goal_pct":null}"#,
        )
        .unwrap();
        assert_eq!(row.entries_cash, 0.0);
        assert_eq!(row.net_mrr, -120.5);
        assert_eq!(row.clients_entered, 0);
        assert_eq!(row.goal_pct, None);
        assert_eq!(row.sales_count, None);
    }

    #[test]
    fn test_funnel_roas_null_stays_none() {
        let row: FunnelRow =
            serde_json::from_str(r#"{"month":"2025-03-01","invested":0,"entries":500,"roas":null}"#)
                .unwrap();
        assert_eq!(row.roas, None);
        assert_eq!(row.entries, 500.0);
    }

    #[test]
    fn test_balance_prefers_tracked_value() {
        let mut row = MonthlyMetricRow::empty("2025-01-01".parse().unwrap());
        row.clients_entered = 5;
        row.clients_left = 2;
        assert_eq!(row.balance(), 3);
        row.clients_balance = Some(1);
        assert_eq!(row.balance(), 1);
    }

    #[test]
    fn test_goal_status_from_pct() {
        assert_eq!(GoalStatus::from_pct(None), GoalStatus::NoGoal);
        assert_eq!(GoalStatus::from_pct(Some(99.9)), GoalStatus::InProgress);
        assert_eq!(GoalStatus::from_pct(Some(100.0)), GoalStatus::Reached);
        assert_eq!(GoalStatus::from_pct(Some(137.5)), GoalStatus::Reached);
    }
}
