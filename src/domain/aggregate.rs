use serde::{Deserialize, Serialize};

use super::{FunnelRow, Monthly, MonthlyMetricRow, PeriodRange};

/// KPIs reduced over every row of a period.
///
/// Ratio fields are `None` when their denominator is zero, including for an
/// empty period. No field is ever NaN or infinite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateKpis {
    /// Rows that contributed.
    pub months: usize,
    pub clients_entered: i64,
    pub clients_left: i64,
    pub clients_balance: i64,
    pub entries_cash: f64,
    pub exits_churn: f64,
    pub net_mrr: f64,
    pub sales_count: i64,
    pub avg_ticket: Option<f64>,
    pub goal_amount: f64,
    pub goal_pct: Option<f64>,
    pub goal_gap: f64,
    /// Snapshot from the latest month in the period.
    pub active_contracts: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelAggregate {
    pub months: usize,
    pub invested: f64,
    pub entries: f64,
    pub saldo: f64,
    pub ltv_total: f64,
    pub roas: Option<f64>,
}

/// Non-finite inputs count as zero.
pub(crate) fn finite(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64).filter(|m| m.is_finite())
}

/// `num / den`, or `None` when `den` is not positive or the quotient overflows.
pub(crate) fn ratio(num: f64, den: f64) -> Option<f64> {
    if den <= 0.0 {
        return None;
    }
    Some(num / den).filter(|r| r.is_finite())
}

/// Rows whose month lies in `range`, sorted ascending by month.
/// Input order is irrelevant.
pub fn rows_in_range<'a, R: Monthly>(rows: &'a [R], range: &PeriodRange) -> Vec<&'a R> {
    let mut selected: Vec<&R> = rows.iter().filter(|r| range.contains(r.month())).collect();
    selected.sort_by_key(|r| r.month());
    selected
}

/// Reduce the rows of `series` that fall in `range`.
pub fn aggregate_kpis(series: &[MonthlyMetricRow], range: &PeriodRange) -> AggregateKpis {
    AggregateKpis::from_rows(&rows_in_range(series, range))
}

/// Reduce the funnel rows of `series` that fall in `range`.
pub fn aggregate_funnel(series: &[FunnelRow], range: &PeriodRange) -> FunnelAggregate {
    FunnelAggregate::from_rows(&rows_in_range(series, range))
}

impl AggregateKpis {
    /// `rows` must be sorted ascending by month; `rows_in_range` does that.
    pub fn from_rows(rows: &[&MonthlyMetricRow]) -> Self {
        // Totals can overflow even when every row is finite.
        let sum = |f: fn(&MonthlyMetricRow) -> f64| finite(rows.iter().map(|r| finite(f(r))).sum());

        let entries_cash = sum(|r| r.entries_cash);
        let exits_churn = sum(|r| r.exits_churn);
        let net_mrr = sum(|r| r.net_mrr);
        let goal_amount = sum(|r| r.goal_amount);

        let sales_count: i64 = rows.iter().map(|r| r.sales_count.unwrap_or(0)).sum();
        let avg_ticket = if sales_count > 0 {
            ratio(entries_cash, sales_count as f64)
        } else {
            // Months without a ticket are left out, not averaged in as zero.
            let tickets: Vec<f64> = rows
                .iter()
                .filter_map(|r| r.avg_ticket)
                .map(finite)
                .filter(|t| *t > 0.0)
                .collect();
            mean(&tickets)
        };

        let goal_pct = ratio(entries_cash * 100.0, goal_amount);

        Self {
            months: rows.len(),
            clients_entered: rows.iter().map(|r| r.clients_entered).sum(),
            clients_left: rows.iter().map(|r| r.clients_left).sum(),
            clients_balance: rows.iter().map(|r| r.balance()).sum(),
            entries_cash,
            exits_churn,
            net_mrr,
            sales_count,
            avg_ticket,
            goal_amount,
            goal_pct,
            goal_gap: finite(goal_amount - entries_cash).max(0.0),
            active_contracts: rows.last().and_then(|r| r.active_contracts).unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.months == 0
    }
}

impl FunnelAggregate {
    pub fn from_rows(rows: &[&FunnelRow]) -> Self {
        let sum = |f: fn(&FunnelRow) -> f64| finite(rows.iter().map(|r| finite(f(r))).sum());

        let invested = sum(|r| r.invested);
        let entries = sum(|r| r.entries);

        Self {
            months: rows.len(),
            invested,
            entries,
            saldo: sum(|r| r.saldo),
            ltv_total: sum(|r| r.ltv_total),
            roas: ratio(entries, invested),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MonthKey;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    fn row(month: &str, entries_cash: f64, goal_amount: f64) -> MonthlyMetricRow {
        MonthlyMetricRow {
            entries_cash,
            goal_amount,
            ..MonthlyMetricRow::empty(key(month))
        }
    }

    fn range(from: &str, to: &str) -> PeriodRange {
        PeriodRange::new(key(from), key(to)).unwrap()
    }

    #[test]
    fn test_two_month_goal_scenario() {
        let series = vec![row("2025-01-01", 1000.0, 800.0), row("2025-02-01", 1200.0, 800.0)];
        let agg = aggregate_kpis(&series, &range("2025-01-01", "2025-02-01"));

        assert_eq!(agg.months, 2);
        assert_eq!(agg.entries_cash, 2200.0);
        assert_eq!(agg.goal_amount, 1600.0);
        assert!((agg.goal_pct.unwrap() - 137.5).abs() < 1e-9);
        assert_eq!(agg.goal_gap, 0.0);
    }

    #[test]
    fn test_goal_gap_when_short() {
        let series = vec![row("2025-01-01", 300.0, 1000.0)];
        let agg = aggregate_kpis(&series, &range("2025-01", "2025-01"));
        assert_eq!(agg.goal_gap, 700.0);
        assert!((agg.goal_pct.unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_range_yields_zeros_and_none() {
        let series = vec![row("2025-01-01", 1000.0, 800.0)];
        let agg = aggregate_kpis(&series, &range("2026-01", "2026-03"));

        assert!(agg.is_empty());
        assert_eq!(agg.entries_cash, 0.0);
        assert_eq!(agg.clients_balance, 0);
        assert_eq!(agg.avg_ticket, None);
        assert_eq!(agg.goal_pct, None);
        assert_eq!(agg.goal_gap, 0.0);
        assert_eq!(agg.active_contracts, 0);
    }

    #[test]
    fn test_avg_ticket_weighted_by_sales_count() {
        let mut a = row("2025-01-01", 1000.0, 0.0);
        a.sales_count = Some(4);
        a.avg_ticket = Some(250.0);
        let mut b = row("2025-02-01", 2000.0, 0.0);
        b.sales_count = Some(1);
        b.avg_ticket = Some(2000.0);

        let agg = aggregate_kpis(&[a, b], &range("2025-01", "2025-02"));
        assert_eq!(agg.sales_count, 5);
        assert_eq!(agg.avg_ticket, Some(600.0));
    }

    #[test]
    fn test_avg_ticket_fallback_skips_empty_months() {
        let mut a = row("2025-01-01", 0.0, 0.0);
        a.avg_ticket = Some(100.0);
        let mut b = row("2025-02-01", 0.0, 0.0);
        b.avg_ticket = Some(0.0);
        let c = row("2025-03-01", 0.0, 0.0);
        let mut d = row("2025-04-01", 0.0, 0.0);
        d.avg_ticket = Some(300.0);

        let agg = aggregate_kpis(&[a, b, c, d], &range("2025-01", "2025-04"));
        assert_eq!(agg.avg_ticket, Some(200.0));
    }

    #[test]
    fn test_active_contracts_from_latest_month_not_last_element() {
        let mut late = row("2025-03-01", 0.0, 0.0);
        late.active_contracts = Some(12);
        let mut early = row("2025-01-01", 0.0, 0.0);
        early.active_contracts = Some(7);
        let mut outside = row("2025-09-01", 0.0, 0.0);
        outside.active_contracts = Some(99);

        let series = vec![late, outside, early];
        let agg = aggregate_kpis(&series, &range("2025-01", "2025-06"));
        assert_eq!(agg.active_contracts, 12);
    }

    #[test]
    fn test_clients_balance_sums_per_row() {
        let mut a = row("2025-01-01", 0.0, 0.0);
        a.clients_entered = 3;
        a.clients_left = 1;
        let mut b = row("2025-02-01", 0.0, 0.0);
        b.clients_entered = 2;
        b.clients_left = 2;
        b.clients_balance = Some(-1);

        let agg = aggregate_kpis(&[a, b], &range("2025-01", "2025-02"));
        assert_eq!(agg.clients_entered, 5);
        assert_eq!(agg.clients_left, 3);
        assert_eq!(agg.clients_balance, 1);
    }

    #[test]
    fn test_non_finite_inputs_count_as_zero() {
        let series = vec![row("2025-01-01", f64::NAN, f64::INFINITY), row("2025-02-01", 50.0, 0.0)];
        let agg = aggregate_kpis(&series, &range("2025-01", "2025-02"));
        assert_eq!(agg.entries_cash, 50.0);
        assert_eq!(agg.goal_amount, 0.0);
        assert_eq!(agg.goal_pct, None);
    }

    #[test]
    fn test_funnel_roas_none_without_investment() {
        let rows = vec![FunnelRow {
            month: key("2025-01-01"),
            invested: 0.0,
            entries: 900.0,
            saldo: 900.0,
            ltv_total: 0.0,
            roas: None,
        }];
        let agg = aggregate_funnel(&rows, &range("2025-01", "2025-01"));
        assert_eq!(agg.roas, None);
        assert_eq!(agg.entries, 900.0);
    }

    #[test]
    fn test_funnel_roas_over_period() {
        let rows = vec![
            FunnelRow {
                month: key("2025-01-01"),
                invested: 100.0,
                entries: 300.0,
                saldo: 200.0,
                ltv_total: 1000.0,
                roas: Some(3.0),
            },
            FunnelRow {
                month: key("2025-02-01"),
                invested: 100.0,
                entries: 100.0,
                saldo: 0.0,
                ltv_total: 500.0,
                roas: Some(1.0),
            },
        ];
        let agg = aggregate_funnel(&rows, &range("2025-01", "2025-02"));
        assert_eq!(agg.invested, 200.0);
        assert_eq!(agg.ltv_total, 1500.0);
        assert_eq!(agg.roas, Some(2.0));
    }

    #[test]
    fn test_overflowing_totals_stay_finite() {
        let series = vec![row("2025-01-01", 1e308, 0.5), row("2025-02-01", 1e308, 0.5)];
        let agg = aggregate_kpis(&series, &range("2025-01", "2025-02"));

        assert!(agg.entries_cash.is_finite());
        assert!(agg.goal_gap.is_finite());
        assert!(agg.goal_pct.is_none_or(f64::is_finite));

        let single = aggregate_kpis(&series, &range("2025-01", "2025-01"));
        assert_eq!(single.entries_cash, 1e308);
        // 1e310 / 0.5 does not fit in an f64.
        assert_eq!(single.goal_pct, None);
    }

    #[test]
    fn test_ratio_guards_denominator_and_overflow() {
        assert_eq!(ratio(10.0, 4.0), Some(2.5));
        assert_eq!(ratio(10.0, 0.0), None);
        assert_eq!(ratio(f64::MAX, 0.5), None);
    }
}
