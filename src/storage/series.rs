use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{
    cents_to_units, Cents, FunnelRow, MonthKey, MonthlyMetricRow, PeriodRange,
};

/// One month of a grouped `SUM`/`COUNT` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthTotals {
    pub month: MonthKey,
    pub total_cents: Cents,
    pub count: i64,
}

/// Start and end dates of a client relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSpan {
    pub started_at: NaiveDate,
    pub ended_at: Option<NaiveDate>,
}

impl ClientSpan {
    fn active_at_end_of(&self, month: MonthKey) -> bool {
        match month.last_day() {
            Some(last) => self.started_at <= last && self.ended_at.is_none_or(|e| e > last),
            None => false,
        }
    }
}

/// Raw grouped figures the monthly series is derived from.
#[derive(Debug, Clone, Default)]
pub struct SeriesInputs {
    pub sales: Vec<MonthTotals>,
    pub expenses: Vec<MonthTotals>,
    pub goals: Vec<MonthTotals>,
    /// Expenses in the acquisition category.
    pub acquisition: Vec<MonthTotals>,
    /// Lifetime sales of clients grouped by the month they started.
    pub cohort_ltv: Vec<MonthTotals>,
    pub clients: Vec<ClientSpan>,
}

fn by_month(totals: &[MonthTotals]) -> BTreeMap<MonthKey, MonthTotals> {
    totals.iter().map(|t| (t.month, *t)).collect()
}

impl SeriesInputs {
    /// First through last month with any activity, or `None` when there is none.
    pub fn span(&self) -> Option<PeriodRange> {
        let months = self
            .sales
            .iter()
            .chain(&self.expenses)
            .chain(&self.goals)
            .map(|t| t.month)
            .chain(self.clients.iter().flat_map(|c| {
                std::iter::once(MonthKey::from_date(c.started_at))
                    .chain(c.ended_at.map(MonthKey::from_date))
            }));

        let (mut first, mut last): (Option<MonthKey>, Option<MonthKey>) = (None, None);
        for month in months {
            first = Some(first.map_or(month, |f| f.min(month)));
            last = Some(last.map_or(month, |l| l.max(month)));
        }
        PeriodRange::new(first?, last?).ok()
    }

    /// Contiguous monthly metric rows over `span()`.
    pub fn monthly_rows(&self) -> Vec<MonthlyMetricRow> {
        let Some(span) = self.span() else {
            return Vec::new();
        };
        let sales = by_month(&self.sales);
        let expenses = by_month(&self.expenses);
        let goals = by_month(&self.goals);

        span.months()
            .map(|month| {
                let sale = sales.get(&month);
                let sales_count = sale.map_or(0, |s| s.count);
                let entries_cash = cents_to_units(sale.map_or(0, |s| s.total_cents));
                let exits_churn = cents_to_units(expenses.get(&month).map_or(0, |e| e.total_cents));
                let goal_amount = cents_to_units(goals.get(&month).map_or(0, |g| g.total_cents));

                let clients_entered = self
                    .clients
                    .iter()
                    .filter(|c| month.contains(c.started_at))
                    .count() as i64;
                let clients_left = self
                    .clients
                    .iter()
                    .filter(|c| c.ended_at.is_some_and(|e| month.contains(e)))
                    .count() as i64;
                let active_contracts = self
                    .clients
                    .iter()
                    .filter(|c| c.active_at_end_of(month))
                    .count() as i64;

                MonthlyMetricRow {
                    month,
                    clients_entered,
                    clients_left,
                    clients_balance: None,
                    entries_cash,
                    exits_churn,
                    net_mrr: entries_cash - exits_churn,
                    avg_ticket: (sales_count > 0).then(|| entries_cash / sales_count as f64),
                    goal_amount,
                    goal_pct: (goal_amount > 0.0).then(|| entries_cash / goal_amount * 100.0),
                    goal_gap: (goal_amount - entries_cash).max(0.0),
                    active_contracts: Some(active_contracts),
                    sales_count: Some(sales_count),
                }
            })
            .collect()
    }

    /// Contiguous funnel rows over `span()`.
    pub fn funnel_rows(&self) -> Vec<FunnelRow> {
        let Some(span) = self.span() else {
            return Vec::new();
        };
        let sales = by_month(&self.sales);
        let acquisition = by_month(&self.acquisition);
        let cohort_ltv = by_month(&self.cohort_ltv);

        span.months()
            .map(|month| {
                let entries = cents_to_units(sales.get(&month).map_or(0, |s| s.total_cents));
                let invested = cents_to_units(acquisition.get(&month).map_or(0, |a| a.total_cents));
                FunnelRow {
                    month,
                    invested,
                    entries,
                    saldo: entries - invested,
                    ltv_total: cents_to_units(cohort_ltv.get(&month).map_or(0, |l| l.total_cents)),
                    roas: (invested > 0.0).then(|| entries / invested),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn totals(month: &str, total_cents: Cents, count: i64) -> MonthTotals {
        MonthTotals {
            month: key(month),
            total_cents,
            count,
        }
    }

    #[test]
    fn test_empty_inputs_yield_empty_series() {
        let inputs = SeriesInputs::default();
        assert_eq!(inputs.span(), None);
        assert!(inputs.monthly_rows().is_empty());
        assert!(inputs.funnel_rows().is_empty());
    }

    #[test]
    fn test_series_is_contiguous_with_gaps_zero_filled() {
        let inputs = SeriesInputs {
            sales: vec![totals("2025-01", 100000, 2), totals("2025-04", 50000, 1)],
            ..Default::default()
        };
        let rows = inputs.monthly_rows();
        let months: Vec<String> = rows.iter().map(|r| r.month.to_string()).collect();
        assert_eq!(months, ["2025-01-01", "2025-02-01", "2025-03-01", "2025-04-01"]);

        assert_eq!(rows[0].entries_cash, 1000.0);
        assert_eq!(rows[0].avg_ticket, Some(500.0));
        assert_eq!(rows[1].entries_cash, 0.0);
        assert_eq!(rows[1].avg_ticket, None);
        assert_eq!(rows[1].sales_count, Some(0));
    }

    #[test]
    fn test_client_movements_and_active_contracts() {
        let inputs = SeriesInputs {
            clients: vec![
                ClientSpan {
                    started_at: date("2025-01-15"),
                    ended_at: Some(date("2025-03-10")),
                },
                ClientSpan {
                    started_at: date("2025-02-01"),
                    ended_at: None,
                },
            ],
            ..Default::default()
        };
        let rows = inputs.monthly_rows();
        assert_eq!(rows.len(), 3);

        assert_eq!((rows[0].clients_entered, rows[0].clients_left), (1, 0));
        assert_eq!(rows[0].active_contracts, Some(1));
        assert_eq!((rows[1].clients_entered, rows[1].clients_left), (1, 0));
        assert_eq!(rows[1].active_contracts, Some(2));
        assert_eq!((rows[2].clients_entered, rows[2].clients_left), (0, 1));
        assert_eq!(rows[2].active_contracts, Some(1));
    }

    #[test]
    fn test_goal_fields_per_month() {
        let inputs = SeriesInputs {
            sales: vec![totals("2025-05", 60000, 3)],
            expenses: vec![totals("2025-05", 10000, 1)],
            goals: vec![totals("2025-05", 100000, 1)],
            ..Default::default()
        };
        let row = &inputs.monthly_rows()[0];
        assert_eq!(row.net_mrr, 500.0);
        assert_eq!(row.goal_amount, 1000.0);
        assert!((row.goal_pct.unwrap() - 60.0).abs() < 1e-9);
        assert_eq!(row.goal_gap, 400.0);
    }

    #[test]
    fn test_funnel_rows() {
        let inputs = SeriesInputs {
            sales: vec![totals("2025-01", 300000, 3), totals("2025-02", 100000, 1)],
            acquisition: vec![totals("2025-01", 100000, 2)],
            cohort_ltv: vec![totals("2025-01", 400000, 4)],
            ..Default::default()
        };
        let rows = inputs.funnel_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].roas, Some(3.0));
        assert_eq!(rows[0].saldo, 2000.0);
        assert_eq!(rows[0].ltv_total, 4000.0);
        assert_eq!(rows[1].invested, 0.0);
        assert_eq!(rows[1].roas, None);
    }
}
