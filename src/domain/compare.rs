use serde::{Deserialize, Serialize};

use super::aggregate::{finite, mean};
use super::{aggregate_kpis, rows_in_range, AggregateKpis, MonthlyMetricRow, PeriodRange};

/// Rolling windows reported for every compared metric.
pub const ROLLING_WINDOWS: [usize; 3] = [3, 6, 12];

/// Selects which metric a comparison tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    EntriesCash,
    ExitsChurn,
    NetMrr,
    AvgTicket,
    SalesCount,
    ClientsEntered,
    ClientsLeft,
}

impl MetricField {
    pub fn label(&self) -> &'static str {
        match self {
            MetricField::EntriesCash => "Entries",
            MetricField::ExitsChurn => "Exits",
            MetricField::NetMrr => "Net",
            MetricField::AvgTicket => "Average ticket",
            MetricField::SalesCount => "Sales",
            MetricField::ClientsEntered => "Clients in",
            MetricField::ClientsLeft => "Clients out",
        }
    }

    /// Whether the metric is an amount of money (affects formatting only).
    pub fn is_monetary(&self) -> bool {
        matches!(
            self,
            MetricField::EntriesCash
                | MetricField::ExitsChurn
                | MetricField::NetMrr
                | MetricField::AvgTicket
        )
    }

    /// The metric's value for a single month.
    pub fn of_row(&self, row: &MonthlyMetricRow) -> f64 {
        let value = match self {
            MetricField::EntriesCash => row.entries_cash,
            MetricField::ExitsChurn => row.exits_churn,
            MetricField::NetMrr => row.net_mrr,
            MetricField::AvgTicket => row.avg_ticket.unwrap_or(0.0),
            MetricField::SalesCount => row.sales_count.unwrap_or(0) as f64,
            MetricField::ClientsEntered => row.clients_entered as f64,
            MetricField::ClientsLeft => row.clients_left as f64,
        };
        finite(value)
    }

    /// The metric's value for a whole period.
    pub fn of_aggregate(&self, agg: &AggregateKpis) -> f64 {
        match self {
            MetricField::EntriesCash => agg.entries_cash,
            MetricField::ExitsChurn => agg.exits_churn,
            MetricField::NetMrr => agg.net_mrr,
            MetricField::AvgTicket => agg.avg_ticket.unwrap_or(0.0),
            MetricField::SalesCount => agg.sales_count as f64,
            MetricField::ClientsEntered => agg.clients_entered as f64,
            MetricField::ClientsLeft => agg.clients_left as f64,
        }
    }
}

/// Trailing means over the in-period months, most recent last.
/// `None` only when the period has no rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingAverages {
    pub avg_3: Option<f64>,
    pub avg_6: Option<f64>,
    pub avg_12: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: MetricField,
    pub current: f64,
    pub previous: f64,
    pub delta_abs: f64,
    pub delta_pct: f64,
    pub rolling: RollingAverages,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub range: PeriodRange,
    pub previous_range: PeriodRange,
    pub window_size: u32,
    pub current: AggregateKpis,
    pub previous: AggregateKpis,
    pub metrics: Vec<MetricComparison>,
}

impl ComparisonResult {
    pub fn metric(&self, field: MetricField) -> Option<&MetricComparison> {
        self.metrics.iter().find(|m| m.metric == field)
    }
}

/// Percentage change from `previous` to `current`.
///
/// A zero baseline reports 0 when nothing changed and 100 otherwise.
pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current == 0.0 { 0.0 } else { 100.0 };
    }
    finite((current - previous) / previous * 100.0)
}

/// Mean of the last `window` values (fewer if the slice is shorter).
pub fn trailing_mean(values: &[f64], window: usize) -> Option<f64> {
    let start = values.len().saturating_sub(window);
    mean(&values[start..])
}

/// Compare the period `range` against the equal-length period right before it.
///
/// `current` is the aggregate of `range` over `series` as produced by
/// `aggregate_kpis`. Rolling averages use only the rows inside `range`.
pub fn compare(
    range: &PeriodRange,
    series: &[MonthlyMetricRow],
    current: &AggregateKpis,
    fields: &[MetricField],
) -> ComparisonResult {
    let previous_range = range.previous();
    let previous = aggregate_kpis(series, &previous_range);
    let in_range = rows_in_range(series, range);

    let metrics = fields
        .iter()
        .map(|&field| {
            let cur = field.of_aggregate(current);
            let prev = field.of_aggregate(&previous);
            let values: Vec<f64> = in_range.iter().map(|r| field.of_row(r)).collect();
            let [w3, w6, w12] = ROLLING_WINDOWS;

            MetricComparison {
                metric: field,
                current: cur,
                previous: prev,
                delta_abs: finite(cur - prev),
                delta_pct: pct_change(cur, prev),
                rolling: RollingAverages {
                    avg_3: trailing_mean(&values, w3),
                    avg_6: trailing_mean(&values, w6),
                    avg_12: trailing_mean(&values, w12),
                },
            }
        })
        .collect();

    ComparisonResult {
        range: *range,
        previous_range,
        window_size: range.window_size(),
        current: current.clone(),
        previous,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MonthKey;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    fn row(month: &str, entries_cash: f64, net_mrr: f64) -> MonthlyMetricRow {
        MonthlyMetricRow {
            entries_cash,
            net_mrr,
            ..MonthlyMetricRow::empty(key(month))
        }
    }

    fn range(from: &str, to: &str) -> PeriodRange {
        PeriodRange::new(key(from), key(to)).unwrap()
    }

    #[test]
    fn test_pct_change_policy() {
        assert_eq!(pct_change(500.0, 0.0), 100.0);
        assert_eq!(pct_change(-500.0, 0.0), 100.0);
        assert_eq!(pct_change(0.0, 0.0), 0.0);
        assert_eq!(pct_change(150.0, 100.0), 50.0);
        assert_eq!(pct_change(50.0, 100.0), -50.0);
    }

    #[test]
    fn test_trailing_mean_uses_available_rows() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(trailing_mean(&values, 3), Some(3.0));
        assert_eq!(trailing_mean(&values, 12), Some(2.5));
        assert_eq!(trailing_mean(&[], 3), None);
    }

    #[test]
    fn test_previous_zero_reports_hundred_percent() {
        let series = vec![row("2025-02-01", 500.0, 0.0)];
        let current_range = range("2025-02", "2025-02");
        let current = aggregate_kpis(&series, &current_range);
        let result = compare(&current_range, &series, &current, &[MetricField::EntriesCash]);

        let entries = result.metric(MetricField::EntriesCash).unwrap();
        assert_eq!(entries.previous, 0.0);
        assert_eq!(entries.delta_abs, 500.0);
        assert_eq!(entries.delta_pct, 100.0);
        assert!(entries.delta_pct.is_finite());
    }

    #[test]
    fn test_compare_against_preceding_window() {
        let series = vec![
            row("2024-10-01", 100.0, 10.0),
            row("2024-11-01", 100.0, 10.0),
            row("2024-12-01", 200.0, 20.0),
            row("2025-01-01", 300.0, 30.0),
            row("2025-02-01", 300.0, -60.0),
            row("2025-03-01", 200.0, 30.0),
        ];
        let current_range = range("2025-01", "2025-03");
        let current = aggregate_kpis(&series, &current_range);
        let result = compare(
            &current_range,
            &series,
            &current,
            &[MetricField::EntriesCash, MetricField::NetMrr],
        );

        assert_eq!(result.previous_range, range("2024-10", "2024-12"));
        assert_eq!(result.window_size, 3);

        let entries = result.metric(MetricField::EntriesCash).unwrap();
        assert_eq!(entries.current, 800.0);
        assert_eq!(entries.previous, 400.0);
        assert_eq!(entries.delta_abs, 400.0);
        assert_eq!(entries.delta_pct, 100.0);

        let net = result.metric(MetricField::NetMrr).unwrap();
        assert_eq!(net.current, 0.0);
        assert_eq!(net.previous, 40.0);
        assert_eq!(net.delta_pct, -100.0);
    }

    #[test]
    fn test_rolling_averages_come_from_filtered_series() {
        let series: Vec<MonthlyMetricRow> = (1..=12)
            .map(|m| row(&format!("2025-{:02}-01", m), m as f64 * 100.0, 0.0))
            .collect();
        // Unsorted input must not matter.
        let mut shuffled = series.clone();
        shuffled.reverse();

        let current_range = range("2025-03", "2025-06");
        let current = aggregate_kpis(&shuffled, &current_range);
        let result = compare(&current_range, &shuffled, &current, &[MetricField::EntriesCash]);
        let rolling = &result.metric(MetricField::EntriesCash).unwrap().rolling;

        // In range: 300, 400, 500, 600
        assert_eq!(rolling.avg_3, Some(500.0));
        assert_eq!(rolling.avg_6, Some(450.0));
        assert_eq!(rolling.avg_12, Some(450.0));
    }

    #[test]
    fn test_compare_is_idempotent() {
        let series = vec![row("2025-01-01", 120.0, 5.0), row("2025-02-01", 80.0, -5.0)];
        let r = range("2025-02", "2025-02");
        let current = aggregate_kpis(&series, &r);
        let a = compare(&r, &series, &current, &[MetricField::EntriesCash, MetricField::NetMrr]);
        let b = compare(&r, &series, &current, &[MetricField::EntriesCash, MetricField::NetMrr]);
        assert_eq!(a, b);
    }
}
