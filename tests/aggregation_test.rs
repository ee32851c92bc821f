mod common;

use common::{month, row};
use metrica::domain::{
    aggregate_funnel, aggregate_kpis, compare, resolve_preset, FunnelRow, MetricField,
    MonthlyMetricRow, PeriodRange, PeriodSelection, Preset,
};

fn range(from: &str, to: &str) -> PeriodRange {
    PeriodRange::new(month(from), month(to)).unwrap()
}

/// Eighteen months of uneven activity, Jan 2024 through Jun 2025.
fn long_series() -> Vec<MonthlyMetricRow> {
    let start = month("2024-01");
    (0..18)
        .map(|i| {
            let m = start.shift(i);
            let entries = 500.0 + 125.0 * (i % 5) as f64;
            let exits = 80.0 * (i % 3) as f64;
            let goal = if i % 4 == 0 { 0.0 } else { 700.0 };
            let mut r = row(&m.to_string(), entries, exits, (i % 4) as i64, goal);
            r.clients_entered = (i % 2) as i64;
            r.active_contracts = Some(10 + i as i64);
            r
        })
        .collect()
}

#[test]
fn test_entries_are_additive_over_consecutive_ranges() {
    let series = long_series();
    let whole = aggregate_kpis(&series, &range("2024-01", "2025-06"));

    for split in ["2024-03", "2024-09", "2025-01"] {
        let split = month(split);
        let a = aggregate_kpis(&series, &range("2024-01", &split.prev().to_string()));
        let b = aggregate_kpis(&series, &range(&split.to_string(), "2025-06"));
        assert!((a.entries_cash + b.entries_cash - whole.entries_cash).abs() < 1e-9);
        assert_eq!(a.months + b.months, whole.months);
        assert_eq!(a.sales_count + b.sales_count, whole.sales_count);
    }
}

#[test]
fn test_goal_pct_is_none_exactly_when_goal_is_zero() {
    let series = long_series();
    // Months 0, 4, 8, 12, 16 have no goal.
    for (from, to) in [
        ("2024-01", "2024-01"),
        ("2024-05", "2024-05"),
        ("2024-01", "2024-02"),
        ("2024-02", "2024-04"),
        ("2026-01", "2026-03"),
    ] {
        let agg = aggregate_kpis(&series, &range(from, to));
        assert_eq!(agg.goal_pct.is_none(), agg.goal_amount == 0.0, "{} to {}", from, to);
    }
}

#[test]
fn test_delta_abs_matches_previous_range_aggregate() {
    let series = long_series();
    let current_range = range("2025-01", "2025-06");
    let current = aggregate_kpis(&series, &current_range);
    let result = compare(
        &current_range,
        &series,
        &current,
        &[MetricField::EntriesCash, MetricField::NetMrr, MetricField::SalesCount],
    );

    assert_eq!(result.previous_range, range("2024-07", "2024-12"));
    assert_eq!(result.window_size, 6);
    let previous = aggregate_kpis(&series, &result.previous_range);
    assert_eq!(result.previous, previous);

    let entries = result.metric(MetricField::EntriesCash).unwrap();
    assert!((entries.delta_abs - (current.entries_cash - previous.entries_cash)).abs() < 1e-9);
    let net = result.metric(MetricField::NetMrr).unwrap();
    assert!((net.delta_abs - (current.net_mrr - previous.net_mrr)).abs() < 1e-9);
}

#[test]
fn test_aggregation_is_idempotent() {
    let series = long_series();
    let r = range("2024-04", "2025-02");
    assert_eq!(aggregate_kpis(&series, &r), aggregate_kpis(&series, &r));

    let current = aggregate_kpis(&series, &r);
    let fields = [MetricField::EntriesCash];
    assert_eq!(
        compare(&r, &series, &current, &fields),
        compare(&r, &series, &current, &fields)
    );
}

#[test]
fn test_rolling_averages_use_trailing_rows_of_the_period() {
    let series = long_series();
    let r = range("2025-01", "2025-04");
    let current = aggregate_kpis(&series, &r);
    let result = compare(&r, &series, &current, &[MetricField::EntriesCash]);
    let rolling = &result.metric(MetricField::EntriesCash).unwrap().rolling;

    let in_range: Vec<f64> = series
        .iter()
        .filter(|row| r.contains(row.month))
        .map(|row| row.entries_cash)
        .collect();
    let last3 = &in_range[in_range.len() - 3..];
    let mean3 = last3.iter().sum::<f64>() / 3.0;
    let mean_all = in_range.iter().sum::<f64>() / in_range.len() as f64;

    assert!((rolling.avg_3.unwrap() - mean3).abs() < 1e-9);
    // Only four rows are in range, so the wider windows see all of them.
    assert!((rolling.avg_6.unwrap() - mean_all).abs() < 1e-9);
    assert!((rolling.avg_12.unwrap() - mean_all).abs() < 1e-9);
}

#[test]
fn test_zero_baseline_reports_hundred_percent() {
    let series = vec![row("2025-01", 0.0, 0.0, 0, 0.0), row("2025-02", 500.0, 0.0, 1, 0.0)];
    let r = range("2025-02", "2025-02");
    let current = aggregate_kpis(&series, &r);
    let result = compare(&r, &series, &current, &[MetricField::EntriesCash]);

    let entries = result.metric(MetricField::EntriesCash).unwrap();
    assert_eq!(entries.previous, 0.0);
    assert_eq!(entries.delta_pct, 100.0);
    assert!(entries.delta_pct.is_finite());
}

#[test]
fn test_last_preset_resolves_to_previous_month() {
    let resolved = resolve_preset(Preset::Last, month("2025-06-01")).unwrap();
    assert_eq!(resolved, range("2025-05-01", "2025-05-01"));

    let selection = PeriodSelection::new(month("2025-06")).with_preset(Preset::Last);
    assert_eq!(selection.resolve(), resolved);
}

#[test]
fn test_roas_is_none_without_investment() {
    let funnel = vec![FunnelRow {
        month: month("2025-03"),
        invested: 0.0,
        entries: 1200.0,
        saldo: 1200.0,
        ltv_total: 0.0,
        roas: None,
    }];
    let agg = aggregate_funnel(&funnel, &range("2025-03", "2025-03"));
    assert_eq!(agg.roas, None);
    assert_eq!(agg.entries, 1200.0);
}

#[test]
fn test_series_rows_outside_range_are_ignored_regardless_of_order() {
    let mut series = long_series();
    series.reverse();
    let agg = aggregate_kpis(&series, &range("2025-05", "2025-06"));
    assert_eq!(agg.months, 2);
    // Snapshot comes from the latest month, not the last row given.
    assert_eq!(agg.active_contracts, 27);
}
