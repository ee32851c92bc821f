use serde::Serialize;

use crate::domain::{
    AggregateKpis, Cents, Client, ComparisonResult, DashboardMetrics, Expense, ExpenseByCategory,
    FunnelAggregate, FunnelRow, Goal, MonthKey, MonthlyMetricRow, PeriodRange, PeriodSelection,
    RevenuePoint, Sale,
};

/// One client's month: KPIs, the comparison against the previous month and
/// the entries behind them.
#[derive(Debug, Clone, Serialize)]
pub struct ClientMonthReport {
    pub client: Client,
    pub month: MonthKey,
    pub metrics: DashboardMetrics,
    pub comparison: ComparisonResult,
    pub sales: Vec<Sale>,
    pub expenses: Vec<Expense>,
    pub expenses_by_category: Vec<ExpenseByCategory>,
    pub goal: Option<Goal>,
}

/// Twelve zero-filled months of one client plus the year's totals.
#[derive(Debug, Clone, Serialize)]
pub struct YearlyReport {
    pub client: Client,
    pub year: i32,
    pub range: PeriodRange,
    pub months: Vec<MonthlyMetricRow>,
    pub totals: AggregateKpis,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub client: Client,
    /// Sales over the whole relationship.
    pub total_revenue: Cents,
    pub range: PeriodRange,
    pub points: Vec<RevenuePoint>,
}

impl RevenueReport {
    pub fn period_total(&self) -> Cents {
        self.points.iter().map(|p| p.total).sum()
    }
}

/// Company-wide KPIs for a resolved period selection.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyDashboardReport {
    pub selection: PeriodSelection,
    pub range: PeriodRange,
    pub window_size: u32,
    pub kpis: AggregateKpis,
    pub funnel: FunnelAggregate,
    pub comparison: ComparisonResult,
}

/// Latest month plus the month rows matching a search.
#[derive(Debug, Clone, Serialize)]
pub struct MonthsOverview {
    pub latest: Option<MonthlyMetricRow>,
    pub latest_funnel: Option<FunnelRow>,
    pub rows: Vec<MonthlyMetricRow>,
}

/// The full monthly and funnel series, oldest month first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanySeries {
    pub metrics: Vec<MonthlyMetricRow>,
    pub funnel: Vec<FunnelRow>,
}
