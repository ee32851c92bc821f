use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    aggregate_funnel, aggregate_kpis, compare, Cents, Client, ClientCrmUpdate, ClientFilter,
    ClientNote, DashboardMetrics, Expense, Goal, MetricField, MonthKey, MonthlyMetricRow,
    PeriodRange, PeriodSelection, Sale,
};
use crate::storage::Repository;

use super::{
    AppError, ClientMonthReport, CompanyDashboardReport, CompanySeries, MonthsOverview,
    RevenueReport, Settings, YearlyReport,
};

/// Metrics compared month over month on the client dashboard.
pub const CLIENT_COMPARISON_FIELDS: [MetricField; 5] = [
    MetricField::EntriesCash,
    MetricField::ExitsChurn,
    MetricField::NetMrr,
    MetricField::AvgTicket,
    MetricField::SalesCount,
];

/// Metrics compared period over period on the company dashboard.
pub const COMPANY_COMPARISON_FIELDS: [MetricField; 2] =
    [MetricField::EntriesCash, MetricField::NetMrr];

/// Months shown by the revenue report.
pub const REVENUE_WINDOW: u32 = 12;

/// Application service for clients, their entries and the dashboards.
/// This is the interface the CLI and the importer work through.
pub struct DashboardService {
    repo: Repository,
    settings: Settings,
}

impl DashboardService {
    pub fn new(repo: Repository, settings: Settings) -> Self {
        Self { repo, settings }
    }

    /// Create (if needed) and migrate the database at `database_path`.
    pub async fn init(database_path: &str, settings: Settings) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, settings))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, settings: Settings) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, settings))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ========================
    // Clients
    // ========================

    pub async fn create_client(
        &self,
        name: &str,
        started_at: NaiveDate,
    ) -> Result<Client, AppError> {
        self.create_client_until(name, started_at, None).await
    }

    /// Register a client whose relationship may already have an end date.
    pub async fn create_client_until(
        &self,
        name: &str,
        started_at: NaiveDate,
        ended_at: Option<NaiveDate>,
    ) -> Result<Client, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("client name cannot be empty".into()));
        }
        check_end_date(started_at, ended_at)?;
        if self.repo.get_client_by_name(name).await?.is_some() {
            return Err(AppError::ClientAlreadyExists(name.to_string()));
        }

        let mut client = Client::new(name.to_string(), started_at);
        if let Some(ended_at) = ended_at {
            client = client.with_ended_at(ended_at);
        }
        self.repo.save_client(&client).await?;
        log::info!("registered client '{}' starting {}", client.name, started_at);
        Ok(client)
    }

    /// Find a client by id or, failing that, by name (case-insensitive).
    pub async fn get_client(&self, key: &str) -> Result<Client, AppError> {
        let key = key.trim();
        let found = match Uuid::parse_str(key) {
            Ok(id) => self.repo.get_client(id).await?,
            Err(_) => self.repo.get_client_by_name(key).await?,
        };
        found.ok_or_else(|| AppError::ClientNotFound(key.to_string()))
    }

    /// Clients matching `filter`, judged active or not as of `as_of`.
    pub async fn list_clients(
        &self,
        filter: &ClientFilter,
        as_of: NaiveDate,
    ) -> Result<Vec<Client>, AppError> {
        let clients = self.repo.list_clients().await?;
        Ok(clients
            .into_iter()
            .filter(|c| filter.matches(c, as_of))
            .collect())
    }

    pub async fn update_client_crm(
        &self,
        key: &str,
        update: ClientCrmUpdate,
    ) -> Result<Client, AppError> {
        if update.is_empty() {
            return Err(AppError::InvalidInput("nothing to update".into()));
        }
        if let Some(day) = update.payment_day.filter(|d| !(1..=31).contains(d)) {
            return Err(AppError::InvalidInput(format!(
                "payment day must be between 1 and 31, got {}",
                day
            )));
        }
        if update.payment_amount.is_some_and(|amount| amount < 0) {
            return Err(AppError::InvalidAmount("payment amount cannot be negative".into()));
        }

        let client = self.get_client(key).await?;
        check_end_date(client.started_at, update.ended_at)?;

        let client = update.apply(client);
        self.repo.update_client(&client).await?;
        log::debug!("updated CRM fields of '{}'", client.name);
        Ok(client)
    }

    // ========================
    // Entries, goals, notes
    // ========================

    pub async fn record_sale(
        &self,
        client: &str,
        amount_cents: Cents,
        occurred_at: NaiveDate,
        description: Option<String>,
    ) -> Result<Sale, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount("sale amount must be positive".into()));
        }
        let client = self.get_client(client).await?;

        let mut sale = Sale::new(client.id, amount_cents, occurred_at);
        if let Some(desc) = description.filter(|d| !d.trim().is_empty()) {
            sale = sale.with_description(desc);
        }
        self.repo.save_sale(&sale).await?;
        log::debug!("sale of {} cents for '{}' on {}", amount_cents, client.name, occurred_at);
        Ok(sale)
    }

    pub async fn record_expense(
        &self,
        client: &str,
        amount_cents: Cents,
        occurred_at: NaiveDate,
        category: Option<String>,
        description: Option<String>,
    ) -> Result<Expense, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount("expense amount must be positive".into()));
        }
        let client = self.get_client(client).await?;

        let mut expense = Expense::new(client.id, amount_cents, occurred_at);
        if let Some(cat) = category.filter(|c| !c.trim().is_empty()) {
            expense = expense.with_category(cat.trim());
        }
        if let Some(desc) = description.filter(|d| !d.trim().is_empty()) {
            expense = expense.with_description(desc);
        }
        self.repo.save_expense(&expense).await?;
        log::debug!(
            "expense of {} cents ({}) for '{}' on {}",
            amount_cents,
            expense.category_or_default(),
            client.name,
            occurred_at
        );
        Ok(expense)
    }

    /// Set the goal for a client and month, replacing any earlier one.
    pub async fn set_goal(
        &self,
        client: &str,
        month: MonthKey,
        amount_cents: Cents,
    ) -> Result<Goal, AppError> {
        if amount_cents < 0 {
            return Err(AppError::InvalidAmount("goal cannot be negative".into()));
        }
        let client = self.get_client(client).await?;

        let goal = Goal {
            client_id: client.id,
            month,
            amount_cents,
        };
        self.repo.upsert_goal(&goal).await?;
        Ok(goal)
    }

    pub async fn add_note(&self, client: &str, content: &str) -> Result<ClientNote, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::InvalidInput("note cannot be empty".into()));
        }
        let client = self.get_client(client).await?;

        let note = ClientNote::new(client.id, content.to_string());
        self.repo.save_note(&note).await?;
        Ok(note)
    }

    /// Notes of a client, newest first.
    pub async fn list_notes(&self, client: &str) -> Result<Vec<ClientNote>, AppError> {
        let client = self.get_client(client).await?;
        Ok(self.repo.list_notes(client.id).await?)
    }

    // ========================
    // Client reports
    // ========================

    async fn client_series(&self, client: &Client) -> Result<Vec<MonthlyMetricRow>, AppError> {
        let inputs = self
            .repo
            .load_series_inputs(Some(client.id), &self.settings.acquisition_category)
            .await?;
        Ok(inputs.monthly_rows())
    }

    /// Dashboard for one client and month, compared with the month before.
    pub async fn client_month_report(
        &self,
        client: &str,
        month: MonthKey,
    ) -> Result<ClientMonthReport, AppError> {
        let client = self.get_client(client).await?;
        let series = self.client_series(&client).await?;

        let row = row_for(&series, month);
        let range = PeriodRange::single(month);
        let current = aggregate_kpis(&series, &range);
        let comparison = compare(&range, &series, &current, &CLIENT_COMPARISON_FIELDS);

        let sales = self.repo.list_sales_for_month(client.id, month).await?;
        let expenses = self.repo.list_expenses_for_month(client.id, month).await?;
        let expenses_by_category = self.repo.expenses_by_category(client.id, month).await?;
        let goal = self.repo.get_goal(client.id, month).await?;

        Ok(ClientMonthReport {
            metrics: DashboardMetrics::from_row(&row),
            client,
            month,
            comparison,
            sales,
            expenses,
            expenses_by_category,
            goal,
        })
    }

    /// Twelve months of `year` for one client, zero-filled, with totals.
    pub async fn client_yearly_report(
        &self,
        client: &str,
        year: i32,
    ) -> Result<YearlyReport, AppError> {
        let client = self.get_client(client).await?;
        let series = self.client_series(&client).await?;
        let range = PeriodRange::calendar_year(year)?;

        Ok(YearlyReport {
            months: range.months().map(|m| row_for(&series, m)).collect(),
            totals: aggregate_kpis(&series, &range),
            client,
            year,
            range,
        })
    }

    /// Lifetime revenue plus the twelve months ending at `anchor`.
    pub async fn client_revenue_report(
        &self,
        client: &str,
        anchor: MonthKey,
    ) -> Result<RevenueReport, AppError> {
        let client = self.get_client(client).await?;
        let range = PeriodRange::trailing(anchor, REVENUE_WINDOW);
        let total_revenue = self.repo.total_revenue(client.id).await?;
        let points = self.repo.revenue_by_month(client.id, &range).await?;

        Ok(RevenueReport {
            client,
            total_revenue,
            range,
            points,
        })
    }

    // ========================
    // Company reports
    // ========================

    /// The full company series, oldest month first.
    pub async fn company_series(&self) -> Result<CompanySeries, AppError> {
        let inputs = self
            .repo
            .load_series_inputs(None, &self.settings.acquisition_category)
            .await?;
        Ok(CompanySeries {
            metrics: inputs.monthly_rows(),
            funnel: inputs.funnel_rows(),
        })
    }

    pub async fn company_dashboard(
        &self,
        selection: &PeriodSelection,
    ) -> Result<CompanyDashboardReport, AppError> {
        let series = self.company_series().await?;
        let range = selection.resolve();
        log::debug!(
            "company dashboard: preset {} resolved to {} over {} series months",
            selection.preset(),
            range,
            series.metrics.len()
        );

        let kpis = aggregate_kpis(&series.metrics, &range);
        let funnel = aggregate_funnel(&series.funnel, &range);
        let comparison = compare(&range, &series.metrics, &kpis, &COMPANY_COMPARISON_FIELDS);

        Ok(CompanyDashboardReport {
            selection: selection.clone(),
            range,
            window_size: range.window_size(),
            kpis,
            funnel,
            comparison,
        })
    }

    /// Latest month's figures plus the rows matching `search` by key prefix
    /// or month name (all rows when blank), newest first.
    pub async fn company_months(&self, search: Option<&str>) -> Result<MonthsOverview, AppError> {
        let series = self.company_series().await?;
        let query = search.unwrap_or("");

        let mut rows: Vec<MonthlyMetricRow> = series
            .metrics
            .iter()
            .filter(|r| r.month.matches_search(query))
            .cloned()
            .collect();
        rows.reverse();

        Ok(MonthsOverview {
            latest: series.metrics.last().cloned(),
            latest_funnel: series.funnel.last().cloned(),
            rows,
        })
    }
}

fn check_end_date(started_at: NaiveDate, ended_at: Option<NaiveDate>) -> Result<(), AppError> {
    match ended_at {
        Some(ended_at) if ended_at < started_at => Err(AppError::InvalidInput(format!(
            "end date {} is before start date {}",
            ended_at, started_at
        ))),
        _ => Ok(()),
    }
}

/// The series row for `month`, or an empty one when the month has no data.
fn row_for(series: &[MonthlyMetricRow], month: MonthKey) -> MonthlyMetricRow {
    series
        .iter()
        .find(|r| r.month == month)
        .cloned()
        .unwrap_or_else(|| MonthlyMetricRow::empty(month))
}
