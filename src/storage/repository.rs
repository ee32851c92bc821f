use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    to_month_key, Cents, Client, ClientCrm, ClientId, ClientNote, Expense, ExpenseByCategory,
    Goal, MonthKey, PeriodRange, RevenuePoint, Sale, UNCATEGORIZED,
};

use super::{ClientSpan, MonthTotals, SeriesInputs, MIGRATION_001_INITIAL};

const CLIENT_COLUMNS: &str = "id, name, started_at, ended_at, created_at, owner_name, owner_phone, owner_email, specialist_name, payment_amount_cents, payment_day, renewal_date";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository for clients, their entries and the monthly series derived from them.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL, e.g. `sqlite:metrica.db?mode=rwc`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Connect and migrate.
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Clients
    // ========================

    pub async fn save_client(&self, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, name, started_at, ended_at, created_at, owner_name, owner_phone, owner_email, specialist_name, payment_amount_cents, payment_day, renewal_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(client.id.to_string())
        .bind(&client.name)
        .bind(format_date(client.started_at))
        .bind(client.ended_at.map(format_date))
        .bind(client.created_at.to_rfc3339())
        .bind(&client.crm.owner_name)
        .bind(&client.crm.owner_phone)
        .bind(&client.crm.owner_email)
        .bind(&client.crm.specialist_name)
        .bind(client.crm.payment_amount)
        .bind(client.crm.payment_day.map(i64::from))
        .bind(client.crm.renewal_date.map(format_date))
        .execute(&self.pool)
        .await
        .context("Failed to save client")?;
        Ok(())
    }

    /// Write back the CRM fields and end date of an existing client.
    pub async fn update_client(&self, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE clients
            SET ended_at = ?, owner_name = ?, owner_phone = ?, owner_email = ?, specialist_name = ?,
                payment_amount_cents = ?, payment_day = ?, renewal_date = ?
            WHERE id = ?
            "#,
        )
        .bind(client.ended_at.map(format_date))
        .bind(&client.crm.owner_name)
        .bind(&client.crm.owner_phone)
        .bind(&client.crm.owner_email)
        .bind(&client.crm.specialist_name)
        .bind(client.crm.payment_amount)
        .bind(client.crm.payment_day.map(i64::from))
        .bind(client.crm.renewal_date.map(format_date))
        .bind(client.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update client")?;
        Ok(())
    }

    pub async fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch client")?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    /// Look a client up by name, ignoring case.
    pub async fn get_client_by_name(&self, name: &str) -> Result<Option<Client>> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE name = ? COLLATE NOCASE"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch client by name")?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    /// All clients, most recently registered first.
    pub async fn list_clients(&self) -> Result<Vec<Client>> {
        let rows = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY created_at DESC, name"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list clients")?;

        rows.iter().map(Self::row_to_client).collect()
    }

    fn row_to_client(row: &SqliteRow) -> Result<Client> {
        let id_str: String = row.get("id");
        let started_at: String = row.get("started_at");
        let ended_at: Option<String> = row.get("ended_at");
        let created_at: String = row.get("created_at");
        let payment_day: Option<i64> = row.get("payment_day");
        let renewal_date: Option<String> = row.get("renewal_date");

        Ok(Client {
            id: Uuid::parse_str(&id_str).context("Invalid client ID")?,
            name: row.get("name"),
            started_at: parse_date(&started_at).context("Invalid started_at date")?,
            ended_at: ended_at
                .as_deref()
                .map(parse_date)
                .transpose()
                .context("Invalid ended_at date")?,
            created_at: parse_timestamp(&created_at)?,
            crm: ClientCrm {
                owner_name: row.get("owner_name"),
                owner_phone: row.get("owner_phone"),
                owner_email: row.get("owner_email"),
                specialist_name: row.get("specialist_name"),
                payment_amount: row.get("payment_amount_cents"),
                payment_day: payment_day
                    .map(u32::try_from)
                    .transpose()
                    .context("Invalid payment day")?,
                renewal_date: renewal_date
                    .as_deref()
                    .map(parse_date)
                    .transpose()
                    .context("Invalid renewal_date")?,
            },
        })
    }

    // ========================
    // Sales and expenses
    // ========================

    pub async fn save_sale(&self, sale: &Sale) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sales (id, client_id, occurred_at, amount_cents, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sale.id.to_string())
        .bind(sale.client_id.to_string())
        .bind(format_date(sale.occurred_at))
        .bind(sale.amount_cents)
        .bind(&sale.description)
        .bind(sale.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save sale")?;
        Ok(())
    }

    pub async fn save_expense(&self, expense: &Expense) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO expenses (id, client_id, occurred_at, amount_cents, category, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(expense.client_id.to_string())
        .bind(format_date(expense.occurred_at))
        .bind(expense.amount_cents)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(expense.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save expense")?;
        Ok(())
    }

    /// Sales of a client within one month, newest first.
    pub async fn list_sales_for_month(&self, client_id: ClientId, month: MonthKey) -> Result<Vec<Sale>> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_id, occurred_at, amount_cents, description, created_at
            FROM sales
            WHERE client_id = ? AND occurred_at >= ? AND occurred_at < ?
            ORDER BY occurred_at DESC, created_at DESC
            "#,
        )
        .bind(client_id.to_string())
        .bind(month.as_iso())
        .bind(month.next().as_iso())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list sales")?;

        rows.iter().map(Self::row_to_sale).collect()
    }

    /// Expenses of a client within one month, newest first.
    pub async fn list_expenses_for_month(
        &self,
        client_id: ClientId,
        month: MonthKey,
    ) -> Result<Vec<Expense>> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_id, occurred_at, amount_cents, category, description, created_at
            FROM expenses
            WHERE client_id = ? AND occurred_at >= ? AND occurred_at < ?
            ORDER BY occurred_at DESC, created_at DESC
            "#,
        )
        .bind(client_id.to_string())
        .bind(month.as_iso())
        .bind(month.next().as_iso())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    /// Expense totals per category for one client and month, largest first.
    /// Blank categories are grouped under `Outros`.
    pub async fn expenses_by_category(
        &self,
        client_id: ClientId,
        month: MonthKey,
    ) -> Result<Vec<ExpenseByCategory>> {
        let rows = sqlx::query(
            r#"
            SELECT COALESCE(NULLIF(TRIM(category), ''), ?) AS category,
                   COALESCE(SUM(amount_cents), 0) AS total
            FROM expenses
            WHERE client_id = ? AND occurred_at >= ? AND occurred_at < ?
            GROUP BY 1
            ORDER BY total DESC, category
            "#,
        )
        .bind(UNCATEGORIZED)
        .bind(client_id.to_string())
        .bind(month.as_iso())
        .bind(month.next().as_iso())
        .fetch_all(&self.pool)
        .await
        .context("Failed to group expenses by category")?;

        Ok(rows
            .iter()
            .map(|row| ExpenseByCategory {
                category: row.get("category"),
                total: row.get("total"),
            })
            .collect())
    }

    fn row_to_sale(row: &SqliteRow) -> Result<Sale> {
        let id_str: String = row.get("id");
        let client_id_str: String = row.get("client_id");
        let occurred_at: String = row.get("occurred_at");
        let created_at: String = row.get("created_at");

        Ok(Sale {
            id: Uuid::parse_str(&id_str).context("Invalid sale ID")?,
            client_id: Uuid::parse_str(&client_id_str).context("Invalid client ID")?,
            occurred_at: parse_date(&occurred_at).context("Invalid sale date")?,
            amount_cents: row.get("amount_cents"),
            description: row.get("description"),
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_expense(row: &SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let client_id_str: String = row.get("client_id");
        let occurred_at: String = row.get("occurred_at");
        let created_at: String = row.get("created_at");

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            client_id: Uuid::parse_str(&client_id_str).context("Invalid client ID")?,
            occurred_at: parse_date(&occurred_at).context("Invalid expense date")?,
            amount_cents: row.get("amount_cents"),
            category: row.get("category"),
            description: row.get("description"),
            created_at: parse_timestamp(&created_at)?,
        })
    }

    // ========================
    // Goals
    // ========================

    /// Insert or replace the goal for `(client_id, month)`.
    pub async fn upsert_goal(&self, goal: &Goal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO goals (client_id, month, amount_cents)
            VALUES (?, ?, ?)
            ON CONFLICT (client_id, month) DO UPDATE SET amount_cents = excluded.amount_cents
            "#,
        )
        .bind(goal.client_id.to_string())
        .bind(goal.month.as_iso())
        .bind(goal.amount_cents)
        .execute(&self.pool)
        .await
        .context("Failed to save goal")?;
        Ok(())
    }

    pub async fn get_goal(&self, client_id: ClientId, month: MonthKey) -> Result<Option<Goal>> {
        let row = sqlx::query(
            "SELECT amount_cents FROM goals WHERE client_id = ? AND month = ?",
        )
        .bind(client_id.to_string())
        .bind(month.as_iso())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch goal")?;

        Ok(row.map(|row| Goal {
            client_id,
            month,
            amount_cents: row.get("amount_cents"),
        }))
    }

    // ========================
    // Notes
    // ========================

    pub async fn save_note(&self, note: &ClientNote) -> Result<()> {
        sqlx::query(
            "INSERT INTO client_notes (id, client_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(note.id.to_string())
        .bind(note.client_id.to_string())
        .bind(&note.content)
        .bind(note.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save note")?;
        Ok(())
    }

    /// Notes of a client, newest first.
    pub async fn list_notes(&self, client_id: ClientId) -> Result<Vec<ClientNote>> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_id, content, created_at
            FROM client_notes
            WHERE client_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list notes")?;

        rows.iter()
            .map(|row| -> Result<ClientNote> {
                let id_str: String = row.get("id");
                let created_at: String = row.get("created_at");
                Ok(ClientNote {
                    id: Uuid::parse_str(&id_str).context("Invalid note ID")?,
                    client_id,
                    content: row.get("content"),
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    // ========================
    // Revenue
    // ========================

    /// Lifetime sales total of a client.
    pub async fn total_revenue(&self, client_id: ClientId) -> Result<Cents> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount_cents), 0) AS total FROM sales WHERE client_id = ?",
        )
        .bind(client_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute total revenue")?;

        Ok(row.get("total"))
    }

    /// Sales totals per month over `range`, one point per month, zero-filled.
    pub async fn revenue_by_month(
        &self,
        client_id: ClientId,
        range: &PeriodRange,
    ) -> Result<Vec<RevenuePoint>> {
        let rows = sqlx::query(
            r#"
            SELECT strftime('%Y-%m-01', occurred_at) AS month,
                   COALESCE(SUM(amount_cents), 0) AS total,
                   COUNT(*) AS cnt
            FROM sales
            WHERE client_id = ? AND occurred_at >= ? AND occurred_at < ?
            GROUP BY month
            "#,
        )
        .bind(client_id.to_string())
        .bind(range.from().as_iso())
        .bind(range.to().next().as_iso())
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute revenue by month")?;

        let totals = rows
            .iter()
            .map(Self::row_to_month_totals)
            .collect::<Result<Vec<_>>>()?;

        Ok(range
            .months()
            .map(|month| RevenuePoint {
                month,
                total: totals
                    .iter()
                    .find(|t| t.month == month)
                    .map_or(0, |t| t.total_cents),
            })
            .collect())
    }

    // ========================
    // Monthly series
    // ========================

    /// Grouped per-month figures for the whole company, or for one client
    /// when `scope` is set.
    pub async fn load_series_inputs(
        &self,
        scope: Option<ClientId>,
        acquisition_category: &str,
    ) -> Result<SeriesInputs> {
        let scope = scope.map(|id| id.to_string());

        let sales = self
            .month_totals(
                r#"
                SELECT strftime('%Y-%m-01', occurred_at) AS month,
                       COALESCE(SUM(amount_cents), 0) AS total, COUNT(*) AS cnt
                FROM sales
                WHERE (? IS NULL OR client_id = ?)
                GROUP BY month ORDER BY month
                "#,
                &scope,
                None,
            )
            .await
            .context("Failed to group sales by month")?;

        let expenses = self
            .month_totals(
                r#"
                SELECT strftime('%Y-%m-01', occurred_at) AS month,
                       COALESCE(SUM(amount_cents), 0) AS total, COUNT(*) AS cnt
                FROM expenses
                WHERE (? IS NULL OR client_id = ?)
                GROUP BY month ORDER BY month
                "#,
                &scope,
                None,
            )
            .await
            .context("Failed to group expenses by month")?;

        let acquisition = self
            .month_totals(
                r#"
                SELECT strftime('%Y-%m-01', occurred_at) AS month,
                       COALESCE(SUM(amount_cents), 0) AS total, COUNT(*) AS cnt
                FROM expenses
                WHERE (? IS NULL OR client_id = ?) AND TRIM(category) = ? COLLATE NOCASE
                GROUP BY month ORDER BY month
                "#,
                &scope,
                Some(acquisition_category),
            )
            .await
            .context("Failed to group acquisition expenses by month")?;

        let goals = self
            .month_totals(
                r#"
                SELECT month, COALESCE(SUM(amount_cents), 0) AS total, COUNT(*) AS cnt
                FROM goals
                WHERE (? IS NULL OR client_id = ?)
                GROUP BY month ORDER BY month
                "#,
                &scope,
                None,
            )
            .await
            .context("Failed to group goals by month")?;

        let cohort_ltv = self
            .month_totals(
                r#"
                SELECT strftime('%Y-%m-01', c.started_at) AS month,
                       COALESCE(SUM(s.amount_cents), 0) AS total, COUNT(s.id) AS cnt
                FROM clients c
                JOIN sales s ON s.client_id = c.id
                WHERE (? IS NULL OR c.id = ?)
                GROUP BY month ORDER BY month
                "#,
                &scope,
                None,
            )
            .await
            .context("Failed to compute cohort LTV")?;

        let rows = sqlx::query(
            "SELECT started_at, ended_at FROM clients WHERE (? IS NULL OR id = ?)",
        )
        .bind(scope.as_deref())
        .bind(scope.as_deref())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load client spans")?;

        let clients = rows
            .iter()
            .map(|row| -> Result<ClientSpan> {
                let started_at: String = row.get("started_at");
                let ended_at: Option<String> = row.get("ended_at");
                Ok(ClientSpan {
                    started_at: parse_date(&started_at).context("Invalid started_at date")?,
                    ended_at: ended_at
                        .as_deref()
                        .map(parse_date)
                        .transpose()
                        .context("Invalid ended_at date")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "series inputs: {} sale months, {} expense months, {} goal months, {} clients",
            sales.len(),
            expenses.len(),
            goals.len(),
            clients.len()
        );

        Ok(SeriesInputs {
            sales,
            expenses,
            goals,
            acquisition,
            cohort_ltv,
            clients,
        })
    }

    /// Run a grouped query selecting `month`, `total` and `cnt`. The query
    /// binds the scope twice, then `extra` if given.
    async fn month_totals(
        &self,
        sql: &str,
        scope: &Option<String>,
        extra: Option<&str>,
    ) -> Result<Vec<MonthTotals>> {
        let mut query = sqlx::query(sql).bind(scope.as_deref()).bind(scope.as_deref());
        if let Some(extra) = extra {
            query = query.bind(extra);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_month_totals).collect()
    }

    fn row_to_month_totals(row: &SqliteRow) -> Result<MonthTotals> {
        let month: String = row.get("month");
        Ok(MonthTotals {
            month: to_month_key(&month).context("Invalid month in grouped query")?,
            total_cents: row.get("total"),
            count: row.get("cnt"),
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("Invalid date: {}", s))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .context("Invalid timestamp")?
        .with_timezone(&Utc))
}
