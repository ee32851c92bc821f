use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::application::{
    ClientMonthReport, CompanyDashboardReport, DashboardService, MonthsOverview, RevenueReport,
    Settings, YearlyReport, DEFAULT_ACQUISITION_CATEGORY,
};
use crate::domain::{
    format_amount, format_cents, format_pct, parse_cents, to_month_key, AggregateKpis, Client,
    ClientCrmUpdate, ClientFilter, ClientStatus, ComparisonResult, MetricComparison, MonthKey,
    PeriodSelection, Preset,
};

/// Metrica - client financial dashboard
#[derive(Parser)]
#[command(name = "metrica")]
#[command(about = "Track client sales, expenses and goals, and compare KPIs across periods")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "METRICA_DATABASE", default_value = "metrica.db")]
    pub database: String,

    /// Expense category counted as acquisition investment in the funnel
    #[arg(
        long,
        env = "METRICA_ACQUISITION_CATEGORY",
        default_value = DEFAULT_ACQUISITION_CATEGORY
    )]
    pub acquisition_category: String,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Client management commands
    #[command(subcommand)]
    Client(ClientCommands),

    /// Record a sale for a client
    Sale {
        /// Client name or ID
        client: String,

        /// Amount (e.g., "1500.00", "1500" or "1500,00")
        amount: String,

        /// Date of the sale (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Record an expense for a client
    Expense {
        /// Client name or ID
        client: String,

        /// Amount (e.g., "300.00")
        amount: String,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Category (uncategorized expenses are grouped under "Outros")
        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Set the monthly revenue goal for a client
    Goal {
        /// Client name or ID
        client: String,

        /// Goal amount; 0 clears the goal
        amount: String,

        /// Month (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },

    /// Client dashboard for one month, compared with the previous month
    Dashboard {
        /// Client name or ID
        client: String,

        /// Month (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Month-by-month view of one client for a calendar year
    Yearly {
        /// Client name or ID
        client: String,

        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Lifetime revenue and the last 12 months of a client
    Revenue {
        /// Client name or ID
        client: String,

        /// Last month of the 12-month window (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Company-wide KPIs for a period, compared with the period before
    Company {
        #[command(flatten)]
        period: PeriodArgs,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Company month rows, latest month first
    Months {
        /// Month key prefix to search for (e.g., "2025" or "2025-03")
        #[arg(short, long)]
        search: Option<String>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: series, funnel, clients, company
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Import data from CSV
    Import {
        /// What to import: entries
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,

        /// Register clients that don't exist yet
        #[arg(long)]
        create_clients: bool,
    },
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a new client
    Add {
        /// Client name (must be unique)
        name: String,

        /// Start of the relationship (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        since: Option<String>,

        /// End of the relationship, for clients that already left (YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
    },

    /// List clients
    List {
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,

        /// Status filter: all, active, inactive
        #[arg(long, default_value = "all")]
        status: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show client details
    Show {
        /// Client name or ID
        client: String,
    },

    /// Update CRM fields; only the given fields change
    Crm {
        /// Client name or ID
        client: String,

        #[arg(long)]
        owner_name: Option<String>,

        #[arg(long)]
        owner_phone: Option<String>,

        #[arg(long)]
        owner_email: Option<String>,

        #[arg(long)]
        specialist: Option<String>,

        /// Recurring fee amount
        #[arg(long)]
        payment_amount: Option<String>,

        /// Day of the month the fee is due (1-31)
        #[arg(long)]
        payment_day: Option<u32>,

        /// Contract renewal date (YYYY-MM-DD)
        #[arg(long)]
        renewal_date: Option<String>,

        /// End of the relationship (YYYY-MM-DD)
        #[arg(long)]
        ended_at: Option<String>,
    },

    /// Add a note to a client
    Note {
        /// Client name or ID
        client: String,

        content: String,
    },

    /// List a client's notes, newest first
    Notes {
        /// Client name or ID
        client: String,
    },
}

/// Period selection flags shared by the company views.
#[derive(Args, Debug, Clone, Default)]
pub struct PeriodArgs {
    /// Reference month (YYYY-MM, defaults to the current month)
    #[arg(long)]
    pub month: Option<String>,

    /// Period preset: current, last, 3m, 6m, 12m, custom (default 12m)
    #[arg(long)]
    pub preset: Option<String>,

    /// Month the preset resolves against (defaults to the reference month)
    #[arg(long)]
    pub anchor: Option<String>,

    /// First month of a custom period (YYYY-MM)
    #[arg(long)]
    pub from: Option<String>,

    /// Last month of a custom period (YYYY-MM)
    #[arg(long)]
    pub to: Option<String>,
}

impl PeriodArgs {
    /// Build the selection. Giving `--from`/`--to` without a preset selects `custom`.
    pub fn selection(&self, today: NaiveDate) -> Result<PeriodSelection> {
        let month = parse_month_or(self.month.as_deref(), today)?;
        let mut selection = PeriodSelection::new(month);

        let preset = match (&self.preset, &self.from, &self.to) {
            (Some(p), _, _) => Preset::parse(p)?,
            (None, Some(_), _) | (None, _, Some(_)) => Preset::Custom,
            (None, None, None) => Preset::default(),
        };
        selection.set_preset(preset);

        if let Some(anchor) = &self.anchor {
            selection.set_anchor(parse_month(anchor)?);
        }

        match (&self.from, &self.to) {
            (Some(from), Some(to)) => selection.set_custom(parse_month(from)?, parse_month(to)?)?,
            (None, None) => {}
            _ => anyhow::bail!("A custom period needs both --from and --to"),
        }

        Ok(selection)
    }
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings::default().with_acquisition_category(&self.acquisition_category)
    }

    pub async fn run(self) -> Result<()> {
        let today = Local::now().date_naive();
        let settings = self.settings();

        match self.command {
            Commands::Init => {
                DashboardService::init(&self.database, settings).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Client(client_cmd) => {
                let service = DashboardService::connect(&self.database, settings).await?;
                run_client_command(&service, client_cmd, today).await?;
            }

            Commands::Sale {
                client,
                amount,
                date,
                description,
            } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                let amount_cents = parse_amount(&amount)?;
                let date = parse_date_or(date.as_deref(), today)?;

                let sale = service
                    .record_sale(&client, amount_cents, date, description)
                    .await?;
                println!(
                    "Recorded sale: {} for {} on {} ({})",
                    format_cents(sale.amount_cents),
                    client,
                    sale.occurred_at,
                    sale.id
                );
            }

            Commands::Expense {
                client,
                amount,
                date,
                category,
                description,
            } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                let amount_cents = parse_amount(&amount)?;
                let date = parse_date_or(date.as_deref(), today)?;

                let expense = service
                    .record_expense(&client, amount_cents, date, category, description)
                    .await?;
                println!(
                    "Recorded expense: {} [{}] for {} on {} ({})",
                    format_cents(expense.amount_cents),
                    expense.category_or_default(),
                    client,
                    expense.occurred_at,
                    expense.id
                );
            }

            Commands::Goal {
                client,
                amount,
                month,
            } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                let amount_cents = parse_amount(&amount)?;
                let month = parse_month_or(month.as_deref(), today)?;

                let goal = service.set_goal(&client, month, amount_cents).await?;
                println!(
                    "Goal for {} in {}: {}",
                    client,
                    goal.month,
                    format_cents(goal.amount_cents)
                );
            }

            Commands::Dashboard {
                client,
                month,
                format,
            } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                let month = parse_month_or(month.as_deref(), today)?;
                let report = service.client_month_report(&client, month).await?;
                print_client_month(&report, &format, today)?;
            }

            Commands::Yearly {
                client,
                year,
                format,
            } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                let report = service
                    .client_yearly_report(&client, year.unwrap_or(today.year()))
                    .await?;
                print_yearly(&report, &format)?;
            }

            Commands::Revenue {
                client,
                month,
                format,
            } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                let anchor = parse_month_or(month.as_deref(), today)?;
                let report = service.client_revenue_report(&client, anchor).await?;
                print_revenue(&report, &format)?;
            }

            Commands::Company { period, format } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                let selection = period.selection(today)?;
                let report = service.company_dashboard(&selection).await?;
                print_company(&report, &format)?;
            }

            Commands::Months { search, format } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                let overview = service.company_months(search.as_deref()).await?;
                print_months(&overview, &format)?;
            }

            Commands::Export {
                export_type,
                output,
                period,
            } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                run_export_command(&service, &export_type, output.as_deref(), &period, today)
                    .await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
                create_clients,
            } => {
                let service = DashboardService::connect(&self.database, settings).await?;
                run_import_command(&service, &import_type, input.as_deref(), dry_run, create_clients)
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_client_command(
    service: &DashboardService,
    cmd: ClientCommands,
    today: NaiveDate,
) -> Result<()> {
    match cmd {
        ClientCommands::Add { name, since, until } => {
            let started_at = parse_date_or(since.as_deref(), today)?;
            let ended_at = until.as_deref().map(parse_date).transpose()?;
            let client = service.create_client_until(&name, started_at, ended_at).await?;
            println!("Registered client: {} since {} ({})", client.name, client.started_at, client.id);
        }

        ClientCommands::List {
            search,
            status,
            format,
        } => {
            let status = ClientStatus::from_str(&status).ok_or_else(|| {
                anyhow::anyhow!("Invalid status '{}'. Valid: all, active, inactive", status)
            })?;
            let filter = ClientFilter { search, status };
            let clients = service.list_clients(&filter, today).await?;

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&clients)?),
                "csv" => write_csv(clients.iter().map(|c| ClientCsvRow::new(c, today)))?,
                _ => {
                    if clients.is_empty() {
                        println!("No clients found.");
                        return Ok(());
                    }
                    println!(
                        "{:<24} {:<12} {:<12} {:<10} {:>8}",
                        "NAME", "SINCE", "UNTIL", "STATUS", "MONTHS"
                    );
                    println!("{}", "-".repeat(70));
                    for client in &clients {
                        println!(
                            "{:<24} {:<12} {:<12} {:<10} {:>8}",
                            truncate(&client.name, 24),
                            client.started_at.to_string(),
                            client.ended_at.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                            if client.is_active(today) { "active" } else { "inactive" },
                            client.tenure_months(today)
                        );
                    }
                }
            }
        }

        ClientCommands::Show { client } => {
            let client = service.get_client(&client).await?;
            let crm = &client.crm;

            println!("Client: {}", client.name);
            println!("  ID:             {}", client.id);
            println!("  Since:          {}", client.started_at);
            if let Some(ended) = client.ended_at {
                println!("  Until:          {}", ended);
            }
            println!(
                "  Status:         {} ({} months)",
                if client.is_active(today) { "active" } else { "inactive" },
                client.tenure_months(today)
            );
            let optional = [
                ("Owner", crm.owner_name.clone()),
                ("Phone", crm.owner_phone.clone()),
                ("Email", crm.owner_email.clone()),
                ("Specialist", crm.specialist_name.clone()),
                ("Fee", crm.payment_amount.map(format_cents)),
                ("Due day", crm.payment_day.map(|d| d.to_string())),
                ("Renewal", crm.renewal_date.map(|d| d.to_string())),
            ];
            for (label, value) in optional {
                if let Some(value) = value {
                    println!("  {:<15} {}", format!("{}:", label), value);
                }
            }
        }

        ClientCommands::Crm {
            client,
            owner_name,
            owner_phone,
            owner_email,
            specialist,
            payment_amount,
            payment_day,
            renewal_date,
            ended_at,
        } => {
            let update = ClientCrmUpdate {
                owner_name,
                owner_phone,
                owner_email,
                specialist_name: specialist,
                payment_amount: payment_amount.as_deref().map(parse_amount).transpose()?,
                payment_day,
                renewal_date: renewal_date.as_deref().map(parse_date).transpose()?,
                ended_at: ended_at.as_deref().map(parse_date).transpose()?,
            };
            let client = service.update_client_crm(&client, update).await?;
            println!("Updated client: {}", client.name);
        }

        ClientCommands::Note { client, content } => {
            let note = service.add_note(&client, &content).await?;
            println!("Added note to {} ({})", client, note.id);
        }

        ClientCommands::Notes { client } => {
            let notes = service.list_notes(&client).await?;
            if notes.is_empty() {
                println!("No notes for {}.", client);
            }
            for note in notes {
                println!("[{}] {}", note.created_at.format("%Y-%m-%d %H:%M"), note.content);
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &DashboardService,
    export_type: &str,
    output: Option<&str>,
    period: &PeriodArgs,
    today: NaiveDate,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "series" => {
            let count = exporter.export_series_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} months", count);
            }
        }
        "funnel" => {
            let count = exporter.export_funnel_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} funnel months", count);
            }
        }
        "clients" => {
            let count = exporter.export_clients_csv(writer, today).await?;
            if output.is_some() {
                eprintln!("Exported {} clients", count);
            }
        }
        "company" => {
            let selection = period.selection(today)?;
            let report = exporter.export_company_json(writer, &selection).await?;
            if output.is_some() {
                eprintln!("Exported company dashboard for {}", report.range);
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: series, funnel, clients, company",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &DashboardService,
    import_type: &str,
    input: Option<&str>,
    dry_run: bool,
    create_clients: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{stdin, Read};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        create_clients,
    };

    let result = match import_type {
        "entries" => importer.import_entries_csv(reader, options).await?,
        _ => {
            anyhow::bail!("Invalid import type '{}'. Valid types: entries", import_type);
        }
    };

    if dry_run {
        println!("Validation complete (nothing written)");
    } else {
        println!("Import complete");
    }
    println!("  Imported:        {}", result.imported);
    println!("  Clients created: {}", result.created_clients);
    println!("  Errors:          {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

// ========================
// Report rendering
// ========================

/// Flat comparison row for CSV output.
#[derive(Serialize)]
struct ComparisonCsvRow {
    metric: &'static str,
    current: f64,
    previous: f64,
    delta_abs: f64,
    delta_pct: f64,
    avg_3: Option<f64>,
    avg_6: Option<f64>,
    avg_12: Option<f64>,
}

impl From<&MetricComparison> for ComparisonCsvRow {
    fn from(m: &MetricComparison) -> Self {
        Self {
            metric: m.metric.label(),
            current: m.current,
            previous: m.previous,
            delta_abs: m.delta_abs,
            delta_pct: m.delta_pct,
            avg_3: m.rolling.avg_3,
            avg_6: m.rolling.avg_6,
            avg_12: m.rolling.avg_12,
        }
    }
}

#[derive(Serialize)]
struct ClientCsvRow<'a> {
    name: &'a str,
    started_at: NaiveDate,
    ended_at: Option<NaiveDate>,
    status: &'static str,
}

impl<'a> ClientCsvRow<'a> {
    fn new(client: &'a Client, today: NaiveDate) -> Self {
        Self {
            name: &client.name,
            started_at: client.started_at,
            ended_at: client.ended_at,
            status: if client.is_active(today) { "active" } else { "inactive" },
        }
    }
}

#[derive(Serialize)]
struct RevenueCsvRow {
    month: MonthKey,
    total: String,
}

fn write_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<()> {
    write_csv_to(std::io::stdout(), rows)
}

fn write_csv_to<W: std::io::Write, T: Serialize>(
    out: W,
    rows: impl IntoIterator<Item = T>,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_client_month(report: &ClientMonthReport, format: &str, today: NaiveDate) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        "csv" => write_csv(report.comparison.metrics.iter().map(ComparisonCsvRow::from))?,
        _ => {
            let m = &report.metrics;
            println!("Client dashboard: {}", report.client.name);
            println!(
                "Month: {}   Status: {}",
                report.month,
                if report.client.is_active(today) { "active" } else { "inactive" }
            );
            println!();
            println!("Entries:         {:>14}", format_amount(m.entries));
            println!("Exits:           {:>14}", format_amount(m.exits));
            println!("Net:             {:>14}", format_amount(m.net));
            println!(
                "Average ticket:  {:>14}",
                m.avg_ticket.map(format_amount).unwrap_or_else(|| "-".into())
            );
            println!("Sales:           {:>14}", m.sales_count);
            if m.goal_amount > 0.0 {
                println!(
                    "Goal:            {:>14} ({}, {})",
                    format_amount(m.goal_amount),
                    format_pct(m.goal_pct),
                    m.goal_status
                );
            } else {
                println!("Goal:            {:>14}", m.goal_status.as_str());
            }
            println!();
            print_comparison_table(&report.comparison);

            if !report.expenses_by_category.is_empty() {
                println!();
                println!("Expenses by category:");
                for cat in &report.expenses_by_category {
                    println!("  {:<20} {:>12}", truncate(&cat.category, 20), format_cents(cat.total));
                }
            }

            if !report.sales.is_empty() {
                println!();
                println!("Sales:");
                for sale in &report.sales {
                    println!(
                        "  {}  {:>12}  {}",
                        sale.occurred_at,
                        format_cents(sale.amount_cents),
                        sale.description.as_deref().unwrap_or("")
                    );
                }
            }

            if !report.expenses.is_empty() {
                println!();
                println!("Expenses:");
                for expense in &report.expenses {
                    println!(
                        "  {}  {:>12}  {:<14} {}",
                        expense.occurred_at,
                        format_cents(expense.amount_cents),
                        truncate(expense.category_or_default(), 14),
                        expense.description.as_deref().unwrap_or("")
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_yearly(report: &YearlyReport, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        "csv" => write_csv(&report.months)?,
        _ => {
            println!("Yearly view: {} ({})", report.client.name, report.year);
            println!();
            println!(
                "{:<12} {:>12} {:>12} {:>12} {:>7} {:>9}",
                "MONTH", "ENTRIES", "EXITS", "NET", "SALES", "GOAL %"
            );
            println!("{}", "-".repeat(68));
            for row in &report.months {
                println!(
                    "{:<12} {:>12} {:>12} {:>12} {:>7} {:>9}",
                    row.month.to_string(),
                    format_amount(row.entries_cash),
                    format_amount(row.exits_churn),
                    format_amount(row.net_mrr),
                    row.sales_count.unwrap_or(0),
                    format_pct(row.goal_pct)
                );
            }
            println!("{}", "-".repeat(68));
            let t = &report.totals;
            println!(
                "{:<12} {:>12} {:>12} {:>12} {:>7} {:>9}",
                "TOTAL",
                format_amount(t.entries_cash),
                format_amount(t.exits_churn),
                format_amount(t.net_mrr),
                t.sales_count,
                format_pct(t.goal_pct)
            );
        }
    }
    Ok(())
}

fn print_revenue(report: &RevenueReport, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        "csv" => write_csv(report.points.iter().map(|p| RevenueCsvRow {
            month: p.month,
            total: format_cents(p.total),
        }))?,
        _ => {
            println!("Revenue: {}", report.client.name);
            println!("Lifetime total: {}", format_cents(report.total_revenue));
            println!("Last 12 months ({}): {}", report.range, format_cents(report.period_total()));
            println!();
            for point in &report.points {
                println!("  {:<12} {:>12}", point.month.to_string(), format_cents(point.total));
            }
        }
    }
    Ok(())
}

fn print_company(report: &CompanyDashboardReport, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        "csv" => write_csv(report.comparison.metrics.iter().map(ComparisonCsvRow::from))?,
        _ => {
            println!("Company dashboard");
            println!(
                "Period: {} ({} months, preset {})",
                report.range,
                report.window_size,
                report.selection.preset()
            );
            println!("Compared with: {}", report.comparison.previous_range);
            println!();
            print_kpis(&report.kpis);

            let f = &report.funnel;
            println!();
            println!("Acquisition funnel:");
            println!("  Invested:      {:>14}", format_amount(f.invested));
            println!("  Entries:       {:>14}", format_amount(f.entries));
            println!("  Balance:       {:>14}", format_amount(f.saldo));
            println!("  Cohort LTV:    {:>14}", format_amount(f.ltv_total));
            println!(
                "  ROAS:          {:>14}",
                f.roas.map(|r| format!("{:.2}x", r)).unwrap_or_else(|| "-".into())
            );
            println!();
            print_comparison_table(&report.comparison);
        }
    }
    Ok(())
}

fn print_months(overview: &MonthsOverview, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(overview)?),
        "csv" => write_csv(&overview.rows)?,
        _ => {
            match &overview.latest {
                Some(latest) => {
                    println!("Latest month: {}", latest.month);
                    println!(
                        "  Entries {}  Net {}  Active contracts {}",
                        format_amount(latest.entries_cash),
                        format_amount(latest.net_mrr),
                        latest.active_contracts.unwrap_or(0)
                    );
                    if let Some(funnel) = &overview.latest_funnel {
                        println!(
                            "  Invested {}  ROAS {}",
                            format_amount(funnel.invested),
                            funnel.roas.map(|r| format!("{:.2}x", r)).unwrap_or_else(|| "-".into())
                        );
                    }
                }
                None => {
                    println!("No data yet.");
                    return Ok(());
                }
            }
            println!();
            println!(
                "{:<12} {:>5} {:>5} {:>12} {:>12} {:>12} {:>9} {:>7}",
                "MONTH", "IN", "OUT", "ENTRIES", "EXITS", "NET", "GOAL %", "ACTIVE"
            );
            println!("{}", "-".repeat(82));
            for row in &overview.rows {
                println!(
                    "{:<12} {:>5} {:>5} {:>12} {:>12} {:>12} {:>9} {:>7}",
                    row.month.to_string(),
                    row.clients_entered,
                    row.clients_left,
                    format_amount(row.entries_cash),
                    format_amount(row.exits_churn),
                    format_amount(row.net_mrr),
                    format_pct(row.goal_pct),
                    row.active_contracts.unwrap_or(0)
                );
            }
        }
    }
    Ok(())
}

fn print_kpis(k: &AggregateKpis) {
    println!("Entries:          {:>14}", format_amount(k.entries_cash));
    println!("Exits:            {:>14}", format_amount(k.exits_churn));
    println!("Net:              {:>14}", format_amount(k.net_mrr));
    println!(
        "Average ticket:   {:>14}",
        k.avg_ticket.map(format_amount).unwrap_or_else(|| "-".into())
    );
    println!("Sales:            {:>14}", k.sales_count);
    println!(
        "Goal:             {:>14} ({} reached, gap {})",
        format_amount(k.goal_amount),
        format_pct(k.goal_pct),
        format_amount(k.goal_gap)
    );
    println!(
        "Clients:          {:>14}",
        format!("+{} / -{} = {}", k.clients_entered, k.clients_left, k.clients_balance)
    );
    println!("Active contracts: {:>14}", k.active_contracts);
}

fn print_comparison_table(comparison: &ComparisonResult) {
    println!(
        "{:<16} {:>12} {:>12} {:>12} {:>9} {:>12} {:>12} {:>12}",
        "METRIC", "CURRENT", "PREVIOUS", "CHANGE", "CHANGE %", "AVG 3", "AVG 6", "AVG 12"
    );
    println!("{}", "-".repeat(104));
    for m in &comparison.metrics {
        let value = |v: f64| {
            if m.metric.is_monetary() {
                format_amount(v)
            } else {
                format!("{:.0}", v)
            }
        };
        let rolling = |v: Option<f64>| v.map(|v| value(v)).unwrap_or_else(|| "-".into());
        println!(
            "{:<16} {:>12} {:>12} {:>12} {:>9} {:>12} {:>12} {:>12}",
            m.metric.label(),
            value(m.current),
            value(m.previous),
            value(m.delta_abs),
            format_pct(Some(m.delta_pct)),
            rolling(m.rolling.avg_3),
            rolling(m.rolling.avg_6),
            rolling(m.rolling.avg_12)
        );
    }
}

// ========================
// Parsing helpers
// ========================

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn parse_amount(input: &str) -> Result<i64> {
    parse_cents(input).context("Invalid amount format. Use '50.00', '50,00' or '50'")
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}

fn parse_date_or(date_str: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    date_str.map(parse_date).unwrap_or(Ok(today))
}

fn parse_month(month_str: &str) -> Result<MonthKey> {
    to_month_key(month_str).with_context(|| format!("Invalid month '{}'. Use YYYY-MM", month_str))
}

fn parse_month_or(month_str: Option<&str>, today: NaiveDate) -> Result<MonthKey> {
    match month_str {
        Some(s) => parse_month(s),
        None => Ok(MonthKey::from_date(today)),
    }
}
