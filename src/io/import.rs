use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;

use crate::application::{AppError, DashboardService};
use crate::domain::{parse_cents, Cents};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub created_clients: usize,
    pub errors: Vec<ImportError>,
}

/// A line that could not be imported
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate every line but write nothing.
    pub dry_run: bool,
    /// Register unknown clients, starting on the entry date.
    pub create_clients: bool,
}

/// One line of an entries CSV:
/// `kind,client,amount,date,category,description`.
#[derive(Debug, Deserialize)]
struct EntryRecord {
    kind: String,
    client: String,
    amount: String,
    date: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Sale,
    Expense,
}

impl EntryKind {
    fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sale" | "venda" => Some(EntryKind::Sale),
            "expense" | "despesa" => Some(EntryKind::Expense),
            _ => None,
        }
    }
}

/// Loads sales and expenses in bulk.
pub struct Importer<'a> {
    service: &'a DashboardService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a DashboardService) -> Self {
        Self { service }
    }

    /// Import sales and expenses from CSV. Bad lines are collected, not fatal.
    pub async fn import_entries_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut result = ImportResult::default();
        // Clients a dry run would have created.
        let mut pending_clients: HashSet<String> = HashSet::new();

        for (line_num, record) in csv_reader.deserialize::<EntryRecord>().enumerate() {
            let line = line_num + 2; // header is line 1
            let fail = |field: Option<&str>, error: String| ImportError {
                line,
                field: field.map(str::to_string),
                error,
            };

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(fail(None, format!("CSV parse error: {}", e)));
                    continue;
                }
            };

            let Some(kind) = EntryKind::from_str(&record.kind) else {
                result.errors.push(fail(
                    Some("kind"),
                    format!("Unknown entry kind '{}' (expected sale or expense)", record.kind),
                ));
                continue;
            };

            let amount = match parse_positive_amount(&record.amount) {
                Ok(a) => a,
                Err(e) => {
                    result.errors.push(fail(Some("amount"), e));
                    continue;
                }
            };

            let date = match NaiveDate::parse_from_str(&record.date, "%Y-%m-%d") {
                Ok(d) => d,
                Err(_) => {
                    result.errors.push(fail(
                        Some("date"),
                        format!("Invalid date '{}', expected YYYY-MM-DD", record.date),
                    ));
                    continue;
                }
            };

            let client_key = record.client.to_lowercase();
            match self.service.get_client(&record.client).await {
                Ok(_) => {}
                Err(AppError::ClientNotFound(_)) if pending_clients.contains(&client_key) => {}
                Err(AppError::ClientNotFound(name)) if options.create_clients => {
                    if options.dry_run {
                        pending_clients.insert(client_key);
                    } else if let Err(e) = self.service.create_client(&record.client, date).await {
                        result.errors.push(fail(Some("client"), e.to_string()));
                        continue;
                    } else {
                        log::info!("import: created client '{}'", name);
                    }
                    result.created_clients += 1;
                }
                Err(e) => {
                    result.errors.push(fail(Some("client"), e.to_string()));
                    continue;
                }
            }

            if options.dry_run {
                result.imported += 1;
                continue;
            }

            let written = match kind {
                EntryKind::Sale => self
                    .service
                    .record_sale(&record.client, amount, date, record.description)
                    .await
                    .map(|_| ()),
                EntryKind::Expense => self
                    .service
                    .record_expense(&record.client, amount, date, record.category, record.description)
                    .await
                    .map(|_| ()),
            };
            match written {
                Ok(()) => result.imported += 1,
                Err(e) => result.errors.push(fail(None, format!("Entry rejected: {}", e))),
            }
        }

        log::debug!(
            "import finished: {} imported, {} errors",
            result.imported,
            result.errors.len()
        );
        Ok(result)
    }
}

fn parse_positive_amount(input: &str) -> Result<Cents, String> {
    let cents = parse_cents(input).map_err(|e| format!("Invalid amount: {}", e))?;
    if cents <= 0 {
        return Err(format!("Amount must be positive, got '{}'", input));
    }
    Ok(cents)
}
