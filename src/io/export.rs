use anyhow::Result;
use chrono::NaiveDate;
use std::io::Write;

use crate::application::{CompanyDashboardReport, DashboardService};
use crate::domain::{format_cents, ClientFilter, PeriodSelection};

/// Writes dashboard data out as CSV or JSON.
pub struct Exporter<'a> {
    service: &'a DashboardService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a DashboardService) -> Self {
        Self { service }
    }

    /// Company monthly series, one row per month, oldest first.
    pub async fn export_series_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let series = self.service.company_series().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        for row in &series.metrics {
            csv_writer.serialize(row)?;
        }

        csv_writer.flush()?;
        Ok(series.metrics.len())
    }

    /// Acquisition funnel series. An undefined ROAS is left empty.
    pub async fn export_funnel_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let series = self.service.company_series().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        for row in &series.funnel {
            csv_writer.serialize(row)?;
        }

        csv_writer.flush()?;
        Ok(series.funnel.len())
    }

    /// Client registry with CRM fields and status as of `as_of`.
    pub async fn export_clients_csv<W: Write>(&self, writer: W, as_of: NaiveDate) -> Result<usize> {
        let clients = self
            .service
            .list_clients(&ClientFilter::default(), as_of)
            .await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "name",
            "started_at",
            "ended_at",
            "status",
            "owner_name",
            "owner_phone",
            "owner_email",
            "specialist_name",
            "payment_amount",
            "payment_day",
            "renewal_date",
        ])?;

        for client in &clients {
            let status = if client.is_active(as_of) { "active" } else { "inactive" };
            csv_writer.write_record([
                client.id.to_string(),
                client.name.clone(),
                client.started_at.to_string(),
                client.ended_at.map(|d| d.to_string()).unwrap_or_default(),
                status.to_string(),
                client.crm.owner_name.clone().unwrap_or_default(),
                client.crm.owner_phone.clone().unwrap_or_default(),
                client.crm.owner_email.clone().unwrap_or_default(),
                client.crm.specialist_name.clone().unwrap_or_default(),
                client.crm.payment_amount.map(format_cents).unwrap_or_default(),
                client.crm.payment_day.map(|d| d.to_string()).unwrap_or_default(),
                client.crm.renewal_date.map(|d| d.to_string()).unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(clients.len())
    }

    /// The company dashboard for `selection` as pretty JSON.
    pub async fn export_company_json<W: Write>(
        &self,
        mut writer: W,
        selection: &PeriodSelection,
    ) -> Result<CompanyDashboardReport> {
        let report = self.service.company_dashboard(selection).await?;

        let json = serde_json::to_string_pretty(&report)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(report)
    }
}
