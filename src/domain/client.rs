use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type ClientId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub started_at: NaiveDate,
    pub ended_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub crm: ClientCrm,
}

/// Relationship details kept alongside a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCrm {
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
    pub specialist_name: Option<String>,
    /// Recurring fee, in cents.
    pub payment_amount: Option<Cents>,
    /// Day of month the fee is due (1..=31).
    pub payment_day: Option<u32>,
    pub renewal_date: Option<NaiveDate>,
}

impl Client {
    pub fn new(name: String, started_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            started_at,
            ended_at: None,
            created_at: Utc::now(),
            crm: ClientCrm::default(),
        }
    }

    pub fn with_ended_at(mut self, ended_at: NaiveDate) -> Self {
        self.ended_at = Some(ended_at);
        self
    }

    /// Active on `as_of`: not ended, or ending after that day.
    pub fn is_active(&self, as_of: NaiveDate) -> bool {
        self.ended_at.is_none_or(|ended| ended > as_of)
    }

    /// Completed calendar months between the start date and `as_of`.
    pub fn tenure_months(&self, as_of: NaiveDate) -> u32 {
        if as_of <= self.started_at {
            return 0;
        }
        let start = self.started_at;
        let mut months = (as_of.year() - start.year()) * 12 + as_of.month() as i32
            - start.month() as i32;
        if as_of.day() < start.day() {
            months -= 1;
        }
        months.max(0) as u32
    }
}

/// Partial CRM update: only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct ClientCrmUpdate {
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
    pub specialist_name: Option<String>,
    pub payment_amount: Option<Cents>,
    pub payment_day: Option<u32>,
    pub renewal_date: Option<NaiveDate>,
    pub ended_at: Option<NaiveDate>,
}

impl ClientCrmUpdate {
    pub fn is_empty(&self) -> bool {
        self.owner_name.is_none()
            && self.owner_phone.is_none()
            && self.owner_email.is_none()
            && self.specialist_name.is_none()
            && self.payment_amount.is_none()
            && self.payment_day.is_none()
            && self.renewal_date.is_none()
            && self.ended_at.is_none()
    }

    /// Apply onto an existing client, returning the updated copy.
    pub fn apply(self, mut client: Client) -> Client {
        let crm = &mut client.crm;
        if self.owner_name.is_some() {
            crm.owner_name = self.owner_name;
        }
        if self.owner_phone.is_some() {
            crm.owner_phone = self.owner_phone;
        }
        if self.owner_email.is_some() {
            crm.owner_email = self.owner_email;
        }
        if self.specialist_name.is_some() {
            crm.specialist_name = self.specialist_name;
        }
        if self.payment_amount.is_some() {
            crm.payment_amount = self.payment_amount;
        }
        if self.payment_day.is_some() {
            crm.payment_day = self.payment_day;
        }
        if self.renewal_date.is_some() {
            crm.renewal_date = self.renewal_date;
        }
        if self.ended_at.is_some() {
            client.ended_at = self.ended_at;
        }
        client
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    All,
    Active,
    Inactive,
}

impl ClientStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(ClientStatus::All),
            "active" => Some(ClientStatus::Active),
            "inactive" => Some(ClientStatus::Inactive),
            _ => None,
        }
    }
}

/// Filter for listing clients.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    pub status: ClientStatus,
}

impl ClientFilter {
    pub fn matches(&self, client: &Client, as_of: NaiveDate) -> bool {
        let name_ok = match &self.search {
            Some(term) if !term.trim().is_empty() => client
                .name
                .to_lowercase()
                .contains(&term.trim().to_lowercase()),
            _ => true,
        };
        let status_ok = match self.status {
            ClientStatus::All => true,
            ClientStatus::Active => client.is_active(as_of),
            ClientStatus::Inactive => !client.is_active(as_of),
        };
        name_ok && status_ok
    }
}
