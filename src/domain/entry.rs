use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ClientId, MonthKey};

pub type EntryId = Uuid;

/// Category used for expenses recorded without one.
pub const UNCATEGORIZED: &str = "Outros";

/// A revenue entry for a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: EntryId,
    pub client_id: ClientId,
    pub occurred_at: NaiveDate,
    pub amount_cents: Cents,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn new(client_id: ClientId, amount_cents: Cents, occurred_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            occurred_at,
            amount_cents,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A cost entry for a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: EntryId,
    pub client_id: ClientId,
    pub occurred_at: NaiveDate,
    pub amount_cents: Cents,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(client_id: ClientId, amount_cents: Cents, occurred_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            occurred_at,
            amount_cents,
            category: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

/// Revenue target for one client and month. At most one per (client, month).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub client_id: ClientId,
    pub month: MonthKey,
    pub amount_cents: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientNote {
    pub id: Uuid,
    pub client_id: ClientId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ClientNote {
    pub fn new(client_id: ClientId, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            content,
            created_at: Utc::now(),
        }
    }
}
