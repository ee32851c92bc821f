/// Expense category counted as acquisition investment unless configured otherwise.
pub const DEFAULT_ACQUISITION_CATEGORY: &str = "Marketing";

/// Settings the service needs beyond the database connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Expense category whose totals feed the funnel's `invested` figure.
    pub acquisition_category: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            acquisition_category: DEFAULT_ACQUISITION_CATEGORY.to_string(),
        }
    }
}

impl Settings {
    pub fn with_acquisition_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.trim().is_empty() {
            self.acquisition_category = category.trim().to_string();
        }
        self
    }
}
