use serde::{Deserialize, Serialize};

use super::{months_between_inclusive, MonthKey, PeriodError};

/// Named shorthand for a month range relative to an anchor month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Preset {
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "last")]
    Last,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[default]
    #[serde(rename = "12m")]
    TwelveMonths,
    #[serde(rename = "custom")]
    Custom,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Current => "current",
            Preset::Last => "last",
            Preset::ThreeMonths => "3m",
            Preset::SixMonths => "6m",
            Preset::TwelveMonths => "12m",
            Preset::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "current" => Some(Preset::Current),
            "last" => Some(Preset::Last),
            "3m" => Some(Preset::ThreeMonths),
            "6m" => Some(Preset::SixMonths),
            "12m" => Some(Preset::TwelveMonths),
            "custom" => Some(Preset::Custom),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, PeriodError> {
        Self::from_str(s).ok_or_else(|| PeriodError::UnknownPreset(s.to_string()))
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive month range. Construction guarantees `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PeriodRange {
    from: MonthKey,
    to: MonthKey,
}

impl PeriodRange {
    /// Inverted bounds are rejected rather than swapped.
    pub fn new(from: MonthKey, to: MonthKey) -> Result<Self, PeriodError> {
        if from > to {
            return Err(PeriodError::InvertedRange { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn single(month: MonthKey) -> Self {
        Self {
            from: month,
            to: month,
        }
    }

    /// `n` months ending at `to` (n = 0 is treated as 1).
    pub fn trailing(to: MonthKey, n: u32) -> Self {
        let span = n.max(1) as i32 - 1;
        Self {
            from: to.shift(-span),
            to,
        }
    }

    /// January through December of `year`.
    pub fn calendar_year(year: i32) -> Result<Self, PeriodError> {
        Self::new(MonthKey::new(year, 1)?, MonthKey::new(year, 12)?)
    }

    pub fn from(&self) -> MonthKey {
        self.from
    }

    pub fn to(&self) -> MonthKey {
        self.to
    }

    pub fn contains(&self, month: MonthKey) -> bool {
        self.from <= month && month <= self.to
    }

    /// Window size in months.
    pub fn window_size(&self) -> u32 {
        months_between_inclusive(self.from, self.to)
    }

    /// The contiguous window of the same length that ends the month before
    /// this one starts.
    pub fn previous(&self) -> Self {
        let prev_to = self.from.shift(-1);
        let prev_from = prev_to.shift(-(self.window_size() as i32 - 1));
        Self {
            from: prev_from,
            to: prev_to,
        }
    }

    /// Every month in the range, ascending.
    pub fn months(&self) -> impl Iterator<Item = MonthKey> + use<> {
        let from = self.from;
        (0..self.window_size()).map(move |i| from.shift(i as i32))
    }
}

impl std::fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.from, self.to)
    }
}

/// Map a preset and an anchor month to a concrete range.
/// Returns `None` for `Custom`, whose bounds come from the caller.
pub fn resolve_preset(preset: Preset, anchor: MonthKey) -> Option<PeriodRange> {
    match preset {
        Preset::Current => Some(PeriodRange::single(anchor)),
        Preset::Last => Some(PeriodRange::single(anchor.shift(-1))),
        Preset::ThreeMonths => Some(PeriodRange::trailing(anchor, 3)),
        Preset::SixMonths => Some(PeriodRange::trailing(anchor, 6)),
        Preset::TwelveMonths => Some(PeriodRange::trailing(anchor, 12)),
        Preset::Custom => None,
    }
}

/// Caller-owned period selection for the company dashboard.
///
/// Holds the reference month, the active preset, the anchor month that
/// presets resolve against, and the last custom bounds ever set. `resolve`
/// always yields a range: `Custom` without explicit bounds falls back to the
/// last known custom bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSelection {
    month: MonthKey,
    preset: Preset,
    anchor: MonthKey,
    custom: PeriodRange,
}

impl PeriodSelection {
    /// Start a selection on `month`. The custom bounds default to the twelve
    /// months ending at `month`.
    pub fn new(month: MonthKey) -> Self {
        Self {
            month,
            preset: Preset::default(),
            anchor: month,
            custom: PeriodRange::trailing(month, 12),
        }
    }

    pub fn month(&self) -> MonthKey {
        self.month
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn anchor(&self) -> MonthKey {
        self.anchor
    }

    pub fn custom_bounds(&self) -> PeriodRange {
        self.custom
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.set_preset(preset);
        self
    }

    pub fn set_preset(&mut self, preset: Preset) {
        self.preset = preset;
    }

    /// Change the reference month. Outside `Custom` the anchor follows it.
    pub fn set_month(&mut self, month: MonthKey) {
        self.month = month;
        if self.preset != Preset::Custom {
            self.anchor = month;
        }
    }

    /// Pin the anchor independently of the reference month.
    pub fn set_anchor(&mut self, anchor: MonthKey) {
        self.anchor = anchor;
    }

    /// Record explicit custom bounds; they become the last known bounds.
    pub fn set_custom(&mut self, from: MonthKey, to: MonthKey) -> Result<(), PeriodError> {
        self.custom = PeriodRange::new(from, to)?;
        Ok(())
    }

    pub fn resolve(&self) -> PeriodRange {
        resolve_preset(self.preset, self.anchor).unwrap_or(self.custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::to_month_key;

    fn key(s: &str) -> MonthKey {
        to_month_key(s).unwrap()
    }

    fn range(from: &str, to: &str) -> PeriodRange {
        PeriodRange::new(key(from), key(to)).unwrap()
    }

    #[test]
    fn test_preset_roundtrip() {
        for p in [
            Preset::Current,
            Preset::Last,
            Preset::ThreeMonths,
            Preset::SixMonths,
            Preset::TwelveMonths,
            Preset::Custom,
        ] {
            assert_eq!(Preset::from_str(p.as_str()), Some(p));
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.as_str()));
        }
        assert!(matches!(Preset::parse("9m"), Err(PeriodError::UnknownPreset(_))));
    }

    #[test]
    fn test_resolve_preset_table() {
        let anchor = key("2025-06-01");
        let cases = [
            (Preset::Current, "2025-06-01", "2025-06-01"),
            (Preset::Last, "2025-05-01", "2025-05-01"),
            (Preset::ThreeMonths, "2025-04-01", "2025-06-01"),
            (Preset::SixMonths, "2025-01-01", "2025-06-01"),
            (Preset::TwelveMonths, "2024-07-01", "2025-06-01"),
        ];
        for (preset, from, to) in cases {
            let r = resolve_preset(preset, anchor).unwrap();
            assert_eq!(r, range(from, to), "preset {}", preset);
        }
        assert_eq!(resolve_preset(Preset::Custom, anchor), None);
    }

    #[test]
    fn test_last_crosses_year_boundary() {
        let r = resolve_preset(Preset::Last, key("2025-01")).unwrap();
        assert_eq!(r, range("2024-12", "2024-12"));
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let err = PeriodRange::new(key("2025-05"), key("2025-02")).unwrap_err();
        assert!(matches!(err, PeriodError::InvertedRange { .. }));
    }

    #[test]
    fn test_previous_window_is_contiguous_and_same_length() {
        let r = range("2025-01", "2025-03");
        let prev = r.previous();
        assert_eq!(prev, range("2024-10", "2024-12"));
        assert_eq!(prev.window_size(), r.window_size());
        assert_eq!(prev.to().next(), r.from());

        let single = PeriodRange::single(key("2025-03"));
        assert_eq!(single.previous(), PeriodRange::single(key("2025-02")));
    }

    #[test]
    fn test_months_iterates_inclusive() {
        let months: Vec<String> = range("2024-11", "2025-02").months().map(|m| m.to_string()).collect();
        assert_eq!(months, ["2024-11-01", "2024-12-01", "2025-01-01", "2025-02-01"]);
    }

    #[test]
    fn test_selection_custom_falls_back_to_last_known_bounds() {
        let selection = PeriodSelection::new(key("2025-06")).with_preset(Preset::Custom);
        assert_eq!(selection.resolve(), range("2024-07", "2025-06"));

        let mut selection = selection;
        selection.set_custom(key("2025-01"), key("2025-03")).unwrap();
        selection.set_preset(Preset::ThreeMonths);
        selection.set_preset(Preset::Custom);
        assert_eq!(selection.resolve(), range("2025-01", "2025-03"));
    }

    #[test]
    fn test_selection_rejected_custom_keeps_previous_bounds() {
        let mut selection = PeriodSelection::new(key("2025-06")).with_preset(Preset::Custom);
        selection.set_custom(key("2025-02"), key("2025-04")).unwrap();
        assert!(selection.set_custom(key("2025-05"), key("2025-01")).is_err());
        assert_eq!(selection.resolve(), range("2025-02", "2025-04"));
    }

    #[test]
    fn test_selection_anchor_follows_month_outside_custom() {
        let mut selection = PeriodSelection::new(key("2025-06")).with_preset(Preset::Last);
        selection.set_month(key("2025-09"));
        assert_eq!(selection.anchor(), key("2025-09"));
        assert_eq!(selection.resolve(), range("2025-08", "2025-08"));

        selection.set_preset(Preset::Custom);
        selection.set_month(key("2026-01"));
        assert_eq!(selection.anchor(), key("2025-09"));
    }
}
