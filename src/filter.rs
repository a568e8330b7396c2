use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::Incident;

pub const ALL: &str = "all";

const STATUS_OPTIONS: [(&str, &str); 5] = [
    ("All Statuses", ALL),
    ("Up", "up"),
    ("Down", "down"),
    ("Degraded", "degraded"),
    ("Maintenance", "maintenance"),
];

/// A dropdown value: the `all` sentinel or one exact column value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => expected == value,
        }
    }
}

impl From<String> for Selection {
    fn from(raw: String) -> Self {
        if raw == ALL { Selection::All } else { Selection::Only(raw) }
    }
}

impl From<&str> for Selection {
    fn from(raw: &str) -> Self {
        Selection::from(raw.to_string())
    }
}

/// Rows matching both selections, in table order.
pub fn filter(incidents: &[Incident], status: &Selection, provider: &Selection) -> Vec<Incident> {
    incidents
        .iter()
        .filter(|incident| status.matches(&incident.status) && provider.matches(&incident.provider))
        .cloned()
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct FilterOptions {
    pub statuses: Vec<FilterOption>,
    pub providers: Vec<FilterOption>,
}

impl FilterOptions {
    /// Built once from the unfiltered table.
    pub fn from_incidents(incidents: &[Incident]) -> Self {
        let statuses = STATUS_OPTIONS
            .iter()
            .map(|(label, value)| FilterOption { label: label.to_string(), value: value.to_string() })
            .collect();

        let distinct: BTreeSet<&str> = incidents.iter().map(|incident| incident.provider.as_str()).collect();
        let providers = std::iter::once(FilterOption { label: String::from("All Providers"), value: ALL.to_string() })
            .chain(distinct.into_iter().map(|p| FilterOption { label: p.to_string(), value: p.to_string() }))
            .collect();

        FilterOptions { statuses, providers }
    }
}
