use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use serde_with::SerializeDisplay;

/// Fields every incident row carries after ingestion.
pub const REQUIRED_FIELDS: [&str; 7] = ["guid", "provider", "status", "title", "started_at", "link", "id"];

/// Calendar month of an incident, shown as `YYYY-MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Month { year: date.year(), month: date.month() }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Incident {
    pub id: String,
    pub guid: String,
    pub provider: String,
    pub status: String,
    pub title: String,
    pub started_at: Option<DateTime<Utc>>,
    pub link: String,
}

impl Incident {
    pub fn date(&self) -> Option<NaiveDate> {
        self.started_at.map(|ts| ts.date_naive())
    }

    pub fn month(&self) -> Option<Month> {
        self.date().map(Month::of)
    }

    pub fn year(&self) -> Option<i32> {
        self.started_at.map(|ts| ts.year())
    }
}

/// One element of the `data` array as the content API sends it. Nothing is
/// guaranteed to be present; JSON `null` reads as absent. `into_incident`
/// fills the gaps.
#[derive(Debug, Default, Deserialize)]
pub struct RawIncident {
    pub id: Option<Value>,
    pub guid: Option<Value>,
    pub provider: Option<Value>,
    pub status: Option<Value>,
    pub title: Option<Value>,
    pub started_at: Option<Value>,
    pub link: Option<Value>,
}

impl RawIncident {
    /// Names of the known fields this record actually carries.
    pub fn present_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        let fields = [
            ("guid", &self.guid),
            ("provider", &self.provider),
            ("status", &self.status),
            ("title", &self.title),
            ("started_at", &self.started_at),
            ("link", &self.link),
            ("id", &self.id),
        ];
        fields.into_iter().filter(|(_, value)| value.is_some()).map(|(name, _)| name)
    }

    /// Applies the ingestion defaults: the row's position for a missing `id`,
    /// an empty string for anything else. Names of defaulted fields are added
    /// to `backfilled`.
    pub fn into_incident(self, index: usize, backfilled: &mut BTreeSet<&'static str>) -> Incident {
        let id = match self.id {
            Some(id) => text(id),
            None => {
                backfilled.insert("id");
                index.to_string()
            }
        };
        let started_at = or_empty("started_at", self.started_at, backfilled);

        Incident {
            id,
            guid: or_empty("guid", self.guid, backfilled),
            provider: or_empty("provider", self.provider, backfilled),
            status: or_empty("status", self.status, backfilled),
            title: or_empty("title", self.title, backfilled),
            started_at: parse_timestamp(&started_at),
            link: or_empty("link", self.link, backfilled),
        }
    }
}

fn or_empty(name: &'static str, value: Option<Value>, backfilled: &mut BTreeSet<&'static str>) -> String {
    match value {
        Some(value) => text(value),
        None => {
            backfilled.insert(name);
            String::new()
        }
    }
}

fn text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Accepts RFC 3339, naive ISO date-times (with `T` or a space) and bare
/// dates. Offset-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
