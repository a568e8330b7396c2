use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::Serialize;

use crate::models::{Incident, Month};

pub const TOP_PROVIDERS: usize = 10;
pub const RECENT_INCIDENTS: usize = 10;
const ACTIVE_STATUSES: [&str; 2] = ["down", "degraded"];
const RECENT_WINDOW_DAYS: i64 = 30;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryCounters {
    pub total: usize,
    pub active: usize,
    pub providers: usize,
    pub last_30_days: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderStatusMatrix {
    pub providers: Vec<String>,
    pub statuses: Vec<String>,
    /// `counts[p][s]` for `providers[p]` and `statuses[s]`.
    pub counts: Vec<Vec<usize>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeriesPoint<K> {
    pub key: K,
    pub status: String,
    pub count: usize,
}

pub fn summary_counters(rows: &[Incident], now: DateTime<Utc>) -> SummaryCounters {
    let since = now - TimeDelta::days(RECENT_WINDOW_DAYS);
    let providers: BTreeSet<&str> = rows.iter().map(|r| r.provider.as_str()).collect();

    SummaryCounters {
        total: rows.len(),
        active: rows.iter().filter(|r| ACTIVE_STATUSES.contains(&r.status.as_str())).count(),
        providers: providers.len(),
        last_30_days: rows.iter().filter(|r| r.started_at.is_some_and(|ts| ts >= since)).count(),
    }
}

pub fn status_distribution(rows: &[Incident]) -> Vec<(String, usize)> {
    ranked(rows.iter().map(|r| r.status.as_str()))
}

pub fn top_providers(rows: &[Incident]) -> Vec<(String, usize)> {
    let mut counts = ranked(rows.iter().map(|r| r.provider.as_str()));
    counts.truncate(TOP_PROVIDERS);
    counts
}

/// Counts per key, highest first; equal counts keep first-seen order.
fn ranked<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for key in keys {
        match index.get(key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key, counts.len());
                counts.push((key.to_string(), 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

pub fn provider_status_matrix(rows: &[Incident]) -> ProviderStatusMatrix {
    let mut cells: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for row in rows {
        *cells.entry((row.provider.as_str(), row.status.as_str())).or_default() += 1;
    }

    let providers: Vec<String> = rows.iter().map(|r| r.provider.as_str()).collect::<BTreeSet<_>>().into_iter().map(String::from).collect();
    let statuses: Vec<String> = rows.iter().map(|r| r.status.as_str()).collect::<BTreeSet<_>>().into_iter().map(String::from).collect();

    let counts = providers
        .iter()
        .map(|p| {
            statuses
                .iter()
                .map(|s| cells.get(&(p.as_str(), s.as_str())).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    ProviderStatusMatrix { providers, statuses, counts }
}

pub fn daily_timeline(rows: &[Incident]) -> Vec<SeriesPoint<NaiveDate>> {
    grouped_by_status(rows, Incident::date)
}

pub fn monthly_trend(rows: &[Incident]) -> Vec<SeriesPoint<Month>> {
    grouped_by_status(rows, Incident::month)
}

// undated rows have no bucket and are skipped
fn grouped_by_status<K: Ord + Copy>(rows: &[Incident], key: impl Fn(&Incident) -> Option<K>) -> Vec<SeriesPoint<K>> {
    let mut groups: BTreeMap<(K, &str), usize> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            *groups.entry((k, row.status.as_str())).or_default() += 1;
        }
    }

    groups
        .into_iter()
        .map(|((key, status), count)| SeriesPoint { key, status: status.to_string(), count })
        .collect()
}

/// Newest first, undated rows last, at most [`RECENT_INCIDENTS`].
pub fn recent_incidents(rows: &[Incident]) -> Vec<&Incident> {
    let mut sorted: Vec<&Incident> = rows.iter().collect();
    // None < Some, so comparing b to a puts undated rows at the end
    sorted.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    sorted.truncate(RECENT_INCIDENTS);
    sorted
}
