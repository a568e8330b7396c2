use std::{collections::BTreeSet, fmt::Display};

use serde::Serialize;

use crate::{
    aggregate::{ProviderStatusMatrix, SeriesPoint},
    models::Incident,
};

pub const FALLBACK_COLOR: &str = "#888888";
const PROVIDER_BAR_COLOR: &str = "#00ff88";
const TITLE_LIMIT: usize = 50;

/// Viridis stops, low to high, for the heatmap cells.
pub const VIRIDIS: [&str; 10] = [
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58", "#b5de2b", "#fde725",
];

pub fn status_color(status: &str) -> &'static str {
    match status {
        "up" => "#00ff88",
        "down" => "#ff4444",
        "degraded" => "#ffaa00",
        "maintenance" => "#0088ff",
        _ => FALLBACK_COLOR,
    }
}

/// Cuts to 50 characters and appends `...`, but only if something was cut.
pub fn truncate_title(title: &str) -> String {
    match title.char_indices().nth(TITLE_LIMIT) {
        Some((end, _)) => format!("{}...", &title[..end]),
        None => title.to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Pie,
    Line,
    Bar,
    HorizontalBar,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataSet {
    pub label: String,
    pub data: Vec<Option<usize>>,
    /// One color per point for pies, a single color for everything else.
    pub colors: Vec<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_title: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_title: Option<&'static str>,
    pub labels: Vec<String>,
    pub datasets: Vec<DataSet>,
    /// Join a dataset's points across the `null`s left for labels it has no count for.
    pub span_gaps: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeatmapSpec {
    pub title: &'static str,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<usize>>,
    pub color_scale: &'static [&'static str],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow {
    pub provider: String,
    pub status: String,
    pub color: &'static str,
    pub title: String,
    pub started_at: String,
    pub link: String,
}

pub fn status_pie(distribution: &[(String, usize)]) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Pie,
        title: "Incident Status Distribution",
        x_title: None,
        y_title: None,
        labels: distribution.iter().map(|(status, _)| status.clone()).collect(),
        datasets: vec![DataSet {
            label: String::from("Incidents"),
            data: distribution.iter().map(|(_, count)| Some(*count)).collect(),
            colors: distribution.iter().map(|(status, _)| status_color(status)).collect(),
        }],
        span_gaps: false,
    }
}

pub fn status_heatmap(matrix: &ProviderStatusMatrix) -> HeatmapSpec {
    HeatmapSpec {
        title: "Status Distribution by Provider",
        x_title: "Status",
        y_title: "Provider",
        rows: matrix.providers.clone(),
        columns: matrix.statuses.clone(),
        values: matrix.counts.clone(),
        color_scale: &VIRIDIS,
    }
}

pub fn timeline_chart<K: Ord + Display>(points: &[SeriesPoint<K>]) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Line,
        title: "Incidents Over Time",
        x_title: Some("Date"),
        y_title: Some("Number of Incidents"),
        span_gaps: true,
        ..series_by_status(points)
    }
}

pub fn monthly_chart<K: Ord + Display>(points: &[SeriesPoint<K>]) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Bar,
        title: "Monthly Incident Trends",
        x_title: Some("Month"),
        y_title: Some("Number of Incidents"),
        ..series_by_status(points)
    }
}

/// One dataset per status over the sorted key axis; absent points stay `null`.
fn series_by_status<K: Ord + Display>(points: &[SeriesPoint<K>]) -> ChartSpec {
    let keys: BTreeSet<&K> = points.iter().map(|p| &p.key).collect();
    let keys: Vec<&K> = keys.into_iter().collect();
    let statuses: BTreeSet<&str> = points.iter().map(|p| p.status.as_str()).collect();

    let datasets = statuses
        .into_iter()
        .map(|status| {
            let mut data = vec![None; keys.len()];
            for point in points.iter().filter(|p| p.status == status) {
                if let Ok(i) = keys.binary_search(&&point.key) {
                    data[i] = Some(point.count);
                }
            }
            DataSet { label: status.to_string(), data, colors: vec![status_color(status)] }
        })
        .collect();

    ChartSpec {
        kind: ChartKind::Line,
        title: "",
        x_title: None,
        y_title: None,
        labels: keys.iter().map(|k| k.to_string()).collect(),
        datasets,
        span_gaps: false,
    }
}

pub fn provider_bar(top: &[(String, usize)]) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::HorizontalBar,
        title: "Top 10 Providers by Incident Count",
        x_title: Some("Number of Incidents"),
        y_title: Some("Provider"),
        labels: top.iter().map(|(provider, _)| provider.clone()).collect(),
        datasets: vec![DataSet {
            label: String::from("Incidents"),
            data: top.iter().map(|(_, count)| Some(*count)).collect(),
            colors: vec![PROVIDER_BAR_COLOR],
        }],
        span_gaps: false,
    }
}

pub fn incident_rows(incidents: &[&Incident]) -> Vec<TableRow> {
    incidents
        .iter()
        .map(|incident| TableRow {
            provider: incident.provider.clone(),
            status: incident.status.clone(),
            color: status_color(&incident.status),
            title: truncate_title(&incident.title),
            started_at: incident.started_at.map(|ts| ts.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default(),
            link: incident.link.clone(),
        })
        .collect()
}
