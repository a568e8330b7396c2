// source pulls every incident out of the content API once, before the api starts serving

use std::collections::BTreeSet;

use reqwest::{header, StatusCode};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    config::DirectusConfig,
    models::{Incident, RawIncident, REQUIRED_FIELDS},
};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("cannot reach content API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("content API answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no data found in response")]
    MissingData,
}

#[derive(Deserialize)]
struct ItemsResponse {
    data: Option<Vec<RawIncident>>,
}

pub struct DataSource {
    client: reqwest::Client,
    items_url: String,
    token: String,
}

impl DataSource {
    pub fn new(config: &DirectusConfig) -> Self {
        let items_url = format!("{}/items/{}", config.url.trim_end_matches('/'), config.collection);
        DataSource { client: reqwest::Client::new(), items_url, token: config.token.clone() }
    }

    /// Never fails: any [`FetchError`] is logged and an empty table comes back.
    pub async fn load(&self) -> Vec<Incident> {
        match self.fetch().await {
            Ok(incidents) => {
                let years: BTreeSet<i32> = incidents.iter().filter_map(Incident::year).collect();
                match (years.first(), years.last()) {
                    (Some(first), Some(last)) => {
                        info!(count = incidents.len(), "loaded incidents from {} ({first}-{last})", self.items_url)
                    }
                    _ => info!(count = incidents.len(), "loaded incidents from {}", self.items_url),
                }
                incidents
            }
            Err(err) => {
                error!(%err, "failed to load incidents from {}", self.items_url);
                warn!("check the Directus url, API token and collection name; serving an empty dashboard");
                Vec::new()
            }
        }
    }

    pub async fn fetch(&self) -> Result<Vec<Incident>, FetchError> {
        let res = self
            .client
            .get(&self.items_url)
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, "application/json")
            .query(&[("limit", "-1"), ("sort", "-started_at")])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if status != StatusCode::OK {
            return Err(FetchError::Status { status, body });
        }

        ingest(&body)
    }
}

/// Turns an items response body into table rows, defaults applied.
pub fn ingest(body: &str) -> Result<Vec<Incident>, FetchError> {
    let response: ItemsResponse = serde_json::from_str(body)?;
    let records = response.data.ok_or(FetchError::MissingData)?;

    let seen: BTreeSet<&str> = records.iter().flat_map(RawIncident::present_fields).collect();
    let mut backfilled = BTreeSet::new();
    let incidents: Vec<Incident> = records
        .into_iter()
        .enumerate()
        .map(|(index, raw)| raw.into_incident(index, &mut backfilled))
        .collect();

    if !backfilled.is_empty() {
        // absent: columns no record carries at all
        let absent: Vec<&str> = REQUIRED_FIELDS.into_iter().filter(|f| !seen.contains(f)).collect();
        warn!(?backfilled, ?absent, available = ?seen, "incident records are missing fields, filled with defaults");
    }
    let undated = incidents.iter().filter(|i| i.started_at.is_none()).count();
    if undated > 0 {
        warn!(undated, "incidents without a usable started_at are left out of date charts");
    }

    Ok(incidents)
}
