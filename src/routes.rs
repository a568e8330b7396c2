use axum::{extract::Query, response::Html, Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    aggregate::{self, SummaryCounters},
    filter::{filter, FilterOptions, Selection},
    models::Incident,
    presentation::{self, ChartSpec, HeatmapSpec, TableRow},
    AppContext,
};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// `?status=..&provider=..`, either one defaulting to `all`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub status: Selection,
    pub provider: Selection,
}

impl FilterParams {
    fn apply(&self, incidents: &[Incident]) -> Vec<Incident> {
        filter(incidents, &self.status, &self.provider)
    }
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn filters(ctx: Extension<AppContext>) -> Json<FilterOptions> {
    Json(ctx.options.as_ref().clone())
}

pub async fn summary(ctx: Extension<AppContext>, Query(params): Query<FilterParams>) -> Json<SummaryCounters> {
    let rows = params.apply(&ctx.incidents);
    Json(aggregate::summary_counters(&rows, Utc::now()))
}

pub async fn status_chart(ctx: Extension<AppContext>, Query(params): Query<FilterParams>) -> Json<ChartSpec> {
    let rows = params.apply(&ctx.incidents);
    Json(presentation::status_pie(&aggregate::status_distribution(&rows)))
}

pub async fn heatmap_chart(ctx: Extension<AppContext>, Query(params): Query<FilterParams>) -> Json<HeatmapSpec> {
    let rows = params.apply(&ctx.incidents);
    Json(presentation::status_heatmap(&aggregate::provider_status_matrix(&rows)))
}

pub async fn timeline_chart(ctx: Extension<AppContext>, Query(params): Query<FilterParams>) -> Json<ChartSpec> {
    let rows = params.apply(&ctx.incidents);
    Json(presentation::timeline_chart(&aggregate::daily_timeline(&rows)))
}

pub async fn monthly_chart(ctx: Extension<AppContext>, Query(params): Query<FilterParams>) -> Json<ChartSpec> {
    let rows = params.apply(&ctx.incidents);
    Json(presentation::monthly_chart(&aggregate::monthly_trend(&rows)))
}

pub async fn provider_chart(ctx: Extension<AppContext>, Query(params): Query<FilterParams>) -> Json<ChartSpec> {
    let rows = params.apply(&ctx.incidents);
    Json(presentation::provider_bar(&aggregate::top_providers(&rows)))
}

pub async fn recent_incidents(ctx: Extension<AppContext>, Query(params): Query<FilterParams>) -> Json<Vec<TableRow>> {
    let rows = params.apply(&ctx.incidents);
    Json(presentation::incident_rows(&aggregate::recent_incidents(&rows)))
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::{config::Config, models::parse_timestamp};

    fn incident(id: &str, provider: &str, status: &str, started_at: &str) -> Incident {
        Incident {
            id: id.into(),
            guid: format!("guid-{id}"),
            provider: provider.into(),
            status: status.into(),
            title: format!("Incident {id}"),
            started_at: parse_timestamp(started_at),
            link: format!("https://status.example.com/{id}"),
        }
    }

    fn scenario() -> AppContext {
        AppContext::new(
            Config::default(),
            vec![
                incident("3", "providerB", "degraded", "2024-01-03"),
                incident("2", "providerA", "up", "2024-01-02"),
                incident("1", "providerA", "down", "2024-01-01"),
            ],
        )
    }

    fn params(status: &str, provider: &str) -> Query<FilterParams> {
        Query(FilterParams { status: status.into(), provider: provider.into() })
    }

    #[tokio::test]
    async fn summary_counts_the_filtered_rows() {
        let Json(all) = summary(Extension(scenario()), params("all", "all")).await;
        assert_eq!((all.total, all.active, all.providers), (3, 2, 2));

        let Json(down) = summary(Extension(scenario()), params("down", "all")).await;
        assert_eq!((down.total, down.active, down.providers), (1, 1, 1));
    }

    #[tokio::test]
    async fn recent_table_follows_the_provider_filter() {
        let Json(rows) = recent_incidents(Extension(scenario()), params("all", "providerA")).await;
        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Incident 2", "Incident 1"]);
        assert_eq!(rows[0].link, "https://status.example.com/2");
    }

    #[tokio::test]
    async fn provider_options_ignore_the_status_filter() {
        let ctx = scenario();
        let Json(options) = filters(Extension(ctx.clone())).await;
        let providers: Vec<&str> = options.providers.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(providers, vec!["all", "providerA", "providerB"]);

        // narrowing the data does not narrow the dropdown
        let Json(summary) = summary(Extension(ctx.clone()), params("degraded", "all")).await;
        assert_eq!(summary.providers, 1);
        let Json(again) = filters(Extension(ctx)).await;
        assert_eq!(again.providers.len(), 3);
    }

    #[tokio::test]
    async fn empty_table_renders_every_region() {
        let ctx = AppContext::new(Config::default(), Vec::new());

        let Json(counters) = summary(Extension(ctx.clone()), params("all", "all")).await;
        assert_eq!(counters, SummaryCounters { total: 0, active: 0, providers: 0, last_30_days: 0 });
        assert!(status_chart(Extension(ctx.clone()), params("all", "all")).await.0.labels.is_empty());
        assert!(heatmap_chart(Extension(ctx.clone()), params("all", "all")).await.0.rows.is_empty());
        assert!(timeline_chart(Extension(ctx.clone()), params("all", "all")).await.0.datasets.is_empty());
        assert!(monthly_chart(Extension(ctx.clone()), params("all", "all")).await.0.datasets.is_empty());
        assert!(provider_chart(Extension(ctx.clone()), params("up", "all")).await.0.labels.is_empty());
        assert!(recent_incidents(Extension(ctx.clone()), params("all", "x")).await.0.is_empty());

        let Json(options) = filters(Extension(ctx)).await;
        assert_eq!(options.providers.len(), 1);
    }

    #[tokio::test]
    async fn serves_the_page_and_api_over_http() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, crate::app(scenario())).await.unwrap() });

        let page = reqwest::get(format!("http://{addr}/")).await.unwrap().text().await.unwrap();
        assert!(page.contains("Payment Services Incident Dashboard"));

        let body = reqwest::get(format!("http://{addr}/api/summary?status=down"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let counters: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(counters["total"], 1);
        assert_eq!(counters["active"], 1);

        let body = reqwest::get(format!("http://{addr}/api/charts/providers?provider=all"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let chart: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(chart["labels"], serde_json::json!(["providerA", "providerB"]));
    }
}
