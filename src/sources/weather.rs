//! WeatherAPI.com client and the multi-city dashboard.

use crate::aggregate::{aggregate_with, AggregateError, Observer, Task};
use crate::config::WeatherConfig;
use crate::http::{build_client, get_json, FetchError};
use crate::models::{Condition, Dashboard, Reading, WeatherReport};
use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// `current.json` response, reduced to the fields we display.
#[derive(Debug, Deserialize)]
struct CurrentResponse {
    location: Location,
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Location {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: f64,
    /// 1 during daylight, 0 at night.
    is_day: u8,
    condition: ConditionText,
}

#[derive(Debug, Deserialize)]
struct ConditionText {
    text: String,
}

pub struct WeatherClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    country: String,
    spread_degrees: f64,
    timeout: Duration,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            http_client: build_client(timeout_seconds)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            country: config.country.clone(),
            spread_degrees: config.spread_degrees,
            timeout: Duration::from_secs(timeout_seconds),
        })
    }

    fn query_for(&self, city: &str) -> String {
        if self.country.trim().is_empty() {
            city.to_string()
        } else {
            format!("{},{}", city, self.country)
        }
    }

    /// Current conditions for one city.
    pub async fn current(&self, city: &str) -> Result<WeatherReport, FetchError> {
        let url = format!("{}/current.json", self.base_url);
        let query = self.query_for(city);
        debug!("Fetching weather for {}", query);

        let request = self.http_client.get(&url).query(&[
            ("key", self.api_key.as_str()),
            ("q", query.as_str()),
            ("aqi", "no"),
        ]);
        let response: CurrentResponse = get_json(request).await?;

        Ok(WeatherReport {
            city: response.location.name,
            condition: Condition::classify(
                &response.current.condition.text,
                response.current.is_day == 1,
            ),
            summary: response.current.condition.text,
            reading: Some(Reading::from_celsius(
                response.current.temp_c,
                self.spread_degrees,
            )),
        })
    }

    /// Fetch every city concurrently. Cities that fail are shown as
    /// unavailable; the dashboard always has one card per city.
    pub async fn dashboard(
        &self,
        cities: &[String],
        observer: &dyn Observer,
    ) -> Result<Dashboard, AggregateError> {
        info!("Fetching weather for {} cities", cities.len());

        let tasks: Vec<Task<'_, WeatherReport>> = cities
            .iter()
            .map(|city| {
                Task::new(city.as_str(), async move {
                    self.current(city).await.map_err(anyhow::Error::from)
                })
                .with_timeout(self.timeout)
            })
            .collect();

        let result = aggregate_with(tasks, WeatherReport::unavailable, observer).await?;
        if result.all_failed() {
            warn!("No city could be loaded");
        } else if result.any_failed() {
            info!(
                "{} of {} cities fell back to placeholders",
                result.failure_count(),
                result.len()
            );
        }

        let failed = result.failures().iter().map(|f| f.id.clone()).collect();
        Ok(Dashboard {
            generated_at: Utc::now(),
            reports: result.into_values(),
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::TracingObserver;
    use mockito::{Matcher, Server};

    const CURRENT_FIXTURE: &str = include_str!("../../fixtures/weatherapi_current.json");

    fn client_for(server: &Server) -> WeatherClient {
        let config = WeatherConfig {
            base_url: server.url(),
            api_key: "test-key".to_string(),
            ..WeatherConfig::default()
        };
        WeatherClient::new(&config, 5).unwrap()
    }

    #[tokio::test]
    async fn test_current_maps_response() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/current.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "test-key".into()),
                Matcher::UrlEncoded("q".into(), "Kampala,Uganda".into()),
                Matcher::UrlEncoded("aqi".into(), "no".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CURRENT_FIXTURE)
            .create_async()
            .await;

        let report = client_for(&server).current("Kampala").await.unwrap();

        assert_eq!(report.city, "Kampala");
        assert_eq!(report.summary, "Partly cloudy");
        assert_eq!(report.condition, Condition::PartlyCloudy);
        assert_eq!(
            report.reading,
            Some(Reading {
                temperature: 25,
                high: 28,
                low: 22,
            })
        );
    }

    #[tokio::test]
    async fn test_current_status_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/current.json")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":{"code":2006,"message":"API key is invalid."}}"#)
            .create_async()
            .await;

        let err = client_for(&server).current("Kampala").await.unwrap_err();

        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_dashboard_keeps_city_order_with_fallbacks() {
        let mut server = Server::new_async().await;
        let _ok = server
            .mock("GET", "/current.json")
            .match_query(Matcher::UrlEncoded("q".into(), "Kampala,Uganda".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CURRENT_FIXTURE)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/current.json")
            .match_query(Matcher::UrlEncoded("q".into(), "Gulu,Uganda".into()))
            .with_status(500)
            .create_async()
            .await;
        let _garbled = server
            .mock("GET", "/current.json")
            .match_query(Matcher::UrlEncoded("q".into(), "Arua,Uganda".into()))
            .with_status(200)
            .with_body("{\"location\":")
            .create_async()
            .await;

        let cities: Vec<String> = ["Gulu", "Kampala", "Arua"]
            .into_iter()
            .map(String::from)
            .collect();
        let dashboard = client_for(&server)
            .dashboard(&cities, &TracingObserver)
            .await
            .unwrap();

        assert_eq!(dashboard.reports.len(), 3);
        assert_eq!(dashboard.reports[0], WeatherReport::unavailable("Gulu"));
        assert_eq!(dashboard.reports[1].city, "Kampala");
        assert!(dashboard.reports[1].is_available());
        assert_eq!(dashboard.reports[2], WeatherReport::unavailable("Arua"));
        assert_eq!(dashboard.failed, vec!["Gulu", "Arua"]);
    }

    #[tokio::test]
    async fn test_dashboard_rejects_empty_city_list() {
        let server = Server::new_async().await;

        let result = client_for(&server).dashboard(&[], &TracingObserver).await;

        assert!(matches!(result, Err(AggregateError::InvalidArgument(_))));
    }

    #[test]
    fn test_query_without_country() {
        let config = WeatherConfig {
            country: String::new(),
            ..WeatherConfig::default()
        };
        let client = WeatherClient::new(&config, 5).unwrap();
        assert_eq!(client.query_for("Nairobi"), "Nairobi");
    }
}
