//! OpenWeather API client
//!
//! Fetches the 5-day / 3-hour forecast in imperial units and folds the
//! 3-hour entries into one `WeatherSnapshot` per local calendar day. Also
//! reads current conditions from the `/weather` endpoint.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::{CityQuery, SnapshotFetcher};
use crate::PlannerError;
use crate::config::PlannerConfig;
use crate::models::{CityForecast, CurrentConditions, WeatherSnapshot};
use crate::window::TargetWindow;

/// A local day needs this many 3-hour slots (of 8) to count. Days at the
/// edges of the forecast often have only a few night slots.
pub const MIN_SLOTS_PER_DAY: u32 = 6;

/// Forecast endpoint response
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub list: Vec<ForecastEntry>,
    pub city: Option<ForecastCity>,
}

/// One 3-hour forecast slot
#[derive(Debug, Deserialize)]
pub struct ForecastEntry {
    /// Unix timestamp (UTC)
    pub dt: i64,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub wind: Wind,
    /// Probability of precipitation (0.0-1.0)
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: f64,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

#[derive(Debug, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    /// Shift from UTC in seconds
    #[serde(default)]
    pub timezone: i64,
}

/// Current weather endpoint response
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    pub dt: i64,
    pub main: CurrentReadings,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub wind: Wind,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
}

/// OpenWeather forecast client
pub struct OpenWeatherClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    /// Create a new client from configuration
    pub fn new(config: &PlannerConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let timeout = Duration::from_secs(config.weather.timeout_seconds.into());

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("holiday-weather/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.weather.max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.weather.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint_url(&self, endpoint: &str, query: &CityQuery) -> String {
        format!(
            "{}/{endpoint}?q={}&units=imperial&appid={}",
            self.base_url,
            urlencoding::encode(&query.search_term()),
            self.api_key
        )
    }

    /// GET `url` and decode the JSON body. Non-2xx statuses become
    /// `PlannerError::Api` carrying status and body.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!("OpenWeather request: {}", redact(url));
        let start_time = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("{what} request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                PlannerError::api(format!("{what} request failed with status {status}: {body}"))
                    .into(),
            );
        }

        let parsed = response
            .json()
            .await
            .with_context(|| format!("Failed to parse OpenWeather response for {what}"))?;

        let total_duration = start_time.elapsed();
        debug!("{what} answered in {:.3}s", total_duration.as_secs_f64());
        if total_duration.as_secs() > 5 {
            warn!(
                "Slow weather API response: {:.3}s",
                total_duration.as_secs_f64()
            );
        }
        Ok(parsed)
    }

    /// Conditions observed right now
    #[instrument(skip(self), fields(city = %query.city))]
    pub async fn current(&self, query: &CityQuery) -> Result<CurrentConditions> {
        let what = format!("Current weather for {}", query.search_term());
        let response: CurrentResponse = self
            .get_json(&self.endpoint_url("weather", query), &what)
            .await?;
        Ok(current_conditions(&query.city, &response)?)
    }
}

#[async_trait]
impl SnapshotFetcher for OpenWeatherClient {
    #[instrument(skip(self, window), fields(city = %query.city, state = %query.state))]
    async fn fetch_forecast(
        &self,
        query: &CityQuery,
        window: &TargetWindow,
    ) -> Result<CityForecast> {
        let what = format!("Forecast for {}", query.search_term());
        let forecast: ForecastResponse = self
            .get_json(&self.endpoint_url("forecast", query), &what)
            .await?;
        info!(
            "Retrieved {} forecast slots for {}",
            forecast.list.len(),
            query.city
        );

        let snapshots = daily_snapshots(&query.city, &forecast)
            .into_iter()
            .filter(|s| window.contains(s.date))
            .collect();
        Ok(CityForecast::new(query.city.clone(), snapshots)?)
    }
}

/// Hide the API key when logging request URLs
fn redact(url: &str) -> String {
    match url.split_once("appid=") {
        Some((head, _)) => format!("{head}appid=***"),
        None => url.to_string(),
    }
}

/// Map a current-weather response onto `city`
pub fn current_conditions(
    city: &str,
    response: &CurrentResponse,
) -> Result<CurrentConditions, PlannerError> {
    let observed_at = DateTime::from_timestamp(response.dt, 0).ok_or_else(|| {
        PlannerError::api(format!(
            "Current weather for {city} has invalid timestamp {}",
            response.dt
        ))
    })?;
    Ok(CurrentConditions {
        city: city.to_string(),
        observed_at,
        temperature: response.main.temp,
        feels_like: response.main.feels_like,
        humidity: response.main.humidity,
        wind_speed: response.wind.speed,
        condition_text: response
            .weather
            .first()
            .map_or_else(|| "unknown".to_string(), |c| c.description.clone()),
    })
}

#[derive(Default)]
struct DayAccumulator {
    high: f64,
    low: f64,
    humidity_sum: f64,
    wind_sum: f64,
    max_pop: f64,
    slots: u32,
    conditions: HashMap<String, u32>,
}

impl DayAccumulator {
    fn add(&mut self, entry: &ForecastEntry) {
        if self.slots == 0 {
            self.high = entry.main.temp_max;
            self.low = entry.main.temp_min;
        } else {
            self.high = self.high.max(entry.main.temp_max);
            self.low = self.low.min(entry.main.temp_min);
        }
        self.humidity_sum += entry.main.humidity;
        self.wind_sum += entry.wind.speed;
        self.max_pop = self.max_pop.max(entry.pop);
        self.slots += 1;
        if let Some(condition) = entry.weather.first() {
            *self
                .conditions
                .entry(condition.description.clone())
                .or_insert(0) += 1;
        }
    }

    /// Most frequent description; ties go to the alphabetically first one
    fn dominant_condition(&self) -> String {
        self.conditions
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(description, _)| description.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn into_snapshot(self, city: &str, date: NaiveDate) -> WeatherSnapshot {
        let slots = f64::from(self.slots);
        WeatherSnapshot {
            city: city.to_string(),
            date,
            temperature_high: self.high,
            temperature_low: self.low,
            humidity: self.humidity_sum / slots,
            wind_speed: self.wind_sum / slots,
            precipitation_probability: self.max_pop * 100.0,
            condition_text: self.dominant_condition(),
        }
    }
}

/// Fold 3-hour slots into one snapshot per local day, in date order.
///
/// Local dates use the city's UTC offset from the response, so an evening
/// slot is not counted towards the next day. Days with fewer than
/// `MIN_SLOTS_PER_DAY` slots are dropped rather than summarised from a few
/// hours.
pub fn daily_snapshots(city: &str, response: &ForecastResponse) -> Vec<WeatherSnapshot> {
    let offset = response.city.as_ref().map_or(0, |c| c.timezone);
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for entry in &response.list {
        let Some(utc) = DateTime::from_timestamp(entry.dt + offset, 0) else {
            warn!("Skipping forecast slot with invalid timestamp {}", entry.dt);
            continue;
        };
        days.entry(utc.date_naive()).or_default().add(entry);
    }

    days.into_iter()
        .filter(|(date, acc)| {
            let enough = acc.slots >= MIN_SLOTS_PER_DAY;
            if !enough {
                warn!(
                    "Dropping {date} for {city}: only {} of 8 forecast slots",
                    acc.slots
                );
            }
            enough
        })
        .map(|(date, acc)| acc.into_snapshot(city, date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // 2025-05-23 00:00:00 UTC
    const MAY_23: i64 = 1_747_958_400;
    const HOUR: i64 = 3600;
    const DAY: i64 = 24 * HOUR;

    fn entry(ts: i64, min: f64, max: f64, humidity: f64, wind: f64, pop: f64, desc: &str) -> Value {
        json!({
            "dt": ts,
            "main": { "temp": (min + max) / 2.0, "temp_min": min, "temp_max": max, "humidity": humidity },
            "weather": [{ "id": 800, "main": "Clear", "description": desc }],
            "wind": { "speed": wind, "deg": 180 },
            "pop": pop,
            "dt_txt": "ignored"
        })
    }

    /// Eight identical slots starting at `day_start`
    fn full_day(day_start: i64, desc: &str) -> Vec<Value> {
        (0..8)
            .map(|slot| entry(day_start + slot * 3 * HOUR, 65.0, 75.0, 40.0, 5.0, 0.0, desc))
            .collect()
    }

    fn forecast_body(list: Vec<Value>, timezone: i64) -> Value {
        json!({
            "cod": "200",
            "list": list,
            "city": { "id": 1, "name": "Austin", "timezone": timezone }
        })
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    #[test]
    fn test_parse_and_aggregate() {
        let may_24 = MAY_23 + DAY;
        let mut list = vec![
            entry(may_24, 64.0, 70.0, 50.0, 4.0, 0.0, "clear sky"),
            entry(may_24 + 3 * HOUR, 62.0, 66.0, 60.0, 2.0, 0.0, "clear sky"),
            entry(may_24 + 6 * HOUR, 63.0, 68.0, 50.0, 4.0, 0.0, "clear sky"),
            entry(may_24 + 9 * HOUR, 66.0, 72.0, 40.0, 6.0, 0.0, "few clouds"),
            entry(may_24 + 12 * HOUR, 72.0, 81.0, 30.0, 8.0, 0.2, "few clouds"),
            entry(may_24 + 15 * HOUR, 74.0, 80.0, 20.0, 10.0, 0.1, "clear sky"),
            entry(may_24 + 18 * HOUR, 70.0, 76.0, 30.0, 8.0, 0.0, "few clouds"),
            entry(may_24 + 21 * HOUR, 66.0, 70.0, 40.0, 6.0, 0.0, "few clouds"),
        ];
        list.extend(full_day(may_24 + DAY, "light rain"));
        let response: ForecastResponse =
            serde_json::from_value(forecast_body(list, 0)).unwrap();

        let snapshots = daily_snapshots("Austin", &response);
        assert_eq!(snapshots.len(), 2);

        let first = &snapshots[0];
        assert_eq!(first.date, date(24));
        assert_eq!(first.temperature_high, 81.0);
        assert_eq!(first.temperature_low, 62.0);
        assert_eq!(first.humidity, 40.0);
        assert_eq!(first.wind_speed, 6.0);
        assert!((first.precipitation_probability - 20.0).abs() < 1e-9);
        // 4 "clear sky" vs 4 "few clouds"
        assert_eq!(first.condition_text, "clear sky");

        let second = &snapshots[1];
        assert_eq!(second.date, date(25));
        assert_eq!(second.condition_text, "light rain");
        assert!(second.validate().is_ok());
    }

    #[test]
    fn test_local_offset_moves_evening_slots() {
        // At UTC-9 the eight slots from 09:00 UTC on the 24th are all the 24th
        let start = MAY_23 + DAY + 9 * HOUR;
        let list = full_day(start, "clear sky");
        let response: ForecastResponse =
            serde_json::from_value(forecast_body(list, -9 * HOUR)).unwrap();

        let snapshots = daily_snapshots("Austin", &response);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].date, date(24));

        // The same slots in UTC split 5/3 across two thin days
        let list = full_day(start, "clear sky");
        let response: ForecastResponse = serde_json::from_value(forecast_body(list, 0)).unwrap();
        assert!(daily_snapshots("Austin", &response).is_empty());
    }

    #[test]
    fn test_thin_edge_days_dropped() {
        let mut list = full_day(MAY_23, "clear sky");
        // Only two night slots on the 24th
        list.push(entry(MAY_23 + DAY, 58.0, 60.0, 70.0, 3.0, 0.0, "clear sky"));
        list.push(entry(MAY_23 + DAY + 3 * HOUR, 56.0, 58.0, 75.0, 3.0, 0.0, "clear sky"));
        let response: ForecastResponse = serde_json::from_value(forecast_body(list, 0)).unwrap();

        let snapshots = daily_snapshots("Austin", &response);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].date, date(23));
    }

    #[test]
    fn test_condition_tie_prefers_alphabetical() {
        let mut list = full_day(MAY_23, "scattered clouds");
        list.truncate(4);
        list.extend(full_day(MAY_23 + 12 * HOUR, "broken clouds").into_iter().take(4));
        let response: ForecastResponse = serde_json::from_value(forecast_body(list, 0)).unwrap();
        let snapshots = daily_snapshots("Austin", &response);
        assert_eq!(snapshots[0].condition_text, "broken clouds");
    }

    #[test]
    fn test_missing_pop_defaults_to_zero() {
        let list: Vec<Value> = (0..8)
            .map(|slot| {
                json!({
                    "dt": MAY_23 + slot * 3 * HOUR,
                    "main": { "temp": 72.0, "temp_min": 70.0, "temp_max": 74.0, "humidity": 45 },
                    "weather": [],
                    "wind": { "speed": 3.5 }
                })
            })
            .collect();
        let response: ForecastResponse = serde_json::from_value(json!({ "list": list })).unwrap();
        let snapshots = daily_snapshots("Austin", &response);
        assert_eq!(snapshots[0].precipitation_probability, 0.0);
        assert_eq!(snapshots[0].condition_text, "unknown");
        assert_eq!(snapshots[0].humidity, 45.0);
    }

    fn current_body() -> Value {
        json!({
            "coord": { "lon": -97.74, "lat": 30.27 },
            "weather": [{ "id": 802, "main": "Clouds", "description": "scattered clouds" }],
            "main": { "temp": 78.4, "feels_like": 79.1, "temp_min": 75.0, "temp_max": 81.0, "humidity": 48 },
            "wind": { "speed": 9.2, "deg": 170 },
            "dt": 1_748_102_400,
            "timezone": -18000,
            "name": "Austin",
            "cod": 200
        })
    }

    #[test]
    fn test_parse_current_weather() {
        let response: CurrentResponse = serde_json::from_value(current_body()).unwrap();
        let current = current_conditions("Austin", &response).unwrap();

        assert_eq!(current.city, "Austin");
        assert_eq!(current.temperature, 78.4);
        assert_eq!(current.feels_like, 79.1);
        assert_eq!(current.humidity, 48.0);
        assert_eq!(current.wind_speed, 9.2);
        assert_eq!(current.condition_text, "scattered clouds");
        assert_eq!(current.observed_at.date_naive(), date(24));
        assert_eq!(current.format_temperature(), "78°F (feels like 79°F)");
    }

    #[test]
    fn test_redact_hides_api_key() {
        let url = "https://api.openweathermap.org/data/2.5/forecast?q=Austin&units=imperial&appid=secret123";
        let redacted = redact(url);
        assert!(!redacted.contains("secret123"));
        assert!(redacted.ends_with("appid=***"));
    }

    #[test]
    fn test_endpoint_url_encodes_city() {
        let mut config = PlannerConfig::default();
        config.weather.api_key = Some("test_api_key_123".to_string());
        config.weather.base_url = "https://example.test/data/2.5/".to_string();
        let client = OpenWeatherClient::new(&config).unwrap();

        let url = client.endpoint_url("forecast", &CityQuery::us("San Diego", "California"));
        assert_eq!(
            url,
            "https://example.test/data/2.5/forecast?q=San%20Diego%2CCalifornia%2CUS&units=imperial&appid=test_api_key_123"
        );
    }

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        let mut config = PlannerConfig::default();
        config.weather.api_key = Some("test_api_key_123".to_string());
        config.weather.base_url = server.uri();
        config.weather.max_retries = 0;
        OpenWeatherClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_forecast_keeps_window_days() {
        let server = MockServer::start().await;
        let list: Vec<Value> = (0..5)
            .flat_map(|d| full_day(MAY_23 + d * DAY, "clear sky"))
            .collect();
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "Austin,Texas,US"))
            .and(query_param("units", "imperial"))
            .and(query_param("appid", "test_api_key_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(list, 0)))
            .expect(1)
            .mount(&server)
            .await;

        let window = TargetWindow::memorial_day_weekend(2025).unwrap();
        let forecast = client_for(&server)
            .fetch_forecast(&CityQuery::us("Austin", "Texas"), &window)
            .await
            .unwrap();

        assert_eq!(forecast.city(), "Austin");
        let dates: Vec<_> = forecast.snapshots().iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![date(24), date(25), date(26)]);
        assert!(forecast.missing_dates(&window).is_empty());
    }

    #[tokio::test]
    async fn test_error_status_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"cod":401,"message":"Invalid API key"}"#),
            )
            .mount(&server)
            .await;

        let window = TargetWindow::memorial_day_weekend(2025).unwrap();
        let err = client_for(&server)
            .fetch_forecast(&CityQuery::us("Austin", "Texas"), &window)
            .await
            .unwrap_err();

        match err.downcast_ref::<PlannerError>() {
            Some(PlannerError::Api { message }) => {
                assert!(message.contains("401"), "{message}");
                assert!(message.contains("Invalid API key"), "{message}");
                assert!(message.contains("Austin,Texas,US"), "{message}");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let window = TargetWindow::memorial_day_weekend(2025).unwrap();
        let err = client_for(&server)
            .fetch_forecast(&CityQuery::us("Austin", "Texas"), &window)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse OpenWeather response"));
    }

    #[tokio::test]
    async fn test_current_weather_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Austin,Texas,US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .expect(1)
            .mount(&server)
            .await;

        let current = client_for(&server)
            .current(&CityQuery::us("Austin", "Texas"))
            .await
            .unwrap();
        assert_eq!(current.condition_text, "scattered clouds");
        assert_eq!(current.temperature, 78.4);
    }
}
