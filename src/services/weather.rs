use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{CurrentConditions, DailyForecast, WeatherForecast};

const FORECAST_DAYS: u32 = 7;
const TIMEZONE: &str = "America/Mexico_City";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<NaiveDate>,
    weather_code: Vec<Option<u16>>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
}

/// Open-Meteo forecast client for a fixed location.
pub struct WeatherClient {
    client: Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
}

impl WeatherClient {
    pub fn new(base_url: String, latitude: f64, longitude: f64, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("slw-newsletter/1.0")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            latitude,
            longitude,
        })
    }

    /// Single attempt, no retry. Callers decide how to degrade.
    pub async fn fetch_forecast(&self) -> Result<WeatherForecast> {
        let response = self
            .client
            .get(format!("{}/v1/forecast", self.base_url))
            .query(&[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m".to_string(),
                ),
                (
                    "daily",
                    "weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max"
                        .to_string(),
                ),
                ("timezone", TIMEZONE.to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::WeatherApi(format!("HTTP {}", response.status())));
        }

        let raw: ForecastResponse = response.json().await?;
        Ok(into_forecast(raw))
    }
}

fn into_forecast(raw: ForecastResponse) -> WeatherForecast {
    let current = CurrentConditions {
        temperature: raw.current.temperature_2m,
        humidity: raw.current.relative_humidity_2m,
        wind_speed: raw.current.wind_speed_10m,
        description: describe_code(raw.current.weather_code).to_string(),
    };

    let daily: Vec<DailyForecast> = raw
        .daily
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, date)| {
            Some(DailyForecast {
                date: *date,
                temp_max: *raw.daily.temperature_2m_max.get(i)?,
                temp_min: *raw.daily.temperature_2m_min.get(i)?,
                precipitation_probability: raw
                    .daily
                    .precipitation_probability_max
                    .get(i)
                    .copied()
                    .flatten(),
                description: describe_code(raw.daily.weather_code.get(i).copied().flatten())
                    .to_string(),
            })
        })
        .collect();

    let summary = summarize(&current, &daily);
    WeatherForecast {
        current,
        daily,
        summary,
    }
}

fn summarize(current: &CurrentConditions, daily: &[DailyForecast]) -> String {
    let now = format!(
        "Currently {:.0}°C and {}",
        current.temperature,
        current.description.to_lowercase()
    );
    if daily.is_empty() {
        return format!("{now}.");
    }

    let high = daily.iter().map(|d| d.temp_max).fold(f64::MIN, f64::max);
    let low = daily.iter().map(|d| d.temp_min).fold(f64::MAX, f64::min);
    let wettest = daily
        .iter()
        .filter_map(|d| d.precipitation_probability.map(|p| (d, p)))
        .max_by(|a, b| a.1.total_cmp(&b.1));

    let rain = match wettest {
        Some((day, p)) if p >= 40.0 => format!(
            " Best chance of rain on {} ({:.0}%).",
            day.date.format("%A, %B %-d"),
            p
        ),
        _ => " Little rain expected.".to_string(),
    };

    format!("{now}. Highs up to {high:.0}°C and lows down to {low:.0}°C this week.{rain}")
}

/// WMO weather interpretation codes.
fn describe_code(code: Option<u16>) -> &'static str {
    match code {
        Some(0) => "Clear sky",
        Some(1) => "Mainly clear",
        Some(2) => "Partly cloudy",
        Some(3) => "Overcast",
        Some(45 | 48) => "Fog",
        Some(51 | 53 | 55 | 56 | 57) => "Drizzle",
        Some(61 | 63 | 65 | 66 | 67) => "Rain",
        Some(71 | 73 | 75 | 77) => "Snow",
        Some(80..=82) => "Rain showers",
        Some(85 | 86) => "Snow showers",
        Some(95..=99) => "Thunderstorms",
        _ => "Unknown conditions",
    }
}
