use std::collections::HashMap;

use chrono::{Duration, Local, NaiveDate};
use journi_core::tool::{Tool, ToolResult};
use rand::Rng;
use reqwest::Client;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::seeded_rng;

const DEFAULT_DAYS: i64 = 3;
const MAX_DAYS: i64 = 7;
const MAX_LIVE_DAYS: usize = 5;
const CONDITIONS: [&str; 10] = [
    "Sunny",
    "Partly Cloudy",
    "Cloudy",
    "Light Rain",
    "Heavy Rain",
    "Thunderstorms",
    "Windy",
    "Foggy",
    "Snow",
    "Clear",
];

#[derive(Deserialize, JsonSchema)]
pub struct WeatherForecastParameters {
    #[schemars(description = "City or location name.")]
    destination: String,
    #[schemars(
        description = "Number of days to forecast (default: 3).",
        with = "Option<i64>"
    )]
    #[serde(default, deserialize_with = "lenient_days")]
    days: Option<i64>,
}

/// Accepts `3`, `3.0` and `"3"` alike.
fn lenient_days<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let days = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match days {
        Some(days) if days.is_finite() => Ok(Some(days.round() as i64)),
        _ => Err(D::Error::custom("`days` must be a number")),
    }
}

/// Gets the weather forecast for a travel destination.
pub struct WeatherForecastTool {
    live: Option<(Client, String)>,
    parameter_schema: Value,
}

impl WeatherForecastTool {
    /// Creates a tool that produces synthetic forecasts.
    #[inline]
    pub fn new() -> Self {
        WeatherForecastTool {
            live: None,
            parameter_schema: schema_for!(WeatherForecastParameters)
                .to_value(),
        }
    }

    /// Asks OpenWeatherMap first, falling back to synthetic forecasts.
    pub fn with_api_key(mut self, client: Client, api_key: String) -> Self {
        self.live = Some((client, api_key));
        self
    }
}

impl Default for WeatherForecastTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for WeatherForecastTool {
    type Input = WeatherForecastParameters;

    fn name(&self) -> &str {
        "get_weather_forecast"
    }

    fn description(&self) -> &str {
        "Gets the weather forecast for a travel destination, with packing tips."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WeatherForecastParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let live = self.live.clone();
        async move {
            let destination = input.destination.trim().to_owned();
            let days =
                input.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS) as usize;

            if let Some((client, api_key)) = live {
                match fetch_forecast(&client, &api_key, &destination).await {
                    Ok(forecast) => {
                        if let Some(text) =
                            live_forecast(&destination, days, &forecast)
                        {
                            return Ok(text);
                        }
                        debug!("empty forecast for {destination}");
                    }
                    Err(err) => warn!("weather API failed: {err}"),
                }
            }

            Ok(demo_forecast(&destination, days, Local::now().date_naive()))
        }
    }
}

struct DayForecast {
    low: i32,
    high: i32,
    condition: &'static str,
}

/// Builds a forecast that only depends on the destination name.
pub(crate) fn demo_forecast(
    destination: &str,
    days: usize,
    today: NaiveDate,
) -> String {
    let mut rng = seeded_rng(&[destination]);
    let base: i32 = rng.gen_range(10..=25);

    let mut text = format!("🌦️ Weather forecast for {destination}:\n\n");
    let mut generated = Vec::with_capacity(days);
    for offset in 0..days {
        let date = today + Duration::days(offset as i64);
        let condition = CONDITIONS[rng.gen_range(0..CONDITIONS.len())];
        let high = base + rng.gen_range(0..=10);
        let low = high - rng.gen_range(5..=15);
        let wet = ["Rain", "Snow", "Thunder"]
            .iter()
            .any(|kind| condition.contains(kind));
        let precipitation = if wet { rng.gen_range(0..=100) } else { 0 };

        text.push_str(&format!(
            "• {}: {condition}, {low}°C to {high}°C",
            date.format("%A, %b %d")
        ));
        if precipitation > 0 {
            text.push_str(&format!(
                ", {precipitation}% chance of precipitation"
            ));
        }
        text.push('\n');
        generated.push(DayForecast {
            low,
            high,
            condition,
        });
    }

    text.push_str(&demo_packing_tips(&generated));
    text
}

fn demo_packing_tips(days: &[DayForecast]) -> String {
    let half = days.len() as f64 / 2.0;
    let cold = days.iter().filter(|d| d.low + d.high < 30).count();
    let hot = days.iter().filter(|d| d.high > 25).count();
    let rainy = days
        .iter()
        .any(|d| d.condition.contains("Rain") || d.condition.contains("Thunder"));
    let snowy = days.iter().any(|d| d.condition == "Snow");

    let mut tips = Vec::new();
    if cold as f64 > half {
        tips.push("Bring warm layers and a jacket.");
    } else if cold > 0 {
        tips.push("Pack a light jacket for cooler periods.");
    }
    if rainy {
        tips.push("Don't forget an umbrella or rain gear.");
    }
    if snowy {
        tips.push("Bring waterproof boots and warm socks.");
    }
    if hot as f64 > half {
        tips.push("Bring sunscreen, sunglasses, and light clothing.");
    }
    packing_line(&tips)
}

fn packing_line(tips: &[&str]) -> String {
    if tips.is_empty() {
        return "\n🧳 Packing tips: Comfortable layers should cover it."
            .to_owned();
    }
    format!("\n🧳 Packing tips: {}", tips.join(" "))
}

#[derive(Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
}

#[derive(Deserialize)]
struct ForecastItem {
    dt_txt: String,
    main: ForecastMain,
    weather: Vec<ForecastWeather>,
}

#[derive(Deserialize)]
struct ForecastMain {
    temp: f64,
}

#[derive(Deserialize)]
struct ForecastWeather {
    main: String,
}

impl ForecastItem {
    fn condition(&self) -> &str {
        self.weather.first().map_or("Unknown", |w| w.main.as_str())
    }
}

async fn fetch_forecast(
    client: &Client,
    api_key: &str,
    destination: &str,
) -> Result<ForecastResponse, reqwest::Error> {
    let url = format!(
        "https://api.openweathermap.org/data/2.5/forecast?q={}&appid={}&units=metric",
        urlencoding::encode(destination),
        urlencoding::encode(api_key),
    );
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

/// Summarizes the 3-hourly forecast into one line per day.
fn live_forecast(
    destination: &str,
    days: usize,
    forecast: &ForecastResponse,
) -> Option<String> {
    let days = days.min(MAX_LIVE_DAYS);
    // Dates in first-seen order.
    let mut by_day: Vec<(&str, Vec<&ForecastItem>)> = Vec::new();
    for item in forecast.list.iter().take(days * 8) {
        let date = item.dt_txt.split(' ').next().unwrap_or_default();
        match by_day.iter_mut().find(|(d, _)| *d == date) {
            Some((_, items)) => items.push(item),
            None => by_day.push((date, vec![item])),
        }
    }
    by_day.truncate(days);
    if by_day.is_empty() {
        return None;
    }

    let mut text = format!("🌦️ Weather forecast for {destination}:\n\n");
    for (date, items) in &by_day {
        let day_name = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(|d| d.format("%A").to_string())
            .unwrap_or_default();
        let (low, high) = temp_range(items.iter().copied());
        let precipitation = items.iter().any(|item| is_wet(item.condition()));

        text.push_str(&format!(
            "• {day_name}, {date}: {}, {low:.1}°C to {high:.1}°C",
            most_common_condition(items)
        ));
        if precipitation {
            text.push_str(", 60% chance of precipitation");
        }
        text.push('\n');
    }

    let all = by_day.iter().flat_map(|(_, items)| items.iter().copied());
    text.push_str(&live_packing_tips(all));
    Some(text)
}

fn is_wet(condition: &str) -> bool {
    condition.contains("Rain") || condition.contains("Snow")
}

fn temp_range<'a>(items: impl Iterator<Item = &'a ForecastItem>) -> (f64, f64) {
    items.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), item| {
        (lo.min(item.main.temp), hi.max(item.main.temp))
    })
}

fn most_common_condition<'a>(items: &[&'a ForecastItem]) -> &'a str {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &item in items {
        *counts.entry(item.condition()).or_default() += 1;
    }
    let mut best = "Unknown";
    let mut best_count = 0;
    for &item in items {
        let condition = item.condition();
        let count = counts.get(condition).copied().unwrap_or_default();
        if count > best_count {
            best = condition;
            best_count = count;
        }
    }
    best
}

fn live_packing_tips<'a>(
    items: impl Iterator<Item = &'a ForecastItem> + Clone,
) -> String {
    let (min_temp, max_temp) = temp_range(items.clone());
    let (min_temp, max_temp) = if min_temp.is_finite() {
        (min_temp, max_temp)
    } else {
        (0.0, 30.0)
    };
    let mut has_rain = false;
    let mut has_snow = false;
    for item in items {
        has_rain |= item.condition().contains("Rain");
        has_snow |= item.condition().contains("Snow");
    }

    let mut tips = Vec::new();
    if min_temp < 5.0 {
        tips.push("Bring a heavy winter coat, gloves, and hat.");
    } else if min_temp < 15.0 {
        tips.push("Pack a warm jacket and layers.");
    } else if min_temp < 20.0 {
        tips.push("Bring a light jacket for evenings.");
    }
    if max_temp > 25.0 {
        tips.push("Pack light, breathable clothing for warm days.");
    }
    if has_rain {
        tips.push("Don't forget an umbrella and waterproof footwear.");
    }
    if has_snow {
        tips.push("Bring waterproof boots and warm socks.");
    }
    if max_temp > 22.0 {
        tips.push("Sunscreen and sunglasses are recommended.");
    }
    packing_line(&tips)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    #[test]
    fn test_demo_forecast_is_deterministic() {
        let a = demo_forecast("Lisbon", 3, today());
        let b = demo_forecast("Lisbon", 3, today());
        assert_eq!(a, b);
        assert!(a.starts_with("🌦️ Weather forecast for Lisbon:\n\n"));

        let lines: Vec<_> = a.lines().filter(|l| l.starts_with('•')).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("• Monday, Jan 06: "));
        assert!(lines[2].starts_with("• Wednesday, Jan 08: "));
        assert!(a.contains("🧳 Packing tips: "));
    }

    #[test]
    fn test_demo_forecast_temperatures() {
        for dest in ["Paris", "Tokyo", "Reykjavik", "Cairo"] {
            let text = demo_forecast(dest, 7, today());
            for line in text.lines().filter(|l| l.starts_with('•')) {
                let (_, temps) = line.split_once(": ").unwrap();
                let temps = temps.split(", ").nth(1).unwrap();
                let (low, high) = temps.split_once(" to ").unwrap();
                let low: i32 = low.trim_end_matches("°C").parse().unwrap();
                let high: i32 = high.trim_end_matches("°C").parse().unwrap();
                assert!((10..=35).contains(&high));
                assert!((5..=15).contains(&(high - low)));
            }
        }
    }

    #[tokio::test]
    async fn test_days_are_clamped() {
        let tool = WeatherForecastTool::new();
        let count = |text: &str| text.lines().filter(|l| l.starts_with('•')).count();

        let input = serde_json::from_value(serde_json::json!({
            "destination": "Rome", "days": 30
        }))
        .unwrap();
        assert_eq!(count(&tool.execute(input).await.unwrap()), 7);

        let input = serde_json::from_value(serde_json::json!({
            "destination": "Rome", "days": 0
        }))
        .unwrap();
        assert_eq!(count(&tool.execute(input).await.unwrap()), 1);

        let input =
            serde_json::from_value(serde_json::json!({ "destination": "Rome" }))
                .unwrap();
        assert_eq!(count(&tool.execute(input).await.unwrap()), 3);
    }

    #[test]
    fn test_days_accept_loose_numbers() {
        let days = |value: Value| {
            serde_json::from_value::<WeatherForecastParameters>(
                serde_json::json!({ "destination": "Rome", "days": value }),
            )
            .map(|params| params.days)
        };

        assert_eq!(days(serde_json::json!(4)).unwrap(), Some(4));
        assert_eq!(days(serde_json::json!(4.0)).unwrap(), Some(4));
        assert_eq!(days(serde_json::json!(" 5 ")).unwrap(), Some(5));
        assert_eq!(days(serde_json::json!("")).unwrap(), None);
        assert_eq!(days(Value::Null).unwrap(), None);
        assert!(days(serde_json::json!("a week")).is_err());
        assert!(days(serde_json::json!([3])).is_err());
    }

    #[test]
    fn test_live_forecast() {
        let forecast: ForecastResponse = serde_json::from_value(serde_json::json!({
            "list": [
                { "dt_txt": "2025-01-06 09:00:00", "main": { "temp": 3.0 }, "weather": [{ "main": "Clouds" }] },
                { "dt_txt": "2025-01-06 12:00:00", "main": { "temp": 7.5 }, "weather": [{ "main": "Rain" }] },
                { "dt_txt": "2025-01-06 15:00:00", "main": { "temp": 6.0 }, "weather": [{ "main": "Clouds" }] },
                { "dt_txt": "2025-01-07 09:00:00", "main": { "temp": 9.0 }, "weather": [{ "main": "Clear" }] }
            ]
        }))
        .unwrap();

        let text = live_forecast("Oslo", 3, &forecast).unwrap();
        assert_eq!(
            text,
            "🌦️ Weather forecast for Oslo:\n\n\
             • Monday, 2025-01-06: Clouds, 3.0°C to 7.5°C, 60% chance of precipitation\n\
             • Tuesday, 2025-01-07: Clear, 9.0°C to 9.0°C\n\
             \n🧳 Packing tips: Bring a heavy winter coat, gloves, and hat. \
             Don't forget an umbrella and waterproof footwear."
        );

        let empty = ForecastResponse { list: Vec::new() };
        assert!(live_forecast("Oslo", 3, &empty).is_none());
    }
}
