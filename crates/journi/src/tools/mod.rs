//! The travel tools the agents can call.
//!
//! Every tool answers offline from built-in tables or deterministic sample
//! data. When the [`Config`] carries an API key or enables web search, the
//! tool asks the live service first and falls back to the offline answer
//! when that fails.

mod accommodation;
mod currency;
mod final_answer;
mod generate_image;
mod local_time;
mod preview;
mod translate;
mod visa;
mod visit_webpage;
mod weather;
mod web_search;

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use reqwest::Client;

pub use accommodation::SearchAccommodationsTool;
pub use currency::ConvertCurrencyTool;
pub use final_answer::TravelAnswerTool;
pub use generate_image::GenerateImageTool;
pub use local_time::LocalTimeTool;
pub use preview::DestinationPreviewTool;
pub use translate::TranslatePhraseTool;
pub use visa::VisaRequirementsTool;
pub use visit_webpage::VisitWebpageTool;
pub use weather::WeatherForecastTool;
pub use web_search::WebSearchTool;

use crate::Config;
use crate::image::ImageGenerator;
use crate::search::SearchClient;

const USER_AGENT: &str = concat!("journi/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Builds the tools from one configuration, sharing an HTTP client.
#[derive(Clone, Debug)]
pub struct Toolbox {
    config: Config,
    client: Client,
    search: SearchClient,
    images: Option<ImageGenerator>,
}

impl Toolbox {
    /// Creates a toolbox for `config`.
    pub fn new(config: Config) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!("failed to build HTTP client, using defaults: {err}");
                Client::new()
            });
        let search = if config.web_search {
            SearchClient::new(client.clone())
        } else {
            SearchClient::disabled()
        };
        let images = config
            .hf_token
            .clone()
            .map(|token| ImageGenerator::new(client.clone(), token));
        Self {
            config,
            client,
            search,
            images,
        }
    }

    /// A toolbox that never touches the network.
    pub fn offline() -> Self {
        Self::new(Config::offline())
    }

    /// The configuration the tools were built from.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The web search backend shared by the tools.
    #[inline]
    pub fn search_client(&self) -> &SearchClient {
        &self.search
    }

    /// `convert_currency`, live when an ExchangeRate-API key is set.
    pub fn convert_currency(&self) -> ConvertCurrencyTool {
        let tool = ConvertCurrencyTool::new();
        match &self.config.exchange_rate_api_key {
            Some(key) => tool.with_api_key(self.client.clone(), key.clone()),
            None => tool,
        }
    }

    /// `get_weather_forecast`, live when an OpenWeatherMap key is set.
    pub fn weather_forecast(&self) -> WeatherForecastTool {
        let tool = WeatherForecastTool::new();
        match &self.config.weather_api_key {
            Some(key) => tool.with_api_key(self.client.clone(), key.clone()),
            None => tool,
        }
    }

    /// `get_local_time`.
    pub fn local_time(&self) -> LocalTimeTool {
        LocalTimeTool::new().with_search(self.search.clone())
    }

    /// `translate_phrase`, live when a translation key is set.
    pub fn translate_phrase(&self) -> TranslatePhraseTool {
        let tool = TranslatePhraseTool::new();
        match &self.config.translation_api_key {
            Some(key) => tool.with_api_key(self.client.clone(), key.clone()),
            None => tool,
        }
    }

    /// `get_visa_requirements`.
    pub fn visa_requirements(&self) -> VisaRequirementsTool {
        let tool = VisaRequirementsTool::new().with_search(self.search.clone());
        if self.config.visa_api_key.is_some() {
            tool.with_api_key()
        } else {
            tool
        }
    }

    /// `search_accommodations`.
    pub fn search_accommodations(&self) -> SearchAccommodationsTool {
        SearchAccommodationsTool::new().with_search(self.search.clone())
    }

    /// `generate_destination_preview`, rendering images when a Hugging
    /// Face token is set.
    pub fn destination_preview(&self) -> DestinationPreviewTool {
        let tool = DestinationPreviewTool::new();
        match &self.images {
            Some(images) => tool.with_image_generator(images.clone()),
            None => tool,
        }
    }

    /// `generate_image`.
    pub fn generate_image(&self) -> GenerateImageTool {
        GenerateImageTool::new(self.images.clone())
    }

    /// The coordinator's `final_answer`.
    pub fn travel_answer(&self) -> TravelAnswerTool {
        TravelAnswerTool::new()
    }

    /// `web_search`.
    pub fn web_search(&self) -> WebSearchTool {
        WebSearchTool::new(self.search.clone())
    }

    /// `visit_webpage`.
    pub fn visit_webpage(&self) -> VisitWebpageTool {
        VisitWebpageTool::new(self.search.clone())
    }
}

/// Sum of the character codes of every part.
fn seed_of(parts: &[&str]) -> u64 {
    parts
        .iter()
        .flat_map(|part| part.chars())
        .map(|c| u64::from(u32::from(c)))
        .sum()
}

/// A generator that yields the same values for the same inputs.
fn seeded_rng(parts: &[&str]) -> StdRng {
    StdRng::seed_from_u64(seed_of(parts))
}

/// Whether either string contains the other.
fn matches_either(key: &str, query: &str) -> bool {
    !query.is_empty() && (key.contains(query) || query.contains(key))
}

/// Uppercases the first letter of every word.
fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formats with two decimals and thousands separators.
fn format_amount(amount: f64) -> String {
    let text = format!("{:.2}", amount.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-4200.5), "-4,200.50");
    }

    #[test]
    fn test_helpers() {
        assert_eq!(title_case("united states of america"), "United States Of America");
        assert!(matches_either("new york", "york"));
        assert!(matches_either("paris", "paris, france"));
        assert!(!matches_either("paris", ""));
        assert_eq!(seed_of(&["ab", "c"]), 97 + 98 + 99);
    }

    #[test]
    fn test_offline_toolbox() {
        let toolbox = Toolbox::offline();
        assert!(!toolbox.search_client().is_enabled());
        assert!(toolbox.images.is_none());
    }
}
