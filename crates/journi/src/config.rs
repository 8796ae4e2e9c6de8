//! Settings read from the environment.

use std::env;

/// Settings of the travel tools.
///
/// Every key is optional. A tool whose key is missing answers from its
/// built-in tables instead of calling the live API.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// ExchangeRate-API key for `convert_currency`.
    pub exchange_rate_api_key: Option<String>,
    /// OpenWeatherMap key for `get_weather_forecast`.
    pub weather_api_key: Option<String>,
    /// Google Cloud Translation key for `translate_phrase`.
    pub translation_api_key: Option<String>,
    /// Accepted for `get_visa_requirements`; no visa API is wired to it.
    pub visa_api_key: Option<String>,
    /// Hugging Face token for image generation.
    pub hf_token: Option<String>,
    /// Whether tools may search the web.
    pub web_search: bool,
}

impl Config {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Settings with every live service disabled.
    pub fn offline() -> Self {
        Self::default()
    }

    /// Reads the settings through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let web_search = get("JOURNI_WEB_SEARCH")
            .map(|value| {
                !matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "no" | "off"
                )
            })
            .unwrap_or(true);
        Self {
            exchange_rate_api_key: get("EXCHANGE_RATE_API_KEY"),
            weather_api_key: get("WEATHER_API_KEY"),
            translation_api_key: get("TRANSLATION_API_KEY"),
            visa_api_key: get("VISA_API_KEY"),
            hf_token: get("HF_TOKEN"),
            web_search,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Config")
            .field("exchange_rate_api_key", &set(&self.exchange_rate_api_key))
            .field("weather_api_key", &set(&self.weather_api_key))
            .field("translation_api_key", &set(&self.translation_api_key))
            .field("visa_api_key", &set(&self.visa_api_key))
            .field("hf_token", &set(&self.hf_token))
            .field("web_search", &self.web_search)
            .finish()
    }
}

/// Settings of the language model behind the agents.
#[derive(Clone, PartialEq, Eq)]
pub struct ModelSettings {
    /// Bearer token for the chat-completions endpoint.
    pub api_key: String,
    /// Endpoint base URL, if not the default router.
    pub base_url: Option<String>,
    /// Model id, if not the default model.
    pub model: Option<String>,
}

impl ModelSettings {
    /// Reads the settings from the process environment. Returns `None` when
    /// no API key is set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the settings through `lookup`.
    ///
    /// The key is taken from `JOURNI_API_KEY`, then `HF_TOKEN`, then
    /// `OPENAI_API_KEY`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let api_key = get("JOURNI_API_KEY")
            .or_else(|| get("HF_TOKEN"))
            .or_else(|| get("OPENAI_API_KEY"))?;
        Some(Self {
            api_key,
            base_url: get("JOURNI_BASE_URL"),
            model: get("JOURNI_MODEL"),
        })
    }
}

impl std::fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}
