use chrono::{DateTime, Offset, Utc};
use chrono_tz::Tz;
use journi_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::matches_either;
use crate::search::SearchClient;

/// Popular destinations and their IANA zones. First match wins.
const DESTINATION_TIMEZONES: &[(&str, &str)] = &[
    ("london", "Europe/London"),
    ("paris", "Europe/Paris"),
    ("rome", "Europe/Rome"),
    ("madrid", "Europe/Madrid"),
    ("berlin", "Europe/Berlin"),
    ("amsterdam", "Europe/Amsterdam"),
    ("athens", "Europe/Athens"),
    ("istanbul", "Europe/Istanbul"),
    ("dubai", "Asia/Dubai"),
    ("new delhi", "Asia/Kolkata"),
    ("mumbai", "Asia/Kolkata"),
    ("bangkok", "Asia/Bangkok"),
    ("singapore", "Asia/Singapore"),
    ("tokyo", "Asia/Tokyo"),
    ("seoul", "Asia/Seoul"),
    ("beijing", "Asia/Shanghai"),
    ("shanghai", "Asia/Shanghai"),
    ("hong kong", "Asia/Hong_Kong"),
    ("sydney", "Australia/Sydney"),
    ("melbourne", "Australia/Melbourne"),
    ("auckland", "Pacific/Auckland"),
    ("fiji", "Pacific/Fiji"),
    ("honolulu", "Pacific/Honolulu"),
    ("anchorage", "America/Anchorage"),
    ("los angeles", "America/Los_Angeles"),
    ("san francisco", "America/Los_Angeles"),
    ("las vegas", "America/Los_Angeles"),
    ("denver", "America/Denver"),
    ("chicago", "America/Chicago"),
    ("houston", "America/Chicago"),
    ("new york", "America/New_York"),
    ("miami", "America/New_York"),
    ("toronto", "America/Toronto"),
    ("mexico city", "America/Mexico_City"),
    ("rio de janeiro", "America/Sao_Paulo"),
    ("sao paulo", "America/Sao_Paulo"),
    ("buenos aires", "America/Argentina/Buenos_Aires"),
    ("cairo", "Africa/Cairo"),
    ("cape town", "Africa/Johannesburg"),
    ("johannesburg", "Africa/Johannesburg"),
    ("nairobi", "Africa/Nairobi"),
];

#[derive(Deserialize, JsonSchema)]
pub struct LocalTimeParameters {
    #[schemars(
        description = "A city or location name (e.g., \"Paris\", \"Tokyo\", \"New York\")."
    )]
    destination: String,
}

/// Gets the current local time at a travel destination.
pub struct LocalTimeTool {
    search: Option<SearchClient>,
    parameter_schema: Value,
}

impl LocalTimeTool {
    /// Creates a tool answering from the destination table.
    #[inline]
    pub fn new() -> Self {
        LocalTimeTool {
            search: None,
            parameter_schema: schema_for!(LocalTimeParameters).to_value(),
        }
    }

    /// Guesses the offset of unknown destinations from web search results.
    pub fn with_search(mut self, search: SearchClient) -> Self {
        self.search = Some(search);
        self
    }
}

impl Default for LocalTimeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for LocalTimeTool {
    type Input = LocalTimeParameters;

    fn name(&self) -> &str {
        "get_local_time"
    }

    fn description(&self) -> &str {
        "Gets the current local time at a travel destination."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: LocalTimeParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let search = self.search.clone();
        async move {
            let destination = input.destination.trim();
            if destination.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`destination` must not be empty"));
            }

            if let Some(text) = local_time_at(destination, Utc::now()) {
                return Ok(text);
            }

            if let Some(search) = search.filter(SearchClient::is_enabled) {
                let query = format!("{destination} timezone");
                match search.search(&query, 5).await {
                    Ok(results) => {
                        let guess = results
                            .iter()
                            .find_map(|result| offset_hint(&result.body));
                        if let Some(guess) = guess {
                            return Ok(format!(
                                "Based on web search, the timezone in \
                                 {destination} appears to be around {guess}. \
                                 Current time information is not available."
                            ));
                        }
                    }
                    Err(err) => warn!("timezone search failed: {err}"),
                }
            }

            Ok(format!(
                "I don't have timezone information for {destination}. \
                 Please try a major city nearby."
            ))
        }
    }
}

fn timezone_for(destination: &str) -> Option<Tz> {
    let normalized = destination.trim().to_lowercase();
    let (_, name) = DESTINATION_TIMEZONES
        .iter()
        .find(|(city, _)| matches_either(city, &normalized))?;
    name.parse().ok()
}

/// Formats the local time at `destination` for the instant `now`.
pub(crate) fn local_time_at(
    destination: &str,
    now: DateTime<Utc>,
) -> Option<String> {
    let tz = timezone_for(destination)?;
    let local = now.with_timezone(&tz);
    let offset = local.offset().fix().local_minus_utc();
    Some(format!(
        "The current local time in {destination} is {} ({})",
        local.format("%I:%M %p on %A, %B %d, %Y"),
        format_utc_offset(offset)
    ))
}

fn format_utc_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.unsigned_abs();
    let (hours, minutes) = (seconds / 3600, seconds % 3600 / 60);
    if minutes == 0 {
        format!("UTC{sign}{hours}")
    } else {
        format!("UTC{sign}{hours}:{minutes:02}")
    }
}

/// Pulls the text right after the first `utc`/`gmt` mention.
fn offset_hint(body: &str) -> Option<String> {
    let body = body.to_lowercase();
    let pos = body.find("utc").or_else(|| body.find("gmt"))?;
    Some(body[pos..].chars().take(8).collect::<String>().to_uppercase())
}
