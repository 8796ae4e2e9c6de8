use journi_core::tool::{Error as ToolError, Tool, ToolResult};
use rand::Rng;
use rand::seq::SliceRandom;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::{seeded_rng, title_case};
use crate::search::{SearchClient, SearchResult};

const MAX_RESULTS: usize = 8;
const SAMPLE_LISTINGS: usize = 5;

const NAME_PREFIXES: [&str; 8] = [
    "Grand",
    "Central",
    "Harbor View",
    "Old Town",
    "Garden",
    "Riverside",
    "Skyline",
    "Heritage",
];
const KINDS: [&str; 6] = [
    "Hotel",
    "Boutique Hotel",
    "Guesthouse",
    "Apartments",
    "Inn",
    "Resort",
];
const AREAS: [&str; 6] = [
    "City Center",
    "Old Town",
    "Waterfront",
    "Arts District",
    "Near the Main Station",
    "Quiet Residential Area",
];

#[derive(Deserialize, JsonSchema)]
pub struct SearchAccommodationsParameters {
    #[schemars(
        description = "The destination city or region (e.g., \"Tokyo\", \"Bali\", \"Paris\")."
    )]
    destination: String,
    #[schemars(
        description = "Price range (e.g., \"budget\", \"mid-range\", \"luxury\")."
    )]
    budget: Option<String>,
    #[schemars(
        description = "Type of accommodation (e.g., \"hotel\", \"hostel\", \"apartment\", \"resort\")."
    )]
    style: Option<String>,
    #[schemars(description = "Preferred area or neighborhood.")]
    location: Option<String>,
}

struct Filters {
    destination: String,
    budget: Option<String>,
    style: Option<String>,
    location: Option<String>,
}

impl Filters {
    fn new(input: SearchAccommodationsParameters) -> Self {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        Self {
            destination: input.destination.trim().to_owned(),
            budget: clean(input.budget),
            style: clean(input.style),
            location: clean(input.location),
        }
    }

    fn query(&self) -> String {
        let mut query = format!("accommodations {}", self.destination);
        if let Some(budget) = &self.budget {
            query.push_str(&format!(" {budget} price"));
        }
        if let Some(style) = &self.style {
            query.push_str(&format!(" {style}"));
        }
        if let Some(location) = &self.location {
            query.push_str(&format!(" in {location}"));
        }
        query
    }

    fn header(&self) -> String {
        let mut header =
            format!("🏨 **Accommodation Options in {}**\n\n", self.destination);
        let mut filters = Vec::new();
        if let Some(budget) = &self.budget {
            filters.push(format!("Budget: {budget}"));
        }
        if let Some(style) = &self.style {
            filters.push(format!("Type: {style}"));
        }
        if let Some(location) = &self.location {
            filters.push(format!("Area: {location}"));
        }
        if !filters.is_empty() {
            header.push_str(&format!(
                "Search filters: {}\n\n",
                filters.join(", ")
            ));
        }
        header
    }
}

/// Searches for accommodations with optional budget, style and area
/// filters.
pub struct SearchAccommodationsTool {
    search: Option<SearchClient>,
    parameter_schema: Value,
}

impl SearchAccommodationsTool {
    /// Creates a tool that only lists sample accommodations.
    #[inline]
    pub fn new() -> Self {
        SearchAccommodationsTool {
            search: None,
            parameter_schema: schema_for!(SearchAccommodationsParameters)
                .to_value(),
        }
    }

    /// Searches the web first, falling back to sample listings.
    pub fn with_search(mut self, search: SearchClient) -> Self {
        self.search = Some(search);
        self
    }
}

impl Default for SearchAccommodationsTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for SearchAccommodationsTool {
    type Input = SearchAccommodationsParameters;

    fn name(&self) -> &str {
        "search_accommodations"
    }

    fn description(&self) -> &str {
        "Searches for available accommodations at a travel destination with \
         customizable filters like budget, style, and location."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SearchAccommodationsParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let search = self.search.clone();
        async move {
            let filters = Filters::new(input);
            if filters.destination.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`destination` must not be empty"));
            }

            if let Some(search) = search.filter(SearchClient::is_enabled) {
                match search.search(&filters.query(), MAX_RESULTS).await {
                    Ok(results) if !results.is_empty() => {
                        return Ok(format_search_results(&filters, &results));
                    }
                    Ok(_) => {
                        debug!("no accommodation results for {}", filters.query())
                    }
                    Err(err) => warn!("accommodation search failed: {err}"),
                }
            }

            Ok(sample_listings(&filters))
        }
    }
}

fn format_search_results(filters: &Filters, results: &[SearchResult]) -> String {
    let mut text = filters.header();
    for (idx, result) in results.iter().enumerate() {
        let body = if result.body.is_empty() {
            "No description available"
        } else {
            &result.body
        };
        text.push_str(&format!(
            "### {}. {}\n{body}\n[View Details]({})\n\n",
            idx + 1,
            result.title,
            result.href
        ));
    }
    text.push_str(
        "Note: These are search results. For accurate pricing and \
         availability, check the official websites or booking platforms.",
    );
    text
}

/// Nightly price range in USD for a budget description.
fn price_range(budget: Option<&str>) -> (u32, u32) {
    let budget = budget.unwrap_or_default().to_lowercase();
    if ["budget", "cheap", "low", "backpack", "economy"]
        .iter()
        .any(|k| budget.contains(k))
    {
        (25, 80)
    } else if ["luxury", "high", "premium", "5-star", "five star"]
        .iter()
        .any(|k| budget.contains(k))
    {
        (250, 600)
    } else {
        (90, 220)
    }
}

fn sample_listings(filters: &Filters) -> String {
    let mut rng = seeded_rng(&[
        filters.destination.as_str(),
        filters.budget.as_deref().unwrap_or_default(),
        filters.style.as_deref().unwrap_or_default(),
        filters.location.as_deref().unwrap_or_default(),
    ]);
    let (min_price, max_price) = price_range(filters.budget.as_deref());

    let mut prefixes = NAME_PREFIXES;
    prefixes.shuffle(&mut rng);
    let mut text = filters.header();
    for (idx, prefix) in prefixes.iter().take(SAMPLE_LISTINGS).enumerate() {
        let kind = match &filters.style {
            Some(style) => title_case(style),
            None => KINDS[rng.gen_range(0..KINDS.len())].to_owned(),
        };
        let area = match &filters.location {
            Some(location) => location.clone(),
            None => AREAS[rng.gen_range(0..AREAS.len())].to_owned(),
        };
        let price = rng.gen_range(min_price..=max_price);
        let rating = f64::from(rng.gen_range(35..=49_u32)) / 10.0;
        text.push_str(&format!(
            "### {}. {prefix} {kind} {}\n{area} · about ${price} per night · \
             rated {rating:.1}/5\n\n",
            idx + 1,
            filters.destination,
        ));
    }
    text.push_str(
        "Note: These are sample listings for planning purposes. For accurate \
         pricing and availability, check the official websites or booking \
         platforms.",
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(
        budget: Option<&str>,
        style: Option<&str>,
        location: Option<&str>,
    ) -> Filters {
        Filters::new(SearchAccommodationsParameters {
            destination: " Kyoto ".to_owned(),
            budget: budget.map(str::to_owned),
            style: style.map(str::to_owned),
            location: location.map(str::to_owned),
        })
    }

    #[test]
    fn test_query_and_header() {
        let f = filters(Some("luxury"), Some("ryokan"), Some("Gion"));
        assert_eq!(f.query(), "accommodations Kyoto luxury price ryokan in Gion");
        assert_eq!(
            f.header(),
            "🏨 **Accommodation Options in Kyoto**\n\n\
             Search filters: Budget: luxury, Type: ryokan, Area: Gion\n\n"
        );

        let f = filters(None, Some("  "), None);
        assert_eq!(f.query(), "accommodations Kyoto");
        assert_eq!(f.header(), "🏨 **Accommodation Options in Kyoto**\n\n");
    }

    #[test]
    fn test_sample_listings() {
        let f = filters(Some("budget"), Some("hostel"), None);
        let text = sample_listings(&f);
        assert_eq!(text, sample_listings(&f));
        assert_eq!(text.matches("### ").count(), SAMPLE_LISTINGS);
        assert!(text.contains("### 1. "));
        assert!(text.contains(" Hostel Kyoto\n"));
        for line in text.lines().filter(|l| l.contains("per night")) {
            let price = line
                .split("about $")
                .nth(1)
                .and_then(|rest| rest.split(' ').next())
                .unwrap();
            let price: u32 = price.parse().unwrap();
            assert!((25..=80).contains(&price));
        }

        let f = filters(None, Some("capsule hotel"), None);
        assert!(sample_listings(&f).contains(" Capsule Hotel Kyoto\n"));
    }

    #[test]
    fn test_format_search_results() {
        let f = filters(None, None, None);
        let text = format_search_results(
            &f,
            &[SearchResult {
                title: "Ryokan Sakura".to_owned(),
                href: "https://example.com/sakura".to_owned(),
                body: String::new(),
            }],
        );
        assert!(text.contains(
            "### 1. Ryokan Sakura\nNo description available\n\
             [View Details](https://example.com/sakura)\n\n"
        ));
        assert!(text.ends_with("booking platforms."));
    }

    #[tokio::test]
    async fn test_disabled_search_uses_samples() {
        let tool =
            SearchAccommodationsTool::new().with_search(SearchClient::disabled());
        let output = tool
            .execute(SearchAccommodationsParameters {
                destination: "Lisbon".to_owned(),
                budget: None,
                style: None,
                location: Some("Alfama".to_owned()),
            })
            .await
            .unwrap();
        assert!(output.starts_with("🏨 **Accommodation Options in Lisbon**"));
        assert!(output.contains("Alfama · about $"));
    }
}
