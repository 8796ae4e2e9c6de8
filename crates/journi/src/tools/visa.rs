use journi_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::title_case;
use crate::search::SearchClient;

const DISCLAIMER: &str = "(Note: Visa requirements may change. Always verify \
    with the official embassy or consulate before travel.)";

const EUROPEAN_UNION: &str = "european union";

const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("us", "united states"),
    ("usa", "united states"),
    ("u.s.", "united states"),
    ("america", "united states"),
    ("united states of america", "united states"),
    ("uk", "united kingdom"),
    ("britain", "united kingdom"),
    ("great britain", "united kingdom"),
    ("england", "united kingdom"),
    ("uae", "united arab emirates"),
    ("emirates", "united arab emirates"),
    ("prc", "china"),
    ("korea", "south korea"),
    ("republic of korea", "south korea"),
    ("aus", "australia"),
    ("nz", "new zealand"),
    ("can", "canada"),
    ("russian federation", "russia"),
    ("sa", "south africa"),
    ("ph", "philippines"),
    ("sg", "singapore"),
    ("türkiye", "turkey"),
    ("turkiye", "turkey"),
    ("holland", "netherlands"),
    ("the netherlands", "netherlands"),
    ("czechia", "czech republic"),
    ("eu", EUROPEAN_UNION),
    ("europe", EUROPEAN_UNION),
    ("schengen", EUROPEAN_UNION),
    ("schengen area", EUROPEAN_UNION),
];

const SCHENGEN_MEMBERS: &[&str] = &[
    "austria",
    "belgium",
    "croatia",
    "czech republic",
    "denmark",
    "estonia",
    "finland",
    "france",
    "germany",
    "greece",
    "hungary",
    "iceland",
    "italy",
    "latvia",
    "liechtenstein",
    "lithuania",
    "luxembourg",
    "malta",
    "netherlands",
    "norway",
    "poland",
    "portugal",
    "slovakia",
    "slovenia",
    "spain",
    "sweden",
    "switzerland",
];

const SCHENGEN_90_DAYS: &str =
    "No visa required for stays up to 90 days in the Schengen Area";

/// Requirements by nationality, then destination.
const VISA_DATA: &[(&str, &[(&str, &str)])] = &[
    (
        "united states",
        &[
            (EUROPEAN_UNION, SCHENGEN_90_DAYS),
            ("united kingdom", "No visa required for stays up to 6 months"),
            ("japan", "No visa required for stays up to 90 days"),
            ("australia", "Electronic Travel Authority (ETA) required"),
            ("china", "Visa required, must apply in advance"),
            ("india", "e-Visa available, apply online before travel"),
            ("brazil", "No visa required for stays up to 90 days"),
            ("mexico", "No visa required for stays up to 180 days"),
            ("south africa", "No visa required for stays up to 90 days"),
            ("thailand", "No visa required for stays up to 30 days"),
            ("canada", "No visa required for US citizens"),
        ],
    ),
    (
        "united kingdom",
        &[
            (EUROPEAN_UNION, SCHENGEN_90_DAYS),
            ("united states", "ESTA required for entry"),
            ("japan", "No visa required for stays up to 90 days"),
            ("australia", "eVisitor visa required"),
            ("china", "Visa required, must apply in advance"),
            ("india", "e-Visa available, apply online before travel"),
            ("brazil", "No visa required for stays up to 90 days"),
            ("mexico", "No visa required for stays up to 180 days"),
            ("south africa", "No visa required for stays up to 90 days"),
            ("thailand", "No visa required for stays up to 30 days"),
            ("canada", "eTA required for British citizens"),
        ],
    ),
    (
        "canada",
        &[
            (EUROPEAN_UNION, SCHENGEN_90_DAYS),
            ("united states", "No visa required for Canadian citizens"),
            ("japan", "No visa required for stays up to 90 days"),
            ("australia", "eVisitor visa required"),
            ("china", "Visa required, must apply in advance"),
            ("india", "e-Visa available, apply online before travel"),
            ("brazil", "No visa required for stays up to 90 days"),
            ("mexico", "No visa required for stays up to 180 days"),
            ("south africa", "No visa required for stays up to 90 days"),
            ("thailand", "No visa required for stays up to 30 days"),
            ("united kingdom", "No visa required for stays up to 6 months"),
        ],
    ),
    (
        "japan",
        &[
            (EUROPEAN_UNION, SCHENGEN_90_DAYS),
            ("united states", "ESTA required for entry"),
            ("australia", "eVisitor visa required"),
            ("china", "Visa required, must apply in advance"),
            ("india", "e-Visa available, apply online before travel"),
            ("brazil", "Visa required for Japanese citizens"),
            ("mexico", "No visa required for stays up to 180 days"),
            ("south africa", "No visa required for stays up to 90 days"),
            ("thailand", "No visa required for stays up to 30 days"),
            ("united kingdom", "No visa required for stays up to 6 months"),
            ("canada", "eTA required for Japanese citizens"),
        ],
    ),
    (
        "australia",
        &[
            (EUROPEAN_UNION, SCHENGEN_90_DAYS),
            ("united states", "ESTA required for entry"),
            ("japan", "No visa required for stays up to 90 days"),
            ("china", "Visa required, must apply in advance"),
            ("india", "e-Visa available, apply online before travel"),
            ("brazil", "Visa required for Australian citizens"),
            ("mexico", "No visa required for stays up to 180 days"),
            ("south africa", "No visa required for stays up to 90 days"),
            ("thailand", "No visa required for stays up to 30 days"),
            ("united kingdom", "No visa required for stays up to 6 months"),
            ("canada", "eTA required for Australian citizens"),
        ],
    ),
];

#[derive(Deserialize, JsonSchema)]
pub struct VisaRequirementsParameters {
    #[schemars(
        description = "Traveler's passport country (e.g., 'US', 'UK', 'Canada')."
    )]
    nationality: String,
    #[schemars(description = "Country to visit (e.g., 'Japan', 'France', 'Brazil').")]
    destination: String,
}

/// Checks visa requirements for traveling to a destination.
pub struct VisaRequirementsTool {
    search: Option<SearchClient>,
    has_api_key: bool,
    parameter_schema: Value,
}

impl VisaRequirementsTool {
    /// Creates a tool answering from the built-in table.
    #[inline]
    pub fn new() -> Self {
        VisaRequirementsTool {
            search: None,
            has_api_key: false,
            parameter_schema: schema_for!(VisaRequirementsParameters)
                .to_value(),
        }
    }

    /// Looks up routes missing from the table on the web.
    pub fn with_search(mut self, search: SearchClient) -> Self {
        self.search = Some(search);
        self
    }

    /// Records that a visa API key was configured.
    pub fn with_api_key(mut self) -> Self {
        self.has_api_key = true;
        self
    }
}

impl Default for VisaRequirementsTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for VisaRequirementsTool {
    type Input = VisaRequirementsParameters;

    fn name(&self) -> &str {
        "get_visa_requirements"
    }

    fn description(&self) -> &str {
        "Checks visa requirements for traveling to a destination."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: VisaRequirementsParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let search = self.search.clone();
        let has_api_key = self.has_api_key;
        async move {
            let nationality = normalize_country(&input.nationality);
            let destination = normalize_country(&input.destination);
            if nationality.is_empty() || destination.is_empty() {
                return Err(ToolError::invalid_input().with_reason(
                    "`nationality` and `destination` must not be empty",
                ));
            }
            if has_api_key {
                debug!("no visa API is available, using stored data");
            }

            match lookup(&nationality, &destination) {
                Lookup::Found(requirements) => Ok(format!(
                    "🛂 Visa requirements for {} citizens traveling to {}:\
                     \n\n{requirements}\n\n{DISCLAIMER}",
                    title_case(&nationality),
                    title_case(&destination),
                )),
                Lookup::OwnCountry => Ok(format!(
                    "As a citizen of {}, you generally don't need a visa to \
                     visit your own country.\n\n{DISCLAIMER}",
                    title_case(&nationality)
                )),
                miss => {
                    if let Some(search) = search.filter(SearchClient::is_enabled) {
                        if let Some(snippet) =
                            search_snippet(&search, &nationality, &destination)
                                .await
                        {
                            return Ok(format!(
                                "Based on web search, for {} citizens \
                                 traveling to {}: {snippet}\n\n{DISCLAIMER}",
                                title_case(&nationality),
                                title_case(&destination),
                            ));
                        }
                    }
                    Ok(miss_message(&miss, &nationality, &destination))
                }
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Lookup {
    Found(&'static str),
    OwnCountry,
    UnknownNationality,
    UnknownRoute,
}

fn normalize_country(name: &str) -> String {
    let name = name.trim().to_lowercase();
    COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, country)| (*country).to_owned())
}

fn lookup(nationality: &str, destination: &str) -> Lookup {
    if nationality == destination {
        return Lookup::OwnCountry;
    }
    let Some((_, routes)) =
        VISA_DATA.iter().find(|(country, _)| *country == nationality)
    else {
        return Lookup::UnknownNationality;
    };
    let find = |dest: &str| {
        routes
            .iter()
            .find(|(country, _)| *country == dest)
            .map(|(_, requirements)| *requirements)
    };
    let requirements = find(destination).or_else(|| {
        SCHENGEN_MEMBERS
            .contains(&destination)
            .then(|| find(EUROPEAN_UNION))
            .flatten()
    });
    match requirements {
        Some(requirements) => Lookup::Found(requirements),
        None => Lookup::UnknownRoute,
    }
}

async fn search_snippet(
    search: &SearchClient,
    nationality: &str,
    destination: &str,
) -> Option<String> {
    let query = format!(
        "visa requirements for {nationality} citizens traveling to {destination}"
    );
    match search.search(&query, 3).await {
        Ok(results) => results
            .into_iter()
            .map(|result| result.body)
            .find(|body| !body.is_empty()),
        Err(err) => {
            warn!("visa search failed: {err}");
            None
        }
    }
}

fn miss_message(miss: &Lookup, nationality: &str, destination: &str) -> String {
    let nationality = title_case(nationality);
    let destination = title_case(destination);
    let lead = if *miss == Lookup::UnknownNationality {
        format!("I don't have specific visa information for citizens of {nationality}.")
    } else {
        format!(
            "I don't have specific visa information for {nationality} \
             citizens traveling to {destination}."
        )
    };
    format!(
        "{lead} Please check with the embassy of {destination} for accurate \
         visa requirements.\n\n{DISCLAIMER}"
    )
}
