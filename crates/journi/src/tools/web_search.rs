use journi_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use crate::search::{self, SearchClient};

const MAX_RESULTS: usize = 5;

#[derive(Deserialize, JsonSchema)]
pub struct WebSearchParameters {
    #[schemars(description = "The search query to perform.")]
    query: String,
}

/// Performs a web search and returns the top results.
pub struct WebSearchTool {
    search: SearchClient,
    parameter_schema: Value,
}

impl WebSearchTool {
    /// Creates a tool searching through `search`.
    #[inline]
    pub fn new(search: SearchClient) -> Self {
        WebSearchTool {
            search,
            parameter_schema: schema_for!(WebSearchParameters).to_value(),
        }
    }
}

impl Tool for WebSearchTool {
    type Input = WebSearchParameters;

    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Performs a web search for your query, then returns the top search \
         results."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WebSearchParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let search = self.search.clone();
        async move {
            let query = input.query.trim();
            if query.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`query` must not be empty"));
            }
            let results =
                search.search(query, MAX_RESULTS).await.map_err(|err| {
                    ToolError::execution_error().with_reason(err.to_string())
                })?;
            if results.is_empty() {
                return Ok("No results found! Try a less restrictive/shorter \
                           query."
                    .to_owned());
            }
            Ok(search::format_results(&results))
        }
    }
}
