use journi_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use crate::search::{Error as SearchError, SearchClient};

const MAX_CHARS: usize = 10_000;

#[derive(Deserialize, JsonSchema)]
pub struct VisitWebpageParameters {
    #[schemars(description = "The url of the webpage to visit.")]
    url: String,
}

/// Reads a webpage as plain text.
pub struct VisitWebpageTool {
    search: SearchClient,
    parameter_schema: Value,
}

impl VisitWebpageTool {
    /// Creates a tool fetching pages through `search`.
    #[inline]
    pub fn new(search: SearchClient) -> Self {
        VisitWebpageTool {
            search,
            parameter_schema: schema_for!(VisitWebpageParameters).to_value(),
        }
    }
}

impl Tool for VisitWebpageTool {
    type Input = VisitWebpageParameters;

    fn name(&self) -> &str {
        "visit_webpage"
    }

    fn description(&self) -> &str {
        "Visits a webpage at the given url and reads its content as text. \
         Use this to browse webpages found with web_search."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: VisitWebpageParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let search = self.search.clone();
        async move {
            match search.fetch_page(input.url.trim()).await {
                Ok(text) => Ok(truncate(text)),
                Err(err @ SearchError::InvalidUrl(_)) => {
                    Err(ToolError::invalid_input().with_reason(err.to_string()))
                }
                Err(err) => Err(ToolError::execution_error()
                    .with_reason(format!("Error fetching the webpage: {err}"))),
            }
        }
    }
}

fn truncate(text: String) -> String {
    match text.char_indices().nth(MAX_CHARS) {
        Some((end, _)) => format!(
            "{}\n..._This content has been truncated to stay below \
             {MAX_CHARS} characters_...",
            &text[..end]
        ),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use journi_core::tool::ErrorKind;

    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short".to_owned()), "short");
        let long = "é".repeat(MAX_CHARS + 5);
        let truncated = truncate(long);
        assert!(truncated.starts_with(&"é".repeat(MAX_CHARS)));
        assert!(truncated.ends_with("characters_..."));
    }

    #[tokio::test]
    async fn test_rejects_non_http_urls() {
        let tool = VisitWebpageTool::new(SearchClient::disabled());
        let err = tool
            .execute(VisitWebpageParameters {
                url: "file:///etc/passwd".to_owned(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
