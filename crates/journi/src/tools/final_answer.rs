use journi_core::tool::{FINAL_ANSWER_TOOL, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

const TIP_KEYWORDS: [&str; 6] = [
    "tip",
    "recommend",
    "bring",
    "pack",
    "don't forget",
    "suggestion",
];

#[derive(Deserialize, JsonSchema)]
pub struct TravelAnswerParameters {
    #[schemars(description = "The final answer to return to the user.")]
    answer: String,
}

/// Hands the final travel plan to the user, adding summary, details and
/// tips sections when the answer has none.
pub struct TravelAnswerTool {
    parameter_schema: Value,
}

impl TravelAnswerTool {
    /// Creates the tool.
    #[inline]
    pub fn new() -> Self {
        TravelAnswerTool {
            parameter_schema: schema_for!(TravelAnswerParameters).to_value(),
        }
    }
}

impl Default for TravelAnswerTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for TravelAnswerTool {
    type Input = TravelAnswerParameters;

    fn name(&self) -> &str {
        FINAL_ANSWER_TOOL
    }

    fn description(&self) -> &str {
        "Provides the final comprehensive travel information to the user."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: TravelAnswerParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move { Ok(structure_answer(&input.answer)) }
    }
}

fn structure_answer(answer: &str) -> String {
    if answer.contains("Travel summary")
        || answer.contains("Detailed travel information")
    {
        return answer.to_owned();
    }

    let mut sections = answer.split("\n\n");
    let mut text = String::from("### Travel summary (short version):\n");
    text.push_str(sections.next().unwrap_or_default());
    text.push_str("\n\n### Detailed travel information:\n");
    let details: Vec<_> = sections.collect();
    if !details.is_empty() {
        text.push_str(&details.join("\n"));
        text.push_str("\n\n");
    }

    text.push_str("### Practical tips and recommendations:\n");
    let tips: Vec<_> = answer
        .lines()
        .filter(|line| {
            let line = line.to_lowercase();
            TIP_KEYWORDS.iter().any(|keyword| line.contains(keyword))
        })
        .collect();
    if tips.is_empty() {
        text.push_str(
            "Safe travels! Remember to check local regulations and customs \
             before your trip.",
        );
    } else {
        text.push_str(&tips.join("\n"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_answer() {
        let answer = "Lisbon is lovely in May.\n\n\
                      Expect 22°C days.\nTrams are cheap.\n\n\
                      Tip: pack comfortable shoes for the hills.";
        assert_eq!(
            structure_answer(answer),
            "### Travel summary (short version):\n\
             Lisbon is lovely in May.\n\n\
             ### Detailed travel information:\n\
             Expect 22°C days.\nTrams are cheap.\n\
             Tip: pack comfortable shoes for the hills.\n\n\
             ### Practical tips and recommendations:\n\
             Tip: pack comfortable shoes for the hills."
        );
    }

    #[test]
    fn test_single_paragraph() {
        assert_eq!(
            structure_answer("Go to Porto."),
            "### Travel summary (short version):\nGo to Porto.\n\n\
             ### Detailed travel information:\n\
             ### Practical tips and recommendations:\n\
             Safe travels! Remember to check local regulations and customs \
             before your trip."
        );
    }

    #[tokio::test]
    async fn test_structured_answer_is_kept() {
        let answer = "### Travel summary (short version):\nAlready done.";
        let output = TravelAnswerTool::new()
            .execute(TravelAnswerParameters {
                answer: answer.to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(output, answer);
    }
}
