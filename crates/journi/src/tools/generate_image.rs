use journi_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::preview::text_preview;
use crate::image::ImageGenerator;

#[derive(Deserialize, JsonSchema)]
pub struct GenerateImageParameters {
    #[schemars(
        description = "Description of the image to generate, such as a destination name."
    )]
    prompt: String,
}

/// Generates a photo of a travel destination or scene.
///
/// The result is the path of the saved image. Without an image backend, or
/// when generation fails, a text preview is returned instead.
pub struct GenerateImageTool {
    images: Option<ImageGenerator>,
    parameter_schema: Value,
}

impl GenerateImageTool {
    /// Creates the tool. `None` always yields text previews.
    #[inline]
    pub fn new(images: Option<ImageGenerator>) -> Self {
        GenerateImageTool {
            images,
            parameter_schema: schema_for!(GenerateImageParameters).to_value(),
        }
    }
}

impl Tool for GenerateImageTool {
    type Input = GenerateImageParameters;

    fn name(&self) -> &str {
        "generate_image"
    }

    fn description(&self) -> &str {
        "Generates an image of a travel destination or scene and returns the \
         path of the image file."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: GenerateImageParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let images = self.images.clone();
        async move {
            let destination = input.prompt.trim();
            if destination.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`prompt` must not be empty"));
            }

            if let Some(images) = images {
                let prompt = enhanced_prompt(destination);
                match images.generate(&prompt).await {
                    Ok(path) => return Ok(path.display().to_string()),
                    Err(err) => warn!("image generation failed: {err}"),
                }
            }
            Ok(text_preview(destination))
        }
    }
}

fn enhanced_prompt(destination: &str) -> String {
    format!(
        "A beautiful, photorealistic travel photo of {destination}, showing \
         iconic landmarks and distinctive scenery, high-quality professional \
         travel photography"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_falls_back_to_text() {
        let tool = GenerateImageTool::new(None);
        let output = tool
            .execute(GenerateImageParameters {
                prompt: "Santorini".to_owned(),
            })
            .await
            .unwrap();
        assert!(output.starts_with("✨ Destination Preview: Santorini ✨"));
        assert!(output.contains("Aegean Sea"));

        assert!(
            tool.execute(GenerateImageParameters {
                prompt: String::new(),
            })
            .await
            .is_err()
        );
    }

    #[test]
    fn test_enhanced_prompt() {
        assert!(
            enhanced_prompt("Petra")
                .starts_with("A beautiful, photorealistic travel photo of Petra,")
        );
    }
}
