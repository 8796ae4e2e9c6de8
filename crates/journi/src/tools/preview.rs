use journi_core::tool::{Error as ToolError, Tool, ToolResult};
use rand::seq::SliceRandom;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::{matches_either, seed_of, seeded_rng};
use crate::image::ImageGenerator;

const STYLES: [&str; 5] = [
    "sunrise golden hour",
    "blue hour twilight",
    "vibrant daytime",
    "dramatic sunset",
    "night lights",
];

const DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "paris",
        "The Eiffel Tower stands tall against a backdrop of elegant \
         Haussmannian buildings. Charming cafés line the cobblestone streets \
         as the Seine River winds through the heart of the city.",
    ),
    (
        "tokyo",
        "Neon lights illuminate the bustling streets of Shibuya as modern \
         skyscrapers tower over ancient temples. Cherry blossoms add splashes \
         of pink to the urban landscape in spring.",
    ),
    (
        "new york",
        "The iconic skyline of Manhattan rises majestically with the Empire \
         State Building standing prominently. Yellow taxis navigate the grid \
         of streets as diverse neighborhoods showcase the city's cultural \
         melting pot.",
    ),
    (
        "rome",
        "Ancient ruins of the Colosseum and Forum tell stories of a glorious \
         past. Baroque fountains and piazzas are filled with locals and \
         tourists alike enjoying the Mediterranean sunshine.",
    ),
    (
        "bali",
        "Lush terraced rice fields cascade down hillsides to meet pristine \
         beaches. Hindu temples with intricate stone carvings are set against \
         dramatic volcanic backdrops.",
    ),
    (
        "london",
        "The historic Tower Bridge spans the Thames River with the modern \
         Shard rising in the background. Royal parks offer green spaces amid \
         the bustling city streets.",
    ),
    (
        "sydney",
        "The Opera House's distinctive sail-shaped roofs curve gracefully \
         over the harbor as ferries cross the sparkling blue waters. The \
         Harbour Bridge arches dramatically against the skyline.",
    ),
    (
        "mount fuji",
        "The perfectly symmetrical snow-capped volcanic cone rises \
         majestically above the surrounding lakes and forests. Cherry \
         blossoms or autumn leaves frame the mountain depending on the \
         season.",
    ),
    (
        "santorini",
        "Whitewashed buildings with blue domes cling to dramatic cliffs \
         overlooking the deep blue Aegean Sea. Narrow winding pathways lead \
         through charming villages that catch the golden Mediterranean light.",
    ),
    (
        "kyoto",
        "Ancient wooden temples and shrines are nestled among Japanese maple \
         trees and peaceful Zen gardens. Geisha in colorful kimonos \
         occasionally appear on traditional streets lined with machiya \
         houses.",
    ),
];

const LANDMARKS: [&str; 6] = [
    "mountains",
    "beaches",
    "historic sites",
    "urban centers",
    "natural wonders",
    "cultural attractions",
];
const ACTIVITIES: [&str; 5] = [
    "explore",
    "discover",
    "experience",
    "immerse yourself in",
    "marvel at",
];
const FEATURES: [&str; 5] = [
    "beautiful",
    "breathtaking",
    "stunning",
    "picturesque",
    "magnificent",
];

#[derive(Deserialize, JsonSchema)]
pub struct DestinationPreviewParameters {
    #[schemars(
        description = "The travel destination to visualize (e.g., \"Paris\", \"Tokyo\", \"Bali\")."
    )]
    destination: String,
}

/// Generates a vibrant, artistic preview of a travel destination.
pub struct DestinationPreviewTool {
    images: Option<ImageGenerator>,
    parameter_schema: Value,
}

impl DestinationPreviewTool {
    /// Creates a tool that writes text previews.
    #[inline]
    pub fn new() -> Self {
        DestinationPreviewTool {
            images: None,
            parameter_schema: schema_for!(DestinationPreviewParameters)
                .to_value(),
        }
    }

    /// Renders an image first and falls back to text previews.
    pub fn with_image_generator(mut self, images: ImageGenerator) -> Self {
        self.images = Some(images);
        self
    }
}

impl Default for DestinationPreviewTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DestinationPreviewTool {
    type Input = DestinationPreviewParameters;

    fn name(&self) -> &str {
        "generate_destination_preview"
    }

    fn description(&self) -> &str {
        "Generates a vibrant, artistic preview image of a travel destination."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: DestinationPreviewParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let images = self.images.clone();
        async move {
            let destination = input.destination.trim();
            if destination.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`destination` must not be empty"));
            }
            let style = style_for(destination);

            if let Some(images) = images {
                let prompt = format!(
                    "A beautiful travel photograph of {destination}, {style}, \
                     photorealistic, high-resolution, travel photography, \
                     highly detailed landmark view"
                );
                match images.generate(&prompt).await {
                    Ok(path) => {
                        let mut text = format!(
                            "Here's a preview of {destination}: {}",
                            path.display()
                        );
                        if let Some(description) = known_description(destination)
                        {
                            text.push_str("\n\n");
                            text.push_str(description);
                        }
                        return Ok(text);
                    }
                    Err(err) => warn!("preview image failed: {err}"),
                }
            }

            Ok(text_preview(destination))
        }
    }
}

fn style_for(destination: &str) -> &'static str {
    STYLES[(seed_of(&[destination]) % STYLES.len() as u64) as usize]
}

fn known_description(destination: &str) -> Option<&'static str> {
    let normalized = destination.to_lowercase();
    DESCRIPTIONS
        .iter()
        .find(|(place, _)| matches_either(place, &normalized))
        .map(|(_, description)| *description)
}

fn generic_description(destination: &str) -> String {
    let mut rng = seeded_rng(&[destination]);
    let landmark = LANDMARKS.choose(&mut rng).copied().unwrap_or("sights");
    let activity = ACTIVITIES.choose(&mut rng).copied().unwrap_or("explore");
    let feature = FEATURES.choose(&mut rng).copied().unwrap_or("beautiful");
    format!(
        "The {feature} {landmark} of {destination} invite you to {activity} \
         this incredible destination. The unique atmosphere and character \
         create an unforgettable travel experience that captivates visitors \
         from around the world."
    )
}

/// Describes `destination` in words.
pub(crate) fn text_preview(destination: &str) -> String {
    let description = known_description(destination)
        .map(str::to_owned)
        .unwrap_or_else(|| generic_description(destination));
    let style = style_for(destination);
    format!(
        "✨ Destination Preview: {destination} ✨\n\n{description}\n\n\
         Imagine {destination} during {style} - a perfect time to capture \
         memories of this magnificent destination."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_destination() {
        let text = text_preview("Paris, France");
        assert!(text.starts_with("✨ Destination Preview: Paris, France ✨\n\n"));
        assert!(text.contains("The Eiffel Tower stands tall"));
        assert!(text.contains(&format!(
            "Imagine Paris, France during {} - a perfect time",
            style_for("Paris, France")
        )));
    }

    #[test]
    fn test_generic_description_is_deterministic() {
        let a = text_preview("Ulaanbaatar");
        assert_eq!(a, text_preview("Ulaanbaatar"));
        assert!(a.contains("of Ulaanbaatar invite you to "));
        assert!(FEATURES.iter().any(|f| a.contains(&format!("The {f} "))));
    }

    #[tokio::test]
    async fn test_preview_without_images() {
        let tool = DestinationPreviewTool::new();
        let output = tool
            .execute(DestinationPreviewParameters {
                destination: " Kyoto ".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(output, text_preview("Kyoto"));
        assert!(output.contains("Zen gardens"));
    }
}
