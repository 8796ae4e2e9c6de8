//! The coordinator agent and the specialists it delegates to.

use journi_core::{Agent, AgentBuilder, ModelClient};
use journi_model::GenerationOptions;

use crate::tools::Toolbox;

/// Name of the coordinator agent.
pub const COORDINATOR: &str = "journi";

const TEMPERATURE: f32 = 0.5;
const MAX_TOKENS: u32 = 2096;

struct Member {
    name: &'static str,
    description: &'static str,
    prompt: &'static str,
    max_steps: usize,
}

const INFORMATION_RETRIEVAL: Member = Member {
    name: "information_retrieval_agent",
    description: "Finds and extracts relevant travel information from the web.",
    prompt: include_str!("prompts/information_retrieval.md"),
    max_steps: 3,
};

const LANGUAGE_CULTURE: Member = Member {
    name: "language_culture_agent",
    description: "Provides language assistance and cultural context for \
                  travelers.",
    prompt: include_str!("prompts/language_culture.md"),
    max_steps: 2,
};

const LOGISTICS: Member = Member {
    name: "logistics_agent",
    description: "Manages practical travel information: local time, \
                  weather, visas and currency.",
    prompt: include_str!("prompts/logistics.md"),
    max_steps: 4,
};

const RECOMMENDATION: Member = Member {
    name: "recommendation_agent",
    description: "Creates destination descriptions, finds accommodations \
                  and suggests activities.",
    prompt: include_str!("prompts/recommendation.md"),
    max_steps: 3,
};

const COORDINATOR_MEMBER: Member = Member {
    name: COORDINATOR,
    description: "Your AI travel companion.",
    prompt: include_str!("prompts/coordinator.md"),
    max_steps: 8,
};

impl Member {
    fn builder(&self, client: &ModelClient) -> AgentBuilder {
        AgentBuilder::with_model_client(client.clone())
            .with_name(self.name)
            .with_description(self.description)
            .with_system_prompt(self.prompt)
            .with_max_steps(self.max_steps)
            .with_options(GenerationOptions {
                temperature: Some(TEMPERATURE),
                max_tokens: Some(MAX_TOKENS),
            })
    }
}

/// Builds the coordinator with its four specialists, all sharing `client`.
pub fn build_team(client: ModelClient, toolbox: &Toolbox) -> Agent {
    debug!("assembling team with {:?}", toolbox.config());
    let builder = COORDINATOR_MEMBER
        .builder(&client)
        .with_tool(toolbox.travel_answer())
        .with_tool(toolbox.generate_image());
    specialists(&client, toolbox)
        .into_iter()
        .fold(builder, AgentBuilder::with_managed_agent)
        .build()
}

fn specialists(client: &ModelClient, toolbox: &Toolbox) -> [Agent; 4] {
    let information_retrieval = INFORMATION_RETRIEVAL
        .builder(client)
        .with_tool(toolbox.web_search())
        .with_tool(toolbox.visit_webpage())
        .build();

    let language_culture = LANGUAGE_CULTURE
        .builder(client)
        .with_tool(toolbox.translate_phrase())
        .build();

    let logistics = LOGISTICS
        .builder(client)
        .with_tool(toolbox.local_time())
        .with_tool(toolbox.weather_forecast())
        .with_tool(toolbox.visa_requirements())
        .with_tool(toolbox.convert_currency())
        .build();

    let recommendation = RECOMMENDATION
        .builder(client)
        .with_tool(toolbox.search_accommodations())
        .with_tool(toolbox.destination_preview())
        .build();

    [information_retrieval, language_culture, logistics, recommendation]
}

#[cfg(test)]
mod tests {
    use journi_test_model::TestModelProvider;

    use super::*;

    #[test]
    fn test_team_layout() {
        let client = ModelClient::new(TestModelProvider::default());
        let team = build_team(client, &Toolbox::offline());

        assert_eq!(team.name(), COORDINATOR);
        assert_eq!(team.max_steps(), 8);
        assert_eq!(
            team.tool_names(),
            vec![
                "final_answer",
                "generate_image",
                "information_retrieval_agent",
                "language_culture_agent",
                "logistics_agent",
                "recommendation_agent",
            ]
        );
    }

    #[test]
    fn test_specialists() {
        let client = ModelClient::new(TestModelProvider::default());
        let layout: Vec<_> = specialists(&client, &Toolbox::offline())
            .iter()
            .map(|agent| (agent.name().to_owned(), agent.max_steps(), agent.tool_names()))
            .collect();
        let expected = [
            ("information_retrieval_agent", 3, vec!["final_answer", "visit_webpage", "web_search"]),
            ("language_culture_agent", 2, vec!["final_answer", "translate_phrase"]),
            (
                "logistics_agent",
                4,
                vec![
                    "convert_currency",
                    "final_answer",
                    "get_local_time",
                    "get_visa_requirements",
                    "get_weather_forecast",
                ],
            ),
            (
                "recommendation_agent",
                3,
                vec!["final_answer", "generate_destination_preview", "search_accommodations"],
            ),
        ];
        assert_eq!(layout.len(), expected.len());
        for ((name, steps, tools), (exp_name, exp_steps, exp_tools)) in
            layout.iter().zip(expected)
        {
            assert_eq!(name, exp_name);
            assert_eq!(*steps, exp_steps);
            assert_eq!(tools, &exp_tools);
        }
    }

    #[test]
    fn test_prompts_are_embedded() {
        for member in [
            &INFORMATION_RETRIEVAL,
            &LANGUAGE_CULTURE,
            &LOGISTICS,
            &RECOMMENDATION,
            &COORDINATOR_MEMBER,
        ] {
            assert!(!member.prompt.trim().is_empty(), "{}", member.name);
        }
        assert!(LOGISTICS.prompt.contains("get_visa_requirements"));
        assert!(COORDINATOR_MEMBER.prompt.contains("logistics_agent"));
    }
}
