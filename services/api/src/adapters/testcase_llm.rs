//! services/api/src/adapters/testcase_llm.rs
//!
//! This module contains the adapter for LLM-backed test case generation.
//! Every hosted provider is reached through an OpenAI-compatible chat
//! completions endpoint, so one adapter type serves all of them; only the
//! base URL, key and model differ.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use testcase_core::domain::{DraftTestCase, GeneratedSuite, ProjectType, ProviderInfo};
use testcase_core::ports::{PortError, PortResult, TestCaseGenerator};
use tracing::{debug, warn};

use crate::config::ProviderSettings;

const SYSTEM_INSTRUCTIONS: &str =
    "You are an expert QA engineer. You write industry-standard, well-structured test cases and always answer with a single JSON object.";

const USER_INPUT_TEMPLATE: &str = r#"Generate industry-standard test cases based on the following requirements.

Project Type: {project_type}

Requirements:
{requirements}

Each test case must include:
- test_id (format: TC_XXX)
- module (the feature or component being tested)
- test_scenario (what is being tested)
- preconditions (what must be true before the test)
- steps (numbered list of test steps separated by \n)
- test_data (sample data to use)
- expected_result (what should happen)
- actual_result (leave as an empty string)
- status (leave as "Pending")
- priority (High, Medium or Low)
- severity (Critical, Major, Minor or Trivial)
- edge_cases (any edge case considerations)

Return a JSON object with this structure:
{
    "test_cases": [
        {
            "test_id": "TC_001",
            "module": "...",
            "test_scenario": "...",
            "preconditions": "...",
            "steps": "1. Step one\n2. Step two\n3. Step three",
            "test_data": "...",
            "expected_result": "...",
            "actual_result": "",
            "status": "Pending",
            "priority": "High|Medium|Low",
            "severity": "Critical|Major|Minor|Trivial",
            "edge_cases": "..."
        }
    ]
}

Generate at least 5-10 test cases covering positive, negative and edge cases.
IMPORTANT: Return ONLY the JSON object, no additional text or markdown formatting."#;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 4096;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TestCaseGenerator` against one OpenAI-compatible provider.
#[derive(Clone)]
pub struct OpenAiCompatibleGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    info: ProviderInfo,
}

impl OpenAiCompatibleGenerator {
    pub fn new(client: Client<OpenAIConfig>, model: String, info: ProviderInfo) -> Self {
        Self {
            client,
            model,
            info,
        }
    }

    /// Builds the adapter, and its client, from a configured provider.
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(settings.api_key.clone())
            .with_api_base(settings.api_base.clone());
        Self::new(
            Client::with_config(config),
            settings.model.clone(),
            ProviderInfo {
                id: settings.id.clone(),
                name: settings.name.clone(),
                description: settings.description.clone(),
            },
        )
    }
}

//=========================================================================================
// `TestCaseGenerator` Trait Implementation
//=========================================================================================

#[async_trait]
impl TestCaseGenerator for OpenAiCompatibleGenerator {
    fn info(&self) -> ProviderInfo {
        self.info.clone()
    }

    async fn generate(&self, text: &str, project_type: ProjectType) -> PortResult<GeneratedSuite> {
        let user_input = USER_INPUT_TEMPLATE
            .replace("{project_type}", project_type.as_str())
            .replace("{requirements}", text);

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_INSTRUCTIONS)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_input)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        #[allow(deprecated)]
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(MAX_TOKENS)
            .temperature(TEMPERATURE)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(provider = %self.info.id, model = %self.model, "Requesting test cases");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Unexpected("Provider returned no content".to_string()))?;

        parse_suite(&content)
    }
}

//=========================================================================================
// Response Parsing
//=========================================================================================

#[derive(Deserialize)]
struct SuitePayload {
    #[serde(default)]
    test_cases: Vec<DraftTestCase>,
}

/// Decodes the model's answer into draft test cases.
///
/// The answer is tried as-is after stripping markdown code fences; failing
/// that, the outermost `{ ... }` span is tried.
pub fn parse_suite(raw: &str) -> PortResult<GeneratedSuite> {
    let payload = serde_json::from_str::<SuitePayload>(strip_fences(raw)).or_else(|first| {
        let start = raw.find('{');
        let end = raw.rfind('}');
        match (start, end) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<SuitePayload>(&raw[start..=end])
            }
            _ => Err(first),
        }
    });

    match payload {
        Ok(payload) => Ok(GeneratedSuite {
            cases: payload.test_cases,
            note: None,
        }),
        Err(e) => {
            let preview: String = raw.chars().take(200).collect();
            warn!("Failed to parse provider response: {} ({:?})", e, preview);
            Err(PortError::Unexpected(format!(
                "Failed to parse AI response: {}",
                e
            )))
        }
    }
}

fn strip_fences(raw: &str) -> &str {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}
