//! crates/testcase_core/src/orchestrator.rs
//!
//! Turns a generation request into a persisted `GenerationRecord`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{GenerationRecord, GenerationRequest};
use crate::normalize::normalize;
use crate::ports::{DocumentExtractor, RecordStore};
use crate::providers::ProviderRegistry;
use crate::session::{SessionContext, SessionManager};

const REQUIREMENTS_SNAPSHOT_CHARS: usize = 1000;

/// Every way a submission can fail. Messages are safe to show to end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationFault {
    #[error("Requirements text or a document is required")]
    EmptyInput,
    #[error("The uploaded document could not be read")]
    ExtractionFailed,
    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),
    #[error("The {0} provider could not generate test cases")]
    EngineError(String),
    #[error("Test case generation timed out")]
    Timeout,
    #[error("The generated test cases could not be saved")]
    StorageError,
    #[error("Your session has ended, please sign in again")]
    SessionEnded,
}

pub struct GenerationOrchestrator {
    sessions: Arc<SessionManager>,
    extractor: Arc<dyn DocumentExtractor>,
    providers: Arc<ProviderRegistry>,
    records: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl GenerationOrchestrator {
    pub fn new(
        sessions: Arc<SessionManager>,
        extractor: Arc<dyn DocumentExtractor>,
        providers: Arc<ProviderRegistry>,
        records: Arc<dyn RecordStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            extractor,
            providers,
            records,
            timeout,
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Validates, extracts, generates, normalizes and persists.
    ///
    /// Nothing is written unless every step before persistence succeeded and
    /// the caller's session is still valid once the engine has answered.
    pub async fn submit(
        &self,
        request: GenerationRequest,
        session: &SessionContext,
    ) -> Result<GenerationRecord, GenerationFault> {
        let requirements = request.requirements.trim();
        if requirements.is_empty() && request.file.is_none() {
            return Err(GenerationFault::EmptyInput);
        }

        let resolved = self
            .providers
            .resolve_provider(request.provider.as_deref())
            .map_err(GenerationFault::UnknownProvider)?;
        let provider = resolved.engine;
        let provider_id = provider.info().id;

        let deadline = Instant::now() + self.timeout;

        let source_text = match &request.file {
            Some(file) => {
                let extracted = timeout_at(deadline, self.extractor.extract(file))
                    .await
                    .map_err(|_| {
                        warn!(filename = %file.filename, "Document extraction timed out");
                        GenerationFault::Timeout
                    })?
                    .map_err(|e| {
                        warn!(filename = %file.filename, "Document extraction failed: {:?}", e);
                        GenerationFault::ExtractionFailed
                    })?;
                if extracted.trim().is_empty() {
                    warn!(filename = %file.filename, "Document contained no text");
                    return Err(GenerationFault::ExtractionFailed);
                }
                extracted
            }
            None => requirements.to_string(),
        };

        info!(provider = %provider_id, project_type = request.project_type.as_str(), "Generating test cases");
        let outcome = timeout_at(deadline, provider.generate(&source_text, request.project_type))
            .await
            .map_err(|_| {
                warn!(provider = %provider_id, "Generation timed out");
                GenerationFault::Timeout
            })
            .and_then(|generated| {
                generated.map_err(|e| {
                    error!(provider = %provider_id, "Generation failed: {:?}", e);
                    GenerationFault::EngineError(provider_id.clone())
                })
            })
            .and_then(|suite| {
                if suite.cases.is_empty() {
                    error!(provider = %provider_id, "Engine returned no test cases");
                    return Err(GenerationFault::EngineError(provider_id.clone()));
                }
                Ok(suite)
            });

        // Only a provider the caller chose may fail the submission.
        let (provider_id, suite) = match outcome {
            Ok(suite) => (provider_id, suite),
            Err(fault) if resolved.requested => return Err(fault),
            Err(_) => {
                let mock = self.providers.mock();
                let mock_id = mock.info().id;
                warn!(provider = %provider_id, fallback = %mock_id, "Default provider failed, using fallback engine");
                let suite = mock
                    .generate(&source_text, request.project_type)
                    .await
                    .map_err(|e| {
                        error!(provider = %mock_id, "Fallback generation failed: {:?}", e);
                        GenerationFault::EngineError(mock_id.clone())
                    })?;
                (mock_id, suite)
            }
        };

        let test_cases = normalize(suite.cases);

        // The owner may have logged out while the engine was working.
        match self.sessions.validate(&session.token).await {
            Ok(current) if current.user_id == session.user_id => {}
            _ => {
                warn!(user_id = %session.user_id, "Discarding generation result for ended session");
                return Err(GenerationFault::SessionEnded);
            }
        }

        let created_at = Utc::now();
        let filename = match &request.file {
            Some(file) if !file.filename.trim().is_empty() => file.filename.clone(),
            _ => format!(
                "test_cases_{}_{}",
                request.project_type.as_str().to_lowercase(),
                created_at.format("%Y%m%d_%H%M%S")
            ),
        };
        let snapshot_source = if requirements.is_empty() {
            source_text.as_str()
        } else {
            requirements
        };

        let record = GenerationRecord {
            id: Uuid::new_v4(),
            owner: session.user_id,
            filename,
            requirements: snapshot_source
                .chars()
                .take(REQUIREMENTS_SNAPSHOT_CHARS)
                .collect(),
            project_type: request.project_type,
            provider_used: provider_id,
            note: suite.note,
            test_cases,
            created_at,
        };

        self.records
            .append(session.user_id, record.clone())
            .await
            .map_err(|e| {
                error!(record_id = %record.id, "Failed to persist generation record: {:?}", e);
                GenerationFault::StorageError
            })?;

        info!(
            record_id = %record.id,
            total = record.test_cases.len(),
            "Generation record saved"
        );
        Ok(record)
    }
}
