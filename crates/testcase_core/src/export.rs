//! crates/testcase_core/src/export.rs
//!
//! Looks up an owned record and renders it into a downloadable file.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use crate::domain::ExportFormat;
use crate::ports::{ExportRenderer, PortError, RecordStore};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// Missing and foreign records are reported the same way.
    #[error("File not found")]
    NotFound,
    #[error("Error generating {} file", .0.extension())]
    Render(ExportFormat),
    #[error("Test cases are temporarily unavailable")]
    Storage,
}

/// A complete export artifact ready to be sent to the client.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

pub struct ExportGateway {
    records: Arc<dyn RecordStore>,
    renderers: HashMap<ExportFormat, Arc<dyn ExportRenderer>>,
}

impl ExportGateway {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            renderers: HashMap::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ExportRenderer>) -> Self {
        self.renderers.insert(renderer.format(), renderer);
        self
    }

    pub async fn export(
        &self,
        owner: Uuid,
        id: Uuid,
        format: ExportFormat,
    ) -> Result<ExportedFile, ExportError> {
        let record = self.records.get(owner, id).await.map_err(|e| match e {
            PortError::NotFound(_) => ExportError::NotFound,
            other => {
                error!(record_id = %id, "Failed to load record for export: {:?}", other);
                ExportError::Storage
            }
        })?;

        let renderer = self.renderers.get(&format).ok_or_else(|| {
            error!(?format, "No renderer registered");
            ExportError::Render(format)
        })?;

        let rendered = renderer.render(&record.test_cases).map_err(|e| {
            error!(record_id = %id, ?format, "Export rendering failed: {:?}", e);
            ExportError::Render(format)
        })?;

        Ok(ExportedFile {
            bytes: rendered.bytes,
            filename: rendered
                .filename
                .unwrap_or_else(|| format.default_filename(record.id)),
            content_type: format.content_type(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GenerationRecord, ProjectType, TestCase};
    use crate::memory::InMemoryRecordStore;
    use crate::ports::{PortResult, RenderedExport};
    use chrono::Utc;

    struct CountingRenderer {
        format: ExportFormat,
        filename: Option<&'static str>,
    }

    impl ExportRenderer for CountingRenderer {
        fn format(&self) -> ExportFormat {
            self.format
        }

        fn render(&self, cases: &[TestCase]) -> PortResult<RenderedExport> {
            Ok(RenderedExport {
                bytes: format!("{} cases", cases.len()).into_bytes(),
                filename: self.filename.map(str::to_string),
            })
        }
    }

    struct FailingRenderer;

    impl ExportRenderer for FailingRenderer {
        fn format(&self) -> ExportFormat {
            ExportFormat::Spreadsheet
        }

        fn render(&self, _: &[TestCase]) -> PortResult<RenderedExport> {
            Err(PortError::Unexpected("disk full".to_string()))
        }
    }

    async fn seeded() -> (Arc<InMemoryRecordStore>, Uuid, Uuid) {
        let store = Arc::new(InMemoryRecordStore::default());
        let owner = Uuid::new_v4();
        let record = GenerationRecord {
            id: Uuid::new_v4(),
            owner,
            filename: "login.txt".to_string(),
            requirements: String::new(),
            project_type: ProjectType::Web,
            provider_used: "mock".to_string(),
            note: None,
            test_cases: Vec::new(),
            created_at: Utc::now(),
        };
        let id = record.id;
        store.append(owner, record).await.unwrap();
        (store, owner, id)
    }

    #[tokio::test]
    async fn default_filename_is_derived_from_id_and_format() {
        let (store, owner, id) = seeded().await;
        let gateway = ExportGateway::new(store).with_renderer(Arc::new(CountingRenderer {
            format: ExportFormat::DelimitedText,
            filename: None,
        }));

        let file = gateway
            .export(owner, id, ExportFormat::DelimitedText)
            .await
            .unwrap();
        assert_eq!(file.filename, format!("test_cases_{}.csv", id));
        assert_eq!(file.content_type, "text/csv");
        assert_eq!(file.bytes, b"0 cases");
    }

    #[tokio::test]
    async fn renderer_filename_overrides_default() {
        let (store, owner, id) = seeded().await;
        let gateway = ExportGateway::new(store).with_renderer(Arc::new(CountingRenderer {
            format: ExportFormat::Spreadsheet,
            filename: Some("custom.xlsx"),
        }));

        let file = gateway
            .export(owner, id, ExportFormat::Spreadsheet)
            .await
            .unwrap();
        assert_eq!(file.filename, "custom.xlsx");
    }

    #[tokio::test]
    async fn foreign_record_is_not_found() {
        let (store, _owner, id) = seeded().await;
        let gateway = ExportGateway::new(store).with_renderer(Arc::new(CountingRenderer {
            format: ExportFormat::DelimitedText,
            filename: None,
        }));

        let err = gateway
            .export(Uuid::new_v4(), id, ExportFormat::DelimitedText)
            .await
            .unwrap_err();
        assert_eq!(err, ExportError::NotFound);
    }

    #[tokio::test]
    async fn render_failures_surface_as_render_errors() {
        let (store, owner, id) = seeded().await;
        let gateway = ExportGateway::new(store).with_renderer(Arc::new(FailingRenderer));

        assert_eq!(
            gateway
                .export(owner, id, ExportFormat::Spreadsheet)
                .await
                .unwrap_err(),
            ExportError::Render(ExportFormat::Spreadsheet)
        );
        assert_eq!(
            gateway
                .export(owner, id, ExportFormat::DelimitedText)
                .await
                .unwrap_err(),
            ExportError::Render(ExportFormat::DelimitedText)
        );
    }
}
