pub mod domain;
pub mod export;
pub mod memory;
pub mod mock;
pub mod normalize;
pub mod orchestrator;
pub mod ports;
pub mod providers;
pub mod session;

pub use domain::{
    AuthSession, DraftTestCase, ExportFormat, GeneratedSuite, GenerationRecord,
    GenerationRequest, HistoryEntry, Priority, ProjectType, ProviderInfo, Severity, Summary,
    TestCase, TestStatus, UploadedFile, User, UserCredentials,
};
pub use export::{ExportError, ExportGateway, ExportedFile};
pub use orchestrator::{GenerationFault, GenerationOrchestrator};
pub use ports::{
    DocumentExtractor, ExportRenderer, PortError, PortResult, RecordStore, RenderedExport,
    TestCaseGenerator, TokenStore, UserStore,
};
pub use providers::ProviderRegistry;
pub use session::{AuthError, SessionContext, SessionManager};
