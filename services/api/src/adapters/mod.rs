pub mod db;
pub mod extract;
pub mod render;
pub mod testcase_llm;

pub use db::DbAdapter;
pub use extract::FileExtractor;
pub use render::{CsvRenderer, SpreadsheetRenderer};
pub use testcase_llm::OpenAiCompatibleGenerator;
