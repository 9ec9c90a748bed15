//! crates/testcase_client/src/lib.rs
//!
//! A typed client for the test case generator HTTP API. The caller owns the
//! session state and hands it to every call.

pub mod client;
pub mod session;
pub mod types;

pub use client::{ApiClient, ClientError, DownloadedFile, GenerateParams};
pub use session::{ClientSession, MemoryTokenStorage, TokenStorage};
