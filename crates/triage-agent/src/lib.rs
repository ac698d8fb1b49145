//! Triage Agent - diagnosis of failed agent runs
//!
//! The [`DiagnosticAgent`] ties the pieces together:
//! - Reads a run's log from a [`triage_store::RunLogStore`]
//! - Classifies, assesses and summarizes it with `triage-core`
//! - Optionally asks an [`LlmProvider`] for a root cause narrative
//! - Persists an immutable report to a [`triage_store::ReportStore`]
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use triage_agent::{DiagnosticAgent, DiagnosticConfig};
//! use triage_store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let agent = DiagnosticAgent::new(store.clone(), store, DiagnosticConfig::default());
//!
//! let report = agent.analyze(&"task-1".into(), &"run-1".into()).await?;
//! println!("{}: {}", report.severity, report.root_cause);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod prompt;
pub mod provider;

pub use agent::{
    category_description, fallback_root_cause, DiagnosticAgent, FIRST_ERROR_CHARS,
    NO_LOGS_ROOT_CAUSE,
};
pub use config::{DiagnosticConfig, LlmSettings};
pub use error::{ConfigError, DiagnosisError, LlmError};
pub use http::HttpLlmProvider;
pub use prompt::{build_prompt, parse_analysis, LlmAnalysis, PromptInput};
pub use provider::{LlmProvider, LlmResponse};

pub use tokio_util::sync::CancellationToken;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the diagnostic agent
    pub use crate::{
        CancellationToken, DiagnosisError, DiagnosticAgent, DiagnosticConfig, LlmError,
        LlmProvider, LlmResponse,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
