//! Shared types, error model, and configuration for cvtailor.
//!
//! This crate is the foundation depended on by all other cvtailor crates.
//! It provides:
//! - [`TailorError`], the unified error type
//! - Domain types ([`SourceProfile`], [`TargetSpec`], [`DraftArtifact`], assessments,
//!   [`PipelineResult`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LlmConfig, LlmSection, PipelineConfig, PipelineSection, RetrievalConfig,
    RetrievalSection, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{Result, TailorError};
pub use types::{
    AuditIssue, AuditReport, CURRENT_SCHEMA_VERSION, ComplianceAssessment, ComplianceIssue,
    DraftArtifact, Experience, NO_AUDIT_SUMMARY, PipelineResult, QualityAssessment, Resume,
    RunId, RunRecord, Severity, SourceProfile, TargetSpec,
};
