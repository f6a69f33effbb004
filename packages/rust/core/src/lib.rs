//! Pipeline orchestration for cvtailor.
//!
//! This crate owns the control flow of a tailoring run: bounded-retry stage
//! execution, the quality review loop, the compliance audit gate, and the
//! write-audit cycle that ties them together (see [`PipelineOrchestrator`]).
//! The transformers doing the actual work are injected through
//! [`Transformers`].

pub mod aggregate;
pub mod audit;
pub mod inputs;
pub mod pipeline;
pub mod review;
pub mod stage;
pub mod transformer;

#[cfg(test)]
mod testing;

pub use aggregate::finalize;
pub use audit::{AuditVerdict, ComplianceAuditGate};
pub use inputs::{JOB_POSTING_PLACEHOLDERS, RESUME_PLACEHOLDERS, validate_input_file};
pub use pipeline::{PipelineOrchestrator, PipelineState, ProgressReporter, SilentProgress};
pub use review::{QualityReviewLoop, ReviewExit, ReviewOutcome};
pub use stage::{Stage, StageExecutor, StageFailure};
pub use transformer::{
    AnalyzeRequest, AuditFeedback, AuditRequest, GenerationRequest, ParseRequest, ReviewRequest,
    TransformError, TransformResult, Transformer, Transformers,
};
