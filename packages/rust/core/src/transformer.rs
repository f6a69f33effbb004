//! The transformer capability and the request shapes each stage sends it.
//!
//! A transformer maps a request to a structured result or a failure. The pipeline
//! never sees how: model calls, tool use and internal retries all live behind
//! [`Transformer::transform`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use cvtailor_shared::{
    ComplianceAssessment, ComplianceIssue, DraftArtifact, QualityAssessment, SourceProfile,
    TargetSpec,
};

/// Why a transformer produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The call raised or returned an error.
    #[error("{0}")]
    Failed(String),
    /// The call completed but returned no result.
    #[error("no result returned")]
    NoOutput,
}

pub type TransformResult<T> = std::result::Result<T, TransformError>;

/// Produce structured output of type `Out` from a request of type `Req`.
#[async_trait]
pub trait Transformer<Req, Out>: Send + Sync
where
    Req: Sync,
    Out: Send,
{
    async fn transform(&self, request: &Req) -> TransformResult<Out>;
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Free-form source text to parse into a profile.
#[derive(Debug, Clone, Serialize)]
pub struct ParseRequest {
    pub source_text: String,
}

/// Where to find the target posting. Retrieval is the analyzer's business.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    pub target_locator: String,
}

/// Audit findings carried into the next generation cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditFeedback {
    pub summary: String,
    pub issues: Vec<ComplianceIssue>,
}

impl From<&ComplianceAssessment> for AuditFeedback {
    fn from(assessment: &ComplianceAssessment) -> Self {
        Self {
            summary: assessment.feedback_summary.clone(),
            issues: assessment.issues.clone(),
        }
    }
}

/// Everything the generator can be asked to do.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationRequest {
    /// First draft from the profile and the target alone.
    Initial {
        profile: Arc<SourceProfile>,
        target: Arc<TargetSpec>,
    },
    /// Regenerate after a rejected audit, steering by its findings.
    AuditRetry {
        profile: Arc<SourceProfile>,
        target: Arc<TargetSpec>,
        feedback: AuditFeedback,
    },
    /// Improve the current draft using reviewer suggestions.
    Refine {
        current: DraftArtifact,
        profile: Arc<SourceProfile>,
        target: Arc<TargetSpec>,
        suggestions: Vec<String>,
    },
}

impl GenerationRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::AuditRetry { .. } => "audit_retry",
            Self::Refine { .. } => "refine",
        }
    }

    pub fn profile(&self) -> &SourceProfile {
        match self {
            Self::Initial { profile, .. }
            | Self::AuditRetry { profile, .. }
            | Self::Refine { profile, .. } => profile.as_ref(),
        }
    }

    pub fn target(&self) -> &TargetSpec {
        match self {
            Self::Initial { target, .. }
            | Self::AuditRetry { target, .. }
            | Self::Refine { target, .. } => target.as_ref(),
        }
    }
}

/// Ask the reviewer how well a draft fits the target.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRequest {
    pub draft: DraftArtifact,
    pub target: Arc<TargetSpec>,
}

/// Ask the auditor whether a draft stays true to the profile.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRequest {
    pub profile: Arc<SourceProfile>,
    pub draft: DraftArtifact,
    pub target: Arc<TargetSpec>,
}

// ---------------------------------------------------------------------------
// Capability bundle
// ---------------------------------------------------------------------------

pub type ParserCapability = Arc<dyn Transformer<ParseRequest, SourceProfile>>;
pub type AnalyzerCapability = Arc<dyn Transformer<AnalyzeRequest, TargetSpec>>;
pub type GeneratorCapability = Arc<dyn Transformer<GenerationRequest, DraftArtifact>>;
pub type ReviewerCapability = Arc<dyn Transformer<ReviewRequest, QualityAssessment>>;
pub type AuditorCapability = Arc<dyn Transformer<AuditRequest, ComplianceAssessment>>;

/// The five named capabilities a pipeline is built from.
#[derive(Clone)]
pub struct Transformers {
    pub parser: ParserCapability,
    pub analyzer: AnalyzerCapability,
    pub generator: GeneratorCapability,
    pub reviewer: ReviewerCapability,
    pub auditor: AuditorCapability,
}

impl std::fmt::Debug for Transformers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformers").finish_non_exhaustive()
    }
}
