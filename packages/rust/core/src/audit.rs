//! Compliance gate: one auditor call per write cycle.
//!
//! The auditor applies its own thresholds and reports them through `passed`;
//! the gate consumes that flag and keeps the issue list for feedback injection.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use cvtailor_shared::{ComplianceAssessment, DraftArtifact, SourceProfile, TargetSpec};

use crate::transformer::{AuditRequest, AuditorCapability};

/// What one audit call decided.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditVerdict {
    /// The draft may be released.
    Passed(ComplianceAssessment),
    /// The draft was rejected; the assessment explains why.
    Rejected(ComplianceAssessment),
    /// The auditor failed or returned nothing. Counts as a failed cycle.
    Unavailable(String),
}

impl AuditVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed(_))
    }

    pub fn into_assessment(self) -> Option<ComplianceAssessment> {
        match self {
            Self::Passed(a) | Self::Rejected(a) => Some(a),
            Self::Unavailable(_) => None,
        }
    }
}

pub struct ComplianceAuditGate {
    auditor: AuditorCapability,
}

impl ComplianceAuditGate {
    pub fn new(auditor: AuditorCapability) -> Self {
        Self { auditor }
    }

    /// Check `draft` against the ground-truth `profile`. No internal retry.
    #[instrument(skip_all, fields(cycle = cycle))]
    pub async fn audit(
        &self,
        profile: &Arc<SourceProfile>,
        draft: &DraftArtifact,
        target: &Arc<TargetSpec>,
        cycle: u32,
    ) -> AuditVerdict {
        log_untraced_content(profile, draft);

        let request = AuditRequest {
            profile: Arc::clone(profile),
            draft: draft.clone(),
            target: Arc::clone(target),
        };

        let assessment = match self.auditor.transform(&request).await {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(error = %e, "audit returned no result");
                return AuditVerdict::Unavailable(e.to_string());
            }
        };

        info!(
            passed = assessment.passed,
            fabrication_risk = assessment.fabrication_risk,
            unnatural_language_risk = assessment.unnatural_language_risk,
            issues = assessment.issues.len(),
            "draft audited"
        );

        if assessment.passed {
            AuditVerdict::Passed(assessment)
        } else {
            for issue in &assessment.issues {
                warn!(
                    severity = %issue.severity,
                    issue = %issue.issue,
                    suggestion = %issue.suggestion,
                    "audit issue"
                );
            }
            AuditVerdict::Rejected(assessment)
        }
    }
}

/// Surface obvious fabrications in the log. Informational only: the verdict
/// belongs to the auditor.
fn log_untraced_content(profile: &SourceProfile, draft: &DraftArtifact) {
    let skills = draft.untraced_skills(profile);
    if !skills.is_empty() {
        warn!(?skills, "draft lists skills absent from the source profile");
    }
    let organizations = draft.untraced_organizations(profile);
    if !organizations.is_empty() {
        warn!(?organizations, "draft lists employers absent from the source profile");
    }
}
