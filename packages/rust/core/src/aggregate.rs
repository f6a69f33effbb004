//! Builds the terminal [`PipelineResult`] from whatever a run produced.

use tracing::warn;

use cvtailor_shared::{
    AuditReport, ComplianceAssessment, DraftArtifact, PipelineResult, TargetSpec,
};

/// Assemble the run's result. Never fails.
///
/// With no draft the résumé field is empty; with no assessment the report is
/// the "no audit result" placeholder. The report is always normalized into
/// [`AuditReport`], never the auditor's own type.
pub fn finalize(
    target: &TargetSpec,
    draft: Option<&DraftArtifact>,
    assessment: Option<&ComplianceAssessment>,
    passed: bool,
    write_cycles: u32,
) -> PipelineResult {
    let tailored_resume = match draft {
        Some(draft) => serde_json::to_string(draft).unwrap_or_else(|e| {
            warn!(error = %e, "could not serialize draft");
            String::new()
        }),
        None => String::new(),
    };

    let audit_report = match assessment {
        Some(assessment) => AuditReport::from(assessment),
        None => AuditReport::unavailable(),
    };

    PipelineResult {
        organization: target.organization.clone(),
        tailored_resume,
        audit_report,
        passed,
        write_cycles,
    }
}
