//! Scripted transformers and fixtures for exercising the pipeline deterministically.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use cvtailor_shared::{
    ComplianceAssessment, ComplianceIssue, DraftArtifact, Experience, QualityAssessment, Resume,
    Severity, SourceProfile, TargetSpec,
};

use crate::transformer::{TransformError, TransformResult, Transformer};

/// Replays queued outcomes in order, then repeats `always` (or fails once the
/// script runs dry). Records every request it receives.
pub(crate) struct Scripted<Req, Out> {
    script: Mutex<VecDeque<TransformResult<Out>>>,
    fallback: Option<TransformResult<Out>>,
    requests: Mutex<Vec<Req>>,
}

impl<Req, Out> Scripted<Req, Out>
where
    Req: Clone,
    Out: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn then(self, outcome: TransformResult<Out>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub(crate) fn always(mut self, outcome: TransformResult<Out>) -> Self {
        self.fallback = Some(outcome);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<Req> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl<Req, Out> Transformer<Req, Out> for Scripted<Req, Out>
where
    Req: Clone + Send + Sync,
    Out: Clone + Send + Sync,
{
    async fn transform(&self, request: &Req) -> TransformResult<Out> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome,
            None => self
                .fallback
                .clone()
                .unwrap_or_else(|| Err(TransformError::Failed("script exhausted".into()))),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub(crate) fn complete_profile(name: &str) -> SourceProfile {
    SourceProfile(Resume {
        full_name: name.into(),
        summary: "Systems programmer".into(),
        skills: vec!["Rust".into(), "COBOL".into()],
        experience: vec![Experience {
            organization: "US Navy".into(),
            role: "Computer Scientist".into(),
            dates: "1943 - 1986".into(),
            highlights: vec!["Built the first compiler".into()],
        }],
        ..Default::default()
    })
}

pub(crate) fn target(title: &str, organization: &str) -> TargetSpec {
    TargetSpec {
        title: title.into(),
        organization: organization.into(),
        summary: "Build compilers".into(),
        hard_skills: vec!["Rust".into()],
        keywords: vec!["compilers".into()],
        ..Default::default()
    }
}

/// A draft whose summary names the call that produced it.
pub(crate) fn draft(tag: &str) -> DraftArtifact {
    DraftArtifact(Resume {
        full_name: "Grace Hopper".into(),
        summary: tag.into(),
        skills: vec!["Rust".into()],
        ..Default::default()
    })
}

pub(crate) fn review(needs_improvement: bool, suggestions: &[&str]) -> QualityAssessment {
    QualityAssessment {
        quality_score: if needs_improvement { 5.0 } else { 9.0 },
        needs_improvement,
        suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        strengths: vec!["clear structure".into()],
    }
}

pub(crate) fn approval() -> ComplianceAssessment {
    ComplianceAssessment {
        passed: true,
        fabrication_risk: 0,
        unnatural_language_risk: 1,
        issues: vec![],
        feedback_summary: "Accurate and natural.".into(),
    }
}

pub(crate) fn rejection() -> ComplianceAssessment {
    ComplianceAssessment {
        passed: false,
        fabrication_risk: 8,
        unnatural_language_risk: 2,
        issues: vec![ComplianceIssue {
            severity: Severity::Critical,
            issue: "invented skill".into(),
            suggestion: "remove skill X".into(),
        }],
        feedback_summary: "The draft claims a skill the original never mentions.".into(),
    }
}
