//! End-to-end tailoring run: parse → analyze → (generate → review → audit)*.
//!
//! Parse and analyze must succeed within their attempt budget or the run
//! aborts. The write-audit cycle absorbs every failure into its own budget and
//! always ends in a [`PipelineResult`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use cvtailor_shared::{
    ComplianceAssessment, DraftArtifact, PipelineConfig, PipelineResult, Result, SourceProfile,
    TargetSpec,
};

use crate::aggregate;
use crate::audit::ComplianceAuditGate;
use crate::review::QualityReviewLoop;
use crate::stage::{Stage, StageExecutor, accept_any, accept_profile, accept_target};
use crate::transformer::{
    AnalyzeRequest, AnalyzerCapability, AuditFeedback, GenerationRequest, GeneratorCapability,
    ParseRequest, ParserCapability, Transformers,
};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Parsing,
    Analyzing,
    Generating { cycle: u32 },
    Reviewing { cycle: u32, iteration: u32 },
    Auditing { cycle: u32 },
    Passed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parsing => f.write_str("Parsing résumé"),
            Self::Analyzing => f.write_str("Analyzing job posting"),
            Self::Generating { cycle } => write!(f, "Writing draft (attempt {cycle})"),
            Self::Reviewing { cycle, iteration } => {
                write!(f, "Reviewing draft (attempt {cycle}, round {iteration})")
            }
            Self::Auditing { cycle } => write!(f, "Auditing draft (attempt {cycle})"),
            Self::Passed => f.write_str("Audit passed"),
            Self::Failed => f.write_str("Audit failed"),
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called on every state transition.
    fn state(&self, state: &PipelineState);
    /// Called once with the final result.
    fn done(&self, result: &PipelineResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn state(&self, _state: &PipelineState) {}
    fn done(&self, _result: &PipelineResult) {}
}

/// Values carried from one write cycle into the next.
#[derive(Debug, Default)]
struct WriteCycleState {
    /// Cycles started so far.
    cycles: u32,
    /// Most recent draft that reached the audit gate.
    draft: Option<DraftArtifact>,
    /// Most recent assessment the auditor returned.
    assessment: Option<ComplianceAssessment>,
    passed: bool,
}

/// Drives one tailoring run over five injected transformers.
pub struct PipelineOrchestrator {
    parser: ParserCapability,
    analyzer: AnalyzerCapability,
    generator: GeneratorCapability,
    review_loop: QualityReviewLoop,
    audit_gate: ComplianceAuditGate,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    /// Rejects configurations with a zero budget.
    pub fn new(transformers: Transformers, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            review_loop: QualityReviewLoop::new(
                transformers.reviewer,
                Arc::clone(&transformers.generator),
                config.max_review_iterations,
            ),
            audit_gate: ComplianceAuditGate::new(transformers.auditor),
            parser: transformers.parser,
            analyzer: transformers.analyzer,
            generator: transformers.generator,
            config,
        })
    }

    /// Tailor `source_text` to the posting at `target_locator`.
    ///
    /// Errors only when parse or analyze exhaust their attempts. An audit that
    /// never passes is reported through `PipelineResult::passed`.
    pub async fn run(&self, source_text: &str, target_locator: &str) -> Result<PipelineResult> {
        self.run_with_progress(source_text, target_locator, &SilentProgress)
            .await
    }

    #[instrument(skip_all, fields(
        target = %target_locator,
        max_write_attempts = self.config.max_write_attempts,
        max_review_iterations = self.config.max_review_iterations,
    ))]
    pub async fn run_with_progress(
        &self,
        source_text: &str,
        target_locator: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineResult> {
        let start = Instant::now();
        let executor = StageExecutor::new(self.config.max_stage_attempts, self.config.retry_delay);

        // --- Parse ---
        progress.state(&PipelineState::Parsing);
        let request = ParseRequest {
            source_text: source_text.to_string(),
        };
        let profile = executor
            .execute(Stage::Parse, self.parser.as_ref(), &request, accept_profile)
            .await?;
        info!(
            name = %profile.full_name,
            skills = profile.skills.len(),
            positions = profile.experience.len(),
            "résumé parsed"
        );
        let profile = Arc::new(profile);

        // --- Analyze ---
        progress.state(&PipelineState::Analyzing);
        let request = AnalyzeRequest {
            target_locator: target_locator.to_string(),
        };
        let target = executor
            .execute(Stage::Analyze, self.analyzer.as_ref(), &request, accept_target)
            .await?;
        info!(
            title = %target.title,
            organization = %target.organization,
            keywords = target.keywords.len(),
            "job posting analyzed"
        );
        let target = Arc::new(target);

        // --- Write-audit cycles ---
        let mut state = WriteCycleState::default();
        for cycle in 1..=self.config.max_write_attempts {
            state = self
                .write_cycle(state, cycle, &profile, &target, progress)
                .await;
            if state.passed {
                break;
            }
            if cycle < self.config.max_write_attempts {
                info!(cycle, "audit not passed, regenerating with feedback");
            }
        }

        let terminal = if state.passed {
            PipelineState::Passed
        } else {
            PipelineState::Failed
        };
        progress.state(&terminal);

        let result = aggregate::finalize(
            &target,
            state.draft.as_ref(),
            state.assessment.as_ref(),
            state.passed,
            state.cycles,
        );

        info!(
            passed = result.passed,
            write_cycles = result.write_cycles,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tailoring run complete"
        );
        if !result.passed {
            warn!(
                attempts = result.write_cycles,
                "no draft passed the audit, returning the last attempt"
            );
        }

        progress.done(&result);
        Ok(result)
    }

    /// One generate → review → audit pass. Every failure in here only ends the
    /// cycle early.
    async fn write_cycle(
        &self,
        state: WriteCycleState,
        cycle: u32,
        profile: &Arc<SourceProfile>,
        target: &Arc<TargetSpec>,
        progress: &dyn ProgressReporter,
    ) -> WriteCycleState {
        progress.state(&PipelineState::Generating { cycle });

        let request = match &state.assessment {
            Some(assessment) => GenerationRequest::AuditRetry {
                profile: Arc::clone(profile),
                target: Arc::clone(target),
                feedback: AuditFeedback::from(assessment),
            },
            None => GenerationRequest::Initial {
                profile: Arc::clone(profile),
                target: Arc::clone(target),
            },
        };
        debug!(cycle, kind = request.kind(), "requesting draft");

        let draft = match StageExecutor::single()
            .execute(Stage::Generate, self.generator.as_ref(), &request, accept_any)
            .await
        {
            Ok(draft) => draft,
            Err(failure) => {
                warn!(cycle, reason = %failure.reason, "generation failed, cycle lost");
                return WriteCycleState {
                    cycles: cycle,
                    ..state
                };
            }
        };

        let review = self
            .review_loop
            .refine(draft, profile, target, cycle, progress)
            .await;
        debug!(
            cycle,
            exit = ?review.exit,
            iterations = review.iterations,
            refinements = review.refinements,
            quality_score = review.last_assessment.as_ref().map(|a| a.quality_score),
            "review finished"
        );

        progress.state(&PipelineState::Auditing { cycle });
        let verdict = self
            .audit_gate
            .audit(profile, &review.draft, target, cycle)
            .await;
        let passed = verdict.passed();

        WriteCycleState {
            cycles: cycle,
            draft: Some(review.draft),
            assessment: verdict.into_assessment().or(state.assessment),
            passed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::testing::{
        Scripted, approval, complete_profile, draft, rejection, review, target,
    };
    use crate::transformer::{AuditRequest, ReviewRequest, TransformError};
    use cvtailor_shared::{NO_AUDIT_SUMMARY, QualityAssessment, Resume, TailorError};

    type Parser = Scripted<ParseRequest, SourceProfile>;
    type Analyzer = Scripted<AnalyzeRequest, TargetSpec>;
    type Generator = Scripted<GenerationRequest, DraftArtifact>;
    type Reviewer = Scripted<ReviewRequest, QualityAssessment>;
    type Auditor = Scripted<AuditRequest, ComplianceAssessment>;

    struct Harness {
        parser: Arc<Parser>,
        analyzer: Arc<Analyzer>,
        generator: Arc<Generator>,
        reviewer: Arc<Reviewer>,
        auditor: Arc<Auditor>,
    }

    impl Harness {
        /// Every stage succeeds first time and the audit passes.
        fn happy() -> Self {
            Self {
                parser: Arc::new(Parser::new().always(Ok(complete_profile("Grace Hopper")))),
                analyzer: Arc::new(
                    Analyzer::new().always(Ok(target("Compiler Engineer", "Initech"))),
                ),
                generator: Arc::new(Generator::new().always(Ok(draft("generated")))),
                reviewer: Arc::new(Reviewer::new().always(Ok(review(false, &[])))),
                auditor: Arc::new(Auditor::new().always(Ok(approval()))),
            }
        }

        fn orchestrator(&self) -> PipelineOrchestrator {
            self.orchestrator_with(config())
        }

        fn orchestrator_with(&self, config: PipelineConfig) -> PipelineOrchestrator {
            let transformers = Transformers {
                parser: self.parser.clone(),
                analyzer: self.analyzer.clone(),
                generator: self.generator.clone(),
                reviewer: self.reviewer.clone(),
                auditor: self.auditor.clone(),
            };
            PipelineOrchestrator::new(transformers, config).expect("valid config")
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            max_stage_attempts: 3,
            max_write_attempts: 3,
            max_review_iterations: 3,
            retry_delay: Duration::ZERO,
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        states: Mutex<Vec<PipelineState>>,
        done: Mutex<Option<PipelineResult>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn state(&self, state: &PipelineState) {
            self.states.lock().unwrap().push(*state);
        }
        fn done(&self, result: &PipelineResult) {
            *self.done.lock().unwrap() = Some(result.clone());
        }
    }

    #[tokio::test]
    async fn clean_run_passes_in_one_cycle() {
        let h = Harness::happy();
        let progress = RecordingProgress::default();

        let result = h
            .orchestrator()
            .run_with_progress("# Grace Hopper", "posting.md", &progress)
            .await
            .expect("run succeeds");

        assert!(result.passed);
        assert_eq!(result.write_cycles, 1);
        assert_eq!(result.organization, "Initech");
        assert_eq!(result.draft(), Some(draft("generated")));
        assert_eq!(h.generator.calls(), 1);
        assert_eq!(h.reviewer.calls(), 1);
        assert_eq!(h.auditor.calls(), 1);

        assert_eq!(
            *progress.states.lock().unwrap(),
            vec![
                PipelineState::Parsing,
                PipelineState::Analyzing,
                PipelineState::Generating { cycle: 1 },
                PipelineState::Reviewing {
                    cycle: 1,
                    iteration: 1
                },
                PipelineState::Auditing { cycle: 1 },
                PipelineState::Passed,
            ]
        );
        assert_eq!(progress.done.lock().unwrap().as_ref(), Some(&result));
    }

    #[tokio::test]
    async fn persistent_rejection_fails_after_all_cycles() {
        let h = Harness {
            generator: Arc::new(
                Generator::new()
                    .then(Ok(draft("first")))
                    .then(Ok(draft("second")))
                    .then(Ok(draft("third"))),
            ),
            auditor: Arc::new(Auditor::new().always(Ok(rejection()))),
            ..Harness::happy()
        };

        let result = h
            .orchestrator()
            .run("# Grace Hopper", "posting.md")
            .await
            .expect("rejection is not an error");

        assert!(!result.passed);
        assert_eq!(result.write_cycles, 3);
        assert_eq!(h.auditor.calls(), 3);
        assert_eq!(result.draft(), Some(draft("third")));

        let issue = &result.audit_report.issues[0];
        assert_eq!(issue.severity, "Critical");
        assert_eq!(issue.issue, "invented skill");
        assert_eq!(issue.suggestion, "remove skill X");
    }

    #[tokio::test]
    async fn incomplete_profile_is_fatal_before_analysis() {
        let incomplete = SourceProfile(Resume {
            full_name: "Grace Hopper".into(),
            ..Default::default()
        });
        let h = Harness {
            parser: Arc::new(Parser::new().always(Ok(incomplete))),
            ..Harness::happy()
        };

        let err = h
            .orchestrator()
            .run("# Grace Hopper", "posting.md")
            .await
            .unwrap_err();

        match err {
            TailorError::StageExhausted {
                stage,
                attempts,
                reason,
            } => {
                assert_eq!(stage, "parse");
                assert_eq!(attempts, 3);
                assert_eq!(reason, "incomplete result: profile has no experience");
            }
            other => panic!("expected stage exhaustion, got {other:?}"),
        }
        assert_eq!(h.parser.calls(), 3);
        assert_eq!(h.analyzer.calls(), 0);
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test]
    async fn reviewer_failure_sends_original_draft_to_audit() {
        let h = Harness {
            generator: Arc::new(Generator::new().then(Ok(draft("original")))),
            reviewer: Arc::new(
                Reviewer::new().then(Err(TransformError::Failed("reviewer crashed".into()))),
            ),
            ..Harness::happy()
        };

        let result = h
            .orchestrator()
            .run("# Grace Hopper", "posting.md")
            .await
            .expect("run succeeds");

        assert!(result.passed);
        assert_eq!(h.generator.calls(), 1);
        assert_eq!(h.auditor.requests()[0].draft, draft("original"));
    }

    #[tokio::test]
    async fn pass_on_second_cycle_stops_and_injects_feedback() {
        let h = Harness {
            auditor: Arc::new(
                Auditor::new()
                    .then(Ok(rejection()))
                    .then(Ok(approval())),
            ),
            ..Harness::happy()
        };

        let result = h
            .orchestrator()
            .run("# Grace Hopper", "posting.md")
            .await
            .expect("run succeeds");

        assert!(result.passed);
        assert_eq!(result.write_cycles, 2);
        assert_eq!(h.generator.calls(), 2);
        assert_eq!(h.reviewer.calls(), 2);
        assert_eq!(h.auditor.calls(), 2);

        let requests = h.generator.requests();
        assert_eq!(requests[0].kind(), "initial");
        match &requests[1] {
            GenerationRequest::AuditRetry { feedback, profile, .. } => {
                assert_eq!(feedback.issues[0].issue, "invented skill");
                assert_eq!(feedback.issues[0].suggestion, "remove skill X");
                assert_eq!(profile.full_name, "Grace Hopper");
            }
            other => panic!("expected audit retry, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn generator_calls_stay_within_bound() {
        let h = Harness {
            reviewer: Arc::new(Reviewer::new().always(Ok(review(true, &["more"])))),
            auditor: Arc::new(Auditor::new().always(Ok(rejection()))),
            ..Harness::happy()
        };
        let cfg = config();

        let result = h
            .orchestrator_with(cfg.clone())
            .run("# Grace Hopper", "posting.md")
            .await
            .expect("run succeeds");

        assert!(!result.passed);
        let bound = cfg.max_write_attempts * (1 + cfg.max_review_iterations);
        assert!(h.generator.calls() as u32 <= bound);
        // One draft plus two refinements per cycle.
        assert_eq!(h.generator.calls(), 9);
        assert_eq!(h.reviewer.calls(), 9);
    }

    #[tokio::test]
    async fn failed_generation_counts_as_a_cycle() {
        let h = Harness {
            generator: Arc::new(
                Generator::new()
                    .then(Err(TransformError::NoOutput))
                    .then(Ok(draft("retry"))),
            ),
            ..Harness::happy()
        };

        let result = h
            .orchestrator()
            .run("# Grace Hopper", "posting.md")
            .await
            .expect("run succeeds");

        assert!(result.passed);
        assert_eq!(result.write_cycles, 2);
        assert_eq!(h.generator.calls(), 2);
        assert_eq!(h.reviewer.calls(), 1);
        // No audit has happened yet, so the second request has no feedback.
        assert_eq!(h.generator.requests()[1].kind(), "initial");
    }

    #[tokio::test]
    async fn draft_and_feedback_survive_later_generation_failures() {
        let h = Harness {
            generator: Arc::new(
                Generator::new()
                    .then(Ok(draft("first")))
                    .always(Err(TransformError::Failed("rate limited".into()))),
            ),
            auditor: Arc::new(Auditor::new().always(Ok(rejection()))),
            ..Harness::happy()
        };

        let result = h
            .orchestrator()
            .run("# Grace Hopper", "posting.md")
            .await
            .expect("run succeeds");

        assert!(!result.passed);
        assert_eq!(result.write_cycles, 3);
        assert_eq!(result.draft(), Some(draft("first")));
        assert_eq!(result.audit_report.issues[0].issue, "invented skill");
        assert_eq!(h.auditor.calls(), 1);

        let kinds: Vec<&str> = h.generator.requests().iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, ["initial", "audit_retry", "audit_retry"]);
        match &h.generator.requests()[2] {
            GenerationRequest::AuditRetry { feedback, .. } => {
                assert_eq!(feedback.issues[0].suggestion, "remove skill X");
            }
            other => panic!("expected audit retry, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn generator_that_never_produces_yields_empty_result() {
        let h = Harness {
            generator: Arc::new(Generator::new().always(Err(TransformError::NoOutput))),
            ..Harness::happy()
        };

        let result = h
            .orchestrator()
            .run("# Grace Hopper", "posting.md")
            .await
            .expect("run succeeds");

        assert!(!result.passed);
        assert_eq!(result.write_cycles, 3);
        assert!(result.tailored_resume.is_empty());
        assert_eq!(result.audit_report.feedback_summary, NO_AUDIT_SUMMARY);
        assert_eq!(h.reviewer.calls(), 0);
        assert_eq!(h.auditor.calls(), 0);
    }

    #[tokio::test]
    async fn unavailable_audit_fails_the_cycle() {
        let h = Harness {
            auditor: Arc::new(
                Auditor::new().always(Err(TransformError::Failed("auditor down".into()))),
            ),
            ..Harness::happy()
        };

        let result = h
            .orchestrator()
            .run("# Grace Hopper", "posting.md")
            .await
            .expect("run succeeds");

        assert!(!result.passed);
        assert_eq!(result.write_cycles, 3);
        assert_eq!(h.auditor.calls(), 3);
        assert_eq!(result.draft(), Some(draft("generated")));
        assert_eq!(result.audit_report.feedback_summary, NO_AUDIT_SUMMARY);
    }

    #[tokio::test]
    async fn incomplete_target_is_fatal() {
        let h = Harness {
            analyzer: Arc::new(Analyzer::new().always(Ok(target("Engineer", "")))),
            ..Harness::happy()
        };

        let err = h
            .orchestrator()
            .run("# Grace Hopper", "posting.md")
            .await
            .unwrap_err();

        assert!(err.is_fatal_stage_failure());
        assert!(err.to_string().starts_with("analyze stage failed after 3 attempts"));
        assert_eq!(h.generator.calls(), 0);
    }

    #[test]
    fn zero_write_budget_is_rejected() {
        let h = Harness::happy();
        let transformers = Transformers {
            parser: h.parser.clone(),
            analyzer: h.analyzer.clone(),
            generator: h.generator.clone(),
            reviewer: h.reviewer.clone(),
            auditor: h.auditor.clone(),
        };
        let cfg = PipelineConfig {
            max_write_attempts: 0,
            ..config()
        };
        assert!(PipelineOrchestrator::new(transformers, cfg).is_err());
    }

    #[test]
    fn state_labels() {
        assert_eq!(
            PipelineState::Reviewing {
                cycle: 2,
                iteration: 1
            }
            .to_string(),
            "Reviewing draft (attempt 2, round 1)"
        );
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Parsing.is_terminal());
    }
}
