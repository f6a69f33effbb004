//! Best-effort quality refinement of a draft.
//!
//! The reviewer scores the draft against the target; while it asks for more
//! work and budget remains, the generator rewrites the draft from the
//! reviewer's suggestions. Nothing in here can fail a run: every problem ends
//! the loop early and hands back the last good draft.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use cvtailor_shared::{DraftArtifact, QualityAssessment, SourceProfile, TargetSpec};

use crate::pipeline::{PipelineState, ProgressReporter};
use crate::transformer::{
    GenerationRequest, GeneratorCapability, ReviewRequest, ReviewerCapability,
};

/// Why the review loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewExit {
    /// Reviewer is satisfied with the draft.
    Accepted,
    /// Last allowed iteration reached while the reviewer still wanted changes.
    BudgetExhausted,
    /// Reviewer call failed or returned nothing.
    ReviewerFailed(String),
    /// Refinement call failed or returned nothing.
    RefinementFailed(String),
}

/// The draft the loop settled on and how it got there.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub draft: DraftArtifact,
    /// Reviewer calls made.
    pub iterations: u32,
    /// Drafts replaced by a refinement.
    pub refinements: u32,
    pub exit: ReviewExit,
    /// The reviewer's most recent verdict, if any call succeeded.
    pub last_assessment: Option<QualityAssessment>,
}

/// Loop-local state, replaced wholesale on each iteration.
struct ReviewState {
    draft: DraftArtifact,
    iteration: u32,
    refinements: u32,
    last_assessment: Option<QualityAssessment>,
}

impl ReviewState {
    fn finish(self, exit: ReviewExit) -> ReviewOutcome {
        ReviewOutcome {
            draft: self.draft,
            iterations: self.iteration,
            refinements: self.refinements,
            exit,
            last_assessment: self.last_assessment,
        }
    }
}

/// Bounded reviewer → generator refinement loop.
pub struct QualityReviewLoop {
    reviewer: ReviewerCapability,
    generator: GeneratorCapability,
    max_iterations: u32,
}

impl QualityReviewLoop {
    /// `max_iterations` below one is treated as one.
    pub fn new(
        reviewer: ReviewerCapability,
        generator: GeneratorCapability,
        max_iterations: u32,
    ) -> Self {
        Self {
            reviewer,
            generator,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Improve `draft` for `target`, never claiming more than `profile` does.
    #[instrument(skip_all, fields(cycle = cycle, max_iterations = self.max_iterations))]
    pub async fn refine(
        &self,
        draft: DraftArtifact,
        profile: &Arc<SourceProfile>,
        target: &Arc<TargetSpec>,
        cycle: u32,
        progress: &dyn ProgressReporter,
    ) -> ReviewOutcome {
        let mut state = ReviewState {
            draft,
            iteration: 0,
            refinements: 0,
            last_assessment: None,
        };

        loop {
            state.iteration += 1;
            let iteration = state.iteration;
            progress.state(&PipelineState::Reviewing { cycle, iteration });

            let request = ReviewRequest {
                draft: state.draft.clone(),
                target: Arc::clone(target),
            };

            let assessment = match self.reviewer.transform(&request).await {
                Ok(assessment) => assessment,
                Err(e) => {
                    warn!(iteration, error = %e, "review failed, keeping current draft");
                    return state.finish(ReviewExit::ReviewerFailed(e.to_string()));
                }
            };

            info!(
                iteration,
                score = assessment.quality_score,
                needs_improvement = assessment.needs_improvement,
                "draft reviewed"
            );
            if !assessment.strengths.is_empty() {
                debug!(strengths = ?assessment.strengths, "reviewer noted strengths");
            }

            if !assessment.needs_improvement {
                state.last_assessment = Some(assessment);
                return state.finish(ReviewExit::Accepted);
            }

            if iteration >= self.max_iterations {
                info!(iteration, "review budget reached, keeping current draft");
                state.last_assessment = Some(assessment);
                return state.finish(ReviewExit::BudgetExhausted);
            }

            let refine = GenerationRequest::Refine {
                current: state.draft.clone(),
                profile: Arc::clone(profile),
                target: Arc::clone(target),
                suggestions: assessment.suggestions.clone(),
            };

            state = match self.generator.transform(&refine).await {
                Ok(refined) => {
                    info!(iteration, "draft refined from reviewer feedback");
                    ReviewState {
                        draft: refined,
                        iteration,
                        refinements: state.refinements + 1,
                        last_assessment: Some(assessment),
                    }
                }
                Err(e) => {
                    warn!(iteration, error = %e, "refinement failed, keeping current draft");
                    state.last_assessment = Some(assessment);
                    return state.finish(ReviewExit::RefinementFailed(e.to_string()));
                }
            };
        }
    }
}
