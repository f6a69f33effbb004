//! Chat-model transformers for the five pipeline roles.
//!
//! Every role talks to the same OpenAI-compatible endpoint through one
//! [`ChatClient`]; only the system prompt and the output type differ. The
//! analyzer additionally retrieves the posting before asking the model.

pub mod agent;
pub mod client;
pub mod extract;
pub mod prompts;

use std::sync::Arc;

use tracing::info;

use cvtailor_core::{
    AuditRequest, GenerationRequest, ParseRequest, ReviewRequest, Transformers,
};
use cvtailor_shared::{
    ComplianceAssessment, DraftArtifact, LlmConfig, QualityAssessment, Result, RetrievalConfig,
    SourceProfile,
};

pub use agent::{LlmTransformer, RetrievingAnalyzer};
pub use client::ChatClient;
pub use prompts::{JobContent, PromptRequest};

/// Wire the parser, analyzer, generator, reviewer and auditor.
pub fn build_transformers(llm: &LlmConfig, retrieval: &RetrievalConfig) -> Result<Transformers> {
    let client = Arc::new(ChatClient::new(llm)?);
    let retries = llm.output_retries;
    info!(model = %client.model(), base_url = %llm.base_url, "chat transformers ready");

    let analyst = LlmTransformer::new(
        "analyst",
        Arc::clone(&client),
        prompts::analyst_system(),
        retries,
    );

    Ok(Transformers {
        parser: Arc::new(LlmTransformer::<ParseRequest, SourceProfile>::new(
            "parser",
            Arc::clone(&client),
            prompts::parser_system(),
            retries,
        )),
        analyzer: Arc::new(RetrievingAnalyzer::new(analyst, retrieval.clone())),
        generator: Arc::new(LlmTransformer::<GenerationRequest, DraftArtifact>::new(
            "writer",
            Arc::clone(&client),
            prompts::writer_system(),
            retries,
        )),
        reviewer: Arc::new(LlmTransformer::<ReviewRequest, QualityAssessment>::new(
            "reviewer",
            Arc::clone(&client),
            prompts::reviewer_system(),
            retries,
        )),
        auditor: Arc::new(LlmTransformer::<AuditRequest, ComplianceAssessment>::new(
            "auditor",
            client,
            prompts::auditor_system(),
            retries,
        )),
    })
}
