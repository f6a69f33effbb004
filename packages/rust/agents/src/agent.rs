//! Transformer implementations backed by a chat model.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use cvtailor_core::{AnalyzeRequest, TransformError, TransformResult, Transformer};
use cvtailor_shared::{RetrievalConfig, TargetSpec};

use crate::client::ChatClient;
use crate::extract::parse_reply;
use crate::prompts::{JobContent, PromptRequest};

/// Asks a chat model to answer `Req` with a JSON `Out`.
///
/// Replies that do not parse are re-asked up to `output_retries` more times,
/// with the parse error appended to the prompt. Transport and HTTP errors are
/// returned at once; retrying those is the caller's decision.
pub struct LlmTransformer<Req, Out> {
    role: &'static str,
    client: Arc<ChatClient>,
    system_prompt: String,
    output_retries: u32,
    _marker: PhantomData<fn(&Req) -> Out>,
}

impl<Req, Out> LlmTransformer<Req, Out> {
    pub fn new(
        role: &'static str,
        client: Arc<ChatClient>,
        system_prompt: String,
        output_retries: u32,
    ) -> Self {
        Self {
            role,
            client,
            system_prompt,
            output_retries,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<Req, Out> Transformer<Req, Out> for LlmTransformer<Req, Out>
where
    Req: PromptRequest + Sync,
    Out: DeserializeOwned + Send,
{
    #[instrument(skip_all, fields(role = self.role))]
    async fn transform(&self, request: &Req) -> TransformResult<Out> {
        let prompt = request.render();
        let mut user = prompt.clone();
        let mut last_error = String::new();

        for attempt in 0..=self.output_retries {
            let reply = self
                .client
                .complete(&self.system_prompt, &user)
                .await
                .map_err(|e| TransformError::Failed(e.to_string()))?;

            let Some(reply) = reply else {
                return Err(TransformError::NoOutput);
            };

            match parse_reply::<Out>(&reply) {
                Ok(output) => {
                    debug!(attempt, "structured reply accepted");
                    return Ok(output);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "model reply did not parse");
                    last_error = e.to_string();
                    user = format!(
                        "{prompt}\n\nYour previous reply could not be used ({last_error}). \
                         Reply with only the JSON object in the required shape."
                    );
                }
            }
        }

        Err(TransformError::Failed(format!(
            "{} output unusable after {} attempts: {last_error}",
            self.role,
            self.output_retries + 1
        )))
    }
}

/// The analyzer capability: retrieve the posting, then ask the analyst model.
pub struct RetrievingAnalyzer {
    analyst: LlmTransformer<JobContent, TargetSpec>,
    retrieval: RetrievalConfig,
}

impl RetrievingAnalyzer {
    pub fn new(analyst: LlmTransformer<JobContent, TargetSpec>, retrieval: RetrievalConfig) -> Self {
        Self { analyst, retrieval }
    }
}

#[async_trait]
impl Transformer<AnalyzeRequest, TargetSpec> for RetrievingAnalyzer {
    async fn transform(&self, request: &AnalyzeRequest) -> TransformResult<TargetSpec> {
        let content = cvtailor_retrieval::retrieve(&request.target_locator, &self.retrieval).await;
        let job = JobContent {
            locator: request.target_locator.clone(),
            content,
        };
        self.analyst.transform(&job).await
    }
}
