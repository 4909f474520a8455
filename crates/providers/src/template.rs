//! Template model — deterministic replies rendered from a fixed string.

use async_trait::async_trait;
use ctxlink_config::ModelConfig;
use ctxlink_core::context::Context;
use ctxlink_core::error::ModelError;
use ctxlink_core::message::QueryPayload;
use ctxlink_core::model::{Generation, Model};
use tracing::debug;

const PLACEHOLDER: &str = "{prompt}";

/// Replies by substituting the prompt into a template.
///
/// With the default template `"Processed query: {prompt}"` the reply to
/// `"Hi"` is `"Processed query: Hi"`. Query options are accepted and ignored.
#[derive(Debug, Clone)]
pub struct TemplateModel {
    template: String,
}

impl TemplateModel {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.response_template.clone())
    }

    pub fn render(&self, prompt: &str) -> String {
        self.template.replace(PLACEHOLDER, prompt)
    }
}

impl Default for TemplateModel {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

#[async_trait]
impl Model for TemplateModel {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(
        &self,
        context: &Context,
        query: &QueryPayload,
    ) -> Result<Generation, ModelError> {
        debug!(
            model = %context.model_id,
            prompt_len = query.prompt.len(),
            "Rendering template reply"
        );
        Ok(Generation::from_text(self.render(&query.prompt)))
    }
}
