//! Website generation by a single-shot model call.

use super::{required_str, Tool, ToolOutput};
use crate::config::Prompts;
use crate::error::Result;
use crate::model::LanguageModel;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Asks the model for a complete HTML/CSS/JS page. The output is never run.
pub struct GenerateWebsiteTool {
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
}

impl GenerateWebsiteTool {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Prompts) -> Self {
        Self { model, prompts }
    }
}

#[async_trait]
impl Tool for GenerateWebsiteTool {
    fn name(&self) -> &str {
        "generate_website"
    }

    fn description(&self) -> &str {
        "Generate the complete markup, styling and script for a website from a description."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "spec": {
                    "type": "string",
                    "description": "What the website should contain and how it should behave"
                }
            },
            "required": ["spec"]
        })
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let spec = required_str(&arguments, "spec")?;

        let mut vars = HashMap::new();
        vars.insert("spec".to_string(), spec.to_string());
        let prompt = self.prompts.render_with_custom(&self.prompts.website, &vars);

        Ok(ToolOutput::text(self.model.prompt(&prompt).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;
    use serde_json::json;

    #[tokio::test]
    async fn test_generates_from_prompt() {
        let model = Arc::new(
            ScriptedModel::new(vec![]).with_prompt_reply("<!DOCTYPE html><html></html>"),
        );
        let tool = GenerateWebsiteTool::new(model.clone(), Prompts::default());

        let output = tool
            .invoke(json!({"spec": "a bakery landing page"}))
            .await
            .unwrap();

        assert_eq!(output.render(), "<!DOCTYPE html><html></html>");
        assert!(model.prompts_seen()[0].contains("a bakery landing page"));
    }
}
