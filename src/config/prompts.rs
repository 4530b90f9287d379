//! Prompt templates for Palaver.
//!
//! Prompts can be customized by placing a `prompts.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// Instruction seeded at the start of every new conversation.
    pub system: String,
    /// Single-shot prompt used by `summarize_weather`.
    pub weather_summary: String,
    /// Single-shot prompt used by `generate_website`.
    pub website: String,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that has access to the following tools:
- search(query: str) → list
  Use this tool when you need current information from the web.
- get_youtube_transcript(video_url: str) → str
  Use this tool when I provide a YouTube URL, to fetch the transcript or provide a summary of the video.
- get_weather(city: str) → str
  Use this tool when I ask about current weather.
- summarize_weather(city: str) → str
  Use this tool when I ask for a more detailed weather summary.
- send_email(recipient: str, subject: str, body: str) → str
  Use this tool when I ask you to send an email.
- generate_website(spec: str) → str
  Use this tool when I ask you to build a web page or website.

Always return the final answer after any tool calls. If no tool is needed, just answer directly."#
                .to_string(),

            weather_summary: r#"You are a helpful assistant.

Here is the raw JSON data from a weather API:

{{weather_json}}

Please summarize the weather in a single, human-readable sentence. Include:
- Weather description
- Temperature in Celsius
- Humidity percentage
- Wind speed in m/s
- City name

Example: "The weather in London is clear sky with a temperature of 18.5°C, humidity at 56%, and wind speed of 3.6 m/s.""#
                .to_string(),

            website: r#"You are an expert front-end developer.

Build a complete, self-contained website that satisfies this request:

{{spec}}

Return a single HTML document with all CSS in a <style> block and all JavaScript in a <script> block.
Respond with the code only, without explanations."#
                .to_string(),

            variables: HashMap::new(),
        }
    }
}

impl Prompts {
    /// Load prompts, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("prompts.toml");
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                prompts = toml::from_str(&content)?;
            }
        }

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The system instruction with custom variables applied.
    pub fn system_instruction(&self) -> String {
        self.render_with_custom(&self.system, &HashMap::new())
    }
}
