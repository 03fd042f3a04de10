//! Turning a project idea into a structured design via the language model.

mod client;

pub use client::{DesignClient, OpenAiClient};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::DesignError;

pub const ALGORITHM_STEPS: usize = 7;

/// Design document the model is asked to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDesign {
    pub introduction: String,
    pub microcontroller: String,
    pub components: Vec<String>,
    pub pin_config: Vec<String>,
    pub algorithm: Vec<String>,
    pub flowchart: String,
    pub arduino_code: String,
}

pub fn build_prompt(project_idea: &str) -> String {
    format!(
        r#"
You are an IoT design mentor for beginners.

For the project: "{project_idea}"

Return ONLY valid JSON:

{{
  "introduction": "Brief 2-3 line explanation",
  "microcontroller": "name with short reason",
  "components": ["list of components"],
  "pin_config": ["Component pin -> MCU pin"],
  "algorithm": ["step1","step2","step3","step4","step5","step6","step7"],
  "flowchart": "Mermaid flowchart code starting with: flowchart TD",
  "arduino_code": "Complete Arduino sketch using SAME pins"
}}

Rules:
- Arduino code must match pin_config
- Flowchart must be valid Mermaid
- Do NOT add text outside JSON
"#
    )
}

/// Return the body of a Markdown code fence, dropping an info string such as
/// `json`. Text without a leading fence is only trimmed.
pub fn strip_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // skip the info string up to the end of the opening line
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

pub fn parse_design(text: &str) -> Result<ProjectDesign, DesignError> {
    let design: ProjectDesign = serde_json::from_str(strip_fence(text))?;
    if design.algorithm.len() != ALGORITHM_STEPS {
        return Err(DesignError::Schema(format!(
            "algorithm must have {ALGORITHM_STEPS} steps, got {}",
            design.algorithm.len()
        )));
    }
    Ok(design)
}

/// One design round-trip. Failures are returned as-is; there is no retry.
#[instrument(skip(client, project_idea), fields(idea_len = project_idea.len()))]
pub async fn request_design(
    client: &dyn DesignClient,
    project_idea: &str,
) -> Result<ProjectDesign, DesignError> {
    let prompt = build_prompt(project_idea);
    let text = client.complete(&prompt).await?;
    debug!(response_len = text.len(), "design response received");

    parse_design(&text).map_err(|e| {
        warn!(error = %e, "design response rejected");
        e
    })
}
