//! Instruction text sent to the language model.

use crate::registry::ModelProfile;
use crate::{GenerationRequest, Result};

const BASE_SYSTEM_PROMPT: &str = "You are PromptForge AI, an expert cinematic video prompt engineer. Your role is to enhance user scene descriptions into highly detailed, professional video generation prompts.

Guidelines:
- Incorporate specific cinematic techniques (camera angles, movements, lighting styles)
- Use vivid, evocative language that AI video models understand
- Maintain the user's creative intent while adding professional depth
- Keep responses focused and concise (max 200 words per scene)
- Output ONLY the refined descriptive text.
- DO NOT include labels like \"Prompt:\", \"Enhanced:\", or \"Scene:\".
- DO NOT include any introductory or concluding remarks.";

const NO_CAMERA_CONTROLS: &str = "- This model does NOT support advanced camera controls. Avoid describing specific camera movements like \"tracking shot\" or \"crane shot\".\n";

const NO_NEGATIVE_PROMPT: &str = "- This model does NOT support negative prompts. If the user mentions things to avoid, try to express constraints positively or rephrase.\n";

/// System instruction for batch generation.
pub const BATCH_SYSTEM_PROMPT: &str = r#"You are a specialized AI for generating professional VEO video prompts in strict JSON format.

Your task is to take the user's rough scene inputs and transform them into a polished, cinematic JSON output.
Follow these rules strictly:
1. Output MUST be a valid JSON array of objects.
2. Each object must follow this schema:
   {
     "description": "Enhanced, detailed cinematic description",
     "camera": "Camera angle/movement (keep original if good, or enhance)",
     "lighting": "Lighting style (keep original if good, or enhance)",
     "negative_prompt": "Negative constraints"
   }
3. Enhance the 'description' field to be vivid, detailed, and use professional filmmaking terminology.
4. Keep the 'negative_prompt' robust but concise.
5. Do NOT add any markdown formatting (like ```json). Output raw JSON string only.
6. Maintain the exact number of scenes as the input.
7. Output ONLY the raw JSON content without any conversational filler or "Prompt" labels."#;

/// Description used when the request leaves it blank.
pub const DEFAULT_DESCRIPTION: &str = "A cinematic scene";

/// General cinematic guidance, extended with the target model's constraints.
pub fn system_prompt(profile: Option<&ModelProfile>) -> String {
    let mut prompt = BASE_SYSTEM_PROMPT.to_string();
    let Some(profile) = profile else {
        return prompt;
    };

    prompt.push_str(&format!("\n\n**Target Model: {}**\n", profile.name));
    prompt.push_str(&format!("- {}\n", profile.description));
    if !profile.supports_camera_controls {
        prompt.push_str(NO_CAMERA_CONTROLS);
    }
    if !profile.supports_negative_prompt {
        prompt.push_str(NO_NEGATIVE_PROMPT);
    }
    prompt.push_str(&format!(
        "- Allowed Frame Rates: {} fps.\n",
        profile.allowed_frame_rates.join(", ")
    ));
    prompt.push_str(&format!("- Max Resolution: {}.\n", profile.max_resolution));
    prompt
}

pub fn user_prompt(request: &GenerationRequest) -> String {
    fn present(field: &Option<String>) -> Option<&str> {
        field.as_deref().filter(|v| !v.trim().is_empty())
    }

    let description = Some(request.description.as_str())
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION);

    let mut prompt = String::from("Enhance this scene description for AI video generation:\n\n");
    prompt.push_str(&format!("Description: {description}\n"));
    if let Some(camera) = present(&request.camera) {
        prompt.push_str(&format!("Camera: {camera}\n"));
    }
    if let Some(lighting) = present(&request.lighting) {
        prompt.push_str(&format!("Lighting: {lighting}\n"));
    }
    if let Some(avoid) = present(&request.negative_prompt) {
        prompt.push_str(&format!("Avoid: {avoid}\n"));
    }
    prompt
}

pub fn batch_user_prompt(scenes: &[GenerationRequest]) -> Result<String> {
    Ok(format!(
        "Here is the raw scene data to enhance and format as JSON:\n{}",
        serde_json::to_string_pretty(scenes)?
    ))
}

/// Remove a leading ```` ```json ```` or ```` ``` ```` fence and a trailing
/// ```` ``` ```` fence.
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}
