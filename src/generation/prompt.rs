//! Instruction text sent to the model.

use super::request::GenerationRequest;

/// Render the single instruction used for every attempt of `request`.
///
/// Layout: role, hard output constraints, the shape as a one-element example array, then
/// the caller's task text.
pub fn build_instruction(request: &GenerationRequest) -> String {
    let mut constraints = String::from(
        "CRITICAL INSTRUCTIONS (DO NOT IGNORE):\n\
         - Return ONLY valid JSON\n\
         - No markdown\n\
         - No explanations\n\
         - No comments\n\
         - No text outside JSON\n\
         - Output MUST be a single JSON ARRAY\n",
    );
    if let Some(n) = request.expected_count() {
        constraints.push_str(&format!("- Array MUST contain EXACTLY {} objects\n", n));
    }

    format!(
        "{role}\n\n{constraints}\nJSON SCHEMA:\n{schema:#}\n\nUser request:\n{task}\n",
        role = request.role().trim(),
        constraints = constraints,
        schema = request.shape().schema_example(),
        task = request.task().trim(),
    )
}
