// Shared prompt fragments used across stages.
// Stage prompt text itself lives in the prompt store; these are appended
// programmatically where a stage needs structured output.

/// Fragment that enforces JSON-only output. Prefixed to every stage's
/// `{format_instructions}`.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
