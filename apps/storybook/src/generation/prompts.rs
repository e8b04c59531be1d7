// Programmatic prompt text for the generation stages: JSON shape descriptions
// for structured stages and the illustration consistency directive.
// Stage system/user prompts live in the prompt store.

/// `{format_instructions}` for the template stage.
pub const TEMPLATE_FORMAT: &str = r#"Return a JSON object with this EXACT schema (no extra fields):
{
  "theme": "the single theme you chose",
  "template_id": "short-unique-kebab-case-id",
  "beats": ["first plot point", "second plot point"]
}"#;

/// `{format_instructions}` for the outline stage.
pub const OUTLINE_FORMAT: &str = r#"Return a JSON object with this EXACT schema (no extra fields):
{
  "title": "Story title",
  "beats": [
    {"page": 1, "summary": "What happens on page 1"},
    {"page": 2, "summary": "What happens on page 2"}
  ],
  "vocabulary_targets": ["word", "another"]
}
Pages are numbered from 1 with no gaps."#;

/// `{format_instructions}` for the moderation stage.
pub const MODERATION_FORMAT: &str = r#"Return a JSON object with this EXACT schema (no extra fields):
{
  "is_safe": true,
  "reason": null
}
When is_safe is false, reason MUST be a short explanation."#;

/// `{format_instructions}` for the illustration-prompt stage.
pub const ILLUSTRATION_FORMAT: &str = r#"Return a JSON object with this EXACT schema (no extra fields):
{
  "prompts": [
    {"page": 1, "prompt": "Text-to-image prompt for page 1"}
  ]
}"#;

/// Appended to every page instruction sent to the image model.
pub const CONSISTENCY_DIRECTIVE: &str = "Make sure all recurring characters, especially the main child, \
look visually consistent with the previous illustrations: \
same face, hairstyle, skin tone, body shape, and clothing style. \
Do NOT change the main character's identity or appearance.";
