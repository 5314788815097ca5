/// System prompt for name extraction.
pub const NAME_EXTRACT_SYSTEM: &str = "You extract the candidate's own name from a resume. \
    You MUST respond with valid JSON only, no code fences, no commentary.";

/// Replace `{resume_text}` before sending. Only the head of the resume is sent.
pub const NAME_EXTRACT_PROMPT_TEMPLATE: &str = r#"Return {"first_name": string|null, "last_name": string|null} for the person this resume belongs to.
Use null for anything you cannot find. Ignore names of references, employers, or schools.

Resume:
{resume_text}
"#;
