/// System prompt for resume generation.
pub const GENERATION_SYSTEM: &str = "You are an expert resume writer who tailors resumes to a specific job posting. \
    You output the HTML <body> content of a one-page resume and nothing else: \
    no <html>, <head> or <body> tags, no markdown, no code fences, no commentary.";

/// Generation prompt template. Replace every `{placeholder}` before sending.
pub const GENERATION_PROMPT_TEMPLATE: &str = r#"Rewrite the candidate's resume for the job below.

{no_fabrication_instruction}

FORMAT RULES:
- Output only body markup using: <header>, <h1>, <h2>, <h3>, <p>, <ul>, <li>, <span>, <strong>, <em>, <a>.
- Sections as <section> elements with an <h2> heading.
- Every achievement is an <li>. Quantify impact (numbers, %, time saved) wherever the source supports it.
- Must fit on ONE page. Prefer fewer, stronger bullets over many weak ones.
- Use the posting's own wording for skills the candidate genuinely has.

JOB POSTING (JSON):
{job_json}

SOURCE RESUME:
{resume_text}

{feedback_block}
{variant_hint}
"#;

/// Inserted when a previous attempt failed validation. Replace `{issues}` and `{suggestions}`.
pub const FEEDBACK_TEMPLATE: &str = r#"A previous version of this resume failed review. Fix these problems:
ISSUES:
{issues}
SUGGESTIONS:
{suggestions}
"#;
