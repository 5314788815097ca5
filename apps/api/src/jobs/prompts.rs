/// System prompt for job posting extraction.
pub const JOB_EXTRACT_SYSTEM: &str = "You are a job posting parser. \
    Extract ONLY what is explicitly stated in the text. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Extraction prompt template. Replace `{job_text}` before sending.
pub const JOB_EXTRACT_PROMPT_TEMPLATE: &str = r#"Parse this job posting into a JSON object with this EXACT schema:
{
  "title": "",
  "company": "",
  "requirements": [],
  "keywords": [],
  "description": ""
}

Rules (strict):
- Extract exactly what appears in the source. Do NOT invent, add, paraphrase, or infer.
- If a field is not clearly present, leave it empty: "" for strings, [] for lists.
- title: exact job title as written.
- company: exact company or employer name as written.
- requirements: only items that are explicitly stated (bullets, "Requirements:", "You bring:", etc.). One requirement per item. Do not combine items.
- keywords: only words or phrases that appear in the text (tools, technologies, skills). Do not add similar terms.
- description: a verbatim excerpt from the text, or "".

Job posting:
{job_text}
"#;
