// Cross-cutting prompt fragments. Each service that calls the LLM keeps its own
// prompts.rs alongside it and pulls shared rules from here.

/// Shared rule for every prompt that reads a user-supplied document.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    CRITICAL: Use only facts that appear in the provided source text. \
    Do NOT invent employers, titles, dates, degrees, metrics, or skills. \
    If the source does not support a detail, leave it out.";

/// Fills `{name}` placeholders in one left-to-right pass. Inserted values are
/// never rescanned, so user text that happens to contain `{name}` stays literal.
/// Unknown `{...}` sequences are kept as-is.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = values.iter().find(|(name, _)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(name))
                .is_some_and(|t| t.starts_with('}'))
        });
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
