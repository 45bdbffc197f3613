// src/utils/html.rs

/// Escapes learner-provided text for display inside HTML.
///
/// Submissions are stored verbatim and only escaped when rendered, so graders
/// see exactly what was written (`a < b` stays `a < b` on screen) and no markup
/// from the learner is ever interpreted.
pub fn escape_text(input: &str) -> String {
    ammonia::clean_text(input)
}

/// Renders multi-line learner text as escaped HTML with `<br>` line breaks.
pub fn text_to_html(input: &str) -> String {
    input
        .lines()
        .map(escape_text)
        .collect::<Vec<_>>()
        .join("<br>")
}
