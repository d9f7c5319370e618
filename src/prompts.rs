//! System prompts for vision-model page extraction.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the extraction behaviour (e.g.
//!    tightening table handling) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without
//!    spinning up a real model, making prompt regressions easy to catch.
//!
//! Callers can override the default via
//! [`crate::config::IngestConfig::system_prompt`]; the constant here is used
//! only when no override is provided.

/// Default system prompt for transcribing a rendered page image.
///
/// Deliberately structure-heavy: asking for real Markdown headers and GFM
/// tables is what lets the structural splitter find section boundaries
/// downstream.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a precise document parser. Extract all text from this page into clean Markdown.

Follow these rules exactly:

1. STRUCTURE
   - Preserve the document structure using Markdown headers (#, ##, ###)
   - Maintain the reading order as a human would read the page
   - Use - for unordered lists and 1. 2. 3. for ordered lists

2. TABLES
   - Convert every table into GFM pipe-table syntax

3. IMAGERY
   - If an image contains text, extract that text
   - If an image is purely decorative (photos, logos, borders), ignore it

4. OUTPUT FORMAT
   - Output ONLY the page content as Markdown
   - Do NOT wrap the output in ```markdown fences
   - Do NOT add conversational text like "Here is the extracted text"
   - Do NOT add commentary or page markers"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_demands_markdown_tables_and_no_filler() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("pipe-table"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("Here is the extracted text"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("decorative"));
    }
}
