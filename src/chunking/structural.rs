//! Structural splitting: partition Markdown along header boundaries.
//!
//! The first chunking stage is purely rule-based and cheap. It cuts a page
//! at every Markdown header of level 1–3, keeping the header line inside the
//! section body (an embedding of "## Results\nThe test..." carries its
//! section context; a bare "The test..." does not) and tracking the header
//! path so chunks can record where in the document they came from.
//!
//! Splitting is infallible by design: text with no headers comes back as a
//! single section, and any input that defeats the parser falls back to one
//! whole-text section rather than surfacing an error. Losing structure is
//! acceptable; losing text is not.

/// One structural section of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section text, header line included.
    pub text: String,
    /// Path of `(level, title)` pairs leading to this section, shallowest
    /// first. Empty for text before the first header.
    pub headers: Vec<(u8, String)>,
}

/// Deepest header level that starts a new section.
const MAX_SPLIT_LEVEL: u8 = 3;

/// Split Markdown text into sections along level 1–3 header boundaries.
///
/// Header lines inside fenced code blocks are ignored. A header at level N
/// clears recorded levels ≥ N before taking its place, so the path always
/// reads like a table of contents. Whitespace-only input yields no sections;
/// any other input yields at least one.
pub fn split_headers(text: &str) -> Vec<Section> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let sections = split_inner(text);
    if sections.is_empty() {
        // Parser produced nothing for non-empty input: degrade to one
        // whole-text section.
        return vec![Section {
            text: text.to_string(),
            headers: Vec::new(),
        }];
    }
    sections
}

fn flush(lines: &mut Vec<&str>, path: &[(u8, String)], out: &mut Vec<Section>) {
    let body = lines.join("\n");
    if !body.trim().is_empty() {
        out.push(Section {
            text: body.trim_end().to_string(),
            headers: path.to_vec(),
        });
    }
    lines.clear();
}

fn split_inner(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut path: Vec<(u8, String)> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_path: Vec<(u8, String)> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            current.push(line);
            continue;
        }

        match (!in_fence).then(|| header_level(line)).flatten() {
            Some((level, title)) => {
                flush(&mut current, &current_path, &mut sections);
                path.retain(|(l, _)| *l < level);
                path.push((level, title));
                current_path = path.clone();
                current.push(line);
            }
            None => current.push(line),
        }
    }
    flush(&mut current, &current_path, &mut sections);

    sections
}

/// Parse `line` as an ATX header of level 1–3: `(level, title)`.
fn header_level(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if !(1..=MAX_SPLIT_LEVEL as usize).contains(&hashes) {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some((hashes as u8, rest.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headerless_text_is_one_section() {
        let text = "Just a paragraph.\n\nAnd another one.";
        let sections = split_headers(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, text);
        assert!(sections[0].headers.is_empty());
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        assert!(split_headers("  \n\n ").is_empty());
    }

    #[test]
    fn splits_at_each_header_and_keeps_header_lines() {
        let text = "# Intro\n\nHello.\n\n## Details\n\nMore.";
        let sections = split_headers(text);
        assert_eq!(sections.len(), 2);
        assert!(sections[0].text.starts_with("# Intro"));
        assert!(sections[1].text.starts_with("## Details"));
    }

    #[test]
    fn preamble_before_first_header_has_empty_path() {
        let sections = split_headers("preamble\n\n# Title\n\nbody");
        assert_eq!(sections.len(), 2);
        assert!(sections[0].headers.is_empty());
        assert_eq!(sections[1].headers, vec![(1, "Title".to_string())]);
    }

    #[test]
    fn header_path_resets_on_shallower_header() {
        let text = "# A\n\none\n\n## B\n\ntwo\n\n### C\n\nthree\n\n## D\n\nfour";
        let sections = split_headers(text);
        assert_eq!(sections.len(), 4);
        assert_eq!(
            sections[2].headers,
            vec![
                (1, "A".to_string()),
                (2, "B".to_string()),
                (3, "C".to_string())
            ]
        );
        assert_eq!(
            sections[3].headers,
            vec![(1, "A".to_string()), (2, "D".to_string())]
        );
    }

    #[test]
    fn level_four_headers_do_not_split() {
        let sections = split_headers("# A\n\n#### not a boundary\n\ntext");
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn headers_inside_code_fences_are_ignored() {
        let text = "# Real\n\n```\n# comment, not a header\n```\n\ntail";
        let sections = split_headers(text);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].text.contains("# comment"));
    }

    #[test]
    fn hash_without_space_is_not_a_header() {
        let sections = split_headers("#hashtag mention\n\nbody");
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn no_text_is_lost() {
        let text = "intro\n# A\nalpha\n## B\nbeta\n# C\ngamma";
        let sections = split_headers(text);
        let rejoined: String = sections.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join("\n");
        for needle in ["intro", "alpha", "beta", "gamma", "# A", "## B", "# C"] {
            assert!(rejoined.contains(needle), "lost {needle:?}");
        }
    }
}
