// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of `[Source N]` citation markers in final-answer paragraphs.
//!
//! Markers are 1-based indexes into the response's `sources`. A marker may
//! list several numbers (`[Source 1, 3]`). Numbers that do not resolve are
//! kept in the text verbatim and reported, never dropped.

use std::sync::LazyLock;

use regex::Regex;

static MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[Sources?\s+([^\]]*)\]").unwrap());

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'\)\]]+"#).unwrap());

/// One piece of a resolved paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Citation {
        /// 1-based source number as written in the answer.
        number: usize,
        /// The full source line.
        source: String,
        /// URL extracted from the source line, if it carries one.
        url: Option<String>,
    },
}

/// Final answer with citation markers resolved against the source list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAnswer {
    pub paragraphs: Vec<Vec<Segment>>,
    /// Marker text of every citation that could not be resolved, in order.
    pub unresolved: Vec<String>,
}

impl ResolvedAnswer {
    /// Renders a paragraph as plain text with `[N]` markers for citations.
    pub fn plain_paragraph(segments: &[Segment]) -> String {
        segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Citation { number, .. } => format!("[{number}]"),
            })
            .collect()
    }

    /// Distinct citations in first-use order.
    pub fn cited_sources(&self) -> Vec<(usize, Option<&str>, &str)> {
        let mut seen = Vec::new();
        let mut cited = Vec::new();
        for segment in self.paragraphs.iter().flatten() {
            if let Segment::Citation {
                number,
                source,
                url,
            } = segment
                && !seen.contains(number)
            {
                seen.push(*number);
                cited.push((*number, url.as_deref(), source.as_str()));
            }
        }
        cited
    }
}

/// Extracts the first http(s) URL in a source line.
pub fn extract_url(source: &str) -> Option<String> {
    URL.find(source)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string())
}

/// Resolves every citation marker in `final_answer` against `sources`.
pub fn resolve_citations(final_answer: &[String], sources: &[String]) -> ResolvedAnswer {
    let mut resolved = ResolvedAnswer::default();
    for paragraph in final_answer {
        let segments = resolve_paragraph(paragraph, sources, &mut resolved.unresolved);
        resolved.paragraphs.push(segments);
    }
    resolved
}

fn resolve_paragraph(text: &str, sources: &[String], unresolved: &mut Vec<String>) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in MARKER.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut segments, &text[last..whole.start()]);
        last = whole.end();

        let list = caps.get(1).map_or("", |m| m.as_str());
        for part in list.split(',').map(str::trim) {
            match lookup(part, sources) {
                Some((number, source)) => segments.push(Segment::Citation {
                    number,
                    source: source.to_string(),
                    url: extract_url(source),
                }),
                None => {
                    let marker = format!("[Source {part}]");
                    push_text(&mut segments, &marker);
                    unresolved.push(marker);
                }
            }
        }
    }
    push_text(&mut segments, &text[last..]);
    segments
}

fn lookup<'a>(part: &str, sources: &'a [String]) -> Option<(usize, &'a str)> {
    let number: usize = part.parse().ok()?;
    let source = sources.get(number.checked_sub(1)?)?;
    Some((number, source.as_str()))
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(prev)) = segments.last_mut() {
        prev.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> Vec<String> {
        vec![
            "Source 1: Quantum basics - https://physics.example/basics".into(),
            "Source 2: https://news.example/entanglement.".into(),
            "Source 3: an offline textbook".into(),
        ]
    }

    #[test]
    fn single_marker_resolves_to_url() {
        let answer = vec!["Particles correlate [Source 1] at a distance.".to_string()];
        let resolved = resolve_citations(&answer, &sources());
        assert!(resolved.unresolved.is_empty());
        assert_eq!(
            resolved.paragraphs[0],
            vec![
                Segment::Text("Particles correlate ".into()),
                Segment::Citation {
                    number: 1,
                    source: sources()[0].clone(),
                    url: Some("https://physics.example/basics".into()),
                },
                Segment::Text(" at a distance.".into()),
            ]
        );
    }

    #[test]
    fn multi_number_marker_yields_each_citation() {
        let answer = vec!["Confirmed twice [Source 2, 3].".to_string()];
        let resolved = resolve_citations(&answer, &sources());
        let cited = resolved.cited_sources();
        assert_eq!(cited.len(), 2);
        assert_eq!(cited[0], (2, Some("https://news.example/entanglement"), sources()[1].as_str()));
        assert_eq!(cited[1].1, None);
        assert_eq!(
            ResolvedAnswer::plain_paragraph(&resolved.paragraphs[0]),
            "Confirmed twice [2][3]."
        );
    }

    #[test]
    fn unresolvable_markers_are_kept_and_reported() {
        let answer = vec!["Claims [Source 0] and [Source 9] and [Source x, 1].".to_string()];
        let resolved = resolve_citations(&answer, &sources());
        assert_eq!(
            resolved.unresolved,
            vec!["[Source 0]", "[Source 9]", "[Source x]"]
        );
        assert_eq!(
            ResolvedAnswer::plain_paragraph(&resolved.paragraphs[0]),
            "Claims [Source 0] and [Source 9] and [Source x][1]."
        );
    }

    #[test]
    fn text_without_markers_is_untouched() {
        let answer = vec!["No citations here.".to_string(), String::new()];
        let resolved = resolve_citations(&answer, &[]);
        assert_eq!(
            resolved.paragraphs,
            vec![vec![Segment::Text("No citations here.".into())], vec![]]
        );
    }
}
