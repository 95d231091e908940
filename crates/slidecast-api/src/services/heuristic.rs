//! Offline script generation by sentence grouping.

use async_trait::async_trait;
use slidecast_models::{Script, Section};
use tracing::{error, info};

use crate::services::content::{ContentError, ContentGenerator};

/// Sentences per section.
const SENTENCES_PER_SECTION: usize = 2;
/// Title length before truncation.
const TITLE_MAX_CHARS: usize = 50;
/// Summary length before truncation.
const SUMMARY_MAX_CHARS: usize = 100;

/// Splits the input into two-sentence sections without calling any model.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicContentGenerator;

#[async_trait]
impl ContentGenerator for HeuristicContentGenerator {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn generate_content(&self, input: &str) -> Result<Script, ContentError> {
        info!(chars = input.chars().count(), "Formatting text input");

        let script = Script {
            title: truncate(input, TITLE_MAX_CHARS),
            sections: split_sections(input),
            summary: truncate(input, SUMMARY_MAX_CHARS),
        };

        script.validate().map_err(|e| {
            error!("Error formatting content: {}", e);
            ContentError::Generation(format!("Failed to process text: {}", e))
        })?;

        info!(sections = script.section_count(), "Formatted content");
        Ok(script)
    }
}

/// Group sentences into sections of two; the last may hold one.
///
/// Sentences are split on `.`, trimmed, and empty fragments dropped. Grouped
/// sentences are rejoined with `". "` and end with a period.
pub fn split_sections(input: &str) -> Vec<Section> {
    let sentences: Vec<&str> = input
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    sentences
        .chunks(SENTENCES_PER_SECTION)
        .map(|group| Section::new(format!("{}.", group.join(". "))))
        .collect()
}

/// First `max_chars` characters, with `...` appended when the input is longer.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(sections: &[Section]) -> Vec<&str> {
        sections.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_three_sentences_make_two_sections() {
        let sections = split_sections("The sun rises. Birds sing. Coffee brews.");
        assert_eq!(texts(&sections), vec!["The sun rises. Birds sing.", "Coffee brews."]);
    }

    #[test]
    fn test_even_sentences_fill_sections() {
        let sections = split_sections("A. B. C. D.");
        assert_eq!(texts(&sections), vec!["A. B.", "C. D."]);
    }

    #[test]
    fn test_fragments_and_whitespace_dropped() {
        let sections = split_sections("  One sentence without a stop  ");
        assert_eq!(texts(&sections), vec!["One sentence without a stop."]);

        assert!(split_sections(" ... . ").is_empty());
    }

    #[test]
    fn test_sentences_are_preserved_in_order() {
        let input = "First point. Second point.  Third point. Fourth. Fifth one here.";
        let sections = split_sections(input);

        let rejoined: Vec<String> = sections
            .iter()
            .flat_map(|s| s.text.split('.').map(|p| p.trim().to_string()))
            .filter(|p| !p.is_empty())
            .collect();
        let original: Vec<String> = input
            .split('.')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        assert_eq!(rejoined, original);
        assert!(sections.iter().all(|s| s.text.matches('.').count() <= 2));
        assert_eq!(sections.last().unwrap().text, "Fifth one here.");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 50), "short");

        let exact = "x".repeat(50);
        assert_eq!(truncate(&exact, 50), exact);

        let long = "y".repeat(51);
        let cut = truncate(&long, 50);
        assert_eq!(cut.chars().count(), 53);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_truncate_counts_characters() {
        let text = "é".repeat(60);
        let cut = truncate(&text, 50);
        assert_eq!(cut, format!("{}...", "é".repeat(50)));
    }

    #[tokio::test]
    async fn test_generate_content() {
        let input = "Volcanoes form at plate boundaries. Magma rises. Eruptions follow.";
        let script = HeuristicContentGenerator.generate_content(input).await.unwrap();

        assert_eq!(script.title, "Volcanoes form at plate boundaries. Magma rises. E...");
        assert_eq!(script.summary, input);
        assert_eq!(script.section_count(), 2);
    }

    #[tokio::test]
    async fn test_generate_content_without_sentences_fails() {
        let err = HeuristicContentGenerator.generate_content("...").await.unwrap_err();
        assert!(matches!(err, ContentError::Generation(_)));
    }
}
