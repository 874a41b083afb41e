//! Reply post-processing.
//!
//! Turns raw assistant text into what the front end shows:
//! 1. Drop a leading persona self-introduction ("I'm your Business mentor.").
//! 2. Mine book recommendations and hide the ones already on the shelf.
//! 3. Mine cue-introduced resource links.
//!
//! Nothing here fails; text without matches passes through untouched.

use crate::bookshelf::Bookshelf;
use crate::extract::{extract_recommendations, extract_resources, Recommendation, Resource};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

static PERSONA_INTRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:hi|hello|hey)(?:\s+there)?\s*[!,.]\s*)?(?:I'll now focus on helping you with [^.!?\n]*|I(?:'m| am) (?:now )?your [^.!?\n]*?\b(?:assistant|mentor|coach|advisor|guide|expert)\b[^.!?\n]*)[.!?]+\s*",
    )
    .expect("persona intro pattern is valid")
});

/// A reply ready for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessedReply {
    /// Reply text with any persona introduction removed
    pub cleaned_text: String,
    /// Recommended books not yet on the shelf, in order of mention
    pub new_recommendations: Vec<Recommendation>,
    /// Resource links, in order of mention
    pub resources: Vec<Resource>,
}

#[derive(Debug, Default)]
pub struct PostProcessor;

impl PostProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Remove a leading persona self-introduction sentence.
    ///
    /// A reply that is nothing but the introduction is kept as is.
    pub fn strip_persona_intro<'a>(&self, text: &'a str) -> &'a str {
        match PERSONA_INTRO.find(text) {
            Some(m) if m.end() < text.len() => {
                debug!("Stripped persona intro: {:?}", m.as_str().trim());
                &text[m.end()..]
            }
            _ => text,
        }
    }

    pub fn process(&self, raw: &str, shelf: &Bookshelf) -> ProcessedReply {
        let cleaned = self.strip_persona_intro(raw);

        let mut new_recommendations = extract_recommendations(cleaned);
        let mentioned = new_recommendations.len();
        new_recommendations.retain(|rec| !shelf.contains(&rec.title));
        let resources = extract_resources(cleaned);

        debug!(
            "Reply mentions {} books ({} new) and {} resources",
            mentioned,
            new_recommendations.len(),
            resources.len()
        );

        ProcessedReply {
            cleaned_text: cleaned.to_string(),
            new_recommendations,
            resources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SkillDomain;
    use crate::extract::UNKNOWN_AUTHOR;
    use crate::store::{MemoryStore, SharedStore};
    use std::sync::Arc;

    fn empty_shelf() -> Bookshelf {
        let store: SharedStore = Arc::new(MemoryStore::new());
        Bookshelf::load(store).unwrap()
    }

    #[test]
    fn test_strips_persona_intro() {
        let processor = PostProcessor::new();
        let cases = vec![
            "I'm your Business mentor. Read \"Good to Great\".",
            "Hello! I'm your friendly data science assistant. Read \"Good to Great\".",
            "I'll now focus on helping you with Business skills. Read \"Good to Great\".",
            "I am now your Data Science and Business coach! Read \"Good to Great\".",
        ];
        for text in cases {
            assert_eq!(
                processor.strip_persona_intro(text),
                "Read \"Good to Great\".",
                "Should strip intro in: {}",
                text
            );
        }
    }

    #[test]
    fn test_no_intro_passes_through() {
        let processor = PostProcessor::new();
        let text = "Statistics is a great place to start. I'm your biggest fan.";
        assert_eq!(processor.strip_persona_intro(text), text);

        let only_intro = "I'm your Business mentor.";
        assert_eq!(processor.strip_persona_intro(only_intro), only_intro);
    }

    #[test]
    fn test_process_filters_shelved_titles() {
        let processor = PostProcessor::new();
        let mut shelf = empty_shelf();
        shelf.add("Deep Work", "Cal Newport", SkillDomain::Both).unwrap();

        let reply = processor.process(
            "Read \"Deep Work\" by Cal Newport and \"Atomic Habits\".\n\nResources:\n- Coursera https://coursera.org",
            &shelf,
        );

        assert!(reply.cleaned_text.contains("Deep Work"));
        assert_eq!(
            reply.new_recommendations,
            vec![Recommendation::new("Atomic Habits", None)]
        );
        assert_eq!(reply.new_recommendations[0].author, UNKNOWN_AUTHOR);
        assert_eq!(reply.resources.len(), 1);
        assert_eq!(reply.resources[0].title, "Coursera");
    }

    #[test]
    fn test_process_plain_text() {
        let processor = PostProcessor::new();
        let reply = processor.process("Practice SQL every day.", &empty_shelf());
        assert_eq!(reply.cleaned_text, "Practice SQL every day.");
        assert!(reply.new_recommendations.is_empty());
        assert!(reply.resources.is_empty());
    }
}
