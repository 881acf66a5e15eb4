use std::collections::HashSet;

use crate::analyzer::TextAnalyzer;
use crate::error::SynthesisError;

pub const MAX_RELATED_QUERIES: usize = 5;

/// Suggestions must be strictly longer than this many characters.
pub const MIN_SUGGESTION_CHARS: usize = 10;

pub const FALLBACK_QUERIES: [&str; 5] = [
    "What are the key features to consider?",
    "How do I compare different options?",
    "What are the pros and cons?",
    "Which one is the best choice?",
    "What should I know before deciding?",
];

/// Words left behind by a failed substitution.
const PLACEHOLDER_WORDS: [&str; 3] = ["undefined", "null", "nan"];
const PLACEHOLDER_CHARS: [char; 3] = ['{', '}', '$'];

const COMPARISON_STEMS: [&str; 4] = ["compar", "versu", "altern", "differ"];
const PRICING_STEMS: [&str; 6] = ["price", "pric", "cost", "cheap", "afford", "budget"];
const FEATURE_STEMS: [&str; 4] = ["featur", "specif", "review", "perform"];

pub trait SuggestionStrategy: Send + Sync {
    /// Candidate follow-up queries for `original`, given the merged text of
    /// the answer and search results. Candidates are filtered by the caller.
    fn derive_suggestions(
        &self,
        original: &str,
        content: &str,
    ) -> Result<Vec<String>, SynthesisError>;
}

/// Topic fragment combined with a handful of query templates. Templates that
/// match vocabulary already present in the results are tried first.
pub struct TemplateSuggestions {
    topic_analyzer: TextAnalyzer,
    content_analyzer: TextAnalyzer,
}

impl Default for TemplateSuggestions {
    fn default() -> Self {
        Self {
            topic_analyzer: TextAnalyzer::topic_analyzer(),
            content_analyzer: TextAnalyzer::content_analyzer(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Vocabulary {
    pub comparison: bool,
    pub pricing: bool,
    pub features: bool,
}

impl TemplateSuggestions {
    pub fn topic(&self, query: &str) -> Result<String, SynthesisError> {
        let topic = self
            .topic_analyzer
            .analyze(query.to_string())
            .iter()
            .map(|t| t.term.as_str())
            .collect::<Vec<&str>>()
            .join(" ");
        if topic.is_empty() {
            return Err(SynthesisError::EmptyTopic(query.to_string()));
        }
        Ok(topic)
    }

    pub fn vocabulary(&self, content: &str) -> Vocabulary {
        let stems: HashSet<String> = self
            .content_analyzer
            .analyze(content.to_string())
            .into_iter()
            .map(|t| t.term)
            .collect();
        let mentions = |prefixes: &[&str]| {
            stems
                .iter()
                .any(|s| prefixes.iter().any(|p| s.starts_with(p)))
        };
        Vocabulary {
            comparison: mentions(&COMPARISON_STEMS),
            pricing: mentions(&PRICING_STEMS),
            features: mentions(&FEATURE_STEMS),
        }
    }
}

impl SuggestionStrategy for TemplateSuggestions {
    fn derive_suggestions(
        &self,
        original: &str,
        content: &str,
    ) -> Result<Vec<String>, SynthesisError> {
        let topic = self.topic(original)?;
        let vocabulary = self.vocabulary(content);

        let mut candidates = Vec::with_capacity(8);
        if vocabulary.comparison {
            candidates.push(format!("{topic} vs alternatives: which is better?"));
        }
        if vocabulary.pricing {
            candidates.push(format!("Best value {topic} for the money"));
        }
        if vocabulary.features {
            candidates.push(format!("Key features to look for in {topic}"));
        }
        candidates.extend([
            format!("Compare the top {topic} options"),
            format!("How to choose {topic}"),
            format!("What are the benefits of {topic}?"),
            format!("How much does {topic} cost?"),
            format!("Common mistakes to avoid with {topic}"),
        ]);
        Ok(candidates)
    }
}

/// Used when a strategy fails: no topic extraction, just the raw query.
pub fn simple_suggestions(original: &str) -> Vec<String> {
    let query = original.trim();
    vec![
        format!("Learn more about {query}"),
        format!("{query} explained"),
        format!("Latest news on {query}"),
    ]
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Artifact words and characters count only when the user did not type them.
fn has_placeholder_artifact(original: &str, candidate: &str) -> bool {
    let typed: HashSet<String> = words(original).collect();
    PLACEHOLDER_CHARS
        .iter()
        .any(|c| candidate.contains(*c) && !original.contains(*c))
        || words(candidate)
            .any(|w| PLACEHOLDER_WORDS.contains(&w.as_str()) && !typed.contains(&w))
}

pub fn is_acceptable(original: &str, candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.chars().count() > MIN_SUGGESTION_CHARS
        && !candidate.eq_ignore_ascii_case(original.trim())
        && !has_placeholder_artifact(original, candidate)
}

/// Filters candidates, caps them, and pads from [`FALLBACK_QUERIES`].
pub fn finalize(original: &str, candidates: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(MAX_RELATED_QUERIES);

    let pool = candidates
        .into_iter()
        .chain(FALLBACK_QUERIES.iter().map(|q| q.to_string()));
    for candidate in pool {
        if out.len() == MAX_RELATED_QUERIES {
            break;
        }
        let candidate = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
        if is_acceptable(original, &candidate) && seen.insert(candidate.to_lowercase()) {
            out.push(candidate);
        }
    }
    out
}

/// Best-effort related queries; never fails.
pub fn related_queries(
    strategy: &dyn SuggestionStrategy,
    original: &str,
    content: &str,
) -> Vec<String> {
    let candidates = match strategy.derive_suggestions(original, content) {
        Ok(candidates) if !candidates.is_empty() => candidates,
        Ok(_) => {
            log::warn!("suggestion strategy returned nothing for {original:?}");
            simple_suggestions(original)
        }
        Err(e) => {
            log::warn!("suggestion strategy failed for {original:?}: {e}");
            simple_suggestions(original)
        }
    };
    finalize(original, candidates)
}
