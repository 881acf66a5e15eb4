use html2text::from_read;
use porter_stemmer::stem;
use std::collections::HashSet;
use std::sync::OnceLock;

static STOP_WORDS: OnceLock<HashSet<String>> = OnceLock::new();
static QUESTION_WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();

fn get_stop_words() -> &'static HashSet<String> {
    STOP_WORDS.get_or_init(|| {
        stop_words::get(stop_words::LANGUAGE::English)
            .into_iter()
            .map(|x| x.to_string())
            .collect()
    })
}

fn get_question_words() -> &'static HashSet<&'static str> {
    QUESTION_WORDS.get_or_init(|| {
        HashSet::from([
            // Interrogatives
            "what", "how", "why", "when", "where", "which", "who", "whom", "whose",
            // Auxiliaries and modals
            "is", "are", "was", "were", "be", "been", "am", "do", "does", "did", "can",
            "could", "should", "would", "will", "shall", "may", "might", "must", "has",
            "have", "had",
            // Articles and fillers that dangle once the question words are gone
            "the", "a", "an", "i", "me", "my", "we", "you", "it", "there", "some", "any",
        ])
    })
}

/// A character filter receives the original text and can transform it by adding,
/// removing, or changing characters before tokenization.
pub trait CharacterFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// Upstream highlights and summaries sometimes carry markup. Renders it down
/// to plain text; plain input passes through untouched.
#[derive(Debug, Default)]
pub struct MarkupStripFilter;

impl CharacterFilter for MarkupStripFilter {
    fn filter(&self, text: String) -> String {
        if !text.contains('<') {
            return text;
        }
        match from_read(text.as_bytes(), 200) {
            Ok(plain) => plain,
            Err(e) => {
                log::debug!("markup strip failed, keeping raw text: {e}");
                text
            }
        }
    }
}

/// A tokenizer breaks text into individual tokens (usually words).
/// For instance, a whitespace tokenizer converts "Quick brown fox!" into [Quick, brown, fox!].
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: String) -> Vec<String>;
}

pub struct WhiteSpaceTokenizer;

impl Tokenizer for WhiteSpaceTokenizer {
    fn tokenize(&self, text: String) -> Vec<String> {
        text.split_whitespace()
            .map(|w| w.to_string())
            .collect::<Vec<String>>()
    }
}

/// Rewrites or drops tokens. Positions of surviving tokens are preserved.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken>;
}

pub struct LowerCaseTokenFilter;

impl TokenFilter for LowerCaseTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .map(|mut t| {
                t.term = t.term.to_lowercase();
                t
            })
            .collect()
    }
}

/// Drops English stop words. Expects lowercased tokens.
pub struct StopWordTokenFilter;

impl TokenFilter for StopWordTokenFilter {
    fn filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        let stop_words = get_stop_words();
        tokens.retain(|w| !stop_words.contains(&w.term));
        tokens
    }
}

/// Drops interrogative and auxiliary words, comparing case-insensitively
/// but leaving the surviving tokens' casing alone.
pub struct QuestionWordFilter;

impl TokenFilter for QuestionWordFilter {
    fn filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        let question_words = get_question_words();
        tokens.retain(|w| !question_words.contains(w.term.to_lowercase().as_str()));
        tokens
    }
}

pub struct PorterStemmerTokenFilter;

impl TokenFilter for PorterStemmerTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .map(|mut w| {
                w.term = stem(&w.term);
                w
            })
            .collect::<Vec<TextToken>>()
    }
}

const SENTENCE_PUNCTUATION: [char; 11] = ['?', '.', ',', '!', ';', ':', '"', '\'', '(', ')', '`'];

/// Trims leading and trailing punctuation and drops tokens shorter than `min_length`.
pub struct PunctuationStripFilter {
    min_length: usize,
    sentence_only: bool,
}

impl PunctuationStripFilter {
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length,
            sentence_only: false,
        }
    }

    /// Only trims sentence punctuation, so names like `C++` or `C#` survive.
    pub fn sentence(min_length: usize) -> Self {
        Self {
            min_length,
            sentence_only: true,
        }
    }

    fn is_trimmed(&self, c: char) -> bool {
        if self.sentence_only {
            SENTENCE_PUNCTUATION.contains(&c)
        } else {
            !c.is_alphanumeric()
        }
    }
}

impl Default for PunctuationStripFilter {
    fn default() -> Self {
        Self::new(2)
    }
}

impl TokenFilter for PunctuationStripFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .filter_map(|mut token| {
                let trimmed: String = token
                    .term
                    .trim_matches(|c: char| self.is_trimmed(c))
                    .to_string();

                if trimmed.chars().count() >= self.min_length
                    && trimmed.chars().any(|c| c.is_alphanumeric())
                {
                    token.term = trimmed;
                    Some(token)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Pure text analysis pipeline - no async, no I/O, just text transformations
pub struct TextAnalyzer {
    char_filters: Vec<Box<dyn CharacterFilter>>,
    tokenizer: Box<dyn Tokenizer>,
    token_filters: Vec<Box<dyn TokenFilter>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextToken {
    pub term: String,
    pub pos: usize,
}

impl std::ops::Deref for TextToken {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.term
    }
}

impl TextAnalyzer {
    pub fn new(
        char_filters: Vec<Box<dyn CharacterFilter>>,
        tokenizer: Box<dyn Tokenizer>,
        token_filters: Vec<Box<dyn TokenFilter>>,
    ) -> Self {
        Self {
            char_filters,
            tokenizer,
            token_filters,
        }
    }

    /// Stemmed, stop-word free terms of upstream page content.
    pub fn content_analyzer() -> Self {
        Self::new(
            vec![Box::new(MarkupStripFilter)],
            Box::new(WhiteSpaceTokenizer),
            vec![
                Box::new(PunctuationStripFilter::default()),
                Box::new(LowerCaseTokenFilter),
                Box::new(StopWordTokenFilter),
                Box::new(PorterStemmerTokenFilter),
            ],
        )
    }

    /// The subject of a user query: question words removed, casing kept.
    pub fn topic_analyzer() -> Self {
        Self::new(
            vec![],
            Box::new(WhiteSpaceTokenizer),
            vec![
                Box::new(PunctuationStripFilter::sentence(1)),
                Box::new(QuestionWordFilter),
            ],
        )
    }

    pub fn char_filter(&self, mut content: String) -> String {
        for filter in self.char_filters.iter() {
            content = filter.filter(content);
        }
        content
    }

    pub fn tokenize(&self, content: String) -> Vec<TextToken> {
        self.tokenizer
            .tokenize(content)
            .into_iter()
            .enumerate()
            .map(|(pos, term)| TextToken { term, pos })
            .collect()
    }

    pub fn token_filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        for filter in self.token_filters.iter() {
            tokens = filter.filter(tokens);
        }
        tokens
    }

    /// Character filters, then tokenizer, then token filters in order.
    pub fn analyze(&self, raw_content: String) -> Vec<TextToken> {
        let content = self.char_filter(raw_content);
        let tokens = self.tokenize(content);
        self.token_filter(tokens)
    }
}
