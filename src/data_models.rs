use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Auto,
    Keyword,
    Neural,
    Fast,
}

impl SearchType {
    pub fn parse(raw: &str) -> Option<SearchType> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(SearchType::Auto),
            "keyword" => Some(SearchType::Keyword),
            "neural" => Some(SearchType::Neural),
            "fast" => Some(SearchType::Fast),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Auto => "auto",
            SearchType::Keyword => "keyword",
            SearchType::Neural => "neural",
            SearchType::Fast => "fast",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    All,
    News,
    Academic,
    Blogs,
    Technical,
}

impl ContentType {
    pub fn parse(raw: &str) -> Option<ContentType> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(ContentType::All),
            "news" => Some(ContentType::News),
            "academic" => Some(ContentType::Academic),
            "blogs" => Some(ContentType::Blogs),
            "technical" => Some(ContentType::Technical),
            _ => None,
        }
    }

    /// Upstream category filter; `All` means no filter.
    pub fn category(&self) -> Option<&'static str> {
        match self {
            ContentType::All => None,
            ContentType::News => Some("news"),
            ContentType::Academic => Some("academic"),
            ContentType::Blogs => Some("blogs"),
            ContentType::Technical => Some("technical"),
        }
    }
}

/// Effective user settings after normalization. Echoed back in responses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub search_type: SearchType,
    pub content_type: ContentType,
    pub num_results: u32,
    pub recency_days: u32,
    pub language: String,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            search_type: SearchType::Auto,
            content_type: ContentType::All,
            num_results: crate::options::DEFAULT_NUM_RESULTS,
            recency_days: 0,
            language: "auto".to_string(),
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Citation {
    pub url: String,
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub score: f64,
    pub published_date: String,
    pub author: String,
    pub highlights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub favicon: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SimilarResultItem {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub published_date: String,
    pub highlights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub favicon: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResponse {
    pub question: String,
    pub answer: Option<String>,
    pub citations: Vec<Citation>,
    pub results: Vec<SearchResultItem>,
    pub similar: Vec<SimilarResultItem>,
    pub related_queries: Vec<String>,
    pub options: SearchOptions,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchOnlyResponse {
    pub query: String,
    pub results: Vec<SearchResultItem>,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub recency_days: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SimilarOnlyResponse {
    pub url: String,
    pub query: String,
    pub results: Vec<SimilarResultItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnswerResponse {
    pub question: String,
    pub answer: Option<String>,
    pub citations: Vec<Citation>,
}
