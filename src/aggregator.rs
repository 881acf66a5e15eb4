use chrono::Utc;
use std::sync::Arc;

use crate::config::{Config, ContentMode};
use crate::data_models::{
    AggregatedResponse, AnswerResponse, Citation, SearchOnlyResponse, SearchOptions,
    SearchResultItem, SimilarOnlyResponse, SimilarResultItem,
};
use crate::error::{AggregateError, ValidationError};
use crate::exa::api::{AnswerPayload, RawResult};
use crate::exa::{Contents, HighlightOptions, SearchBackend, SearchParams, SimilarParams};
use crate::options::{
    DEFAULT_HIGHLIGHTS_PER_URL, DEFAULT_SIMILAR_RESULTS, HIGHLIGHT_SENTENCES,
    MAX_SIMILAR_RESULTS, SearchOnlyOptions, clamp_num_results, validate_query,
};
use crate::suggestions::{self, SuggestionStrategy, TemplateSuggestions};

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    pub content_mode: ContentMode,
    pub highlights_per_url: u32,
    pub similar_num_results: u32,
    pub related_queries: bool,
    pub sort_by_score: bool,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            content_mode: ContentMode::Summary,
            highlights_per_url: DEFAULT_HIGHLIGHTS_PER_URL,
            similar_num_results: DEFAULT_SIMILAR_RESULTS,
            related_queries: true,
            sort_by_score: true,
        }
    }
}

impl From<&Config> for AggregatorSettings {
    fn from(config: &Config) -> Self {
        Self {
            content_mode: config.content_mode,
            highlights_per_url: config.highlights_per_url,
            similar_num_results: config.similar_num_results,
            related_queries: config.related_queries,
            sort_by_score: config.sort_by_score,
        }
    }
}

pub struct Aggregator {
    backend: Arc<dyn SearchBackend>,
    strategy: Box<dyn SuggestionStrategy>,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(backend: Arc<dyn SearchBackend>, settings: AggregatorSettings) -> Self {
        Self {
            backend,
            strategy: Box::new(TemplateSuggestions::default()),
            settings,
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn SuggestionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn contents(&self, query: &str) -> Contents {
        match self.settings.content_mode {
            ContentMode::Summary => Contents::Summary,
            ContentMode::Text => Contents::Text {
                include_text: true,
                highlights: Some(HighlightOptions {
                    highlights_per_url: self.settings.highlights_per_url,
                    num_sentences: HIGHLIGHT_SENTENCES,
                    query: query.to_string(),
                }),
            },
        }
    }

    /// Answer, web results, similar pages and related queries for `query`.
    ///
    /// Fails only when `query` is blank; every upstream failure degrades the
    /// matching section to its empty form.
    #[tracing::instrument(skip(self, options), fields(backend = self.backend.name()))]
    pub async fn aggregate(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<AggregatedResponse, ValidationError> {
        validate_query(query)?;
        let options = options.normalize();
        let contents = self.contents(query);
        let params = options.search_params(contents.clone(), Utc::now());
        let similar_params =
            options.similar_params(self.settings.similar_num_results, contents);

        // answer shares nothing with search; similar needs the top search hit
        let (answer_branch, search_branch) = futures::future::join(
            self.fetch_answer(query),
            self.fetch_results_and_similar(query, &params, &similar_params),
        )
        .await;

        // no suggestions when neither the answer nor the search call came back
        let responded = answer_branch.is_some() || search_branch.is_some();
        let (answer, citations) = answer_branch.unwrap_or_default();
        let (results, similar) = search_branch.unwrap_or_default();

        let related_queries = if self.settings.related_queries && responded {
            let content = merged_content(answer.as_deref(), &results);
            suggestions::related_queries(self.strategy.as_ref(), query, &content)
        } else {
            Vec::new()
        };

        tracing::debug!(
            citations = citations.len(),
            results = results.len(),
            similar = similar.len(),
            related = related_queries.len(),
            "aggregation complete"
        );

        Ok(AggregatedResponse {
            question: query.to_string(),
            answer,
            citations,
            results,
            similar,
            related_queries,
            options,
        })
    }

    /// `None` when the answer call failed.
    async fn fetch_answer(&self, query: &str) -> Option<(Option<String>, Vec<Citation>)> {
        match self.backend.answer(query).await {
            Ok(payload) => Some(normalize_answer(payload)),
            Err(e) => {
                log::warn!("answer call failed, continuing without answer: {e}");
                None
            }
        }
    }

    /// `None` when the search call failed. A failed similar call only empties
    /// the similar list.
    async fn fetch_results_and_similar(
        &self,
        query: &str,
        params: &SearchParams,
        similar_params: &SimilarParams,
    ) -> Option<(Vec<SearchResultItem>, Vec<SimilarResultItem>)> {
        let results = match self.backend.search(query, params).await {
            Ok(raw) => self.normalize_results(raw, &params.contents),
            Err(e) => {
                log::warn!("search call failed, continuing without results: {e}");
                return None;
            }
        };

        let seed = match results.first() {
            Some(top) if !top.url.is_empty() => top.url.clone(),
            _ => return Some((results, Vec::new())),
        };

        let similar = match self.backend.find_similar(&seed, similar_params).await {
            Ok(raw) => raw
                .into_iter()
                .map(|r| normalize_similar(r, &similar_params.contents))
                .collect(),
            Err(e) => {
                log::warn!("find-similar call for {seed} failed: {e}");
                Vec::new()
            }
        };
        Some((results, similar))
    }

    fn normalize_results(&self, raw: Vec<RawResult>, contents: &Contents) -> Vec<SearchResultItem> {
        let mut results: Vec<SearchResultItem> = raw
            .into_iter()
            .map(|r| normalize_result(r, contents))
            .collect();
        if self.settings.sort_by_score {
            sort_by_score(&mut results);
        }
        results
    }

    /// Search call only, always with text and highlights. Upstream failures
    /// are returned rather than degraded.
    pub async fn search_only(
        &self,
        query: &str,
        options: SearchOnlyOptions,
    ) -> Result<SearchOnlyResponse, AggregateError> {
        validate_query(query)?;
        let params = options.search_params(query, Utc::now());
        let raw = self.backend.search(query, &params).await?;
        let results = self.normalize_results(raw, &params.contents);

        Ok(SearchOnlyResponse {
            query: query.to_string(),
            results,
            include_domains: options.include_domains,
            exclude_domains: options.exclude_domains,
            recency_days: options.recency_days,
        })
    }

    /// Find-similar call only, seeded by a caller-supplied URL.
    pub async fn similar_only(
        &self,
        url: &str,
        query: &str,
        num_results: u32,
    ) -> Result<SimilarOnlyResponse, AggregateError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::InvalidUrl("URL parameter is required".to_string()).into());
        }
        let params = SimilarParams {
            num_results: clamp_num_results(num_results as i64, MAX_SIMILAR_RESULTS),
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
            exclude_source_domain: true,
            contents: Contents::Summary,
        };
        let raw = self.backend.find_similar(url, &params).await?;

        Ok(SimilarOnlyResponse {
            url: url.to_string(),
            query: query.to_string(),
            results: raw
                .into_iter()
                .map(|r| normalize_similar(r, &params.contents))
                .collect(),
        })
    }

    /// Answer call only.
    pub async fn answer_only(&self, question: &str) -> Result<AnswerResponse, AggregateError> {
        if question.trim().is_empty() {
            return Err(ValidationError::InvalidQuery("Question parameter is required".to_string()).into());
        }
        let (answer, citations) = normalize_answer(self.backend.answer(question).await?);
        Ok(AnswerResponse {
            question: question.to_string(),
            answer,
            citations,
        })
    }
}

pub fn normalize_answer(payload: AnswerPayload) -> (Option<String>, Vec<Citation>) {
    let answer = payload.answer.filter(|a| !a.trim().is_empty());
    let citations = payload
        .citations
        .unwrap_or_default()
        .into_iter()
        .map(|c| Citation {
            url: c.url.unwrap_or_default(),
            title: c.title.unwrap_or_default(),
        })
        .collect();
    (answer, citations)
}

/// Host of `url`, or empty when it does not parse.
pub fn domain_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default()
}

fn clean_highlights(highlights: Option<Vec<String>>) -> Vec<String> {
    highlights
        .unwrap_or_default()
        .into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Exactly one of (summary, text) is populated, depending on the mode. Text
/// mode always carries `text`, empty when page text was not requested.
fn content_fields(
    summary: Option<String>,
    text: Option<String>,
    contents: &Contents,
) -> (Option<String>, Option<String>) {
    match contents {
        Contents::Summary => (Some(summary.unwrap_or_default()), None),
        Contents::Text { .. } => (None, Some(text.unwrap_or_default())),
    }
}

fn resolve_domain(domain: Option<String>, url: &str) -> String {
    domain
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| domain_of(url))
}

pub fn normalize_result(raw: RawResult, contents: &Contents) -> SearchResultItem {
    let url = raw.url.unwrap_or_default();
    let (summary, text) = content_fields(raw.summary, raw.text, contents);
    SearchResultItem {
        domain: resolve_domain(raw.domain, &url),
        title: raw.title.unwrap_or_default(),
        score: raw.score.filter(|s| s.is_finite()).unwrap_or(0.0),
        published_date: raw.published_date.unwrap_or_default(),
        author: raw.author.unwrap_or_default(),
        highlights: clean_highlights(raw.highlights),
        summary,
        text,
        favicon: raw.favicon.unwrap_or_default(),
        url,
    }
}

pub fn normalize_similar(raw: RawResult, contents: &Contents) -> SimilarResultItem {
    let url = raw.url.unwrap_or_default();
    let (summary, text) = content_fields(raw.summary, raw.text, contents);
    SimilarResultItem {
        domain: resolve_domain(raw.domain, &url),
        title: raw.title.unwrap_or_default(),
        published_date: raw.published_date.unwrap_or_default(),
        highlights: clean_highlights(raw.highlights),
        summary,
        text,
        favicon: raw.favicon.unwrap_or_default(),
        url,
    }
}

/// Descending by score; equal scores keep upstream order.
pub fn sort_by_score(results: &mut [SearchResultItem]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Text the suggestion strategy gets to look at.
fn merged_content(answer: Option<&str>, results: &[SearchResultItem]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(answer) = answer {
        parts.push(answer);
    }
    for r in results {
        parts.push(&r.title);
        parts.extend(r.highlights.iter().map(String::as_str));
        if let Some(summary) = &r.summary {
            parts.push(summary);
        }
    }
    parts.retain(|p| !p.is_empty());
    parts.join("\n")
}
