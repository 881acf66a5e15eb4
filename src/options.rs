use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::data_models::{ContentType, SearchOptions, SearchType};
use crate::error::ValidationError;
use crate::exa::{Contents, HighlightOptions, SearchParams, SimilarParams};

pub const MIN_NUM_RESULTS: u32 = 1;
pub const MAX_NUM_RESULTS: u32 = 50;
pub const DEFAULT_NUM_RESULTS: u32 = 10;
pub const MAX_SIMILAR_RESULTS: u32 = 20;
pub const DEFAULT_SIMILAR_RESULTS: u32 = 8;
pub const DEFAULT_HIGHLIGHTS_PER_URL: u32 = 2;
pub const HIGHLIGHT_SENTENCES: u32 = 2;

pub fn clamp_num_results(value: i64, max: u32) -> u32 {
    value.clamp(MIN_NUM_RESULTS as i64, max as i64) as u32
}

/// `"a.com, b.com ,,"` -> `["a.com", "b.com"]`
pub fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string())
        .collect()
}

/// Accepts either a JSON array of strings or a comma-delimited string.
pub fn domain_list_from_value(value: Option<&Value>) -> Vec<String> {
    let mut domains = match value {
        Some(Value::String(s)) => parse_domain_list(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .flat_map(parse_domain_list)
            .collect(),
        _ => Vec::new(),
    };
    dedup_in_order(&mut domains);
    domains
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|d| seen.insert(d.to_ascii_lowercase()));
}

/// Calendar date `recency_days` before `now`, or `None` when unbounded.
pub fn start_date(recency_days: u32, now: DateTime<Utc>) -> Option<String> {
    if recency_days == 0 {
        return None;
    }
    // windows reaching past the representable range are unbounded
    let start = now.checked_sub_signed(Duration::days(recency_days as i64))?;
    Some(start.format("%Y-%m-%d").to_string())
}

fn normalize_language(raw: &str) -> String {
    let lang = raw.trim().to_ascii_lowercase();
    let well_formed = (2..=8).contains(&lang.len())
        && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && lang.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if well_formed {
        lang
    } else {
        "auto".to_string()
    }
}

fn field<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| body.get(*k)).filter(|v| !v.is_null())
}

/// Integers may arrive as numbers, floats or numeric strings.
fn int_field(body: &Value, keys: &[&str]) -> Option<i64> {
    match field(body, keys)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn str_field<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a str> {
    field(body, keys).and_then(|v| v.as_str())
}

fn bool_field(body: &Value, keys: &[&str]) -> Option<bool> {
    match field(body, keys)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Required non-blank string; the value is returned untrimmed.
fn required_str(body: &Value, keys: &[&str]) -> Option<String> {
    str_field(body, keys)
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

pub fn validate_query(q: &str) -> Result<(), ValidationError> {
    if q.trim().is_empty() {
        return Err(ValidationError::InvalidQuery(
            "Query parameter \"q\" is required".to_string(),
        ));
    }
    Ok(())
}

impl SearchOptions {
    /// Never fails: out-of-range numbers are clamped, malformed values fall
    /// back to defaults.
    pub fn from_json(body: &Value) -> SearchOptions {
        let defaults = SearchOptions::default();
        SearchOptions {
            search_type: str_field(body, &["searchType", "search_type"])
                .and_then(SearchType::parse)
                .unwrap_or(defaults.search_type),
            content_type: str_field(body, &["contentType", "content_type"])
                .and_then(ContentType::parse)
                .unwrap_or(defaults.content_type),
            num_results: int_field(body, &["numResults", "num_results"])
                .map(|n| clamp_num_results(n, MAX_NUM_RESULTS))
                .unwrap_or(defaults.num_results),
            recency_days: int_field(body, &["recencyDays", "recency_days"])
                .map(|d| d.clamp(0, u32::MAX as i64) as u32)
                .unwrap_or(0),
            language: str_field(body, &["language"])
                .map(normalize_language)
                .unwrap_or(defaults.language),
            include_domains: domain_list_from_value(field(
                body,
                &["includeDomains", "include_domains"],
            )),
            exclude_domains: domain_list_from_value(field(
                body,
                &["excludeDomains", "exclude_domains"],
            )),
        }
        .normalize()
    }

    /// Re-applies every bound. Idempotent.
    pub fn normalize(mut self) -> SearchOptions {
        self.num_results = clamp_num_results(self.num_results as i64, MAX_NUM_RESULTS);
        self.language = normalize_language(&self.language);

        let mut include: Vec<String> = self
            .include_domains
            .iter()
            .flat_map(|d| parse_domain_list(d))
            .collect();
        let mut exclude: Vec<String> = self
            .exclude_domains
            .iter()
            .flat_map(|d| parse_domain_list(d))
            .collect();
        dedup_in_order(&mut include);
        dedup_in_order(&mut exclude);

        include.retain(|d| {
            let overlaps = exclude.iter().any(|e| e.eq_ignore_ascii_case(d));
            if overlaps {
                log::warn!("domain {d} is both included and excluded; excluding it");
            }
            !overlaps
        });

        self.include_domains = include;
        self.exclude_domains = exclude;
        self
    }

    /// Translates the effective options into upstream search parameters.
    pub fn search_params(&self, contents: Contents, now: DateTime<Utc>) -> SearchParams {
        SearchParams {
            search_type: match self.search_type {
                SearchType::Auto => None,
                other => Some(other.as_str().to_string()),
            },
            category: self.content_type.category().map(|c| c.to_string()),
            language: (self.language != "auto").then(|| self.language.clone()),
            include_domains: self.include_domains.clone(),
            exclude_domains: self.exclude_domains.clone(),
            start_published_date: start_date(self.recency_days, now),
            num_results: self.num_results,
            contents,
        }
    }

    pub fn similar_params(&self, num_results: u32, contents: Contents) -> SimilarParams {
        SimilarParams {
            num_results: clamp_num_results(num_results as i64, MAX_SIMILAR_RESULTS),
            include_domains: self.include_domains.clone(),
            exclude_domains: self.exclude_domains.clone(),
            exclude_source_domain: true,
            contents,
        }
    }
}

/// Body of the combined `/api/query` operation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub q: String,
    pub options: SearchOptions,
}

impl QueryRequest {
    pub fn from_json(body: &Value) -> Result<QueryRequest, ValidationError> {
        let q = required_str(body, &["q"]).ok_or_else(|| {
            ValidationError::InvalidQuery("Query parameter \"q\" is required".to_string())
        })?;
        Ok(QueryRequest {
            q,
            options: SearchOptions::from_json(body),
        })
    }
}

/// Settings of the search-only operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOnlyOptions {
    pub num_results: u32,
    pub recency_days: u32,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub highlights_per_url: u32,
    pub include_text: bool,
}

impl Default for SearchOnlyOptions {
    fn default() -> Self {
        SearchOnlyOptions {
            num_results: DEFAULT_NUM_RESULTS,
            recency_days: 0,
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
            highlights_per_url: DEFAULT_HIGHLIGHTS_PER_URL,
            include_text: true,
        }
    }
}

impl SearchOnlyOptions {
    pub fn from_json(body: &Value) -> SearchOnlyOptions {
        let filters = SearchOptions::from_json(body);
        SearchOnlyOptions {
            num_results: filters.num_results,
            recency_days: filters.recency_days,
            include_domains: filters.include_domains,
            exclude_domains: filters.exclude_domains,
            highlights_per_url: int_field(body, &["highlightsPerUrl", "highlights_per_url"])
                .map(|h| h.clamp(0, u32::MAX as i64) as u32)
                .unwrap_or(DEFAULT_HIGHLIGHTS_PER_URL),
            include_text: bool_field(body, &["includeText", "include_text"]).unwrap_or(true),
        }
    }

    pub fn search_params(&self, query: &str, now: DateTime<Utc>) -> SearchParams {
        SearchParams {
            search_type: Some(SearchType::Auto.as_str().to_string()),
            category: None,
            language: None,
            include_domains: self.include_domains.clone(),
            exclude_domains: self.exclude_domains.clone(),
            start_published_date: start_date(self.recency_days, now),
            num_results: clamp_num_results(self.num_results as i64, MAX_NUM_RESULTS),
            contents: Contents::Text {
                include_text: self.include_text,
                highlights: Some(HighlightOptions {
                    highlights_per_url: self.highlights_per_url,
                    num_sentences: HIGHLIGHT_SENTENCES,
                    query: query.to_string(),
                }),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOnlyRequest {
    pub q: String,
    pub options: SearchOnlyOptions,
}

impl SearchOnlyRequest {
    pub fn from_json(body: &Value) -> Result<SearchOnlyRequest, ValidationError> {
        let q = required_str(body, &["q"]).ok_or_else(|| {
            ValidationError::InvalidQuery("Query parameter \"q\" is required".to_string())
        })?;
        Ok(SearchOnlyRequest {
            q,
            options: SearchOnlyOptions::from_json(body),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarRequest {
    pub url: String,
    pub q: String,
    pub num_results: u32,
}

impl SimilarRequest {
    pub fn from_json(body: &Value) -> Result<SimilarRequest, ValidationError> {
        let url = required_str(body, &["url"]).ok_or_else(|| {
            ValidationError::InvalidUrl("URL parameter is required".to_string())
        })?;
        Ok(SimilarRequest {
            url: url.trim().to_string(),
            q: str_field(body, &["q"]).unwrap_or_default().to_string(),
            num_results: int_field(body, &["numResults", "num_results"])
                .map(|n| clamp_num_results(n, MAX_SIMILAR_RESULTS))
                .unwrap_or(DEFAULT_SIMILAR_RESULTS),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRequest {
    pub question: String,
}

impl AnswerRequest {
    pub fn from_json(body: &Value) -> Result<AnswerRequest, ValidationError> {
        let question = required_str(body, &["question", "q"]).ok_or_else(|| {
            ValidationError::InvalidQuery("Question parameter is required".to_string())
        })?;
        Ok(AnswerRequest { question })
    }
}
