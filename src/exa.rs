use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::UpstreamError;

/// Upstream response structures
pub mod api {
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct AnswerPayload {
        #[serde(default)]
        pub answer: Option<String>,
        #[serde(default)]
        pub citations: Option<Vec<RawCitation>>,
    }

    #[derive(Debug, Clone, Default, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct RawCitation {
        #[serde(default)]
        pub url: Option<String>,
        #[serde(default)]
        pub title: Option<String>,
    }

    #[derive(Debug, Clone, Default, Deserialize, PartialEq)]
    pub struct ResultsPayload {
        #[serde(default)]
        pub results: Option<Vec<RawResult>>,
    }

    #[derive(Debug, Clone, Default, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct RawResult {
        #[serde(default)]
        pub url: Option<String>,
        #[serde(default)]
        pub title: Option<String>,
        #[serde(default)]
        pub domain: Option<String>,
        #[serde(default)]
        pub score: Option<f64>,
        #[serde(default, alias = "published_date")]
        pub published_date: Option<String>,
        #[serde(default)]
        pub author: Option<String>,
        #[serde(default)]
        pub highlights: Option<Vec<String>>,
        #[serde(default)]
        pub summary: Option<String>,
        #[serde(default)]
        pub text: Option<String>,
        #[serde(default)]
        pub favicon: Option<String>,
    }
}

use api::{AnswerPayload, RawResult, ResultsPayload};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightOptions {
    pub highlights_per_url: u32,
    pub num_sentences: u32,
    pub query: String,
}

/// Which page contents the upstream should attach to each hit.
#[derive(Debug, Clone, PartialEq)]
pub enum Contents {
    Summary,
    Text {
        include_text: bool,
        highlights: Option<HighlightOptions>,
    },
}

impl Contents {
    fn to_json(&self) -> Value {
        match self {
            Contents::Summary => json!({ "summary": true }),
            Contents::Text {
                include_text,
                highlights,
            } => {
                let mut contents = json!({ "text": include_text });
                if let Some(h) = highlights {
                    contents["highlights"] = json!(h);
                }
                contents
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub search_type: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub start_published_date: Option<String>,
    pub num_results: u32,
    pub contents: Contents,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarParams {
    pub num_results: u32,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub exclude_source_domain: bool,
    pub contents: Contents,
}

/// The three operations of the remote search/answer service.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn answer(&self, query: &str) -> Result<AnswerPayload, UpstreamError>;

    async fn search(
        &self,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<RawResult>, UpstreamError>;

    async fn find_similar(
        &self,
        url: &str,
        params: &SimilarParams,
    ) -> Result<Vec<RawResult>, UpstreamError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct ExaClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout_secs: u64,
}

impl ExaClient {
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        let api_key = config.exa_api_key.clone().ok_or_else(|| {
            UpstreamError::ConfigurationError("EXA_API_KEY is required".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| UpstreamError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.exa_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn search_body(query: &str, params: &SearchParams) -> Value {
        let mut body = json!({
            "query": query,
            "numResults": params.num_results,
            "contents": params.contents.to_json(),
        });
        if let Some(t) = &params.search_type {
            body["type"] = json!(t);
        }
        if let Some(c) = &params.category {
            body["category"] = json!(c);
        }
        if let Some(l) = &params.language {
            body["language"] = json!(l);
        }
        if !params.include_domains.is_empty() {
            body["includeDomains"] = json!(params.include_domains);
        }
        if !params.exclude_domains.is_empty() {
            body["excludeDomains"] = json!(params.exclude_domains);
        }
        if let Some(d) = &params.start_published_date {
            body["startPublishedDate"] = json!(d);
        }
        body
    }

    fn similar_body(url: &str, params: &SimilarParams) -> Value {
        let mut body = json!({
            "url": url,
            "numResults": params.num_results,
            "excludeSourceDomain": params.exclude_source_domain,
            "contents": params.contents.to_json(),
        });
        if !params.include_domains.is_empty() {
            body["includeDomains"] = json!(params.include_domains);
        }
        if !params.exclude_domains.is_empty() {
            body["excludeDomains"] = json!(params.exclude_domains);
        }
        body
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, UpstreamError> {
        let url = format!("{}/{}", self.base_url, path);
        let start = Instant::now();
        debug!(url = %url, "sending upstream request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else if e.is_connect() {
                    UpstreamError::ConnectionFailed(e.to_string())
                } else {
                    UpstreamError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        debug!(status = %status, elapsed_ms = start.elapsed().as_millis(), "upstream responded");

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(UpstreamError::RateLimitExceeded {
                retry_after_secs: retry_after,
            });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(UpstreamError::AuthenticationFailed(format!(
                "upstream rejected API key (HTTP {status})"
            )));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::RequestFailed(format!(
                "HTTP {status}: {error_text}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl SearchBackend for ExaClient {
    #[instrument(skip(self), fields(backend = "exa"))]
    async fn answer(&self, query: &str) -> Result<AnswerPayload, UpstreamError> {
        let body = json!({ "query": query, "text": true });
        self.post("answer", &body).await
    }

    #[instrument(skip(self, params), fields(backend = "exa", num_results = params.num_results))]
    async fn search(
        &self,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<RawResult>, UpstreamError> {
        let payload: ResultsPayload = self.post("search", &Self::search_body(query, params)).await?;
        Ok(payload.results.unwrap_or_default())
    }

    #[instrument(skip(self, params), fields(backend = "exa"))]
    async fn find_similar(
        &self,
        url: &str,
        params: &SimilarParams,
    ) -> Result<Vec<RawResult>, UpstreamError> {
        let payload: ResultsPayload = self
            .post("findSimilar", &Self::similar_body(url, params))
            .await?;
        Ok(payload.results.unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "exa"
    }
}
