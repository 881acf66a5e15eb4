#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use spotlight::error::UpstreamError;
use spotlight::exa::api::{AnswerPayload, RawCitation, RawResult};
use spotlight::exa::{SearchBackend, SearchParams, SimilarParams};

/// Deterministic in-memory backend that records every call it receives.
#[derive(Default)]
pub struct StubBackend {
    pub answer: Option<AnswerPayload>,
    pub results: Option<Vec<RawResult>>,
    pub similar: Option<Vec<RawResult>>,
    pub answer_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub similar_calls: AtomicUsize,
    pub search_params: Mutex<Vec<SearchParams>>,
    pub similar_requests: Mutex<Vec<(String, SimilarParams)>>,
}

impl StubBackend {
    /// Every call fails.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, answer: &str, citations: Vec<(&str, &str)>) -> Self {
        self.answer = Some(AnswerPayload {
            answer: Some(answer.to_string()),
            citations: Some(
                citations
                    .into_iter()
                    .map(|(url, title)| RawCitation {
                        url: Some(url.to_string()),
                        title: Some(title.to_string()),
                    })
                    .collect(),
            ),
        });
        self
    }

    pub fn with_results(mut self, results: Vec<RawResult>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_similar(mut self, similar: Vec<RawResult>) -> Self {
        self.similar = Some(similar);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.answer_calls.load(Ordering::SeqCst)
            + self.search_calls.load(Ordering::SeqCst)
            + self.similar_calls.load(Ordering::SeqCst)
    }

    pub fn last_search_params(&self) -> SearchParams {
        self.search_params
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("search was never called")
    }
}

fn unavailable(call: &str) -> UpstreamError {
    UpstreamError::ConnectionFailed(format!("stub {call} unavailable"))
}

#[async_trait]
impl SearchBackend for StubBackend {
    async fn answer(&self, _query: &str) -> Result<AnswerPayload, UpstreamError> {
        self.answer_calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().ok_or_else(|| unavailable("answer"))
    }

    async fn search(
        &self,
        _query: &str,
        params: &SearchParams,
    ) -> Result<Vec<RawResult>, UpstreamError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_params.lock().unwrap().push(params.clone());
        self.results.clone().ok_or_else(|| unavailable("search"))
    }

    async fn find_similar(
        &self,
        url: &str,
        params: &SimilarParams,
    ) -> Result<Vec<RawResult>, UpstreamError> {
        self.similar_calls.fetch_add(1, Ordering::SeqCst);
        self.similar_requests
            .lock()
            .unwrap()
            .push((url.to_string(), params.clone()));
        self.similar.clone().ok_or_else(|| unavailable("find_similar"))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub fn raw(url: &str, title: &str, score: f64) -> RawResult {
    RawResult {
        url: Some(url.to_string()),
        title: Some(title.to_string()),
        score: Some(score),
        ..Default::default()
    }
}
