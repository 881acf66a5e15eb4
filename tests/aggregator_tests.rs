use chrono::{Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use spotlight::aggregator::{Aggregator, AggregatorSettings};
use spotlight::config::ContentMode;
use spotlight::data_models::{Citation, ContentType, SearchOptions, SearchType};
use spotlight::error::{AggregateError, SynthesisError, UpstreamError, ValidationError};
use spotlight::exa::Contents;
use spotlight::options::SearchOnlyOptions;
use spotlight::suggestions::{FALLBACK_QUERIES, MAX_RELATED_QUERIES, SuggestionStrategy};

mod common;
use common::{StubBackend, raw};

fn aggregator(stub: &Arc<StubBackend>) -> Aggregator {
    Aggregator::new(stub.clone(), AggregatorSettings::default())
}

fn scores(response: &spotlight::data_models::AggregatedResponse) -> Vec<f64> {
    response.results.iter().map(|r| r.score).collect()
}

#[tokio::test]
async fn test_all_upstream_calls_fail() {
    let stub = Arc::new(StubBackend::failing());
    let response = aggregator(&stub)
        .aggregate("rust web frameworks", SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(response.question, "rust web frameworks");
    assert_eq!(response.answer, None);
    assert!(response.citations.is_empty());
    assert!(response.results.is_empty());
    assert!(response.similar.is_empty());
    assert!(response.related_queries.is_empty());
    // search failed, so no seed for similar
    assert_eq!(stub.similar_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_query_makes_no_remote_calls() {
    let stub = Arc::new(StubBackend::failing());
    let agg = aggregator(&stub);

    for q in ["", "   ", "\n\t"] {
        let err = agg.aggregate(q, SearchOptions::default()).await.unwrap_err();
        assert!(matches!(err, ValidationError::InvalidQuery(_)));
    }
    assert_eq!(stub.total_calls(), 0);
}

#[tokio::test]
async fn test_budget_laptops_scenario() {
    let stub = Arc::new(StubBackend::failing().with_results(vec![
        raw("https://a.com/1", "First", 0.9),
        raw("https://b.com/2", "Second", 0.5),
        raw("https://c.com/3", "Third", 0.7),
    ]));
    let response = aggregator(&stub)
        .aggregate("best budget laptops", SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(scores(&response), vec![0.9, 0.7, 0.5]);
    assert_eq!(response.answer, None);
    assert!(response.citations.is_empty());
    assert_eq!(response.related_queries.len(), MAX_RELATED_QUERIES);
}

#[tokio::test]
async fn test_equal_scores_keep_upstream_order() {
    let stub = Arc::new(StubBackend::failing().with_results(vec![
        raw("https://a.com", "a", 0.5),
        raw("https://b.com", "b", 0.8),
        raw("https://c.com", "c", 0.5),
    ]));
    let response = aggregator(&stub)
        .aggregate("tie breaking", SearchOptions::default())
        .await
        .unwrap();
    let urls: Vec<&str> = response.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["https://b.com", "https://a.com", "https://c.com"]);
}

#[tokio::test]
async fn test_sorting_can_be_disabled() {
    let stub = Arc::new(StubBackend::failing().with_results(vec![
        raw("https://a.com", "a", 0.1),
        raw("https://b.com", "b", 0.9),
    ]));
    let settings = AggregatorSettings {
        sort_by_score: false,
        ..AggregatorSettings::default()
    };
    let response = Aggregator::new(stub.clone(), settings)
        .aggregate("upstream order", SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(scores(&response), vec![0.1, 0.9]);
}

#[tokio::test]
async fn test_answer_and_citations_survive_search_failure() {
    let stub = Arc::new(
        StubBackend::failing()
            .with_answer("Rust is a systems language.", vec![("https://rust-lang.org", "Rust")]),
    );
    let response = aggregator(&stub)
        .aggregate("what is rust", SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(response.answer.as_deref(), Some("Rust is a systems language."));
    assert_eq!(
        response.citations,
        vec![Citation {
            url: "https://rust-lang.org".into(),
            title: "Rust".into()
        }]
    );
    assert!(response.results.is_empty());
    // answer came back, so suggestions are still offered
    assert_eq!(response.related_queries.len(), MAX_RELATED_QUERIES);
}

#[tokio::test]
async fn test_similar_skipped_without_search_results() {
    let stub = Arc::new(StubBackend::failing().with_results(vec![]));
    let response = aggregator(&stub)
        .aggregate("nothing matches this", SearchOptions::default())
        .await
        .unwrap();

    assert!(response.results.is_empty());
    assert!(response.similar.is_empty());
    assert_eq!(stub.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(stub.similar_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_similar_seeded_with_top_ranked_result() {
    let stub = Arc::new(
        StubBackend::failing()
            .with_results(vec![
                raw("https://low.com/page", "low", 0.2),
                raw("https://top.com/page", "top", 0.95),
            ])
            .with_similar(vec![raw("https://other.org/x", "x", 0.0)]),
    );
    let options = SearchOptions {
        include_domains: vec!["top.com".into(), "other.org".into()],
        exclude_domains: vec!["spam.net".into()],
        ..SearchOptions::default()
    };
    let response = aggregator(&stub)
        .aggregate("seed selection", options)
        .await
        .unwrap();

    let requests = stub.similar_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (seed, params) = &requests[0];
    assert_eq!(seed, "https://top.com/page");
    assert!(params.exclude_source_domain);
    assert_eq!(params.num_results, 8);
    assert_eq!(params.include_domains, vec!["top.com", "other.org"]);
    assert_eq!(params.exclude_domains, vec!["spam.net"]);

    assert_eq!(response.similar.len(), 1);
    assert_eq!(response.similar[0].domain, "other.org");
}

#[tokio::test]
async fn test_similar_failure_keeps_results() {
    let stub = Arc::new(
        StubBackend::failing().with_results(vec![raw("https://a.com", "a", 0.3)]),
    );
    let response = aggregator(&stub)
        .aggregate("similar goes down", SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(response.results.len(), 1);
    assert!(response.similar.is_empty());
    assert_eq!(stub.similar_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_recency_filter() {
    let stub = Arc::new(StubBackend::failing().with_results(vec![]));
    let agg = aggregator(&stub);

    agg.aggregate("no recency", SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(stub.last_search_params().start_published_date, None);

    let options = SearchOptions {
        recency_days: 7,
        ..SearchOptions::default()
    };
    agg.aggregate("last week", options).await.unwrap();
    let expected = (Utc::now() - Duration::days(7)).format("%Y-%m-%d").to_string();
    assert_eq!(
        stub.last_search_params().start_published_date.as_deref(),
        Some(expected.as_str())
    );
}

#[tokio::test]
async fn test_options_translated_and_echoed() {
    let stub = Arc::new(StubBackend::failing().with_results(vec![]));
    let options = SearchOptions {
        search_type: SearchType::Neural,
        content_type: ContentType::Technical,
        num_results: 0,
        language: "DE".into(),
        include_domains: vec![" a.com, b.com ,,".into()],
        exclude_domains: vec!["b.com".into()],
        ..SearchOptions::default()
    };
    let response = aggregator(&stub)
        .aggregate("translated options", options)
        .await
        .unwrap();

    let params = stub.last_search_params();
    assert_eq!(params.search_type.as_deref(), Some("neural"));
    assert_eq!(params.category.as_deref(), Some("technical"));
    assert_eq!(params.language.as_deref(), Some("de"));
    assert_eq!(params.num_results, 1);
    assert_eq!(params.include_domains, vec!["a.com"]);
    assert_eq!(params.exclude_domains, vec!["b.com"]);
    assert_eq!(params.contents, Contents::Summary);

    assert_eq!(response.options.num_results, 1);
    assert_eq!(response.options.include_domains, vec!["a.com"]);
    assert_eq!(response.options.language, "de");
}

#[tokio::test]
async fn test_text_mode_populates_text_and_highlights() {
    let mut hit = raw("https://docs.rs/tokio", "tokio", 0.8);
    hit.text = Some("full page text".into());
    hit.summary = Some("not requested".into());
    hit.highlights = Some(vec!["an excerpt".into()]);
    let stub = Arc::new(StubBackend::failing().with_results(vec![hit]));

    let settings = AggregatorSettings {
        content_mode: ContentMode::Text,
        ..AggregatorSettings::default()
    };
    let response = Aggregator::new(stub.clone(), settings)
        .aggregate("async runtime", SearchOptions::default())
        .await
        .unwrap();

    let item = &response.results[0];
    assert_eq!(item.text.as_deref(), Some("full page text"));
    assert_eq!(item.summary, None);
    assert_eq!(item.highlights, vec!["an excerpt"]);
    assert_eq!(item.domain, "docs.rs");

    match stub.last_search_params().contents {
        Contents::Text {
            include_text,
            highlights: Some(h),
        } => {
            assert!(include_text);
            assert_eq!(h.highlights_per_url, 2);
            assert_eq!(h.query, "async runtime");
        }
        other => panic!("unexpected contents {other:?}"),
    }
}

#[tokio::test]
async fn test_related_queries_never_echo_or_placeholder() {
    let stub = Arc::new(
        StubBackend::failing()
            .with_answer("Compare prices and features.", vec![])
            .with_results(vec![raw("https://a.com", "Laptop review roundup", 0.4)]),
    );
    let agg = aggregator(&stub);

    for q in ["best budget laptops", "How do I choose a laptop?", "what is it", "laptops"] {
        let response = agg.aggregate(q, SearchOptions::default()).await.unwrap();
        assert_eq!(response.related_queries.len(), MAX_RELATED_QUERIES, "query {q:?}");
        for related in &response.related_queries {
            assert_ne!(related, q);
            assert!(related.chars().count() > 10, "{related:?}");
            assert!(!related.contains("undefined"), "{related:?}");
        }
    }
}

#[tokio::test]
async fn test_related_queries_can_be_disabled() {
    let stub = Arc::new(StubBackend::failing().with_results(vec![raw("https://a.com", "a", 0.1)]));
    let settings = AggregatorSettings {
        related_queries: false,
        ..AggregatorSettings::default()
    };
    let response = Aggregator::new(stub.clone(), settings)
        .aggregate("no suggestions please", SearchOptions::default())
        .await
        .unwrap();
    assert!(response.related_queries.is_empty());
}

struct BrokenStrategy;

impl SuggestionStrategy for BrokenStrategy {
    fn derive_suggestions(&self, _: &str, _: &str) -> Result<Vec<String>, SynthesisError> {
        Err(SynthesisError::NoCandidates)
    }
}

#[tokio::test]
async fn test_broken_strategy_falls_back() {
    let stub = Arc::new(StubBackend::failing().with_results(vec![]));
    let response = aggregator(&stub)
        .with_strategy(Box::new(BrokenStrategy))
        .aggregate("rust", SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(
        response.related_queries,
        vec![
            "Learn more about rust".to_string(),
            "rust explained".to_string(),
            "Latest news on rust".to_string(),
            FALLBACK_QUERIES[0].to_string(),
            FALLBACK_QUERIES[1].to_string(),
        ]
    );
}

#[tokio::test]
async fn test_same_input_same_output() {
    let stub = Arc::new(
        StubBackend::failing()
            .with_answer("answer", vec![("https://a.com", "A")])
            .with_results(vec![raw("https://a.com", "a", 0.4), raw("https://b.com", "b", 0.6)])
            .with_similar(vec![raw("https://c.com", "c", 0.0)]),
    );
    let agg = aggregator(&stub);
    let options = SearchOptions {
        recency_days: 30,
        ..SearchOptions::default()
    };

    let first = agg.aggregate("repeatable", options.clone()).await.unwrap();
    let second = agg.aggregate("repeatable", options).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_search_only_surfaces_upstream_errors() {
    let stub = Arc::new(StubBackend::failing());
    let err = aggregator(&stub)
        .search_only("rust", SearchOnlyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregateError::Upstream(UpstreamError::ConnectionFailed(_))
    ));
    assert_eq!(stub.answer_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_search_only_uses_text_and_highlights() {
    let stub = Arc::new(StubBackend::failing().with_results(vec![
        raw("https://a.com", "a", 0.1),
        raw("https://b.com", "b", 0.2),
    ]));
    let options = SearchOnlyOptions {
        include_domains: vec!["a.com".into()],
        recency_days: 3,
        ..SearchOnlyOptions::default()
    };
    let response = aggregator(&stub)
        .search_only("rust", options)
        .await
        .unwrap();

    assert_eq!(response.query, "rust");
    assert_eq!(response.include_domains, vec!["a.com"]);
    assert_eq!(response.recency_days, 3);
    assert_eq!(response.results[0].url, "https://b.com");
    assert_eq!(response.results[0].text.as_deref(), Some(""));

    let params = stub.last_search_params();
    assert_eq!(params.search_type.as_deref(), Some("auto"));
    assert!(params.start_published_date.is_some());
    assert!(matches!(params.contents, Contents::Text { include_text: true, .. }));
    assert_eq!(stub.similar_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_search_only_without_page_text_keeps_empty_text() {
    let mut hit = raw("https://a.com", "a", 0.5);
    hit.text = Some("not requested".into());
    let stub = Arc::new(StubBackend::failing().with_results(vec![hit, raw("https://b.com", "b", 0.1)]));
    let options = SearchOnlyOptions {
        include_text: false,
        ..SearchOnlyOptions::default()
    };
    let response = aggregator(&stub)
        .search_only("rust", options)
        .await
        .unwrap();

    assert!(matches!(
        stub.last_search_params().contents,
        Contents::Text { include_text: false, .. }
    ));
    for item in &response.results {
        assert_eq!(item.summary, None);
        assert!(item.text.is_some(), "{item:?}");
    }
    assert_eq!(response.results[1].text.as_deref(), Some(""));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["results"][1]["text"], "");
}

#[tokio::test]
async fn test_similar_only() {
    let stub = Arc::new(StubBackend::failing().with_similar(vec![raw("https://x.org/a", "x", 0.0)]));
    let agg = aggregator(&stub);

    let err = agg.similar_only("  ", "", 8).await.unwrap_err();
    assert!(matches!(
        err,
        AggregateError::Validation(ValidationError::InvalidUrl(_))
    ));
    assert_eq!(stub.total_calls(), 0);

    let response = agg
        .similar_only("https://seed.com/post", "seed", 100)
        .await
        .unwrap();
    assert_eq!(response.url, "https://seed.com/post");
    assert_eq!(response.query, "seed");
    assert_eq!(response.results[0].summary.as_deref(), Some(""));

    let requests = stub.similar_requests.lock().unwrap();
    assert_eq!(requests[0].1.num_results, 20);
    assert!(requests[0].1.exclude_source_domain);
}

#[tokio::test]
async fn test_answer_only() {
    let stub = Arc::new(StubBackend::failing().with_answer("42", vec![("https://h2g2.com", "")]));
    let response = aggregator(&stub).answer_only("meaning of life").await.unwrap();
    assert_eq!(response.answer.as_deref(), Some("42"));
    assert_eq!(response.citations.len(), 1);
    assert_eq!(stub.search_calls.load(Ordering::SeqCst), 0);

    let failing = Arc::new(StubBackend::failing());
    assert!(matches!(
        aggregator(&failing).answer_only("anything").await,
        Err(AggregateError::Upstream(_))
    ));
}
