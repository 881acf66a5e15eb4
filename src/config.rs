use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    /// Short upstream-generated summary per hit.
    Summary,
    /// Full page text plus query-relevant highlights.
    Text,
}

impl FromStr for ContentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(ContentMode::Summary),
            "text" => Ok(ContentMode::Text),
            other => Err(format!("unknown content mode: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub exa_api_key: Option<String>,
    pub exa_base_url: String,
    pub bind_addr: String,
    pub request_timeout_secs: u64,
    pub content_mode: ContentMode,
    pub highlights_per_url: u32,
    pub similar_num_results: u32,
    pub related_queries: bool,
    pub sort_by_score: bool,
    pub static_dir: String,
    pub log_level: tracing::Level,
    /// Variables that were set but unparsable, reported once logging is up.
    pub invalid_env: Vec<String>,
}

impl Config {
    pub fn from_env() -> Config {
        let mut invalid = Vec::new();
        let request_timeout_secs = parse_env_or("REQUEST_TIMEOUT_SECS", 30, &mut invalid);
        let content_mode = parse_env_or("CONTENT_MODE", ContentMode::Summary, &mut invalid);
        let highlights_per_url = parse_env_or("HIGHLIGHTS_PER_URL", 2, &mut invalid);
        let similar_num_results = parse_env_or("SIMILAR_NUM_RESULTS", 8, &mut invalid);
        let related_queries = parse_env_or("RELATED_QUERIES", true, &mut invalid);
        let sort_by_score = parse_env_or("SORT_BY_SCORE", true, &mut invalid);
        let log_level = parse_env_or("LOG_LEVEL", tracing::Level::INFO, &mut invalid);

        Config {
            exa_api_key: env::var("EXA_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            exa_base_url: get_env_or_default("EXA_BASE_URL", "https://api.exa.ai"),
            bind_addr: get_env_or_default("BIND_ADDR", "0.0.0.0:3000"),
            request_timeout_secs,
            content_mode,
            highlights_per_url,
            similar_num_results,
            related_queries,
            sort_by_score,
            static_dir: get_env_or_default("STATIC_DIR", "static"),
            log_level,
            invalid_env: invalid,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exa_api_key: None,
            exa_base_url: "https://api.exa.ai".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            content_mode: ContentMode::Summary,
            highlights_per_url: 2,
            similar_num_results: 8,
            related_queries: true,
            sort_by_score: true,
            static_dir: "static".to_string(),
            log_level: tracing::Level::INFO,
            invalid_env: Vec::new(),
        }
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unparsable values fall back to the default instead of aborting startup.
/// `CONFIG` is built before any subscriber exists, so they are collected
/// rather than logged here.
fn parse_env_or<T: FromStr>(key: &str, default: T, invalid: &mut Vec<String>) -> T {
    parse_or(key, env::var(key).ok(), default, invalid)
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T, invalid: &mut Vec<String>) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            invalid.push(format!("ignoring invalid value for {key}: {raw:?}"));
            default
        }),
        None => default,
    }
}
