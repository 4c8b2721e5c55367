use std::path::PathBuf;
use std::time::Duration;

pub const START_URL: &str = "https://pokemondb.net/pokedex/all";
pub const RAW_CSV_PATH: &str = "data/saida.csv";
pub const CLEAN_CSV_PATH: &str = "data/pokedex_clean.csv";
const DB_PATH: &str = "data/pokedex.sqlite";
const DB_PATH_ENV: &str = "POKEDEX_DB";

pub const CONCURRENCY: usize = 8;
pub const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 1000;
const MIN_DELAY_MS: u64 = 250;
const MAX_DELAY_MS: u64 = 1000;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("pokedex_etl/", env!("CARGO_PKG_VERSION"));

/// Database path, overridable with `POKEDEX_DB`.
pub fn db_path() -> PathBuf {
    std::env::var(DB_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DB_PATH))
}

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub start_url: String,
    pub concurrency: usize,
    pub max_retries: u32,
    /// First retry wait; doubles on each further attempt.
    pub base_backoff: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub limit: Option<usize>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        CrawlSettings {
            start_url: START_URL.to_string(),
            concurrency: CONCURRENCY,
            max_retries: MAX_RETRIES,
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
            min_delay: Duration::from_millis(MIN_DELAY_MS),
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
            limit: None,
        }
    }
}

impl CrawlSettings {
    /// Random politeness delay within `[min_delay, max_delay]`.
    pub fn jitter(&self) -> Duration {
        let lo = self.min_delay.as_millis() as u64;
        let hi = self.max_delay.as_millis() as u64;
        if hi <= lo {
            return self.min_delay;
        }
        Duration::from_millis(fastrand::u64(lo..=hi))
    }

    /// Wait before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.pow(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_in_range() {
        let s = CrawlSettings::default();
        for _ in 0..100 {
            let d = s.jitter();
            assert!(d >= s.min_delay && d <= s.max_delay);
        }
    }

    #[test]
    fn backoff_doubles() {
        let s = CrawlSettings::default();
        assert_eq!(s.backoff(0), Duration::from_millis(BASE_BACKOFF_MS));
        assert_eq!(s.backoff(1), Duration::from_millis(BASE_BACKOFF_MS * 2));
        assert_eq!(s.backoff(2), Duration::from_millis(BASE_BACKOFF_MS * 4));
    }

    #[test]
    fn jitter_with_collapsed_range() {
        let s = CrawlSettings {
            min_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        };
        assert_eq!(s.jitter(), Duration::from_millis(5));
    }
}
