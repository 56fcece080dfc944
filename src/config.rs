use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.adzerk.net/v1";
const DEFAULT_ADVERTISER_ID: i64 = 20329; // self serve
const DEFAULT_PRIORITY_ID: i64 = 21520;
const DEFAULT_AD_TYPE_ID: i64 = 4; // leaderboard
const DEFAULT_FREQ_CAP: i64 = 1000;
const DEFAULT_FRONT_PAGE_KEYWORD: &str = "reddit.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_MS: u64 = 500;
const DEFAULT_RETRY_MAX_MS: u64 = 8_000;

/// Ad server account settings plus the constants written into every entity.
#[derive(Clone, Debug)]
pub struct PlatformSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub advertiser_id: i64,
    pub priority_id: i64,
    pub ad_type_id: i64,
    pub freq_cap: i64,
    /// Keyword a flight targets when its campaign has no community override.
    pub front_page_keyword: String,
    pub timeout: Duration,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ADZERK_API_KEY").ok(),
            base_url: DEFAULT_BASE_URL.to_string(),
            advertiser_id: DEFAULT_ADVERTISER_ID,
            priority_id: DEFAULT_PRIORITY_ID,
            ad_type_id: DEFAULT_AD_TYPE_ID,
            freq_cap: DEFAULT_FREQ_CAP,
            front_page_keyword: DEFAULT_FRONT_PAGE_KEYWORD.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PlatformSettings {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(base) = std::env::var("ADZERK_BASE_URL") {
            cfg.base_url = base;
        }
        if let Some(v) = env_parse::<i64>("ADZERK_ADVERTISER_ID") {
            cfg.advertiser_id = v;
        }
        if let Some(v) = env_parse::<i64>("ADZERK_PRIORITY_ID") {
            cfg.priority_id = v;
        }
        if let Some(v) = env_parse::<i64>("ADZERK_AD_TYPE_ID") {
            cfg.ad_type_id = v;
        }
        if let Some(v) = env_parse::<i64>("ADZERK_FREQ_CAP") {
            cfg.freq_cap = v;
        }
        if let Ok(kw) = std::env::var("ADZERK_FRONT_PAGE_KEYWORD") {
            if !kw.trim().is_empty() {
                cfg.front_page_keyword = kw;
            }
        }
        if let Some(secs) = env_parse::<u64>("ADZERK_TIMEOUT_SECS") {
            cfg.timeout = Duration::from_secs(secs);
        }
        cfg
    }
}

/// Bounded exponential backoff for transient ad server failures.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_MS),
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        let mut policy = Self::default();
        if let Some(n) = env_parse::<u32>("ADSYNC_RETRY_ATTEMPTS") {
            policy.max_attempts = n.max(1);
        }
        if let Some(ms) = env_parse::<u64>("ADSYNC_RETRY_BASE_MS") {
            policy.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("ADSYNC_RETRY_MAX_MS") {
            policy.max_delay = Duration::from_millis(ms);
        }
        policy
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
