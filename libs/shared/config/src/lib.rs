use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Longest donation interval accepted from configuration.
pub const MAX_DONATION_INTERVAL_DAYS: i64 = 3650;

/// A fallback score step that keeps every score inside [0, 1].
pub fn is_valid_score_step(step: f64) -> bool {
    step.is_finite() && step > 0.0 && step <= 1.0
}

pub fn is_valid_donation_interval(days: i64) -> bool {
    (0..=MAX_DONATION_INTERVAL_DAYS).contains(&days)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub ranking_service_url: Option<String>,
    pub ranking_timeout_ms: u64,
    pub ranking_health_timeout_ms: u64,
    pub ranking_result_cap: usize,
    pub fallback_score_step: f64,
    pub donation_interval_days: i64,
    pub default_max_daily_slots: usize,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            ranking_service_url: None,
            ranking_timeout_ms: 5000,
            ranking_health_timeout_ms: 2000,
            ranking_result_cap: 10,
            fallback_score_step: 0.05,
            donation_interval_days: 56,
            default_max_daily_slots: 20,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            ranking_service_url: match env::var("RANKING_SERVICE_URL") {
                Ok(url) if !url.trim().is_empty() => Some(url.trim().trim_end_matches('/').to_string()),
                _ => {
                    warn!("RANKING_SERVICE_URL not set, donor ranking will use the local fallback");
                    None
                }
            },
            ranking_timeout_ms: numeric_var("RANKING_TIMEOUT_MS", defaults.ranking_timeout_ms),
            ranking_health_timeout_ms: numeric_var(
                "RANKING_HEALTH_TIMEOUT_MS",
                defaults.ranking_health_timeout_ms,
            ),
            ranking_result_cap: numeric_var("RANKING_RESULT_CAP", defaults.ranking_result_cap),
            fallback_score_step: bounded_var(
                "FALLBACK_SCORE_STEP",
                defaults.fallback_score_step,
                is_valid_score_step,
            ),
            donation_interval_days: bounded_var(
                "DONATION_INTERVAL_DAYS",
                defaults.donation_interval_days,
                is_valid_donation_interval,
            ),
            default_max_daily_slots: numeric_var(
                "DEFAULT_MAX_DAILY_SLOTS",
                defaults.default_max_daily_slots,
            ),
            port: numeric_var("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_ranking_service_configured(&self) -> bool {
        self.ranking_service_url.is_some()
    }

    pub fn ranking_timeout(&self) -> Duration {
        Duration::from_millis(self.ranking_timeout_ms)
    }

    pub fn ranking_health_timeout(&self) -> Duration {
        Duration::from_millis(self.ranking_health_timeout_ms)
    }
}

fn numeric_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Like [`numeric_var`], but values rejected by `valid` also fall back to the default.
fn bounded_var<T>(name: &str, default: T, valid: fn(T) -> bool) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let value = numeric_var(name, default);
    if valid(value) {
        value
    } else {
        warn!("{} value {} is out of range, using default {}", name, value, default);
        default
    }
}
