// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Estimated study time per lesson, in minutes.
pub const MINUTES_PER_LESSON: i64 = 45;

/// Upper bound for attempt, submission and lesson scores.
pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,

    /// Root directory for uploaded speaking audio.
    pub media_root: String,
    pub max_body_bytes: usize,

    /// Absolute site prefix used in reminder links. Relative links when unset.
    pub site_url: Option<String>,

    /// Transactional mail API endpoint. Messages are only logged when unset.
    pub mail_api_url: Option<String>,
    pub mail_api_token: Option<String>,
    pub default_from_email: String,
    pub notify_timeout_secs: u64,

    /// Hours between daily reminder runs. 0 disables the scheduler.
    pub reminder_interval_hours: u64,
}

impl Config {
    /// Reads configuration from the environment.
    ///
    /// Invalid optional settings are dropped and described in the returned
    /// warnings, which the caller logs once tracing is installed.
    pub fn from_env() -> (Self, Vec<String>) {
        dotenv().ok();
        let mut warnings = Vec::new();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let site_url = validated_url("SITE_URL", optional_var("SITE_URL"), &mut warnings)
            .map(|raw| raw.trim_end_matches('/').to_string());
        let mail_api_url =
            validated_url("MAIL_API_URL", optional_var("MAIL_API_URL"), &mut warnings);

        let config = Self {
            database_url,
            jwt_secret,
            jwt_expiration: parsed_var("JWT_EXPIRATION", 3600),
            rust_log,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            max_body_bytes: parsed_var("MAX_BODY_BYTES", 25 * 1024 * 1024),
            site_url,
            mail_api_url,
            mail_api_token: optional_var("MAIL_API_TOKEN"),
            default_from_email: env::var("DEFAULT_FROM_EMAIL")
                .unwrap_or_else(|_| "no-reply@example.com".to_string()),
            notify_timeout_secs: parsed_var("NOTIFY_TIMEOUT_SECS", 10),
            reminder_interval_hours: parsed_var("REMINDER_INTERVAL_HOURS", 24),
        };
        (config, warnings)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs.max(1))
    }

    /// Link to a course page, absolute when `site_url` is configured.
    pub fn course_url(&self, course_id: i64) -> String {
        match &self.site_url {
            Some(prefix) => format!("{}/courses/{}/", prefix, course_id),
            None => format!("/courses/{}/", course_id),
        }
    }
}

/// Keeps `raw` only if it parses as an absolute URL; otherwise records why.
fn validated_url(key: &str, raw: Option<String>, warnings: &mut Vec<String>) -> Option<String> {
    let raw = raw?;
    match Url::parse(&raw) {
        Ok(_) => Some(raw),
        Err(e) => {
            warnings.push(format!("Ignoring invalid {} '{}': {}", key, raw, e));
            None
        }
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/elearn_test".to_string(),
        jwt_secret: "unit_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        media_root: std::env::temp_dir().to_string_lossy().into_owned(),
        max_body_bytes: 1024 * 1024,
        site_url: None,
        mail_api_url: None,
        mail_api_token: None,
        default_from_email: "no-reply@example.com".to_string(),
        notify_timeout_secs: 1,
        reminder_interval_hours: 0,
    }
}
