use std::env;

use crate::error::AppError;

const MIN_AVERAGE_SPEED_KMH: f64 = 1.0;
const MAX_AVERAGE_SPEED_KMH: f64 = 200.0;
const MAX_HANDLING_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub notification_queue_size: usize,
    pub dashboard_refresh_secs: u64,
    pub rejection_reason_max_len: usize,
    pub allowed_document_types: Vec<String>,
    pub average_speed_kmh: f64,
    pub handling_minutes: i64,
    pub max_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_buffer_size: 1024,
            notification_queue_size: 1024,
            dashboard_refresh_secs: 30,
            rejection_reason_max_len: 500,
            allowed_document_types: default_document_types(),
            average_speed_kmh: 25.0,
            handling_minutes: 15,
            max_page_size: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let log_format = match env::var("LOG_FORMAT") {
            Ok(raw) => parse_log_format(&raw)?,
            Err(_) => defaults.log_format,
        };

        let allowed_document_types = match env::var("ALLOWED_DOCUMENT_TYPES") {
            Ok(raw) => parse_list(&raw),
            Err(_) => defaults.allowed_document_types,
        };
        if allowed_document_types.is_empty() {
            return Err(AppError::Config(
                "ALLOWED_DOCUMENT_TYPES must name at least one content type".to_string(),
            ));
        }

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            notification_queue_size: parse_or_default(
                "NOTIFICATION_QUEUE_SIZE",
                defaults.notification_queue_size,
            )?,
            dashboard_refresh_secs: parse_or_default(
                "DASHBOARD_REFRESH_SECS",
                defaults.dashboard_refresh_secs,
            )?,
            rejection_reason_max_len: parse_or_default(
                "REJECTION_REASON_MAX_LEN",
                defaults.rejection_reason_max_len,
            )?,
            allowed_document_types,
            average_speed_kmh: parse_or_default("AVERAGE_SPEED_KMH", defaults.average_speed_kmh)?,
            handling_minutes: parse_or_default("HANDLING_MINUTES", defaults.handling_minutes)?,
            max_page_size: parse_or_default("MAX_PAGE_SIZE", defaults.max_page_size)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.event_buffer_size == 0 || self.notification_queue_size == 0 {
            return Err(AppError::Config("queue sizes must be > 0".to_string()));
        }
        if self.dashboard_refresh_secs == 0 {
            return Err(AppError::Config(
                "DASHBOARD_REFRESH_SECS must be > 0".to_string(),
            ));
        }
        if self.rejection_reason_max_len == 0 {
            return Err(AppError::Config(
                "REJECTION_REASON_MAX_LEN must be > 0".to_string(),
            ));
        }
        if !(MIN_AVERAGE_SPEED_KMH..=MAX_AVERAGE_SPEED_KMH).contains(&self.average_speed_kmh) {
            return Err(AppError::Config(format!(
                "AVERAGE_SPEED_KMH must be within {MIN_AVERAGE_SPEED_KMH}..={MAX_AVERAGE_SPEED_KMH}"
            )));
        }
        if !(0..=MAX_HANDLING_MINUTES).contains(&self.handling_minutes) {
            return Err(AppError::Config(format!(
                "HANDLING_MINUTES must be within 0..={MAX_HANDLING_MINUTES}"
            )));
        }
        if self.max_page_size == 0 {
            return Err(AppError::Config("MAX_PAGE_SIZE must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn is_allowed_document_type(&self, content_type: &str) -> bool {
        let content_type = content_type.trim();
        self.allowed_document_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
    }
}

fn default_document_types() -> Vec<String> {
    ["image/jpeg", "image/png", "application/pdf"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn parse_log_format(raw: &str) -> Result<LogFormat, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "compact" | "text" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        other => Err(AppError::Config(format!(
            "invalid LOG_FORMAT: {other}, expected compact/json"
        ))),
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| AppError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
