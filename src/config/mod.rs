use std::path::PathBuf;

use serde::Deserialize;

use crate::images::tools::DEFAULT_JPEG_QUALITY;
use crate::images::ServiceOptions;
use crate::validation::{self, Constraint, FieldRule, FieldValue, ValidationError};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub address: String,
    pub timeout: u64,
    pub user_agent: String,
    pub cache_capacity: usize,
    pub storage_path: PathBuf,
    pub max_image_size: u64,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default)]
    pub reject_upscale: bool,
    #[serde(default = "default_forward_headers")]
    pub forward_headers: Vec<String>,
    #[serde(default)]
    pub error_format: ErrorFormat,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_forward_headers() -> Vec<String> {
    vec!["Authorization".to_string(), "Cookie".to_string()]
}

fn default_log_filter() -> String {
    "info".to_string()
}

const LOG_FILTERS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

fn rules() -> [FieldRule<AppConfig>; 8] {
    [
        FieldRule::new(
            "port",
            |c| FieldValue::Int(c.port as i64),
            Constraint::Range { min: 1, max: 65535 },
        ),
        FieldRule::new(
            "timeout",
            |c| FieldValue::Int(c.timeout as i64),
            Constraint::Range { min: 1, max: 300 },
        ),
        FieldRule::new(
            "user_agent",
            |c| FieldValue::Str(&c.user_agent),
            Constraint::NonEmpty,
        ),
        FieldRule::new(
            "cache_capacity",
            |c| FieldValue::Int(c.cache_capacity.min(i64::MAX as usize) as i64),
            Constraint::Range {
                min: 2,
                max: 100_000,
            },
        ),
        FieldRule::new(
            "storage_path",
            |c| FieldValue::Str(c.storage_path.to_str().unwrap_or_default()),
            Constraint::NonEmpty,
        ),
        FieldRule::new(
            "max_image_size",
            |c| FieldValue::Int(c.max_image_size.min(i64::MAX as u64) as i64),
            Constraint::Range {
                min: 1,
                max: 1_048_576,
            },
        ),
        FieldRule::new(
            "jpeg_quality",
            |c| FieldValue::Int(c.jpeg_quality as i64),
            Constraint::Range { min: 1, max: 100 },
        ),
        FieldRule::new(
            "log_filter",
            |c| FieldValue::Str(&c.log_filter),
            Constraint::OneOf(LOG_FILTERS),
        ),
    ]
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self, &rules())
    }

    /// The configured log filter, or `info` when it is not a known level.
    pub fn effective_log_filter(&self) -> &str {
        if LOG_FILTERS.contains(&self.log_filter.as_str()) {
            &self.log_filter
        } else {
            "info"
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            max_image_size: self.max_image_size,
            jpeg_quality: self.jpeg_quality,
            reject_upscale: self.reject_upscale,
        }
    }
}
