//! Configuration loader and validator for the reminder client.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::push::RenderDefaults;
use crate::schedule::{ScheduleRequestBuilder, DEFAULT_BODY_TEMPLATE, DEFAULT_TITLE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub api: Api,
    #[serde(default)]
    pub reminder: Reminder,
    #[serde(default)]
    pub page: Page,
    #[serde(default)]
    pub push: Push,
    #[serde(default)]
    pub messaging: Messaging,
}

/// Backend endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    #[serde(default = "default_save_token_path")]
    pub save_token_path: String,
    #[serde(default = "default_schedule_path")]
    pub schedule_path: String,
    #[serde(default = "default_status_path")]
    pub status_path: String,
    #[serde(default = "default_timezone_path")]
    pub timezone_path: String,
}

/// Title/body template for scheduled reminders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reminder {
    pub title: String,
    pub body_template: String,
}

/// Element ids read from the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub date_id: String,
    pub time_id: String,
}

/// Notification rendering defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Push {
    pub default_title: String,
    pub default_body: String,
    pub icon: String,
    pub badge: String,
}

/// Device token issued out of band by the messaging platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Messaging {
    #[serde(default)]
    pub token: Option<String>,
}

fn default_save_token_path() -> String {
    "api/save-fcm-token/".into()
}

fn default_schedule_path() -> String {
    "api/schedule-notification/".into()
}

fn default_status_path() -> String {
    "api/notification-status/".into()
}

fn default_timezone_path() -> String {
    "api/timezone-info/".into()
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.into(),
            body_template: DEFAULT_BODY_TEMPLATE.into(),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            date_id: "date".into(),
            time_id: "time".into(),
        }
    }
}

impl Default for Push {
    fn default() -> Self {
        let d = RenderDefaults::default();
        Self {
            default_title: d.title,
            default_body: d.body,
            icon: d.icon,
            badge: d.badge,
        }
    }
}

impl Config {
    pub fn request_builder(&self) -> ScheduleRequestBuilder {
        ScheduleRequestBuilder::new(&self.reminder.title, &self.reminder.body_template)
    }

    pub fn render_defaults(&self) -> RenderDefaults {
        RenderDefaults {
            title: self.push.default_title.clone(),
            body: self.push.default_body.clone(),
            icon: self.push.icon.clone(),
            badge: self.push.badge.clone(),
        }
    }

    /// Base URL with a trailing slash so endpoint paths join beneath it.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.api.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|_| ConfigError::Invalid("api.base_url must be a valid URL"))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    cfg.base_url()?;
    if cfg.api.save_token_path.trim().is_empty() {
        return Err(ConfigError::Invalid("api.save_token_path must be non-empty"));
    }
    if cfg.api.schedule_path.trim().is_empty() {
        return Err(ConfigError::Invalid("api.schedule_path must be non-empty"));
    }
    if cfg.api.status_path.trim().is_empty() {
        return Err(ConfigError::Invalid("api.status_path must be non-empty"));
    }
    if cfg.api.timezone_path.trim().is_empty() {
        return Err(ConfigError::Invalid("api.timezone_path must be non-empty"));
    }

    if cfg.reminder.title.trim().is_empty() {
        return Err(ConfigError::Invalid("reminder.title must be non-empty"));
    }
    if cfg.reminder.body_template.trim().is_empty() {
        return Err(ConfigError::Invalid("reminder.body_template must be non-empty"));
    }

    if cfg.page.date_id.trim().is_empty() {
        return Err(ConfigError::Invalid("page.date_id must be non-empty"));
    }
    if cfg.page.time_id.trim().is_empty() {
        return Err(ConfigError::Invalid("page.time_id must be non-empty"));
    }

    if cfg.push.icon.trim().is_empty() {
        return Err(ConfigError::Invalid("push.icon must be non-empty"));
    }
    if cfg.push.badge.trim().is_empty() {
        return Err(ConfigError::Invalid("push.badge must be non-empty"));
    }

    if let Some(token) = &cfg.messaging.token {
        if token.trim().is_empty() {
            return Err(ConfigError::Invalid("messaging.token must be non-empty when set"));
        }
    }

    Ok(())
}

/// Example configuration document.
pub fn example() -> &'static str {
    r#"api:
  base_url: "http://127.0.0.1:8000"
  save_token_path: "api/save-fcm-token/"
  schedule_path: "api/schedule-notification/"
  status_path: "api/notification-status/"
  timezone_path: "api/timezone-info/"

reminder:
  title: "🔔 Scheduled Reminder"
  body_template: "Your scheduled notification for {when}"

page:
  date_id: "date"
  time_id: "time"

push:
  default_title: "New Notification"
  default_body: "You have a new notification"
  icon: "/static/icon-192x192.png"
  badge: "/static/badge-72x72.png"

messaging:
  token: "YOUR_DEVICE_TOKEN"
"#
}
