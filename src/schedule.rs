use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::datetime::ResolvedSchedule;

pub const DEFAULT_TITLE: &str = "🔔 Scheduled Reminder";
pub const DEFAULT_BODY_TEMPLATE: &str = "Your scheduled notification for {when}";

/// Opaque device identifier issued by the messaging platform. Never empty.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceToken(String);

impl DeviceToken {
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for logs.
    pub fn redacted(&self) -> String {
        let head: String = self.0.chars().take(12).collect();
        format!("{head}…")
    }
}

impl fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeviceToken").field(&self.redacted()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
}

/// Body of `POST /api/schedule-notification/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingRequest {
    pub title: String,
    pub body: String,
    pub fcm_token: DeviceToken,
    pub scheduled_at: String,
    pub priority: Priority,
}

/// Body of `POST /api/save-fcm-token/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRegistration {
    pub token: DeviceToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequestBuilder {
    title: String,
    body_template: String,
}

impl Default for ScheduleRequestBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE, DEFAULT_BODY_TEMPLATE)
    }
}

impl ScheduleRequestBuilder {
    /// `body_template` may contain `{when}`, replaced with the human-readable
    /// scheduled time.
    pub fn new(title: impl Into<String>, body_template: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body_template: body_template.into(),
        }
    }

    pub fn build(&self, resolved: &ResolvedSchedule, token: &DeviceToken) -> SchedulingRequest {
        let when = human_readable(&resolved.timestamp);
        SchedulingRequest {
            title: self.title.replace("{when}", &when),
            body: self.body_template.replace("{when}", &when),
            fcm_token: token.clone(),
            scheduled_at: interchange(&resolved.timestamp),
            priority: Priority::High,
        }
    }
}

/// Canonical interchange form: UTC, millisecond precision, `Z` suffix.
pub fn interchange(ts: &DateTime<FixedOffset>) -> String {
    ts.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Wall-clock rendering in the timestamp's own offset, e.g. `1/15/2025, 2:30:00 PM`.
pub fn human_readable(ts: &DateTime<FixedOffset>) -> String {
    ts.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::ParseStrategy;
    use chrono::TimeZone;
    use serde_json::json;

    fn resolved(offset_secs: i32) -> ResolvedSchedule {
        let tz = FixedOffset::east_opt(offset_secs).unwrap();
        ResolvedSchedule {
            timestamp: tz.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap(),
            was_adjusted_for_past: false,
            strategy: ParseStrategy::Joined,
        }
    }

    #[test]
    fn build_produces_canonical_payload() {
        let token = DeviceToken::new("tok-123").unwrap();
        let req = ScheduleRequestBuilder::default().build(&resolved(0), &token);
        assert_eq!(req.scheduled_at, "2025-01-15T14:30:00.000Z");
        assert_eq!(req.priority, Priority::High);
        assert_eq!(req.title, DEFAULT_TITLE);
        assert_eq!(
            req.body,
            "Your scheduled notification for 1/15/2025, 2:30:00 PM"
        );

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "title": DEFAULT_TITLE,
                "body": "Your scheduled notification for 1/15/2025, 2:30:00 PM",
                "fcm_token": "tok-123",
                "scheduled_at": "2025-01-15T14:30:00.000Z",
                "priority": "high"
            })
        );
    }

    #[test]
    fn scheduled_at_is_utc_while_body_is_local() {
        let token = DeviceToken::new("tok-123").unwrap();
        let req = ScheduleRequestBuilder::default().build(&resolved(2 * 3600), &token);
        assert_eq!(req.scheduled_at, "2025-01-15T12:30:00.000Z");
        assert!(req.body.ends_with("1/15/2025, 2:30:00 PM"));
    }

    #[test]
    fn custom_templates_interpolate_when() {
        let token = DeviceToken::new("tok").unwrap();
        let builder = ScheduleRequestBuilder::new("Reminder", "Due {when}!");
        let req = builder.build(&resolved(0), &token);
        assert_eq!(req.title, "Reminder");
        assert_eq!(req.body, "Due 1/15/2025, 2:30:00 PM!");
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(DeviceToken::new("").is_none());
        assert!(DeviceToken::new("  \n").is_none());
        assert_eq!(DeviceToken::new(" abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn debug_does_not_leak_full_token() {
        let token = DeviceToken::new("abcdefghijklmnopqrstuvwxyz").unwrap();
        let dbg = format!("{:?}", token);
        assert!(!dbg.contains("uvwxyz"));
    }

    #[test]
    fn token_registration_shape() {
        let body = TokenRegistration {
            token: DeviceToken::new("t-1").unwrap(),
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({ "token": "t-1" }));
    }
}
