//! Push payload classification and notification rendering.
//!
//! Incoming push data is first classified into a [`PushKind`]; every kind is
//! then turned into a [`NotificationSpec`] by the single [`render`] routine.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const DEFAULT_TITLE: &str = "New Notification";
const DEFAULT_BODY: &str = "You have a new notification";
const DEFAULT_ICON: &str = "/static/icon-192x192.png";
const DEFAULT_BADGE: &str = "/static/badge-72x72.png";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub notification: Option<PushNotification>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushKind {
    /// Well-formed JSON payload.
    Payload(PushPayload),
    /// Data was present but could not be decoded.
    Malformed,
    /// Push arrived without data.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.into(),
            body: DEFAULT_BODY.into(),
            icon: DEFAULT_ICON.into(),
            badge: DEFAULT_BADGE.into(),
        }
    }
}

/// What the notification tray is asked to display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationSpec {
    pub title: String,
    pub body: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub tag: String,
    pub require_interaction: bool,
    pub data: Value,
}

/// Action taken when the user activates a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Open(String),
    FocusExisting,
}

/// Classify raw push data. Only undecodable JSON or a `null` root is
/// malformed; any other JSON document is a payload, read field by field.
pub fn classify(raw: Option<&[u8]>) -> PushKind {
    let bytes = match raw {
        Some(b) if !b.is_empty() => b,
        _ => return PushKind::Empty,
    };
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Null) => {
            warn!("push data decoded to null");
            PushKind::Malformed
        }
        Ok(root) => PushKind::Payload(PushPayload::from_value(&root)),
        Err(err) => {
            warn!(?err, "failed to decode push data");
            PushKind::Malformed
        }
    }
}

impl PushPayload {
    /// Lenient extraction: notification fields are kept only when they are
    /// strings, and anything else falls back to the render defaults.
    pub fn from_value(root: &Value) -> Self {
        let notification = root
            .get("notification")
            .filter(|n| n.is_object())
            .map(|n| PushNotification {
                title: string_field(n, "title"),
                body: string_field(n, "body"),
                icon: string_field(n, "icon"),
                badge: string_field(n, "badge"),
            });
        Self {
            notification,
            data: root.get("data").cloned(),
        }
    }
}

fn string_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

pub fn render(kind: &PushKind, defaults: &RenderDefaults, now: DateTime<Utc>) -> NotificationSpec {
    let millis = now.timestamp_millis();
    let spec = match kind {
        PushKind::Payload(payload) => {
            let n = payload.notification.clone().unwrap_or_default();
            NotificationSpec {
                title: non_empty(n.title).unwrap_or_else(|| defaults.title.clone()),
                body: non_empty(n.body).unwrap_or_else(|| defaults.body.clone()),
                icon: non_empty(n.icon).unwrap_or_else(|| defaults.icon.clone()),
                badge: Some(non_empty(n.badge).unwrap_or_else(|| defaults.badge.clone())),
                tag: format!("push-notification-{millis}"),
                require_interaction: true,
                data: payload
                    .data
                    .clone()
                    .filter(|d| !d.is_null())
                    .unwrap_or_else(|| Value::Object(Map::new())),
            }
        }
        PushKind::Malformed => fallback(defaults, format!("fallback-notification-{millis}")),
        PushKind::Empty => fallback(defaults, format!("default-notification-{millis}")),
    };
    debug!(tag = %spec.tag, title = %spec.title, "rendered notification");
    spec
}

/// Decide what activating a notification does. A non-empty `data.url` wins;
/// otherwise an already open window is focused, or the root page is opened.
pub fn click_target(data: &Value, open_windows: usize) -> ClickTarget {
    if let Some(url) = data.get("url").and_then(Value::as_str).filter(|u| !u.is_empty()) {
        return ClickTarget::Open(url.to_string());
    }
    if open_windows > 0 {
        ClickTarget::FocusExisting
    } else {
        ClickTarget::Open("/".into())
    }
}

fn fallback(defaults: &RenderDefaults, tag: String) -> NotificationSpec {
    NotificationSpec {
        title: defaults.title.clone(),
        body: defaults.body.clone(),
        icon: defaults.icon.clone(),
        badge: None,
        tag,
        require_interaction: false,
        data: Value::Object(Map::new()),
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}
