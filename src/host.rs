//! Collaborators supplied by the environment the orchestrator runs in:
//! permission prompt, device token source, and user-facing notices.
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::schedule::DeviceToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    Dismissed,
}

#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    async fn request_permission(&self) -> Permission;
}

/// Black-box token issuance by the messaging platform.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<Option<DeviceToken>>;
}

/// User-visible surface: blocking alerts and a status line.
pub trait Notice: Send + Sync {
    fn alert(&self, message: &str);
    fn set_status(&self, message: &str);
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedPermission(pub Permission);

#[async_trait]
impl PermissionPrompt for FixedPermission {
    async fn request_permission(&self) -> Permission {
        self.0
    }
}

/// Token handed over out of band (config file or command line).
#[derive(Debug, Clone, Default)]
pub struct StaticTokenSource {
    token: Option<String>,
}

impl StaticTokenSource {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch_token(&self) -> Result<Option<DeviceToken>> {
        Ok(self.token.clone().and_then(DeviceToken::new))
    }
}

/// Asks on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompt;

#[async_trait]
impl PermissionPrompt for ConsolePrompt {
    async fn request_permission(&self) -> Permission {
        let mut stderr = tokio::io::stderr();
        if stderr
            .write_all(b"Allow reminder notifications? [y/N] ")
            .await
            .is_err()
        {
            return Permission::Dismissed;
        }
        let _ = stderr.flush().await;

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => Permission::Dismissed,
            Ok(_) => parse_answer(&line),
        }
    }
}

pub fn parse_answer(answer: &str) -> Permission {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Permission::Granted,
        "" => Permission::Dismissed,
        _ => Permission::Denied,
    }
}

/// Prints alerts to stdout; the status line goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotice;

impl Notice for ConsoleNotice {
    fn alert(&self, message: &str) {
        println!("{message}");
    }

    fn set_status(&self, message: &str) {
        info!(status = %message, "status updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_map_to_permission() {
        assert_eq!(parse_answer("y\n"), Permission::Granted);
        assert_eq!(parse_answer(" YES "), Permission::Granted);
        assert_eq!(parse_answer("no"), Permission::Denied);
        assert_eq!(parse_answer("\n"), Permission::Dismissed);
    }

    #[tokio::test]
    async fn static_source_rejects_blank_token() {
        let src = StaticTokenSource::new(Some("   ".into()));
        assert!(src.fetch_token().await.unwrap().is_none());
        let src = StaticTokenSource::new(Some("tok".into()));
        assert_eq!(src.fetch_token().await.unwrap().unwrap().as_str(), "tok");
        assert!(StaticTokenSource::default().fetch_token().await.unwrap().is_none());
    }
}
