//! Drives one scheduling attempt: permission, page input, device token,
//! token registration, then the scheduling request.
use chrono::{DateTime, TimeZone};
use std::fmt;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::api::{ApiError, ApiResponse, SchedulerApi};
use crate::config;
use crate::datetime::{ResolveError, ResolvedSchedule};
use crate::host::{Notice, Permission, PermissionPrompt, TokenSource};
use crate::page::{read_input, MissingElement, PageSource};
use crate::schedule::{human_readable, ScheduleRequestBuilder, SchedulingRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RegisterToken,
    Schedule,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::RegisterToken => f.write_str("save device token"),
            Stage::Schedule => f.write_str("schedule notification"),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification permission was {0:?}")]
    PermissionDenied(Permission),
    #[error("element #{0} is missing or empty")]
    InputMissing(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("no device token available")]
    TokenUnavailable,
    #[error("failed to {stage}: {source}")]
    Api {
        stage: Stage,
        #[source]
        source: ApiError,
    },
}

impl From<MissingElement> for NotifyError {
    fn from(m: MissingElement) -> Self {
        NotifyError::InputMissing(m.0)
    }
}

impl NotifyError {
    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            NotifyError::PermissionDenied(_) => "Please allow notifications to continue".into(),
            NotifyError::InputMissing(_) => "Cannot find date or time information on the page".into(),
            NotifyError::Resolve(ResolveError::InputMissing) => {
                "Date or time information is missing".into()
            }
            NotifyError::Resolve(_) => "Invalid date or time format on the page".into(),
            NotifyError::TokenUnavailable => "Could not get a device token for notifications".into(),
            NotifyError::Api { stage, source } => match source.server_error() {
                Some(msg) => format!("Failed to {stage}: {msg}"),
                None => format!("Failed to {stage}. Please try again later."),
            },
        }
    }
}

/// Result of a successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub resolved: ResolvedSchedule,
    pub request: SchedulingRequest,
    pub response: ApiResponse,
}

impl ScheduleOutcome {
    pub fn summary(&self) -> String {
        format!(
            "Notification scheduled for {}",
            human_readable(&self.resolved.timestamp)
        )
    }
}

/// Token fetch, token registration and the scheduling request for an
/// already resolved timestamp.
pub struct Dispatcher<'a> {
    pub tokens: &'a dyn TokenSource,
    pub api: &'a dyn SchedulerApi,
    pub builder: ScheduleRequestBuilder,
}

impl Dispatcher<'_> {
    #[instrument(skip_all)]
    pub async fn dispatch(&self, resolved: ResolvedSchedule) -> Result<ScheduleOutcome, NotifyError> {
        let token = match self.tokens.fetch_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(NotifyError::TokenUnavailable),
            Err(err) => {
                warn!(?err, "token source failed");
                return Err(NotifyError::TokenUnavailable);
            }
        };
        info!(token = %token.redacted(), "device token received");

        self.api
            .register_token(&token)
            .await
            .map_err(|source| NotifyError::Api {
                stage: Stage::RegisterToken,
                source,
            })?;

        let request = self.builder.build(&resolved, &token);
        let response = self
            .api
            .schedule(&request)
            .await
            .map_err(|source| NotifyError::Api {
                stage: Stage::Schedule,
                source,
            })?;

        Ok(ScheduleOutcome {
            resolved,
            request,
            response,
        })
    }
}

pub struct Orchestrator<'a> {
    pub permission: &'a dyn PermissionPrompt,
    pub page: &'a dyn PageSource,
    pub notice: &'a dyn Notice,
    pub page_ids: config::Page,
    pub dispatcher: Dispatcher<'a>,
}

impl Orchestrator<'_> {
    /// Run the attempt and report the first failure.
    ///
    /// Page input is read and resolved before the token is fetched, so
    /// missing or unparseable input never reaches the network.
    #[instrument(skip_all)]
    pub async fn run<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<ScheduleOutcome, NotifyError> {
        let permission = self.permission.request_permission().await;
        if permission != Permission::Granted {
            return Err(NotifyError::PermissionDenied(permission));
        }
        info!("notification permission granted");

        let raw = read_input(self.page, &self.page_ids.date_id, &self.page_ids.time_id)?;
        info!(date = %raw.date_part, time = %raw.time_part, "read date and time from page");
        let resolved = raw.resolve(now)?;

        self.dispatcher.dispatch(resolved).await
    }

    /// Top-level entry point. Failures are logged and surfaced through the
    /// notice, never returned.
    pub async fn initialize<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<ScheduleOutcome> {
        surface(self.notice, self.run(now).await)
    }
}

/// Log the attempt's result and show it to the user.
pub fn surface(
    notice: &dyn Notice,
    result: Result<ScheduleOutcome, NotifyError>,
) -> Option<ScheduleOutcome> {
    match result {
        Ok(outcome) => {
            let summary = outcome.summary();
            info!(
                scheduled_at = %outcome.request.scheduled_at,
                adjusted = outcome.resolved.was_adjusted_for_past,
                "{summary}"
            );
            notice.alert(&format!("✅ {summary}"));
            notice.set_status(&summary);
            Some(outcome)
        }
        Err(err) => {
            error!(%err, "scheduling attempt failed");
            notice.alert(&err.user_message());
            None
        }
    }
}
