//! Retry classification and message formatting.
//!
//! Classifies failed HTTP exchanges (status code, vendor reason, transport
//! error) and formats consistent log lines for the transient retrier.

use reqwest::{Error as ReqwestError, StatusCode};
use std::time::Duration;

/// Vendor reason codes meaning the credential's daily allowance is spent.
pub const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded"];

/// Vendor reason codes meaning the caller is going too fast.
pub const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// Classification of retryable failures for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Network timeout or connection stalled long enough to trigger a timeout
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 429 or a rate-limit reason on 403
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// Generic fallback when no better classification fits
    NetworkGeneric,
}

impl RetryErrorType {
    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation presented after the final failed attempt.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Increase --page-delay-ms to slow down requests",
            Self::ServerError(_) => "The API may be experiencing issues, try again later",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }
}

/// How a failed response should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Credential allowance spent; rotate
    Quota,
    /// Retry with backoff
    Transient(RetryErrorType),
    /// Resource missing
    NotFound,
    /// Anything else; propagate
    Unclassified,
}

/// Classify an HTTP error response from its status and vendor reason code.
pub fn classify_status(status: StatusCode, reason: Option<&str>) -> FailureClass {
    let reason = reason.unwrap_or("");

    if status == StatusCode::FORBIDDEN {
        if QUOTA_REASONS.contains(&reason) {
            return FailureClass::Quota;
        }
        if RATE_LIMIT_REASONS.contains(&reason) {
            return FailureClass::Transient(RetryErrorType::RateLimit);
        }
        return FailureClass::Unclassified;
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return FailureClass::Transient(RetryErrorType::RateLimit);
    }

    if status == StatusCode::NOT_FOUND {
        return FailureClass::NotFound;
    }

    if status.is_server_error() {
        return FailureClass::Transient(RetryErrorType::ServerError(status.as_u16()));
    }

    FailureClass::Unclassified
}

/// Classify a transport-level reqwest error.
pub fn classify_transport(err: &ReqwestError) -> RetryErrorType {
    if err.is_timeout() {
        return RetryErrorType::NetworkTimeout;
    }

    if err.is_connect() {
        return RetryErrorType::NetworkOffline;
    }

    RetryErrorType::NetworkGeneric
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Backoff duration until next attempt
    pub backoff_duration: Duration,
    /// Operation label (e.g., "videos.list batch 3/4")
    pub operation: String,
    /// Original error message for details
    pub error_message: String,
}

impl RetryContext {
    /// Convenience constructor used by the retrier.
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        operation: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            operation: operation.into(),
            error_message: error_message.into(),
        }
    }

    /// Format standardized retry message with attempt counters and context.
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        );
        append_operation(&mut message, &self.operation);
        message
    }

    /// Format retry success message when a previous attempt eventually works.
    pub fn format_success(&self) -> String {
        let mut message = format!(
            "Retry attempt {}/{} succeeded",
            self.attempt, self.max_attempts
        );
        append_operation(&mut message, &self.operation);
        message
    }

    /// Format final failure summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let operation = if self.operation.is_empty() {
            "unknown"
        } else {
            &self.operation
        };

        let mut lines = vec![
            format!(
                "[GAVE UP] {} failed after {} attempts, continuing without it",
                operation, self.max_attempts
            ),
            format!("  Last error: {}", self.error_message),
            "  Suggestions:".to_string(),
        ];
        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }

        lines.join("\n")
    }

    /// Derive suggestions tailored to the current retry context.
    pub fn format_suggestions(&self) -> Vec<String> {
        vec![
            self.error_type.suggestion().to_string(),
            format!(
                "Try increasing --max-retries (current: {})",
                self.max_attempts.saturating_sub(1)
            ),
        ]
    }
}

fn append_operation(buffer: &mut String, operation: &str) {
    if !operation.is_empty() {
        buffer.push_str(" (");
        buffer.push_str(operation);
        buffer.push(')');
    }
}
