//! Retry classification and exponential backoff for provider calls.

use crate::error::AnalysisError;
use std::time::Duration;

/// Whether an analysis error is worth retrying.
///
/// Retryable: timeouts, rate limits (429), server errors (5xx), connection
/// failures. Everything else (auth, bad request, unreadable image, empty
/// answer) fails the same way on every attempt.
pub fn is_retryable(error: &AnalysisError) -> bool {
    match error {
        AnalysisError::Timeout { .. } => true,
        AnalysisError::Provider {
            status_code,
            message,
        } => {
            if let Some(code) = status_code {
                return *code == 429 || (500..=599).contains(code);
            }
            message.contains("timed out") || message.contains("connect")
        }
        _ => false,
    }
}

/// Backoff before retry number `attempt` (0-based): `base * 2^attempt`, capped at 30s.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn provider_error(message: &str, status_code: Option<u16>) -> AnalysisError {
        AnalysisError::Provider {
            message: message.to_string(),
            status_code,
        }
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = AnalysisError::Timeout {
            path: PathBuf::from("red.jpg"),
            timeout_ms: 30_000,
        };
        assert!(is_retryable(&err));
    }

    #[test]
    fn test_status_classification() {
        assert!(is_retryable(&provider_error("HTTP 429", Some(429))));
        assert!(is_retryable(&provider_error("HTTP 503", Some(503))));
        assert!(!is_retryable(&provider_error("HTTP 401", Some(401))));
        assert!(!is_retryable(&provider_error("HTTP 400", Some(400))));
    }

    #[test]
    fn test_transport_errors_without_status() {
        assert!(is_retryable(&provider_error(
            "Gemini connect error: connection refused",
            None
        )));
        assert!(is_retryable(&provider_error(
            "OpenAI request timed out",
            None
        )));
        assert!(!is_retryable(&provider_error(
            "Failed to parse Gemini response: expected value at 500",
            None
        )));
    }

    #[test]
    fn test_input_errors_not_retryable() {
        let err = AnalysisError::FileTooLarge {
            path: PathBuf::from("huge.png"),
            size_mb: 40,
            max_mb: 20,
        };
        assert!(!is_retryable(&err));
        assert!(!is_retryable(&AnalysisError::UnknownPrompt("x".into())));
        assert!(!is_retryable(&AnalysisError::EmptyResponse {
            provider: "gemini".into(),
            message: "no text".into(),
        }));
    }

    #[test]
    fn test_backoff_exponential() {
        assert_eq!(backoff_duration(0, 1000), Duration::from_millis(1000));
        assert_eq!(backoff_duration(1, 1000), Duration::from_millis(2000));
        assert_eq!(backoff_duration(3, 1000), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_capped_at_30s() {
        assert_eq!(backoff_duration(10, 1000), Duration::from_millis(30_000));
        assert_eq!(backoff_duration(u32::MAX, u64::MAX), Duration::from_millis(30_000));
    }
}
