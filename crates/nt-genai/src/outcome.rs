use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::GenAiError;

/// Result of one bounded external call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Ok(T),
    TimedOut,
    Failed(String),
}

/// How a response was produced, reported to clients alongside the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Live,
    FallbackTimedOut,
    FallbackFailed,
}

impl<T> CallOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Take the value, or build the fallback and say why it was needed.
    pub fn or_fallback(self, fallback: impl FnOnce() -> T) -> (T, Provenance) {
        match self {
            Self::Ok(value) => (value, Provenance::Live),
            Self::TimedOut => (fallback(), Provenance::FallbackTimedOut),
            Self::Failed(_) => (fallback(), Provenance::FallbackFailed),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U> {
        match self {
            Self::Ok(value) => CallOutcome::Ok(f(value)),
            Self::TimedOut => CallOutcome::TimedOut,
            Self::Failed(reason) => CallOutcome::Failed(reason),
        }
    }
}

/// Run `call` once, giving up after `deadline`. No retries.
pub async fn with_deadline<T, F>(label: &str, deadline: Duration, call: F) -> CallOutcome<T>
where
    F: Future<Output = Result<T, GenAiError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => CallOutcome::Ok(value),
        Ok(Err(e)) => {
            warn!("{} failed: {}", label, e);
            CallOutcome::Failed(e.to_string())
        }
        Err(_) => {
            warn!("{} timed out after {:?}", label, deadline);
            CallOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let outcome: CallOutcome<u8> = with_deadline("slow", Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1)
        })
        .await;
        assert_eq!(outcome, CallOutcome::TimedOut);
    }

    #[tokio::test]
    async fn error_becomes_failed() {
        let outcome: CallOutcome<u8> = with_deadline("broken", Duration::from_secs(5), async {
            Err(GenAiError::MissingApiKey)
        })
        .await;
        assert!(matches!(outcome, CallOutcome::Failed(reason) if reason.contains("API key")));
    }

    #[test]
    fn fallback_reports_provenance() {
        let (value, provenance) = CallOutcome::Ok(3).or_fallback(|| 0);
        assert_eq!((value, provenance), (3, Provenance::Live));

        let (value, provenance) = CallOutcome::<i32>::TimedOut.or_fallback(|| 0);
        assert_eq!((value, provenance), (0, Provenance::FallbackTimedOut));

        let (value, provenance) = CallOutcome::<i32>::Failed("x".into()).or_fallback(|| 7);
        assert_eq!((value, provenance), (7, Provenance::FallbackFailed));
    }
}
