//! Retry loop for remote requests.
//!
//! One attempt = one closure call returning a [`RawResponse`]. The loop
//! classifies the status, sleeps through the injected [`Sleeper`] on 429/5xx
//! and gives up once the attempt budget is spent. Transport errors (timeout,
//! connection failure) returned by the closure end the loop immediately.

use std::thread;
use std::time::Duration;

use log::{error, warn};

use crate::error::ClientError;

/// Suspends the calling thread. Injected so tests can observe backoff
/// without real delays.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Status, `Retry-After` and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: String,
}

/// What the loop does with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    /// 429: wait this long, then retry.
    RateLimited(Duration),
    /// 5xx: wait this long, then retry.
    ServerError(Duration),
    /// Any other non-2xx: fail now.
    Permanent,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait used for a 429 without a usable `Retry-After`.
    pub default_retry_after: Duration,
    /// Fixed wait after a 5xx.
    pub server_error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_retry_after: Duration::from_secs(1),
            server_error_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn classify(&self, response: &RawResponse) -> Disposition {
        match response.status {
            200..=299 => Disposition::Success,
            429 => Disposition::RateLimited(response.retry_after.unwrap_or(self.default_retry_after)),
            s if s >= 500 => Disposition::ServerError(self.server_error_delay),
            _ => Disposition::Permanent,
        }
    }

    /// Run `attempt` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// `attempt` receives the 1-based attempt number. `label` only feeds the log
    /// lines (e.g. `"GET https://coda.io/apis/v1/whoami"`).
    pub fn execute<F>(
        &self,
        label: &str,
        sleeper: &dyn Sleeper,
        mut attempt: F,
    ) -> Result<RawResponse, ClientError>
    where
        F: FnMut(u32) -> Result<RawResponse, ClientError>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_status = 0;

        for n in 1..=max_attempts {
            let response = attempt(n)?;
            let wait = match self.classify(&response) {
                Disposition::Success => return Ok(response),
                Disposition::Permanent => {
                    error!("{label} failed with HTTP {}: {}", response.status, response.body);
                    return Err(ClientError::Api {
                        status: response.status,
                        body: response.body,
                    });
                }
                Disposition::RateLimited(wait) => {
                    warn!(
                        "{label}: rate limited, waiting {}s (attempt {n}/{max_attempts})",
                        wait.as_secs_f64()
                    );
                    wait
                }
                Disposition::ServerError(wait) => {
                    error!("{label} failed with HTTP {}: {}", response.status, response.body);
                    warn!(
                        "{label}: server error, waiting {}s (attempt {n}/{max_attempts})",
                        wait.as_secs_f64()
                    );
                    wait
                }
            };

            last_status = response.status;
            if n < max_attempts {
                sleeper.sleep(wait);
            }
        }

        error!("{label}: request failed after {max_attempts} attempts");
        Err(ClientError::RetryExhausted {
            attempts: max_attempts,
            last_status,
        })
    }
}

/// Parse a `Retry-After` header value given in seconds. HTTP-date values
/// are not supported and fall back to the policy default.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::Sleeper;

    /// Records requested sleeps instead of sleeping.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pub sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn recorded(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::testing::RecordingSleeper;
    use super::*;

    fn response(status: u16, retry_after: Option<u64>) -> RawResponse {
        RawResponse {
            status,
            retry_after: retry_after.map(Duration::from_secs),
            body: format!("{{\"status\":{status}}}"),
        }
    }

    /// Replays canned responses in order and counts attempts.
    fn scripted(
        responses: Vec<RawResponse>,
    ) -> (impl FnMut(u32) -> Result<RawResponse, ClientError>, std::rc::Rc<std::cell::Cell<u32>>) {
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = calls.clone();
        let mut queue: VecDeque<RawResponse> = responses.into();
        let f = move |_n: u32| {
            counter.set(counter.get() + 1);
            Ok(queue.pop_front().expect("script ran out of responses"))
        };
        (f, calls)
    }

    #[test]
    fn rate_limited_then_success_sleeps_once_for_retry_after() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let (f, calls) = scripted(vec![response(429, Some(2)), response(200, None)]);

        let result = policy.execute("GET /rows", &sleeper, f).unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(calls.get(), 2);
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn rate_limited_without_header_uses_default() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let (f, _) = scripted(vec![response(429, None), response(200, None)]);

        policy.execute("GET /rows", &sleeper, f).unwrap();

        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn three_server_errors_exhaust_budget() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let (f, calls) = scripted(vec![
            response(500, None),
            response(502, None),
            response(503, None),
            response(200, None),
        ]);

        let err = policy.execute("POST /rows", &sleeper, f).unwrap_err();

        assert!(matches!(
            err,
            ClientError::RetryExhausted { attempts: 3, last_status: 503 }
        ));
        // No fourth attempt, and no sleep after the last failure.
        assert_eq!(calls.get(), 3);
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(5); 2]);
    }

    #[test]
    fn client_error_fails_without_retry() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let (f, calls) = scripted(vec![response(404, None), response(200, None)]);

        let err = policy.execute("GET /docs/x", &sleeper, f).unwrap_err();

        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("404"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.get(), 1);
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn transport_error_is_terminal() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let err = policy
            .execute("GET /whoami", &sleeper, |_| {
                calls += 1;
                Err(ClientError::Timeout("GET /whoami".into()))
            })
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout(_)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_budget_still_attempts_once() {
        let policy = RetryPolicy { max_attempts: 0, ..RetryPolicy::default() };
        let sleeper = RecordingSleeper::default();
        let (f, calls) = scripted(vec![response(200, None)]);

        policy.execute("GET /whoami", &sleeper, f).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn classify_statuses() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.classify(&response(202, None)), Disposition::Success);
        assert_eq!(
            policy.classify(&response(429, Some(7))),
            Disposition::RateLimited(Duration::from_secs(7))
        );
        assert_eq!(
            policy.classify(&response(504, None)),
            Disposition::ServerError(Duration::from_secs(5))
        );
        assert_eq!(policy.classify(&response(401, None)), Disposition::Permanent);
        assert_eq!(policy.classify(&response(302, None)), Disposition::Permanent);
    }

    #[test]
    fn retry_after_parsing() {
        assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 10 "), Some(Duration::from_secs(10)));
        assert_eq!(parse_retry_after("1.5"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-3"), None);
    }
}
