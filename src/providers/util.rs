use anyhow::Error;
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How often and how far apart a price request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Throttling and server-side failures are worth another attempt; anything
/// else is answered as is.
fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Sends a request, retrying transport errors and transient statuses.
///
/// Once the retries are spent, a transient response is handed back so the
/// caller reports the status it saw.
pub async fn with_retry<F, Fut>(policy: RetryPolicy, mut send: F) -> Result<Response, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let outcome = send().await;
        let last = attempt >= policy.retries;
        match outcome {
            Ok(response) if last || !is_transient(response.status()) => return Ok(response),
            Err(err) if last => {
                return Err(Error::from(err)
                    .context(format!("gave up after {} attempts", attempt + 1)));
            }
            Ok(response) => {
                debug!(status = %response.status(), attempt, "Transient status, retrying");
            }
            Err(err) => {
                debug!(%err, attempt, "Request failed, retrying");
            }
        }
        attempt += 1;
        tokio::time::sleep(policy.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick(retries: usize) -> RetryPolicy {
        RetryPolicy {
            retries,
            delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn default_policy_is_three_retries_half_a_second_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn gives_up_after_configured_retries() {
        let calls = AtomicUsize::new(0);
        // Nothing listens on port 9 locally, so every attempt fails fast.
        let client = reqwest::Client::new();
        let result = with_retry(quick(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            client.get("http://127.0.0.1:9/").send()
        })
        .await;

        assert!(result.unwrap_err().to_string().contains("gave up after 3 attempts"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chart"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/chart"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/chart", server.uri());
        let response = with_retry(quick(3), || client.get(&url).send()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let response = with_retry(quick(3), || client.get(server.uri()).send())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
