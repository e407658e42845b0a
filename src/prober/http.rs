use std::time::{Duration, Instant};

use super::{ProbeError, ProbeOutcome, elapsed_ms};

/// HTTP(S) GET check sharing one connection pool across all probes.
#[derive(Clone, Default)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Up only for a 2xx or 3xx final status. With `expected_status` set, any
    /// other code is a mismatch, and an expected code outside that range is
    /// still down.
    pub async fn check(
        &self,
        target: &str,
        timeout: Duration,
        expected_status: Option<i32>,
    ) -> ProbeOutcome {
        let start_time = Instant::now();
        let result = self.client.get(target).timeout(timeout).send().await;
        let response_time_ms = elapsed_ms(start_time);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    ProbeError::Timeout {
                        what: "request",
                        after: timeout,
                    }
                } else {
                    ProbeError::Transport(e.to_string())
                };
                return ProbeOutcome::down(error, Some(response_time_ms), None);
            }
        };

        let code = response.status().as_u16();
        match expected_status {
            Some(expected) if i32::from(code) != expected => ProbeOutcome::down(
                ProbeError::StatusMismatch {
                    expected,
                    actual: code,
                },
                Some(response_time_ms),
                Some(code),
            ),
            _ if (200..400).contains(&code) => ProbeOutcome::up(response_time_ms, Some(code)),
            _ => ProbeOutcome::down(
                ProbeError::UnexpectedStatus(code),
                Some(response_time_ms),
                Some(code),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::ProbeStatus;
    use axum::{Router, http::StatusCode, routing::get};
    use std::net::SocketAddr;

    async fn spawn_target() -> SocketAddr {
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/created", get(|| async { StatusCode::CREATED }))
            .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn success_status_is_up() {
        let addr = spawn_target().await;
        let outcome = HttpProber::default()
            .check(&format!("http://{addr}/ok"), Duration::from_secs(2), None)
            .await;

        assert_eq!(outcome.status, ProbeStatus::Up);
        assert_eq!(outcome.status_code, Some(200));
        assert!(outcome.response_time_ms.is_some());
        assert!(outcome.error_message.is_none());
    }

    #[tokio::test]
    async fn expected_status_must_match_exactly() {
        let addr = spawn_target().await;
        let prober = HttpProber::default();

        let matched = prober
            .check(&format!("http://{addr}/created"), Duration::from_secs(2), Some(201))
            .await;
        assert_eq!(matched.status, ProbeStatus::Up);

        let mismatched = prober
            .check(&format!("http://{addr}/ok"), Duration::from_secs(2), Some(201))
            .await;
        assert_eq!(mismatched.status, ProbeStatus::Down);
        assert_eq!(mismatched.status_code, Some(200));
        assert_eq!(
            mismatched.error_message.as_deref(),
            Some("Expected status 201, got 200")
        );
    }

    #[tokio::test]
    async fn server_error_is_down() {
        let addr = spawn_target().await;
        let outcome = HttpProber::default()
            .check(&format!("http://{addr}/broken"), Duration::from_secs(2), None)
            .await;

        assert_eq!(outcome.status, ProbeStatus::Down);
        assert_eq!(outcome.status_code, Some(500));
        assert_eq!(outcome.error_message.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn expected_error_status_is_still_down() {
        let addr = spawn_target().await;
        let outcome = HttpProber::default()
            .check(&format!("http://{addr}/broken"), Duration::from_secs(2), Some(500))
            .await;

        assert_eq!(outcome.status, ProbeStatus::Down);
        assert_eq!(outcome.status_code, Some(500));
        assert_eq!(outcome.error_message.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn slow_target_times_out() {
        let addr = spawn_target().await;
        let started = Instant::now();
        let outcome = HttpProber::default()
            .check(&format!("http://{addr}/slow"), Duration::from_secs(1), None)
            .await;

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(outcome.status, ProbeStatus::Down);
        assert_eq!(outcome.status_code, None);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("request timed out after 1s")
        );
    }

    #[tokio::test]
    async fn malformed_target_is_down_not_an_error() {
        let outcome = HttpProber::default()
            .check("not a url", Duration::from_secs(1), None)
            .await;
        assert_eq!(outcome.status, ProbeStatus::Down);
        assert!(outcome.error_message.is_some());
    }
}
