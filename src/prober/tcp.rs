use std::time::{Duration, Instant};
use tokio::net::TcpStream;

use super::{ProbeError, ProbeOutcome, elapsed_ms};

/// Connect-only check against `host:port`.
#[derive(Clone, Copy, Default)]
pub struct TcpProber;

impl TcpProber {
    pub async fn check(&self, target: &str, timeout: Duration) -> ProbeOutcome {
        let start_time = Instant::now();
        let result = tokio::time::timeout(timeout, TcpStream::connect(target)).await;
        let response_time_ms = elapsed_ms(start_time);

        match result {
            Ok(Ok(_stream)) => ProbeOutcome::up(response_time_ms, None),
            Ok(Err(e)) => ProbeOutcome::down(
                ProbeError::Transport(e.to_string()),
                Some(response_time_ms),
                None,
            ),
            Err(_) => ProbeOutcome::down(
                ProbeError::Timeout {
                    what: "connection",
                    after: timeout,
                },
                Some(response_time_ms),
                None,
            ),
        }
    }
}
