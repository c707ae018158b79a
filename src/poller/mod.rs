//! Client side of the gate protocol.
//!
//! The poller asks the gate about one identifier until the gate releases the
//! payload, the server becomes unreachable, or the wait budget runs out:
//!
//! 1. Empty identifier → fail immediately, nothing is sent
//! 2. Success response → payload released, loop ends
//! 3. Non-success response → sleep `interval`, try again
//! 4. Transport error → fail immediately, no retry
//!
//! Polls never overlap. The budget is counted in whole intervals, so a
//! session that is never approved makes `ceil(timeout / interval)` attempts
//! regardless of round-trip time.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

pub mod executor;
pub mod transport;

use executor::PayloadExecutor;
use transport::{GateReply, GateTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Waiting,
    Granted,
    DeniedTimeout,
    FatalError,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("email required")]
    IdentifierRequired,

    #[error("cannot contact server: {0:#}")]
    Transport(anyhow::Error),

    #[error("timed out after {attempts} attempts ({}s); ask the admin to approve your email", .waited.as_secs())]
    Timeout { attempts: u32, waited: Duration },

    #[error("payload failed: {0:#}")]
    Execution(anyhow::Error),
}

impl PollError {
    /// Terminal state the session ended in.
    pub fn state(&self) -> PollState {
        match self {
            PollError::Timeout { .. } => PollState::DeniedTimeout,
            _ => PollState::FatalError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Granted {
    pub payload: Bytes,
    pub attempts: u32,
}

pub struct Poller<T> {
    transport: T,
    interval: Duration,
    timeout: Duration,
}

impl<T: GateTransport> Poller<T> {
    /// The interval must be non-zero: the budget only advances by one
    /// interval per attempt.
    pub fn new(transport: T, interval: Duration, timeout: Duration) -> anyhow::Result<Self> {
        if interval.is_zero() {
            anyhow::bail!("poll interval must be greater than zero");
        }
        Ok(Self {
            transport,
            interval,
            timeout,
        })
    }

    /// Poll until the payload is released. Does not execute it.
    pub async fn wait_for_access(&self, identifier: &str) -> Result<Granted, PollError> {
        if identifier.is_empty() {
            return Err(PollError::IdentifierRequired);
        }

        tracing::info!(identifier, "waiting for admin approval");

        let mut waited = Duration::ZERO;
        let mut attempts = 0u32;

        while waited < self.timeout {
            attempts += 1;
            match self.transport.check(identifier).await {
                Ok(GateReply::Released(payload)) => {
                    tracing::info!(attempts, "access granted");
                    return Ok(Granted { payload, attempts });
                }
                Ok(GateReply::NotYet { status, message }) => {
                    tracing::debug!(attempts, status, "still waiting: {}", message.trim());
                }
                Err(e) => {
                    tracing::error!(attempts, "gate unreachable: {:#}", e);
                    return Err(PollError::Transport(e));
                }
            }

            tokio::time::sleep(self.interval).await;
            waited += self.interval;
        }

        tracing::warn!(attempts, "gave up waiting for approval");
        Err(PollError::Timeout { attempts, waited })
    }

    /// Full client session: wait for access, then run the payload.
    pub async fn run<E: PayloadExecutor + ?Sized>(
        &self,
        identifier: &str,
        executor: &E,
    ) -> Result<Granted, PollError> {
        let granted = self.wait_for_access(identifier).await?;
        executor
            .execute(granted.payload.clone())
            .await
            .map_err(PollError::Execution)?;
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    /// Scripted transport: replies in order, then repeats the last reply.
    struct Scripted {
        replies: Mutex<Vec<Result<GateReply, String>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(replies: Vec<Result<GateReply, String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            }
        }

        fn never_approved() -> Self {
            Self::new(vec![Ok(not_yet())])
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GateTransport for Scripted {
        async fn check(&self, _identifier: &str) -> anyhow::Result<GateReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            let next = if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies[0].clone()
            };
            next.map_err(|e| anyhow::anyhow!(e))
        }
    }

    #[async_trait]
    impl<T: GateTransport> GateTransport for Arc<T> {
        async fn check(&self, identifier: &str) -> anyhow::Result<GateReply> {
            (**self).check(identifier).await
        }
    }

    fn not_yet() -> GateReply {
        GateReply::NotYet {
            status: 403,
            message: "// Access pending".into(),
        }
    }

    #[derive(Default)]
    struct Recording {
        ran: Mutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl PayloadExecutor for Recording {
        async fn execute(&self, payload: Bytes) -> anyhow::Result<()> {
            self.ran.lock().unwrap().push(payload);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl PayloadExecutor for Failing {
        async fn execute(&self, _payload: Bytes) -> anyhow::Result<()> {
            anyhow::bail!("interpreter exited with status 1")
        }
    }

    #[tokio::test]
    async fn test_empty_identifier_never_contacts_server() {
        let transport = Arc::new(Scripted::never_approved());
        let poller = Poller::new(transport.clone(), Duration::from_secs(3), Duration::from_secs(120)).unwrap();

        let err = poller.wait_for_access("").await.unwrap_err();
        assert!(matches!(err, PollError::IdentifierRequired));
        assert_eq!(err.state(), PollState::FatalError);
        assert_eq!(err.to_string(), "email required");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_approved_times_out_after_full_budget() {
        let transport = Arc::new(Scripted::never_approved());
        let poller = Poller::new(transport.clone(), Duration::from_secs(3), Duration::from_secs(120)).unwrap();

        let start = Instant::now();
        let err = poller.wait_for_access("a@x.com").await.unwrap_err();

        assert_eq!(err.state(), PollState::DeniedTimeout);
        match err {
            PollError::Timeout { attempts, waited } => {
                assert_eq!(attempts, 40);
                assert_eq!(waited, Duration::from_secs(120));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(transport.calls(), 40);
        assert_eq!(start.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_rejected() {
        let transport = Arc::new(Scripted::never_approved());
        let err = match Poller::new(transport.clone(), Duration::ZERO, Duration::from_secs(1)) {
            Ok(_) => panic!("zero interval must not build a poller"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("greater than zero"));
        assert_eq!(transport.calls(), 0);

        // smallest legal interval still terminates within the budget
        let poller = Poller::new(transport.clone(), Duration::from_nanos(1), Duration::from_nanos(5)).unwrap();
        let err = poller.wait_for_access("a@x.com").await.unwrap_err();
        assert!(matches!(err, PollError::Timeout { attempts: 5, .. }));
        assert_eq!(transport.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_granted_after_some_polls() {
        let transport = Arc::new(Scripted::new(vec![
            Ok(not_yet()),
            Ok(not_yet()),
            Ok(GateReply::Released(Bytes::from_static(b"go();"))),
        ]));
        let poller = Poller::new(transport.clone(), Duration::from_secs(3), Duration::from_secs(120)).unwrap();

        let start = Instant::now();
        let granted = poller.wait_for_access("a@x.com").await.unwrap();
        assert_eq!(granted.attempts, 3);
        assert_eq!(granted.payload, Bytes::from_static(b"go();"));
        // two sleeps between three polls, none after the grant
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_fatal_without_retry() {
        let transport = Arc::new(Scripted::new(vec![
            Ok(not_yet()),
            Err("connection refused".into()),
            Ok(GateReply::Released(Bytes::from_static(b"never"))),
        ]));
        let poller = Poller::new(transport.clone(), Duration::from_secs(3), Duration::from_secs(120)).unwrap();

        let err = poller.wait_for_access("a@x.com").await.unwrap_err();
        assert!(matches!(err, PollError::Transport(_)));
        assert_eq!(err.state(), PollState::FatalError);
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_run_executes_released_payload() {
        let transport = Scripted::new(vec![Ok(GateReply::Released(Bytes::from_static(b"go();")))]);
        let poller = Poller::new(transport, Duration::from_millis(10), Duration::from_secs(1)).unwrap();
        let executor = Recording::default();

        poller.run("a@x.com", &executor).await.unwrap();
        assert_eq!(*executor.ran.lock().unwrap(), vec![Bytes::from_static(b"go();")]);
    }

    #[tokio::test]
    async fn test_run_surfaces_executor_failure() {
        let transport = Arc::new(Scripted::new(vec![Ok(GateReply::Released(Bytes::from_static(b"go();")))]));
        let poller = Poller::new(transport.clone(), Duration::from_millis(10), Duration::from_secs(1)).unwrap();

        let err = poller.run("a@x.com", &Failing).await.unwrap_err();
        assert!(matches!(err, PollError::Execution(_)));
        assert_eq!(err.state(), PollState::FatalError);
        assert_eq!(err.to_string(), "payload failed: interpreter exited with status 1");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_does_not_execute_on_timeout() {
        let poller = Poller::new(
            Scripted::never_approved(),
            Duration::from_secs(3),
            Duration::from_secs(9),
        )
        .unwrap();
        let executor = Recording::default();

        let err = poller.run("a@x.com", &executor).await.unwrap_err();
        assert!(matches!(err, PollError::Timeout { attempts: 3, .. }));
        assert!(executor.ran.lock().unwrap().is_empty());
    }
}
