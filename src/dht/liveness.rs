//! Liveness checks
//!
//! The routing table never talks to the network. Whoever owns the transport
//! implements [`LivenessCheck`]; [`TimeoutLiveness`] bounds any checker so a
//! silent peer counts as dead instead of stalling an eviction forever.

use crate::dht::node::Contact;
use crate::error::RoutingError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// Probe reporting whether a contact still responds
#[async_trait]
pub trait LivenessCheck: Send + Sync {
    /// Ping `contact` and report whether it answered
    async fn is_alive(&self, contact: &Contact) -> bool;
}

#[async_trait]
impl<L: LivenessCheck + ?Sized> LivenessCheck for Arc<L> {
    async fn is_alive(&self, contact: &Contact) -> bool {
        (**self).is_alive(contact).await
    }
}

/// Checker with a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct StaticLiveness(pub bool);

#[async_trait]
impl LivenessCheck for StaticLiveness {
    async fn is_alive(&self, _contact: &Contact) -> bool {
        self.0
    }
}

/// Adapter for a synchronous predicate
pub struct FnLiveness<F>(pub F);

#[async_trait]
impl<F> LivenessCheck for FnLiveness<F>
where
    F: Fn(&Contact) -> bool + Send + Sync,
{
    async fn is_alive(&self, contact: &Contact) -> bool {
        (self.0)(contact)
    }
}

/// Bounds another checker with a timeout; a timeout counts as not alive
pub struct TimeoutLiveness<L> {
    inner: L,
    timeout: Duration,
}

impl<L: LivenessCheck> TimeoutLiveness<L> {
    /// Wrap `inner` with `timeout`
    pub fn new(inner: L, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Wrapped checker
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `contact`, reporting a timeout as an error
    pub async fn probe(&self, contact: &Contact) -> Result<bool, RoutingError> {
        trace!("Probing {} ({})", contact.id, contact.addr);
        tokio::time::timeout(self.timeout, self.inner.is_alive(contact))
            .await
            .map_err(|e| {
                RoutingError::liveness_error_full("Liveness probe timed out", contact.addr.to_string(), e.to_string())
            })
    }
}

#[async_trait]
impl<L: LivenessCheck> LivenessCheck for TimeoutLiveness<L> {
    async fn is_alive(&self, contact: &Contact) -> bool {
        match self.probe(contact).await {
            Ok(alive) => alive,
            Err(e) => {
                warn!("Treating {} as dead: {}", contact.id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::node::NodeId;

    struct SlowLiveness(Duration);

    #[async_trait]
    impl LivenessCheck for SlowLiveness {
        async fn is_alive(&self, _contact: &Contact) -> bool {
            tokio::time::sleep(self.0).await;
            true
        }
    }

    fn contact() -> Contact {
        Contact::new(NodeId::random(), "127.0.0.1:6881".parse().unwrap())
    }

    #[tokio::test]
    async fn test_static_liveness() {
        assert!(StaticLiveness(true).is_alive(&contact()).await);
        assert!(!StaticLiveness(false).is_alive(&contact()).await);
    }

    #[tokio::test]
    async fn test_fn_liveness() {
        let target = contact();
        let target_id = target.id;
        let check = FnLiveness(move |c: &Contact| c.id == target_id);
        assert!(check.is_alive(&target).await);
        assert!(!check.is_alive(&contact()).await);
    }

    #[tokio::test]
    async fn test_timeout_passes_through_fast_answer() {
        let check = TimeoutLiveness::new(StaticLiveness(true), Duration::from_secs(1));
        assert!(check.is_alive(&contact()).await);
        assert_eq!(check.timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_dead() {
        let check = TimeoutLiveness::new(SlowLiveness(Duration::from_secs(5)), Duration::from_millis(20));
        let c = contact();
        let err = check.probe(&c).await.unwrap_err();
        match &err {
            RoutingError::LivenessError { contact, source, .. } => {
                assert_eq!(contact.as_deref(), Some("127.0.0.1:6881"));
                assert!(source.is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().contains("contact: 127.0.0.1:6881"));
        assert!(!check.is_alive(&c).await);
    }

    #[tokio::test]
    async fn test_arc_liveness() {
        let check: Arc<dyn LivenessCheck> = Arc::new(StaticLiveness(true));
        assert!(check.is_alive(&contact()).await);
    }
}
