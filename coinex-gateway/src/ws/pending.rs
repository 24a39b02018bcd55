//! Correlation table for in-flight requests.

use super::message::ResponseEnvelope;
use coinex_core::error::{CoinExError, NetworkError};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

type Completion = oneshot::Sender<Result<ResponseEnvelope, CoinExError>>;

/// Pending requests keyed by correlation id.
///
/// Each entry completes exactly once: on a matching response, on disconnect,
/// or by being dropped when its [`PendingGuard`] goes out of scope.
#[derive(Debug, Default, Clone)]
pub(crate) struct PendingRequests {
    entries: Arc<DashMap<u64, Completion>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` and returns the guard that owns its slot.
    pub fn register(
        &self,
        id: u64,
    ) -> (
        PendingGuard,
        oneshot::Receiver<Result<ResponseEnvelope, CoinExError>>,
    ) {
        let (tx, rx) = oneshot::channel();
        self.entries.insert(id, tx);
        (
            PendingGuard {
                id,
                entries: Arc::clone(&self.entries),
            },
            rx,
        )
    }

    /// Completes the request answered by `envelope`.
    ///
    /// Returns false when nothing waits on that id, which is the case for
    /// pushes, fire-and-forget sends and late responses.
    pub fn complete(&self, envelope: &ResponseEnvelope) -> bool {
        if envelope.id == 0 {
            return false;
        }
        let Some((_, tx)) = self.entries.remove(&envelope.id) else {
            return false;
        };
        let outcome = envelope
            .clone()
            .into_result()
            .map_err(CoinExError::from);
        tx.send(outcome).is_ok()
    }

    /// Fails every in-flight request; ids restart on the next connection.
    pub fn fail_all(&self, reason: &str) -> usize {
        let ids: Vec<u64> = self.entries.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, tx)) = self.entries.remove(&id) {
                let _ = tx.send(Err(NetworkError::closed(reason).into()));
                failed += 1;
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Removes its entry when dropped, whatever the outcome of the request.
#[derive(Debug)]
pub(crate) struct PendingGuard {
    id: u64,
    entries: Arc<DashMap<u64, Completion>>,
}

impl PendingGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.entries.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(id: u64, code: i64) -> ResponseEnvelope {
        ResponseEnvelope {
            id,
            code,
            method: None,
            data: json!({"id": id}),
            message: "OK".to_string(),
        }
    }

    #[tokio::test]
    async fn test_out_of_order_completion() {
        let pending = PendingRequests::new();
        let (_g1, rx1) = pending.register(1);
        let (_g2, rx2) = pending.register(2);

        assert!(pending.complete(&response(2, 0)));
        assert!(pending.complete(&response(1, 0)));

        assert_eq!(rx1.await.unwrap().unwrap().data["id"], 1);
        assert_eq!(rx2.await.unwrap().unwrap().data["id"], 2);
    }

    #[tokio::test]
    async fn test_nonzero_code_is_api_error() {
        let pending = PendingRequests::new();
        let (_guard, rx) = pending.register(4);
        pending.complete(&response(4, 3008));

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.as_api_error().map(|e| e.code), Some(3008));
    }

    #[test]
    fn test_guard_drop_discards_late_response() {
        let pending = PendingRequests::new();
        let (guard, _rx) = pending.register(9);
        assert_eq!(guard.id(), 9);
        drop(guard);

        assert_eq!(pending.len(), 0);
        assert!(!pending.complete(&response(9, 0)));
    }

    #[tokio::test]
    async fn test_fail_all() {
        let pending = PendingRequests::new();
        let (_g1, rx1) = pending.register(1);
        let (_g2, rx2) = pending.register(2);

        assert_eq!(pending.fail_all("transport closed"), 2);
        assert!(rx1.await.unwrap().unwrap_err().is_recoverable());
        assert!(matches!(
            rx2.await.unwrap().unwrap_err().as_network_error(),
            Some(NetworkError::ConnectionClosed { .. })
        ));
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn test_push_never_completes() {
        let pending = PendingRequests::new();
        let (_guard, _rx) = pending.register(1);
        assert!(!pending.complete(&response(0, 0)));
        assert_eq!(pending.len(), 1);
    }
}
