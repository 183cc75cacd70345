// ── Per-interface mutation lock ──

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes mutations of a named interface across loops.
///
/// Cloning shares the same lock table.
#[derive(Debug, Clone, Default)]
pub struct InterfaceGuard {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl InterfaceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`. Released on drop.
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        // Clone the mutex out so no map shard stays locked across the await.
        let mutex = Arc::clone(
            self.locks
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        mutex.lock_owned().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn same_interface_is_exclusive() {
        let guard = InterfaceGuard::new();
        let held = guard.lock("eth0").await;

        let other = guard.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock("eth0").await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        // A different interface is independent.
        let _wlan = guard.lock("wlan0").await;

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn release_wakes_the_waiter() {
        let guard = InterfaceGuard::new();
        let held = tokio_test::block_on(guard.lock("eth0"));

        let mut waiter = tokio_test::task::spawn(guard.lock("eth0"));
        tokio_test::assert_pending!(waiter.poll());

        drop(held);
        assert!(waiter.is_woken());
        let _reacquired = tokio_test::assert_ready!(waiter.poll());
    }
}
