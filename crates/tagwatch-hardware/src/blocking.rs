//! Handles that live on the blocking thread pool.
//!
//! A [`BlockingCell`] keeps its value behind a lock instead of moving it in
//! and out of each blocking task. A caller that stops awaiting a run leaves
//! the task to finish on its own; the value stays in the cell and the next
//! run waits for the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{HardwareError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A blocking handle shared with [`tokio::task::spawn_blocking`] tasks.
pub(crate) struct BlockingCell<T> {
    label: String,
    inner: Arc<Mutex<Option<T>>>,
}

impl<T: Send + 'static> BlockingCell<T> {
    /// Wrap `value`. `label` names it in errors once it is released.
    pub(crate) fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            inner: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// Run `op` against the value on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Disconnected`] once the value has been
    /// released, or whatever `op` returns.
    pub(crate) async fn run<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&T) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let label = self.label.clone();

        tokio::task::spawn_blocking(move || {
            let guard = lock(&inner);
            let value = guard
                .as_ref()
                .ok_or_else(|| HardwareError::disconnected(label))?;
            op(value)
        })
        .await
        .map_err(|e| HardwareError::other(format!("Blocking task failed: {e}")))?
    }

    /// Take the value out and hand it to `op`. Does nothing when already
    /// released.
    pub(crate) async fn release<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(T) -> Result<()> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || match lock(&inner).take() {
            Some(value) => op(value),
            None => Ok(()),
        })
        .await
        .map_err(|e| HardwareError::other(format!("Blocking task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_result() {
        let cell = BlockingCell::new("counter", AtomicUsize::new(41));
        let value = cell
            .run(|n| Ok(n.fetch_add(1, Ordering::SeqCst) + 1))
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_abandoned_run_keeps_value() {
        let cell = BlockingCell::new("counter", AtomicUsize::new(0));

        let slow = cell.run(|n| {
            std::thread::sleep(Duration::from_millis(300));
            n.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(
            tokio::time::timeout(Duration::from_millis(50), slow)
                .await
                .is_err()
        );

        // Waits for the abandoned run, then sees its effect
        let seen = cell.run(|n| Ok(n.load(Ordering::SeqCst))).await.unwrap();
        assert_eq!(seen, 1);

        let again = cell.run(|n| Ok(n.load(Ordering::SeqCst))).await.unwrap();
        assert_eq!(again, 1);
    }

    #[tokio::test]
    async fn test_release() {
        let cell = BlockingCell::new("card", AtomicUsize::new(7));

        let released = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&released);
        cell.release(move |n| {
            seen.store(n.into_inner(), Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 7);

        let result = cell.run(|n| Ok(n.load(Ordering::SeqCst))).await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));

        // Releasing twice is a no-op
        cell.release(|_| Err(HardwareError::other("unreachable")))
            .await
            .unwrap();
    }
}
