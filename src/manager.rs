//! The epoch manager façade.
//!
//! Owns the global epoch counter (through the shared driver state), the
//! registry of per-thread contexts and the transaction id allocator.
//!
//! On register:
//!   - allocate a fresh local context
//!   - publish it in the registry under the caller's thread id
//!
//! On the enter fast path:
//!   - sample the global epoch
//!   - enter the matching slot of the thread's own context, retrying with a
//!     fresh sample if a concurrent resynchronization got ahead
//!   - issue a composite transaction id
//!
//! The horizon reduction resynchronizes every registered context against the
//! current global epoch and returns the minimum local tail.

use std::collections::HashMap;
use std::sync::atomic::{
    AtomicU32,
    Ordering::{AcqRel, Acquire, Relaxed, Release},
};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::debug;
use spin::Mutex;

use crate::config::Config;
use crate::driver::{self, DriverState};
use crate::epoch::{Epoch, TransactionId};
use crate::local::LocalEpochContext;

/// The identifier a worker thread registers under.
pub type ThreadId = u64;

////////////////////////////////////////////////////////////////////////////////////////////////////
// EpochManager
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The decentralized epoch manager.
///
/// Worker threads register once, then enter and exit transactions against
/// their own per-thread state without touching shared data structures. A
/// reclamation consumer periodically calls
/// [`global_tail_epoch`][EpochManager::global_tail_epoch] to obtain the
/// system-wide epoch below which no transaction can observe anything.
#[derive(Debug)]
pub struct EpochManager {
    driver: Arc<DriverState>,
    contexts: Mutex<HashMap<ThreadId, Arc<LocalEpochContext>>>,
    next_txn_id: AtomicU32,
    driver_handle: Mutex<Option<JoinHandle<()>>>,
}

/***** impl inherent ******************************************************************************/

impl EpochManager {
    /// Creates a new manager with the default [`Config`].
    #[inline]
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Creates a new manager with the given `config`.
    #[inline]
    pub fn with_config(config: Config) -> Self {
        Self {
            driver: Arc::new(DriverState::new(config)),
            contexts: Mutex::new(HashMap::new()),
            next_txn_id: AtomicU32::new(0),
            driver_handle: Mutex::new(None),
        }
    }

    /// Registers the worker thread `thread_id` and allocates its context.
    ///
    /// Must be called before the thread's first
    /// [`enter`][EpochManager::enter].
    pub fn register_thread(&self, thread_id: ThreadId) {
        let context = Arc::new(LocalEpochContext::new());
        let previous = self.contexts.lock().insert(thread_id, context);
        debug_assert!(previous.is_none(), "thread id registered twice");
        debug!("registered thread {}", thread_id);
    }

    /// Deregisters the worker thread `thread_id` and destroys its context.
    ///
    /// Must happen-after the thread's last [`exit`][EpochManager::exit] has
    /// returned.
    pub fn deregister_thread(&self, thread_id: ThreadId) {
        let context = self.contexts.lock().remove(&thread_id);
        debug_assert!(context.is_some(), "deregister of unknown thread id");
        debug!("deregistered thread {}", thread_id);
    }

    /// Begins a read-write transaction on the worker thread `thread_id` and
    /// returns its composite transaction id.
    ///
    /// # Panics
    ///
    /// Panics if `thread_id` has not been registered.
    #[inline]
    pub fn enter(&self, thread_id: ThreadId) -> TransactionId {
        let context = self.context(thread_id);
        loop {
            // (MGR:1) this `Acquire` load synchronizes-with the `Release`
            // RMW (DRV:1)
            let epoch = self.driver.epoch.load(Acquire);
            if context.try_enter(epoch) {
                // uniqueness derives from the epoch high bits, so the
                // sequence allocation can stay relaxed and wrapping
                let sequence = self.next_txn_id.fetch_add(1, Relaxed);
                return TransactionId::new(epoch, sequence);
            }
            // refused: a resynchronization advanced the head past the
            // sampled epoch, re-sample and retry
        }
    }

    /// Ends the read-write transaction `txn_id` on the worker thread
    /// `thread_id`.
    #[inline]
    pub fn exit(&self, thread_id: ThreadId, txn_id: TransactionId) {
        self.context(thread_id).exit(txn_id.start_epoch());
    }

    /// Begins a read-only transaction on the worker thread `thread_id`.
    ///
    /// Read-only transactions receive ids from the same allocator but never
    /// delay the reclamation horizon.
    #[inline]
    pub fn enter_read_only(&self, thread_id: ThreadId) -> TransactionId {
        let context = self.context(thread_id);
        loop {
            let epoch = self.driver.epoch.load(Acquire);
            if context.try_enter_read_only(epoch) {
                let sequence = self.next_txn_id.fetch_add(1, Relaxed);
                return TransactionId::new(epoch, sequence);
            }
        }
    }

    /// Ends the read-only transaction `txn_id` on the worker thread
    /// `thread_id`.
    #[inline]
    pub fn exit_read_only(&self, thread_id: ThreadId, txn_id: TransactionId) {
        self.context(thread_id).exit_read_only(txn_id.start_epoch());
    }

    /// Computes the safe reclamation horizon: the minimum over all registered
    /// threads of the largest epoch each guarantees to hold no live
    /// read-write transactions.
    ///
    /// Resynchronizes every context against the current global epoch, so
    /// long-idle threads do not clamp the horizon. Returns [`Epoch::MAX`]
    /// when no thread is registered.
    pub fn global_tail_epoch(&self) -> Epoch {
        // (MGR:2) this `Acquire` load synchronizes-with the `Release` RMW (DRV:1)
        let global_epoch = self.driver.epoch.load(Acquire);

        // snapshot the handles so the reduction visits the contexts without
        // holding the registry lock
        let contexts: Vec<_> = self.contexts.lock().values().cloned().collect();

        contexts
            .iter()
            .map(|context| context.resync_and_advance(global_epoch))
            .min()
            .unwrap_or(Epoch::MAX)
    }

    /// Returns the current global epoch.
    #[inline]
    pub fn current_epoch(&self) -> Epoch {
        self.driver.epoch.load(Acquire)
    }

    /// Launches the global epoch driver. No-op if it is already running.
    pub fn start(&self) {
        if self.driver.running.swap(true, AcqRel) {
            return;
        }

        let handle =
            driver::spawn(Arc::clone(&self.driver)).expect("failed to spawn the epoch driver");
        *self.driver_handle.lock() = Some(handle);
    }

    /// Stops the global epoch driver and joins it. No-op if it is already
    /// stopped.
    pub fn stop(&self) {
        if !self.driver.running.swap(false, AcqRel) {
            return;
        }

        if let Some(handle) = self.driver_handle.lock().take() {
            handle.join().expect("the epoch driver panicked");
        }
    }

    /// Administrative rebase of the global epoch counter.
    ///
    /// # Panics
    ///
    /// Panics if the driver is running or any thread is registered; the
    /// global epoch must stay monotonic during normal operation.
    pub fn reset(&self, epoch: Epoch) {
        assert!(!self.driver.running.load(Acquire), "reset requires a stopped driver");
        assert!(self.contexts.lock().is_empty(), "reset requires an empty registry");
        self.driver.epoch.store(epoch, Release);
    }

    #[inline]
    fn context(&self, thread_id: ThreadId) -> Arc<LocalEpochContext> {
        self.contexts
            .lock()
            .get(&thread_id)
            .cloned()
            .expect("thread id is not registered")
    }
}

/***** impl Default *******************************************************************************/

impl Default for EpochManager {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/***** impl Drop **********************************************************************************/

impl Drop for EpochManager {
    #[inline]
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering::Release;

    use crate::epoch::Epoch;

    use super::EpochManager;

    /// Advances the global epoch without a driver thread, keeping the
    /// scenarios deterministic.
    fn tick(manager: &EpochManager, ticks: u64) {
        for _ in 0..ticks {
            manager.driver.epoch.increment(Release);
        }
    }

    #[test]
    fn empty_registry_yields_max_horizon() {
        let manager = EpochManager::new();
        assert_eq!(manager.global_tail_epoch(), Epoch::MAX);
    }

    #[test]
    fn horizon_trails_the_global_epoch_by_one() {
        let manager = EpochManager::new();
        manager.register_thread(1);

        let txn = manager.enter(1);
        manager.exit(1, txn);

        tick(&manager, 1);
        assert_eq!(manager.global_tail_epoch(), manager.current_epoch() - 1);
    }

    #[test]
    fn long_reader_pins_the_horizon() {
        let manager = EpochManager::new();
        manager.register_thread(1);
        manager.register_thread(2);

        let pinning = manager.enter(1);
        let entry_epoch = pinning.start_epoch();
        tick(&manager, 5);

        // a second worker churning through transactions does not move the
        // horizon while the long reader is live
        for _ in 0..2 {
            let txn = manager.enter(2);
            manager.exit(2, txn);
            assert_eq!(manager.global_tail_epoch(), entry_epoch - 1);
        }

        manager.exit(1, pinning);
        tick(&manager, 1);
        assert_eq!(manager.global_tail_epoch(), entry_epoch + 5);
    }

    #[test]
    fn idle_thread_is_resynchronized() {
        let manager = EpochManager::new();
        manager.register_thread(1);

        tick(&manager, 100);
        assert_eq!(manager.global_tail_epoch(), manager.current_epoch() - 1);
    }

    #[test]
    fn read_only_transactions_do_not_pin_the_horizon() {
        let manager = EpochManager::new();
        manager.register_thread(1);

        let txn = manager.enter_read_only(1);
        tick(&manager, 5);
        assert_eq!(manager.global_tail_epoch(), manager.current_epoch() - 1);
        manager.exit_read_only(1, txn);
    }

    #[test]
    fn enter_converges_after_a_resynchronization() {
        let manager = EpochManager::new();
        manager.register_thread(1);

        // a reduction observes the advanced global epoch before the worker
        // samples it
        tick(&manager, 5);
        manager.context(1).resync_and_advance(manager.current_epoch());

        let txn = manager.enter(1);
        assert_eq!(txn.start_epoch(), manager.current_epoch());
        manager.exit(1, txn);
    }

    #[test]
    fn sequences_are_distinct_within_an_epoch() {
        let manager = EpochManager::new();
        manager.register_thread(1);

        let first = manager.enter(1);
        let second = manager.enter(1);
        assert_eq!(first.start_epoch(), second.start_epoch());
        assert_ne!(first.sequence(), second.sequence());

        manager.exit(1, second);
        manager.exit(1, first);
    }

    #[test]
    fn reset_rebases_the_global_epoch() {
        let manager = EpochManager::new();
        manager.reset(Epoch::new(100));
        assert_eq!(manager.current_epoch(), Epoch::new(100));

        manager.register_thread(1);
        let txn = manager.enter(1);
        assert_eq!(txn.start_epoch(), Epoch::new(100));
        manager.exit(1, txn);
    }

    #[test]
    #[should_panic(expected = "empty registry")]
    fn reset_with_registered_threads_is_refused() {
        let manager = EpochManager::new();
        manager.register_thread(1);
        manager.reset(Epoch::new(100));
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn enter_before_register_is_a_contract_violation() {
        let manager = EpochManager::new();
        let _ = manager.enter(7);
    }

    #[test]
    fn deregistered_threads_release_the_horizon() {
        let manager = EpochManager::new();
        manager.register_thread(1);
        manager.register_thread(2);

        let pinning = manager.enter(1);
        tick(&manager, 3);
        assert_eq!(manager.global_tail_epoch(), pinning.start_epoch() - 1);

        manager.exit(1, pinning);
        manager.deregister_thread(1);
        manager.deregister_thread(2);
        assert_eq!(manager.global_tail_epoch(), Epoch::MAX);
    }
}
