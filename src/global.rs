//! A process-wide manager instance.
//!
//! The manager is usually a process-wide singleton, initialized at program
//! start before any worker registers and torn down after all workers have
//! deregistered. This module provides an explicitly initialized handle; lazy
//! initialization racing with a worker is thereby ruled out.

use conquer_once::spin::OnceCell;

use crate::config::Config;
use crate::manager::EpochManager;

static MANAGER: OnceCell<EpochManager> = OnceCell::uninit();

/// Initializes the process-wide [`EpochManager`] with the given `config`.
///
/// Can only succeed once during the runtime of a program; later calls leave
/// the existing instance untouched.
#[inline]
pub fn init(config: Config) {
    MANAGER.init_once(|| EpochManager::with_config(config));
}

/// Returns the process-wide [`EpochManager`].
///
/// # Panics
///
/// Panics if [`init`] has not been called.
#[inline]
pub fn instance() -> &'static EpochManager {
    MANAGER.try_get().expect("the process-wide epoch manager is not initialized")
}
