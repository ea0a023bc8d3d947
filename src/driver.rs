//! The global epoch driver.
//!
//! A single dedicated timer thread advances the global epoch once per
//! configured interval. It is the sole writer of the global epoch outside the
//! administrative reset hook.

use core::time::Duration;

use std::io;
use std::sync::atomic::{
    AtomicBool,
    Ordering::{Acquire, Release},
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::debug;

use crate::config::Config;
use crate::epoch::{AtomicEpoch, Epoch};

////////////////////////////////////////////////////////////////////////////////////////////////////
// DriverState
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The state shared between the epoch manager and its driver thread.
#[derive(Debug)]
pub(crate) struct DriverState {
    /// The global epoch counter, initialized to 1.
    pub epoch: AtomicEpoch,
    /// Flag observed by the driver loop between ticks.
    pub running: AtomicBool,
    epoch_length: Duration,
}

/***** impl inherent ******************************************************************************/

impl DriverState {
    #[inline]
    pub fn new(config: Config) -> Self {
        Self {
            epoch: AtomicEpoch::new(Epoch::new(1)),
            running: AtomicBool::new(false),
            epoch_length: config.epoch_length(),
        }
    }
}

/***** free functions *****************************************************************************/

/// Spawns the driver loop on a dedicated named thread.
pub(crate) fn spawn(state: Arc<DriverState>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("epoch-driver".into()).spawn(move || run(state))
}

fn run(state: Arc<DriverState>) {
    debug!("epoch driver started, tick length {:?}", state.epoch_length);

    loop {
        thread::sleep(state.epoch_length);
        if !state.running.load(Acquire) {
            break;
        }

        // (DRV:1) this `Release` RMW synchronizes-with the `Acquire` loads
        // (MGR:1) and (MGR:2)
        state.epoch.increment(Release);
    }

    debug!("epoch driver stopped at epoch {}", state.epoch.load(Acquire));
}
