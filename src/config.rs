use core::time::Duration;

include!(concat!(env!("OUT_DIR"), "/build_constants.rs"));

////////////////////////////////////////////////////////////////////////////////////////////////////
// Config
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A type containing configuration parameters for the epoch manager.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    epoch_length: Duration,
}

/***** impl Default *******************************************************************************/

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/***** impl inherent ******************************************************************************/

impl Config {
    /// Creates a new default [`Config`].
    #[inline]
    pub const fn new() -> Self {
        Self { epoch_length: Duration::from_millis(DEFAULT_EPOCH_LENGTH_MS) }
    }

    /// Creates a new [`Config`] with the given epoch length.
    ///
    /// The epoch length is the interval at which the driver advances the
    /// global epoch. Any transaction outliving `RING_SIZE` epoch lengths
    /// violates the ring invariant of its local context.
    #[inline]
    pub fn with_epoch_length(epoch_length: Duration) -> Self {
        assert!(epoch_length.as_nanos() > 0, "the epoch length must be larger than zero");
        Self { epoch_length }
    }

    /// Returns the epoch length of the [`Config`].
    #[inline]
    pub fn epoch_length(self) -> Duration {
        self.epoch_length
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// ConfigBuilder
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A builder type for [`Config`] instances.
#[derive(Copy, Clone, Debug, Default)]
pub struct ConfigBuilder {
    epoch_length: Option<Duration>,
}

impl ConfigBuilder {
    /// Creates a new [`ConfigBuilder`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the epoch length.
    #[inline]
    pub fn epoch_length(mut self, epoch_length: Duration) -> Self {
        self.epoch_length = Some(epoch_length);
        self
    }

    /// Consumes the builder and creates a new [`Config`] instance with the
    /// configured parameters or their default values, if they were not set.
    #[inline]
    pub fn build(self) -> Config {
        Config {
            epoch_length: self
                .epoch_length
                .unwrap_or_else(|| Duration::from_millis(DEFAULT_EPOCH_LENGTH_MS)),
        }
    }
}
