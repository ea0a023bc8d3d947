//! Type safe epochs and composite transaction ids.

use core::fmt;
use core::ops::{Add, Sub};
use core::sync::atomic::{AtomicU64, Ordering};

////////////////////////////////////////////////////////////////////////////////////////////////////
// Epoch
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A monotonically increasing id for a coarse logical time slice.
///
/// Epochs are densely numbered and advanced at a fixed wall-clock rate by the
/// global epoch driver.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Epoch(u64);

/***** impl inherent ******************************************************************************/

impl Epoch {
    /// The largest representable epoch.
    ///
    /// Returned by the horizon reduction when no thread is registered and
    /// doubles as the uninitialized-tail sentinel of a local context.
    pub const MAX: Self = Self(u64::max_value());

    /// Creates a new [`Epoch`] with the given numeric id.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric epoch id.
    #[inline]
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

/***** impl Add/Sub *******************************************************************************/

impl Add<u64> for Epoch {
    type Output = Self;

    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Epoch {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0.wrapping_sub(rhs))
    }
}

/***** impl Display *******************************************************************************/

impl fmt::Display for Epoch {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// AtomicEpoch
////////////////////////////////////////////////////////////////////////////////////////////////////

/// An [`Epoch`] that can be mutated and observed concurrently.
pub(crate) struct AtomicEpoch(AtomicU64);

impl AtomicEpoch {
    #[inline]
    pub const fn new(epoch: Epoch) -> Self {
        Self(AtomicU64::new(epoch.0))
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> Epoch {
        Epoch(self.0.load(order))
    }

    #[inline]
    pub fn store(&self, epoch: Epoch, order: Ordering) {
        self.0.store(epoch.0, order);
    }

    /// Raises the stored epoch to `epoch` unless it is already larger.
    #[inline]
    pub fn fetch_max(&self, epoch: Epoch, order: Ordering) -> Epoch {
        Epoch(self.0.fetch_max(epoch.0, order))
    }

    /// Advances the stored epoch by one tick.
    #[inline]
    pub fn increment(&self, order: Ordering) -> Epoch {
        Epoch(self.0.fetch_add(1, order))
    }

    #[inline]
    pub fn compare_exchange(
        &self,
        current: Epoch,
        new: Epoch,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Epoch, Epoch> {
        self.0
            .compare_exchange(current.0, new.0, success, failure)
            .map(Epoch)
            .map_err(Epoch)
    }
}

impl fmt::Debug for AtomicEpoch {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("AtomicEpoch").field(&self.load(Ordering::Relaxed)).finish()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// TransactionId
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A 64-bit composite transaction id.
///
/// The top 32 bits carry the low 32 bits of the epoch during which the
/// transaction entered, the bottom 32 bits carry a per-issuance sequence
/// number. The layout is a public contract with the version visibility check
/// in the executor and must be preserved bit-for-bit.
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct TransactionId(u64);

/***** impl inherent ******************************************************************************/

impl TransactionId {
    const EPOCH_SHIFT: u32 = 32;

    #[inline]
    pub(crate) fn new(epoch: Epoch, sequence: u32) -> Self {
        Self((epoch.0 << Self::EPOCH_SHIFT) | u64::from(sequence))
    }

    /// Creates a [`TransactionId`] from its raw 64-bit representation.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw 64-bit representation.
    #[inline]
    pub fn into_raw(self) -> u64 {
        self.0
    }

    /// Extracts the epoch during which this transaction entered.
    ///
    /// Only the low 32 bits of the original epoch id are recoverable.
    #[inline]
    pub fn start_epoch(self) -> Epoch {
        Epoch(self.0 >> Self::EPOCH_SHIFT)
    }

    /// Extracts the issued sequence number.
    #[inline]
    pub fn sequence(self) -> u32 {
        self.0 as u32
    }
}

/***** impl Debug *********************************************************************************/

impl fmt::Debug for TransactionId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TransactionId")
            .field("epoch", &self.start_epoch())
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Epoch, TransactionId};

    #[test]
    fn compose_and_decompose() {
        let id = TransactionId::new(Epoch::new(7), 1234);
        assert_eq!(id.start_epoch(), Epoch::new(7));
        assert_eq!(id.sequence(), 1234);
        assert_eq!(id.into_raw(), (7 << 32) | 1234);
    }

    #[test]
    fn decode_fixed_layout() {
        let id = TransactionId::from_raw((0x0000_0000_1234_5678 << 32) | 0xDEAD_BEEF);
        assert_eq!(id.start_epoch(), Epoch::new(0x1234_5678));
        assert_eq!(id.sequence(), 0xDEAD_BEEF);
    }

    #[test]
    fn epoch_high_bits_truncate() {
        // only the low 32 bits of the epoch id survive the composition
        let id = TransactionId::new(Epoch::new(0xABCD_0000_0000_0001), 9);
        assert_eq!(id.start_epoch(), Epoch::new(1));
        assert_eq!(id.sequence(), 9);
    }

    #[test]
    fn epoch_arithmetic() {
        let epoch = Epoch::new(10);
        assert_eq!(epoch + 1, Epoch::new(11));
        assert_eq!(epoch - 1, Epoch::new(9));
        assert!(epoch < Epoch::MAX);
    }
}
