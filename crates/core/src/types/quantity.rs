//! Cart line quantity, always within `1..=99`.

use serde::{Deserialize, Serialize};

/// Number of units of a product in a cart line.
///
/// Every constructor clamps or checks, so a `Quantity` outside
/// [`Quantity::MIN`]..=[`Quantity::MAX`] cannot exist. Deserialization clamps
/// as well, so a hand-edited stored cart never produces an invalid line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u32")]
pub struct Quantity(u8);

impl Quantity {
    /// Smallest quantity a cart line can hold.
    pub const MIN: Self = Self(1);
    /// Largest quantity a cart line can hold.
    pub const MAX: Self = Self(99);

    /// Create a quantity, clamping `value` into `1..=99`.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let clamped = value.clamp(i64::from(Self::MIN.0), i64::from(Self::MAX.0));
        // In range after the clamp above
        Self(u8::try_from(clamped).unwrap_or(Self::MAX.0))
    }

    /// Create a quantity only if `value` is already within range.
    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        let value = u8::try_from(value).ok()?;
        (Self::MIN.0..=Self::MAX.0)
            .contains(&value)
            .then_some(Self(value))
    }

    /// Get the quantity as a `u32`.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0 as u32
    }

    /// Add `extra` units, saturating at [`Quantity::MAX`].
    #[must_use]
    pub fn saturating_add(self, extra: Self) -> Self {
        Self::clamped(i64::from(self.get()) + i64::from(extra.get()))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
