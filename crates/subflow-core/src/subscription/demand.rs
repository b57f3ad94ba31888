//! Demand accounting for pull-based flow control.
//!
//! [`Demand`] is the quantity a downstream consumer grants to authorize the
//! delivery of further values: either a finite count or unbounded. It behaves
//! as an extended natural number. Arithmetic saturates instead of overflowing
//! or going negative, and [`Demand::Unbounded`] absorbs both addition and
//! subtraction.

use std::fmt;
use std::ops::{Add, AddAssign};

/// Outstanding demand granted by a downstream consumer.
///
/// The consumer side increases demand (via
/// [`ReplaySubscription::request`](crate::ReplaySubscription::request) or by
/// returning a grant from
/// [`Downstream::receive`](crate::Downstream::receive)); the delivery path
/// spends one unit per forwarded value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Demand {
    /// Authorization for at most this many further values.
    Finite(u64),
    /// No limit on further values.
    Unbounded,
}

impl Demand {
    /// Zero demand.
    pub const NONE: Demand = Demand::Finite(0);

    /// Returns `true` if no further values are authorized.
    #[must_use]
    pub fn is_zero(self) -> bool {
        matches!(self, Demand::Finite(0))
    }

    /// Returns `true` if the demand is unbounded.
    #[must_use]
    pub fn is_unbounded(self) -> bool {
        matches!(self, Demand::Unbounded)
    }

    /// Returns the finite count, or `None` for unbounded demand.
    #[must_use]
    pub fn as_finite(self) -> Option<u64> {
        match self {
            Demand::Finite(n) => Some(n),
            Demand::Unbounded => None,
        }
    }

    /// Adds two demands.
    ///
    /// Finite sums saturate at `u64::MAX`; if either operand is unbounded the
    /// result is unbounded.
    #[must_use]
    pub fn saturating_add(self, rhs: Demand) -> Demand {
        match (self, rhs) {
            (Demand::Unbounded, _) | (_, Demand::Unbounded) => Demand::Unbounded,
            (Demand::Finite(a), Demand::Finite(b)) => Demand::Finite(a.saturating_add(b)),
        }
    }

    /// Subtracts `n` consumed units, saturating at zero.
    ///
    /// Unbounded demand is unaffected by consumption.
    #[must_use]
    pub fn saturating_sub(self, n: u64) -> Demand {
        match self {
            Demand::Unbounded => Demand::Unbounded,
            Demand::Finite(a) => Demand::Finite(a.saturating_sub(n)),
        }
    }
}

impl Add for Demand {
    type Output = Demand;

    fn add(self, rhs: Demand) -> Demand {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Demand {
    fn add_assign(&mut self, rhs: Demand) {
        *self = self.saturating_add(rhs);
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Demand::Finite(n) => write!(f, "{n}"),
            Demand::Unbounded => write!(f, "unbounded"),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
