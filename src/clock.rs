//! Host time source
//!
//! `embedded-hal` covers blocking delays but has no monotonic clock, so the
//! polling loops in [`Sx1276`](crate::Sx1276) take their deadline from this trait.

/// Monotonic millisecond clock with a cooperative yield point
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed epoch. Must never go backwards.
    fn now_ms(&mut self) -> u64;

    /// Called between two polls of a completion flag.
    ///
    /// Cooperative schedulers can hand control to other tasks here. The default
    /// does nothing and the driver keeps polling.
    fn yield_now(&mut self) {}
}
