//! Memory-placement hints for box lists.

use std::fmt;

/// Where a box list's arrays are expected to live.
///
/// This is a placement hint for downstream consumers (e.g. a data loader
/// handing batches to an accelerator). It never changes logical values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Residency {
    /// Ordinary pageable host memory.
    #[default]
    Host,
    /// Page-locked host memory, ready for asynchronous device copies.
    Pinned,
    /// Memory on the accelerator with the given ordinal.
    Device(u32),
}

impl fmt::Display for Residency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Residency::Host => write!(f, "host"),
            Residency::Pinned => write!(f, "pinned"),
            Residency::Device(ordinal) => write!(f, "device:{}", ordinal),
        }
    }
}
