//! Utility modules for edgemon.

mod bounded;

pub use bounded::{BoundedVec, CapacityError};
