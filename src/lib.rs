//! Umbrella package for the cross-crate tests under `tests/`.
//!
//! The IR lives in [`aero_msl_ir`] and the Metal backend in [`aero_msl`].

pub use aero_msl;
pub use aero_msl_ir;
