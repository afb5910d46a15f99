#![cfg_attr(not(feature = "std"), no_std)]

//! Driver for the SLT5006 soil moisture/EC/temperature sensor, speaking its
//! fixed-format binary command/response protocol over a half-duplex serial
//! link at 9600 baud.

/// The no_std enclave
pub mod core;

pub use self::core::*;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
