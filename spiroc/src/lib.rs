//! # SPIROC
//!
//! Configuration tooling for the SPIROC2b/2d front-end ASICs of the WAGASCI detectors: editing
//! and decoding of the slow control bitstream, the acquisition and calibration XML documents and
//! the detector topology, also exported through a C ABI.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bitstream;
pub mod core;
pub mod decode;
pub mod ffi;
pub mod prelude;
#[cfg(feature = "python")]
mod python;
pub mod settings;
pub mod topology;
pub mod xml;
