//! # SPIROC Utilities
//!
//! This small library contains the file formats used to configure SPIROC front-end ASICs: the
//! CSV register-layout tables and the single line hexadecimal bitstream text.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod hex;
pub mod layout;
