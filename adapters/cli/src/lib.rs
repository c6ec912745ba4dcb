#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Terminal adapter that drives the GeoToken experience.
//!
//! The adapter translates line-oriented input into session commands, runs the
//! system loop against the authoritative world, persists after every mutating
//! batch, and presents the result through an ASCII rendering backend.

pub mod ascii;
pub mod session;
pub mod storage;
pub mod transfer;
