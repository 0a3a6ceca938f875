//! $CIGAR Core — shared abstractions.
//!
//! This crate defines the traits and types that the intro sequencer, the
//! completion store and the API server depend on. It contains no
//! infrastructure code.

pub mod clock;
pub mod error;
pub mod event;
pub mod store;
