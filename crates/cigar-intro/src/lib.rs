//! $CIGAR Protocol — story intro scene sequencer.
//!
//! Responsible for presenting the narrative scenes one at a time, revealing
//! their text progressively, advancing automatically or on request, and
//! notifying the owner exactly once when the visitor activates the final
//! call-to-action.

pub mod application;
pub mod domain;
