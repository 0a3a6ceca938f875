//! Shared test doubles and utilities for the $CIGAR Protocol story intro.

mod clock;
mod completion;
mod store;

pub use clock::{FixedClock, ManualClock, epoch};
pub use completion::CompletionCounter;
pub use store::{FailingCompletionStore, InMemoryCompletionStore};
