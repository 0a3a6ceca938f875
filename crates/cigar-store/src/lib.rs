//! $CIGAR Store — durable "intro completed" flag.

pub mod file_completion_store;
