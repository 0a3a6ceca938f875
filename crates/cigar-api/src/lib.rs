//! $CIGAR Protocol API — hosts the story intro over HTTP.
//!
//! A front end mounts an intro session, renders the views it returns, and
//! forwards the visitor's navigation. When the visitor finishes the intro the
//! completion flag is persisted so later visits skip it.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
