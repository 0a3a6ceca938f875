//! Domain model for the story intro.

pub mod commands;
pub mod events;
pub mod layout;
pub mod markup;
pub mod reveal;
pub mod scene;
pub mod sequencer;
