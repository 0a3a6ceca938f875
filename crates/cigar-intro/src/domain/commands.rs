//! Commands accepted by a running intro.

/// User input forwarded to a sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroCommand {
    /// Manual step forward.
    Next,
    /// Manual step back.
    Previous,
    /// Activate the terminal call-to-action.
    Activate,
}

impl IntroCommand {
    /// Name used when logging the command.
    #[must_use]
    pub const fn command_type(self) -> &'static str {
        match self {
            Self::Next => "intro.next",
            Self::Previous => "intro.previous",
            Self::Activate => "intro.activate",
        }
    }
}
