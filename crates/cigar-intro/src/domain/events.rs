//! Domain events for the story intro.

use cigar_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};

/// Why a scene became active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCause {
    /// The intro was mounted.
    Mounted,
    /// The visitor navigated.
    Manual,
    /// The auto-advance timer fired.
    AutoAdvance,
}

/// Emitted when a scene becomes active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneEntered {
    /// Position of the scene in the script.
    pub index: usize,
    /// The scene's id.
    pub scene_id: u32,
    /// Scene-activation generation.
    pub generation: u64,
    /// What triggered the change.
    pub cause: EntryCause,
}

/// Emitted when the active scene's text has fully rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRendered {
    /// Position of the scene in the script.
    pub index: usize,
    /// Scene-activation generation.
    pub generation: u64,
}

/// Emitted when the auto-advance timer is armed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAdvanceArmed {
    /// Position of the scene in the script.
    pub index: usize,
    /// Scene-activation generation that owns the timer.
    pub generation: u64,
    /// When the timer fires.
    pub fires_at: chrono::DateTime<chrono::Utc>,
}

/// Event payload variants for the story intro.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IntroEventKind {
    /// A scene became active.
    SceneEntered(SceneEntered),
    /// Text reveal finished.
    TextRendered(TextRendered),
    /// The auto-advance timer was armed.
    AutoAdvanceArmed(AutoAdvanceArmed),
    /// The first manual navigation turned auto-advance off for good.
    AutoAdvanceDisabled,
    /// The exit transition started.
    ExitStarted,
    /// The completion callback was invoked.
    Completed,
}

/// Domain event envelope for the story intro.
#[derive(Debug, Clone)]
pub struct IntroEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: IntroEventKind,
}

impl DomainEvent for IntroEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("IntroEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

impl IntroEventKind {
    /// Routing name of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SceneEntered(_) => "intro.scene_entered",
            Self::TextRendered(_) => "intro.text_rendered",
            Self::AutoAdvanceArmed(_) => "intro.auto_advance_armed",
            Self::AutoAdvanceDisabled => "intro.auto_advance_disabled",
            Self::ExitStarted => "intro.exit_started",
            Self::Completed => "intro.completed",
        }
    }
}
