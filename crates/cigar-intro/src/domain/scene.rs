//! Scene model and the validated scene script.

use cigar_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::layout::Anchor;
use super::markup::MarkupLine;

/// Opaque reference to a visual asset, handed to the renderer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(pub String);

impl AssetRef {
    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the reference names no asset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for AssetRef {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Horizontal alignment of the scene text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlignment {
    /// Flush left.
    #[default]
    Left,
    /// Flush right.
    Right,
}

/// Overlay dimensions as renderer length strings (e.g. `"w-72"`, `"512px"`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverlaySize {
    /// Width.
    pub width: String,
    /// Height.
    pub height: String,
}

/// A visual state of the overlay during its entrance animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    /// Horizontal offset in pixels.
    pub x: f32,
    /// Vertical offset in pixels.
    pub y: f32,
    /// Uniform scale factor.
    pub scale: f32,
    /// Rotation in degrees.
    pub rotate: f32,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotate: 0.0,
            opacity: 1.0,
        }
    }
}

/// Entrance animation: the overlay moves from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Entrance {
    /// Starting pose.
    pub from: Pose,
    /// Resting pose.
    pub to: Pose,
}

/// Character (or decoration) drawn over the scene background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterOverlay {
    /// Image to draw; an empty reference draws an empty animated box.
    #[serde(default)]
    pub image: AssetRef,
    /// Slot the overlay is pinned to.
    #[serde(default)]
    pub anchor: Anchor,
    /// Overlay dimensions.
    #[serde(default)]
    pub size: OverlaySize,
    /// Entrance animation.
    #[serde(default)]
    pub entrance: Entrance,
}

/// One step of the narrative sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Ordinal identifier; unique and increasing across the script.
    pub id: u32,
    /// Label shown while the scene is active.
    pub location: String,
    /// Text lines revealed progressively, in order.
    pub text: Vec<String>,
    /// Background image.
    pub background: AssetRef,
    /// Optional overlay.
    #[serde(default)]
    pub character: Option<CharacterOverlay>,
    /// Text alignment.
    #[serde(default)]
    pub alignment: TextAlignment,
}

/// Validated, immutable list of scenes with parsed text markup.
///
/// The terminal scene is always the last element.
#[derive(Debug, Clone)]
pub struct SceneScript {
    scenes: Vec<Scene>,
    markup: Vec<Vec<MarkupLine>>,
}

impl SceneScript {
    /// Validates `scenes` and parses their text lines.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidScript` if the list is empty or scene ids
    /// are not strictly increasing.
    pub fn new(scenes: Vec<Scene>) -> Result<Self, DomainError> {
        if scenes.is_empty() {
            return Err(DomainError::InvalidScript(
                "a script needs at least one scene".into(),
            ));
        }
        for pair in scenes.windows(2) {
            if pair[1].id <= pair[0].id {
                return Err(DomainError::InvalidScript(format!(
                    "scene id {} follows {}; ids must be strictly increasing",
                    pair[1].id, pair[0].id
                )));
            }
        }
        let markup: Vec<Vec<MarkupLine>> = scenes
            .iter()
            .map(|scene| scene.text.iter().map(|l| MarkupLine::parse(l)).collect())
            .collect();
        Ok(Self { scenes, markup })
    }

    /// Number of scenes; never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of the terminal scene.
    #[must_use]
    pub fn terminal_index(&self) -> usize {
        self.scenes.len() - 1
    }

    /// True when `index` is the terminal scene.
    #[must_use]
    pub fn is_terminal(&self, index: usize) -> bool {
        index == self.terminal_index()
    }

    /// The scene at `index`.
    #[must_use]
    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    /// Parsed lines of the scene at `index`.
    #[must_use]
    pub fn lines(&self, index: usize) -> &[MarkupLine] {
        self.markup.get(index).map_or(&[], Vec::as_slice)
    }

    /// All scenes in order.
    #[must_use]
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }
}

#[cfg(test)]
pub(crate) fn scene(id: u32, text: &[&str]) -> Scene {
    Scene {
        id,
        location: format!("Location {id}"),
        text: text.iter().map(|&l| l.to_owned()).collect(),
        background: AssetRef::from("/bg.png"),
        character: None,
        alignment: TextAlignment::Left,
    }
}
