//! Anchor slots for character overlays and their layout coordinates.

use serde::{Deserialize, Serialize};

/// One of the nine slots a character overlay can be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    /// Top edge, left edge.
    TopLeft,
    /// Top edge, horizontally centered.
    TopCenter,
    /// Top edge, right edge.
    TopRight,
    /// Vertically centered, left edge.
    CenterLeft,
    /// Centered on both axes.
    #[default]
    Center,
    /// Vertically centered, right edge.
    CenterRight,
    /// Bottom edge, left edge.
    BottomLeft,
    /// Bottom edge, horizontally centered.
    BottomCenter,
    /// Bottom edge, right edge.
    BottomRight,
}

/// Container-relative position of an overlay.
///
/// `x` and `y` locate the overlay's origin as fractions of the container;
/// `translate_x` and `translate_y` shift it by fractions of the overlay's own
/// size, so `x = 1.0, translate_x = -1.0` pins the right edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    /// Horizontal origin as a fraction of the container width.
    pub x: f32,
    /// Vertical origin as a fraction of the container height.
    pub y: f32,
    /// Horizontal shift as a fraction of the overlay width.
    pub translate_x: f32,
    /// Vertical shift as a fraction of the overlay height.
    pub translate_y: f32,
}

impl Anchor {
    /// Every anchor, in reading order.
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// Layout coordinates for this anchor.
    #[must_use]
    pub const fn placement(self) -> Placement {
        let (x, translate_x) = match self {
            Self::TopLeft | Self::CenterLeft | Self::BottomLeft => (0.0, 0.0),
            Self::TopCenter | Self::Center | Self::BottomCenter => (0.5, -0.5),
            Self::TopRight | Self::CenterRight | Self::BottomRight => (1.0, -1.0),
        };
        let (y, translate_y) = match self {
            Self::TopLeft | Self::TopCenter | Self::TopRight => (0.0, 0.0),
            Self::CenterLeft | Self::Center | Self::CenterRight => (0.5, -0.5),
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight => (1.0, -1.0),
        };
        Placement {
            x,
            y,
            translate_x,
            translate_y,
        }
    }
}
