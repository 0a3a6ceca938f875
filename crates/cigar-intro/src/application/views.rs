//! Read-only views handed to renderers and API clients.

use serde::Serialize;

use crate::domain::layout::{Anchor, Placement};
use crate::domain::markup::Run;
use crate::domain::scene::{CharacterOverlay, Entrance, OverlaySize, SceneScript, TextAlignment};
use crate::domain::sequencer::SceneSequencer;

/// One dot of the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressMarker {
    /// Scene index the marker stands for.
    pub index: usize,
    /// True for the active scene.
    pub active: bool,
}

/// Progress indicator for `count` scenes with `current` active.
#[must_use]
pub fn progress_markers(current: usize, count: usize) -> Vec<ProgressMarker> {
    (0..count)
        .map(|index| ProgressMarker {
            index,
            active: index == current,
        })
        .collect()
}

/// How the scene content block is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentLayout {
    /// Regular scene: location label on top, text aligned left.
    Left,
    /// Regular scene: location label on top, text aligned right.
    Right,
    /// Terminal scene: text and call-to-action centered, no location label.
    Centered,
}

/// Character overlay with its anchor resolved to layout coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayView {
    /// Image to draw, if any.
    pub image: Option<String>,
    /// Anchor slot.
    pub anchor: Anchor,
    /// Coordinates for the anchor.
    pub placement: Placement,
    /// Overlay dimensions.
    pub size: OverlaySize,
    /// Entrance animation.
    pub entrance: Entrance,
}

impl From<&CharacterOverlay> for OverlayView {
    fn from(overlay: &CharacterOverlay) -> Self {
        Self {
            image: (!overlay.image.is_empty()).then(|| overlay.image.as_str().to_owned()),
            anchor: overlay.anchor,
            placement: overlay.anchor.placement(),
            size: overlay.size.clone(),
            entrance: overlay.entrance,
        }
    }
}

fn content_layout(alignment: TextAlignment, terminal: bool) -> ContentLayout {
    match (terminal, alignment) {
        (true, _) => ContentLayout::Centered,
        (false, TextAlignment::Left) => ContentLayout::Left,
        (false, TextAlignment::Right) => ContentLayout::Right,
    }
}

/// Everything a renderer needs to draw the sequencer right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequencerView {
    /// Index of the active scene.
    pub current_index: usize,
    /// Number of scenes.
    pub scene_count: usize,
    /// Id of the active scene.
    pub scene_id: u32,
    /// Location label; absent on the terminal scene.
    pub location: Option<String>,
    /// Background asset.
    pub background: String,
    /// Character overlay.
    pub character: Option<OverlayView>,
    /// Content layout.
    pub layout: ContentLayout,
    /// Revealed text so far, one run list per source line.
    pub lines: Vec<Vec<Run>>,
    /// True once the active scene's text has fully rendered.
    pub text_render_complete: bool,
    /// False once the visitor has navigated manually.
    pub auto_advance_enabled: bool,
    /// True once the call-to-action was activated.
    pub exiting: bool,
    /// True once the completion callback fired.
    pub completed: bool,
    /// Whether the back arrow is enabled.
    pub can_go_back: bool,
    /// Whether the forward arrow is enabled.
    pub can_go_forward: bool,
    /// Whether the terminal call-to-action is shown.
    pub call_to_action_visible: bool,
    /// Progress indicator.
    pub progress: Vec<ProgressMarker>,
}

impl SequencerView {
    /// Snapshot of `sequencer`.
    #[must_use]
    pub fn of(sequencer: &SceneSequencer) -> Self {
        let script = sequencer.script();
        let index = sequencer.current_index();
        let terminal = sequencer.is_terminal();
        let exiting = sequencer.is_exiting();
        let reveal = sequencer.reveal();

        let mut lines: Vec<Vec<Run>> = script
            .lines(index)
            .iter()
            .enumerate()
            .map(|(i, line)| line.truncated(reveal.revealed_chars(i)))
            .collect();
        while lines.last().is_some_and(Vec::is_empty) {
            lines.pop();
        }

        let scene = script.scene(index);
        Self {
            current_index: index,
            scene_count: script.len(),
            scene_id: scene.map_or(0, |s| s.id),
            location: scene
                .filter(|_| !terminal)
                .map(|s| s.location.clone()),
            background: scene.map(|s| s.background.as_str().to_owned()).unwrap_or_default(),
            character: scene.and_then(|s| s.character.as_ref()).map(OverlayView::from),
            layout: content_layout(scene.map(|s| s.alignment).unwrap_or_default(), terminal),
            lines,
            text_render_complete: sequencer.text_render_complete(),
            auto_advance_enabled: sequencer.auto_advance_enabled(),
            exiting,
            completed: sequencer.is_completed(),
            can_go_back: index > 0 && !exiting,
            can_go_forward: !terminal && !exiting,
            call_to_action_visible: terminal && reveal.all_chars_typed(),
            progress: progress_markers(index, script.len()),
        }
    }
}

/// A scene as listed by the script view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneView {
    /// Scene id.
    pub id: u32,
    /// Location label.
    pub location: String,
    /// Background asset.
    pub background: String,
    /// Character overlay.
    pub character: Option<OverlayView>,
    /// Content layout.
    pub layout: ContentLayout,
    /// Fully parsed text lines.
    pub lines: Vec<Vec<Run>>,
    /// Visible characters per line.
    pub line_lengths: Vec<usize>,
}

/// Whole-script listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptView {
    /// Scenes in presentation order.
    pub scenes: Vec<SceneView>,
}

impl ScriptView {
    /// Listing of `script`.
    #[must_use]
    pub fn of(script: &SceneScript) -> Self {
        let scenes = script
            .scenes()
            .iter()
            .enumerate()
            .map(|(index, scene)| {
                let markup = script.lines(index);
                SceneView {
                    id: scene.id,
                    location: scene.location.clone(),
                    background: scene.background.as_str().to_owned(),
                    character: scene.character.as_ref().map(OverlayView::from),
                    layout: content_layout(scene.alignment, script.is_terminal(index)),
                    lines: markup.iter().map(|line| line.runs().to_vec()).collect(),
                    line_lengths: markup.iter().map(|line| line.visible_chars()).collect(),
                }
            })
            .collect();
        Self { scenes }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::script::default_script;
    use crate::domain::markup::RunStyle;
    use crate::domain::scene::scene;
    use crate::domain::sequencer::SequencerConfig;
    use cigar_core::clock::Clock;
    use cigar_test_support::{CompletionCounter, ManualClock};

    #[test]
    fn test_progress_marks_only_the_current_scene() {
        let markers = progress_markers(2, 4);

        let active: Vec<bool> = markers.iter().map(|m| m.active).collect();
        assert_eq!(active, vec![false, false, true, false]);
    }

    #[test]
    fn test_view_shows_partially_revealed_text() {
        // Arrange
        let script = SceneScript::new(vec![scene(1, &["abc<br>", "de"]), scene(2, &["f"])]).unwrap();
        let clock = ManualClock::at_epoch();
        let counter = CompletionCounter::new();
        let mut sequencer = SceneSequencer::new(
            Arc::new(script),
            SequencerConfig::default(),
            clock.now(),
            counter.callback(),
        );

        // Act: two characters at 50ms each.
        clock.advance_ms(100);
        sequencer.tick(clock.now());
        let view = SequencerView::of(&sequencer);

        // Assert
        assert_eq!(
            view.lines,
            vec![vec![Run::Text {
                text: "ab".into(),
                style: RunStyle::Plain,
            }]]
        );
        assert_eq!(view.location.as_deref(), Some("Location 1"));
        assert_eq!(view.layout, ContentLayout::Left);
        assert!(!view.can_go_back);
        assert!(view.can_go_forward);
        assert!(!view.call_to_action_visible);
    }

    #[test]
    fn test_terminal_view_centers_content_and_shows_cta_after_typing() {
        // Arrange
        let clock = ManualClock::at_epoch();
        let counter = CompletionCounter::new();
        let mut sequencer = SceneSequencer::new(
            Arc::new(default_script()),
            SequencerConfig::default(),
            clock.now(),
            counter.callback(),
        );
        for _ in 0..5 {
            sequencer.advance_to_next(clock.now());
        }

        // Act
        let before = SequencerView::of(&sequencer);
        clock.advance_ms(60_000);
        sequencer.tick(clock.now());
        let after = SequencerView::of(&sequencer);

        // Assert
        assert_eq!(before.layout, ContentLayout::Centered);
        assert_eq!(before.location, None);
        assert!(!before.can_go_forward);
        assert!(!before.call_to_action_visible);
        assert!(after.call_to_action_visible);
        assert_eq!(after.lines.len(), 3);
        assert!(after.progress[5].active);
    }

    #[test]
    fn test_overlay_view_resolves_anchor_and_hides_empty_image() {
        let script = default_script();
        let view = ScriptView::of(&script);

        let first = view.scenes[0].character.as_ref().unwrap();
        assert_eq!(first.placement, Anchor::BottomLeft.placement());
        assert_eq!(first.image.as_deref(), Some("/assets/images/king.png"));

        let second = view.scenes[1].character.as_ref().unwrap();
        assert_eq!(second.image, None);
        assert_eq!(view.scenes[5].layout, ContentLayout::Centered);
    }
}
