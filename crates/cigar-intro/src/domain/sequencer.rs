//! The scene sequencer.
//!
//! Owns the position in the script, the progressive reveal of the active
//! scene, the auto-advance timer and the exit transition. Time only enters
//! through `now` arguments; `tick` applies every deadline that is due and
//! `next_deadline` tells the driver when to call it again.
//!
//! Every scene activation bumps a generation counter. Reveal tickets and the
//! auto-advance timer carry the generation that created them and are ignored
//! once it is stale, so nothing armed for scene N can act on scene N±1.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use cigar_core::error::DomainError;
use cigar_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{
    AutoAdvanceArmed, EntryCause, IntroEvent, IntroEventKind, SceneEntered, TextRendered,
};
use super::reveal::{RevealConfig, RevealStep, TextReveal};
use super::scene::SceneScript;

/// Timing constants of a sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Typewriter pacing.
    pub reveal: RevealConfig,
    /// Delay between text completion and the automatic advance.
    pub auto_advance_delay: TimeDelta,
    /// Length of the exit transition before the completion callback.
    pub exit_delay: TimeDelta,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            reveal: RevealConfig::default(),
            auto_advance_delay: TimeDelta::milliseconds(5000),
            exit_delay: TimeDelta::milliseconds(1000),
        }
    }
}

/// Proof that a reveal belongs to a particular scene activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTicket {
    generation: u64,
}

impl RevealTicket {
    /// The scene-activation generation this ticket was issued for.
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Result of a manual navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The active scene changed.
    Moved {
        /// Previous index.
        from: usize,
        /// New index.
        to: usize,
    },
    /// Already at the boundary; nothing changed.
    Clamped,
    /// The intro is exiting or finished; nothing changed.
    Ignored,
}

/// Result of activating the completion affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The exit transition started; the callback fires at `fires_at`.
    Started {
        /// When the completion callback is due.
        fires_at: DateTime<Utc>,
    },
    /// A previous activation is already in flight (or done).
    AlreadyExiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitState {
    Idle,
    Exiting { fires_at: DateTime<Utc> },
    Completed,
}

#[derive(Debug, Clone, Copy)]
struct AutoAdvanceTimer {
    generation: u64,
    fires_at: DateTime<Utc>,
}

type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Presents a scene script one scene at a time.
pub struct SceneSequencer {
    script: Arc<SceneScript>,
    config: SequencerConfig,
    current_index: usize,
    text_render_complete: bool,
    auto_advance_enabled: bool,
    exit: ExitState,
    generation: u64,
    reveal: TextReveal,
    auto_advance: Option<AutoAdvanceTimer>,
    on_complete: Option<CompletionCallback>,
    events: Vec<IntroEvent>,
    sequence_number: u64,
}

impl SceneSequencer {
    /// Mounts a sequencer on the first scene of `script`.
    ///
    /// `on_complete` is invoked exactly once, when the exit transition that
    /// follows activation has elapsed.
    #[must_use]
    pub fn new(
        script: Arc<SceneScript>,
        config: SequencerConfig,
        now: DateTime<Utc>,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> Self {
        let reveal = TextReveal::start(Vec::new(), config.reveal, now);
        let mut sequencer = Self {
            script,
            config,
            current_index: 0,
            text_render_complete: false,
            auto_advance_enabled: true,
            exit: ExitState::Idle,
            generation: 0,
            reveal,
            auto_advance: None,
            on_complete: Some(Box::new(on_complete)),
            events: Vec::new(),
            sequence_number: 0,
        };
        sequencer.enter_scene(0, EntryCause::Mounted, now);
        sequencer
    }

    /// Index of the active scene.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// True once the active scene's text has fully rendered.
    #[must_use]
    pub fn text_render_complete(&self) -> bool {
        self.text_render_complete
    }

    /// False from the first manual navigation onwards.
    #[must_use]
    pub fn auto_advance_enabled(&self) -> bool {
        self.auto_advance_enabled
    }

    /// True once the completion affordance was activated.
    #[must_use]
    pub fn is_exiting(&self) -> bool {
        self.exit != ExitState::Idle
    }

    /// True once the completion callback has been invoked.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.exit == ExitState::Completed
    }

    /// True when the active scene is the last one.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.script.is_terminal(self.current_index)
    }

    /// Current scene-activation generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The script being presented.
    #[must_use]
    pub fn script(&self) -> &SceneScript {
        &self.script
    }

    /// Reveal progress of the active scene.
    #[must_use]
    pub fn reveal(&self) -> &TextReveal {
        &self.reveal
    }

    /// Timing constants.
    #[must_use]
    pub fn config(&self) -> SequencerConfig {
        self.config
    }

    /// When the armed auto-advance timer fires, if one is armed.
    #[must_use]
    pub fn auto_advance_at(&self) -> Option<DateTime<Utc>> {
        self.auto_advance.map(|timer| timer.fires_at)
    }

    /// Ticket for reporting that the active scene's text finished rendering.
    #[must_use]
    pub fn reveal_ticket(&self) -> RevealTicket {
        RevealTicket {
            generation: self.generation,
        }
    }

    /// Steps forward manually, disabling auto-advance for good.
    pub fn advance_to_next(&mut self, now: DateTime<Utc>) -> Navigation {
        if self.is_exiting() {
            return Navigation::Ignored;
        }
        if self.current_index >= self.script.terminal_index() {
            return Navigation::Clamped;
        }
        let from = self.current_index;
        self.disable_auto_advance(now);
        self.enter_scene(from + 1, EntryCause::Manual, now);
        Navigation::Moved { from, to: from + 1 }
    }

    /// Steps back manually, disabling auto-advance for good.
    pub fn advance_to_previous(&mut self, now: DateTime<Utc>) -> Navigation {
        if self.is_exiting() {
            return Navigation::Ignored;
        }
        if self.current_index == 0 {
            return Navigation::Clamped;
        }
        let from = self.current_index;
        self.disable_auto_advance(now);
        self.enter_scene(from - 1, EntryCause::Manual, now);
        Navigation::Moved { from, to: from - 1 }
    }

    /// Records that the text of the scene identified by `ticket` finished
    /// rendering. Returns false when the ticket is stale or the flag was
    /// already set.
    pub fn on_text_render_complete(&mut self, ticket: RevealTicket, now: DateTime<Utc>) -> bool {
        if ticket.generation != self.generation
            || self.text_render_complete
            || self.is_completed()
        {
            return false;
        }
        self.text_render_complete = true;
        self.record(
            IntroEventKind::TextRendered(TextRendered {
                index: self.current_index,
                generation: self.generation,
            }),
            now,
        );
        self.arm_auto_advance(now);
        true
    }

    /// The completion affordance; only exists on the terminal scene.
    #[must_use]
    pub fn completion_prompt(&mut self) -> Option<CompletionPrompt<'_>> {
        if self.is_terminal() {
            Some(CompletionPrompt { sequencer: self })
        } else {
            None
        }
    }

    /// Activates the completion affordance on behalf of an outer surface that
    /// cannot know which scene is active.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotAtTerminalScene` when the active scene is not
    /// the last one.
    pub fn try_activate(&mut self, now: DateTime<Utc>) -> Result<Activation, DomainError> {
        let index = self.current_index;
        let terminal = self.script.terminal_index();
        match self.completion_prompt() {
            Some(prompt) => Ok(prompt.activate(now)),
            None => Err(DomainError::NotAtTerminalScene { index, terminal }),
        }
    }

    /// Earliest pending deadline: a reveal step, the auto-advance timer or
    /// the end of the exit transition.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        if self.is_completed() {
            return None;
        }
        let exit = match self.exit {
            ExitState::Exiting { fires_at } => Some(fires_at),
            ExitState::Idle | ExitState::Completed => None,
        };
        [
            self.reveal.next_deadline(),
            self.auto_advance.map(|timer| timer.fires_at),
            exit,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Applies every deadline due at or before `now`, earliest first.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        while let Some(at) = self.next_deadline() {
            if at > now {
                break;
            }
            self.step(at);
        }
    }

    /// Takes the events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<IntroEvent> {
        std::mem::take(&mut self.events)
    }

    fn step(&mut self, at: DateTime<Utc>) {
        if let ExitState::Exiting { fires_at } = self.exit {
            if fires_at <= at {
                self.complete(at);
                return;
            }
        }
        if let Some(timer) = self.auto_advance {
            if timer.fires_at <= at {
                self.auto_advance = None;
                self.fire_auto_advance(timer, at);
                return;
            }
        }
        if self.reveal.poll(at) == RevealStep::Completed {
            let ticket = self.reveal_ticket();
            self.on_text_render_complete(ticket, at);
        }
    }

    fn fire_auto_advance(&mut self, timer: AutoAdvanceTimer, at: DateTime<Utc>) {
        let still_valid = timer.generation == self.generation
            && self.text_render_complete
            && self.auto_advance_enabled
            && !self.is_terminal()
            && !self.is_exiting();
        if still_valid {
            self.enter_scene(self.current_index + 1, EntryCause::AutoAdvance, at);
        }
    }

    fn arm_auto_advance(&mut self, now: DateTime<Utc>) {
        if !self.text_render_complete
            || !self.auto_advance_enabled
            || self.is_terminal()
            || self.is_exiting()
            || self.auto_advance.is_some()
        {
            return;
        }
        let fires_at = now + self.config.auto_advance_delay;
        self.auto_advance = Some(AutoAdvanceTimer {
            generation: self.generation,
            fires_at,
        });
        self.record(
            IntroEventKind::AutoAdvanceArmed(AutoAdvanceArmed {
                index: self.current_index,
                generation: self.generation,
                fires_at,
            }),
            now,
        );
    }

    fn disable_auto_advance(&mut self, now: DateTime<Utc>) {
        self.auto_advance = None;
        if self.auto_advance_enabled {
            self.auto_advance_enabled = false;
            self.record(IntroEventKind::AutoAdvanceDisabled, now);
        }
    }

    fn enter_scene(&mut self, index: usize, cause: EntryCause, now: DateTime<Utc>) {
        self.generation = self.generation.wrapping_add(1);
        self.current_index = index;
        self.text_render_complete = false;
        self.auto_advance = None;
        let lengths = self
            .script
            .lines(index)
            .iter()
            .map(super::markup::MarkupLine::visible_chars)
            .collect();
        self.reveal = TextReveal::start(lengths, self.config.reveal, now);

        let scene_id = self.script.scene(index).map_or(0, |scene| scene.id);
        self.record(
            IntroEventKind::SceneEntered(SceneEntered {
                index,
                scene_id,
                generation: self.generation,
                cause,
            }),
            now,
        );
    }

    fn activate(&mut self, now: DateTime<Utc>) -> Activation {
        if self.exit != ExitState::Idle {
            return Activation::AlreadyExiting;
        }
        let fires_at = now + self.config.exit_delay;
        self.exit = ExitState::Exiting { fires_at };
        self.auto_advance = None;
        self.record(IntroEventKind::ExitStarted, now);
        Activation::Started { fires_at }
    }

    fn complete(&mut self, at: DateTime<Utc>) {
        self.exit = ExitState::Completed;
        self.auto_advance = None;
        self.record(IntroEventKind::Completed, at);
        // Taken before the call: a callback that fails is never invoked again.
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
    }

    fn record(&mut self, kind: IntroEventKind, now: DateTime<Utc>) {
        self.sequence_number += 1;
        self.events.push(IntroEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                sequence_number: self.sequence_number,
                occurred_at: now,
            },
            kind,
        });
    }
}

impl fmt::Debug for SceneSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneSequencer")
            .field("current_index", &self.current_index)
            .field("scene_count", &self.script.len())
            .field("text_render_complete", &self.text_render_complete)
            .field("auto_advance_enabled", &self.auto_advance_enabled)
            .field("exit", &self.exit)
            .field("generation", &self.generation)
            .field("auto_advance", &self.auto_advance)
            .finish_non_exhaustive()
    }
}

/// The terminal scene's call-to-action.
///
/// Only obtainable through [`SceneSequencer::completion_prompt`] while the
/// terminal scene is active.
#[derive(Debug)]
pub struct CompletionPrompt<'a> {
    sequencer: &'a mut SceneSequencer,
}

impl CompletionPrompt<'_> {
    /// Starts the exit transition. Repeated activations have no effect.
    pub fn activate(self, now: DateTime<Utc>) -> Activation {
        self.sequencer.activate(now)
    }
}
