//! Async runner for a mounted intro.
//!
//! One tokio task owns one sequencer and is its only event queue: commands
//! arrive over an `mpsc` channel and the only timer is a single sleep until
//! `next_deadline()`. Whenever a command wins the `select!`, the deadline is
//! recomputed from the new state, so a timer armed for a superseded scene
//! can never fire. Dropping every handle unmounts the intro.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use cigar_core::clock::Clock;
use cigar_core::error::DomainError;
use cigar_core::event::DomainEvent;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use super::views::SequencerView;
use crate::domain::commands::IntroCommand;
use crate::domain::scene::SceneScript;
use crate::domain::sequencer::{SceneSequencer, SequencerConfig};

const COMMAND_BUFFER: usize = 32;

/// Wall clock that follows tokio's monotonic time.
///
/// Under a paused test runtime it advances exactly as tokio's virtual time
/// does, so the runner can be tested without real sleeps.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin_wall: DateTime<Utc>,
    origin: Instant,
}

impl TokioClock {
    /// Anchors the clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin_wall: Utc::now(),
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.origin.elapsed()).unwrap_or_else(|_| TimeDelta::zero());
        self.origin_wall + elapsed
    }
}

#[derive(Debug)]
struct Envelope {
    command: IntroCommand,
    reply: oneshot::Sender<Result<SequencerView, DomainError>>,
}

/// Handle to a running intro.
#[derive(Debug, Clone)]
pub struct IntroHandle {
    commands: mpsc::Sender<Envelope>,
    views: watch::Receiver<SequencerView>,
}

impl IntroHandle {
    /// Mounts a sequencer on `script` and starts driving it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        script: Arc<SceneScript>,
        config: SequencerConfig,
        clock: Arc<dyn Clock>,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> Self {
        let sequencer = SceneSequencer::new(script, config, clock.now(), on_complete);
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        let (publisher, views) = watch::channel(SequencerView::of(&sequencer));
        tokio::spawn(run(sequencer, clock, inbox, publisher));
        Self { commands, views }
    }

    /// Sends `command` and returns the view after it was applied.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotAtTerminalScene` for an activation away from
    /// the terminal scene, and `DomainError::Infrastructure` if the runner has
    /// already stopped.
    pub async fn send(&self, command: IntroCommand) -> Result<SequencerView, DomainError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Envelope { command, reply })
            .await
            .map_err(|_| DomainError::Infrastructure("intro runner has stopped".into()))?;
        response
            .await
            .map_err(|_| DomainError::Infrastructure("intro runner dropped the request".into()))?
    }

    /// Manual step forward.
    ///
    /// # Errors
    ///
    /// See [`IntroHandle::send`].
    pub async fn next(&self) -> Result<SequencerView, DomainError> {
        self.send(IntroCommand::Next).await
    }

    /// Manual step back.
    ///
    /// # Errors
    ///
    /// See [`IntroHandle::send`].
    pub async fn previous(&self) -> Result<SequencerView, DomainError> {
        self.send(IntroCommand::Previous).await
    }

    /// Activates the terminal call-to-action.
    ///
    /// # Errors
    ///
    /// See [`IntroHandle::send`].
    pub async fn activate(&self) -> Result<SequencerView, DomainError> {
        self.send(IntroCommand::Activate).await
    }

    /// The latest published view.
    #[must_use]
    pub fn view(&self) -> SequencerView {
        self.views.borrow().clone()
    }

    /// A receiver that observes every published view.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SequencerView> {
        self.views.clone()
    }

    /// True while the runner task accepts commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Waits until the completion callback has fired or the runner stopped.
    pub async fn finished(&self) {
        let mut views = self.views.clone();
        let _ = views.wait_for(|view| view.completed).await;
    }
}

#[instrument(skip_all, fields(scenes = sequencer.script().len()))]
async fn run(
    mut sequencer: SceneSequencer,
    clock: Arc<dyn Clock>,
    mut inbox: mpsc::Receiver<Envelope>,
    publisher: watch::Sender<SequencerView>,
) {
    info!("intro mounted");
    publish(&mut sequencer, &publisher);

    loop {
        let sleep_for = sequencer
            .next_deadline()
            .map(|at| (at - clock.now()).to_std().unwrap_or(Duration::ZERO));

        tokio::select! {
            envelope = inbox.recv() => {
                let Some(Envelope { command, reply }) = envelope else {
                    info!("intro unmounted");
                    break;
                };
                let now = clock.now();
                sequencer.tick(now);
                let result = apply(&mut sequencer, command, now);
                let view = publish(&mut sequencer, &publisher);
                // The caller may have given up waiting; the command still stands.
                let _ = reply.send(result.map(|()| view));
            }
            () = tokio::time::sleep(sleep_for.unwrap_or_default()), if sleep_for.is_some() => {
                sequencer.tick(clock.now());
                publish(&mut sequencer, &publisher);
            }
        }

        if sequencer.is_completed() {
            info!("intro completed");
            break;
        }
    }
}

fn apply(
    sequencer: &mut SceneSequencer,
    command: IntroCommand,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    match command {
        IntroCommand::Next => {
            let navigation = sequencer.advance_to_next(now);
            debug!(command = command.command_type(), ?navigation, "applied command");
            Ok(())
        }
        IntroCommand::Previous => {
            let navigation = sequencer.advance_to_previous(now);
            debug!(command = command.command_type(), ?navigation, "applied command");
            Ok(())
        }
        IntroCommand::Activate => {
            let activation = sequencer.try_activate(now)?;
            debug!(command = command.command_type(), ?activation, "applied command");
            Ok(())
        }
    }
}

fn publish(
    sequencer: &mut SceneSequencer,
    publisher: &watch::Sender<SequencerView>,
) -> SequencerView {
    for event in sequencer.drain_events() {
        debug!(
            event_type = event.event_type(),
            sequence_number = event.metadata.sequence_number,
            payload = %event.to_payload(),
            "intro event"
        );
    }
    let view = SequencerView::of(sequencer);
    publisher.send_replace(view.clone());
    view
}
