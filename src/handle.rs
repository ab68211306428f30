//! Control surface for the playback session.
//!
//! The session runs on its own task, single-threaded and cooperative: one
//! `tokio::select!` loop multiplexes control commands, load completions from
//! spawned orchestrator runs, and progress events from both media elements.
//! Consumers talk to it through a cloneable [`SessionHandle`].
//!
//! Load-shaped commands (play, next, previous, shuffle) reply once the load
//! actually finishes; a command that supersedes a load still in flight
//! answers the older caller with `Cancelled`.

use std::{sync::Arc, time::Duration};

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{
    catalog::Album,
    config::Config,
    element::{ElementEvent, MediaElement},
    error::{Error, Result},
    events::Event,
    hls::HlsBackend,
    session::{LoadOutcome, Mode, PersistedState, Session, SessionSnapshot},
};

/// Commands accepted by the session loop.
enum Command {
    PlayAlbum {
        album: Arc<Album>,
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    PlayShuffled {
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    ShuffleAll {
        albums: Vec<Arc<Album>>,
        reply: oneshot::Sender<Result<()>>,
    },
    Next {
        reply: oneshot::Sender<Result<()>>,
    },
    Previous {
        reply: oneshot::Sender<Result<()>>,
    },
    Pause {
        reply: oneshot::Sender<Result<()>>,
    },
    Resume {
        reply: oneshot::Sender<Result<()>>,
    },
    Seek {
        position: Duration,
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        reply: oneshot::Sender<Result<()>>,
    },
    Restore {
        saved: PersistedState,
        catalog: Vec<Arc<Album>>,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Cloneable handle to a running playback session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<Event>,
}

impl SessionHandle {
    /// Spawns the session loop and returns its handle.
    #[must_use]
    pub fn spawn(
        config: Config,
        audio: Arc<dyn MediaElement>,
        video: Arc<dyn MediaElement>,
        hls: Option<Arc<dyn HlsBackend>>,
    ) -> Self {
        let audio_events = audio.events();
        let video_events = video.events();

        let (session, outcomes) = Session::new(config, audio, video, hls);
        let snapshot = session.watch();
        let events = session.event_channel();

        let (commands, command_rx) = mpsc::channel(16);
        tokio::spawn(run(
            session,
            command_rx,
            outcomes,
            audio_events,
            video_events,
        ));

        Self {
            commands,
            snapshot,
            events,
        }
    }

    /// Starts playback of track `index` within `album`. Resolves once the
    /// track is actually playing, or with the terminal failure.
    pub async fn play_album(&self, album: Arc<Album>, index: usize) -> Result<()> {
        self.send(|reply| Command::PlayAlbum {
            album,
            index,
            reply,
        })
        .await
    }

    /// Starts playback of entry `index` of the active shuffle playlist.
    pub async fn play_shuffled(&self, index: usize) -> Result<()> {
        self.send(|reply| Command::PlayShuffled { index, reply }).await
    }

    /// Builds a fresh shuffle playlist over `albums` and starts playing it
    /// from position 0. An empty catalog is a no-op.
    pub async fn shuffle_all(&self, albums: Vec<Arc<Album>>) -> Result<()> {
        self.send(|reply| Command::ShuffleAll { albums, reply }).await
    }

    /// Advances to the next track (wrapping), in shuffle or album order.
    pub async fn next(&self) -> Result<()> {
        self.send(|reply| Command::Next { reply }).await
    }

    /// Moves to the previous track (wrapping).
    pub async fn previous(&self) -> Result<()> {
        self.send(|reply| Command::Previous { reply }).await
    }

    /// Pauses playback.
    pub async fn pause(&self) -> Result<()> {
        self.send(|reply| Command::Pause { reply }).await
    }

    /// Resumes paused playback.
    pub async fn resume(&self) -> Result<()> {
        self.send(|reply| Command::Resume { reply }).await
    }

    /// Seeks to `position`, clamped to the media duration.
    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.send(|reply| Command::Seek { position, reply }).await
    }

    /// Stops playback and resets the session.
    pub async fn stop(&self) -> Result<()> {
        self.send(|reply| Command::Stop { reply }).await
    }

    /// Restores a persisted now-playing snapshot. Stale snapshots are
    /// accepted and left inert.
    pub async fn restore(&self, saved: PersistedState, catalog: Vec<Arc<Album>>) -> Result<()> {
        self.send(|reply| Command::Restore {
            saved,
            catalog,
            reply,
        })
        .await
    }

    /// The latest session snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// A watch receiver over session snapshots, for rendering.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    async fn send<F>(&self, command: F) -> Result<()>
    where
        F: FnOnce(oneshot::Sender<Result<()>>) -> Command,
    {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| Error::internal("session loop is gone"))?;
        response
            .await
            .map_err(|_| Error::internal("session loop dropped the request"))?
    }
}

/// The session loop.
async fn run(
    mut session: Session,
    mut commands: mpsc::Receiver<Command>,
    mut outcomes: mpsc::UnboundedReceiver<LoadOutcome>,
    mut audio_events: broadcast::Receiver<ElementEvent>,
    mut video_events: broadcast::Receiver<ElementEvent>,
) {
    // Reply for the load currently in flight, keyed by its generation.
    let mut load_reply: Option<(u64, oneshot::Sender<Result<()>>)> = None;
    let mut audio_open = true;
    let mut video_open = true;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    // All handles dropped; halt playback and wind down.
                    session.stop().await;
                    break;
                };
                handle_command(&mut session, command, &mut load_reply).await;
            }

            Some(outcome) = outcomes.recv() => {
                let generation = outcome.generation;
                if let Some(result) = session.finish_load(outcome).await {
                    match load_reply.take() {
                        Some((expected, reply)) if expected == generation => {
                            let _ = reply.send(result);
                        }
                        other => {
                            // Auto-advance loads have no caller waiting.
                            load_reply = other;
                            if let Err(e) = result {
                                warn!("automatic track advance failed: {e}");
                            }
                        }
                    }
                }
            }

            event = audio_events.recv(), if audio_open => {
                match event {
                    Ok(event) => session.handle_element_event(Mode::Audio, event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        trace!("audio element events lagged by {missed}");
                    }
                    Err(broadcast::error::RecvError::Closed) => audio_open = false,
                }
            }

            event = video_events.recv(), if video_open => {
                match event {
                    Ok(event) => session.handle_element_event(Mode::Video, event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        trace!("video element events lagged by {missed}");
                    }
                    Err(broadcast::error::RecvError::Closed) => video_open = false,
                }
            }
        }
    }
}

async fn handle_command(
    session: &mut Session,
    command: Command,
    load_reply: &mut Option<(u64, oneshot::Sender<Result<()>>)>,
) {
    match command {
        Command::PlayAlbum {
            album,
            index,
            reply,
        } => {
            defer_load(session, load_reply, reply, |session| {
                session.play_album(album, index)
            });
        }
        Command::PlayShuffled { index, reply } => {
            defer_load(session, load_reply, reply, |session| {
                session.play_shuffled(index)
            });
        }
        Command::ShuffleAll { albums, reply } => {
            defer_load(session, load_reply, reply, |session| {
                session.shuffle_all(&albums)
            });
        }
        Command::Next { reply } => {
            defer_load(session, load_reply, reply, Session::next);
        }
        Command::Previous { reply } => {
            defer_load(session, load_reply, reply, Session::previous);
        }
        Command::Pause { reply } => {
            let _ = reply.send(session.pause().await);
        }
        Command::Resume { reply } => {
            let _ = reply.send(session.resume().await);
        }
        Command::Seek { position, reply } => {
            let _ = reply.send(session.seek(position).await);
        }
        Command::Stop { reply } => {
            if let Some((_, superseded)) = load_reply.take() {
                let _ = superseded.send(Err(Error::cancelled("session stopped")));
            }
            session.stop().await;
            let _ = reply.send(Ok(()));
        }
        Command::Restore {
            saved,
            catalog,
            reply,
        } => {
            session.restore(&saved, &catalog);
            let _ = reply.send(Ok(()));
        }
    }
}

/// Runs a load-shaped operation and wires its eventual completion back to
/// the caller.
///
/// A generation bump means a load was actually spawned and the reply must
/// wait for its completion; otherwise the operation settled synchronously
/// (validation error or no-op) and is answered immediately.
fn defer_load<F>(
    session: &mut Session,
    load_reply: &mut Option<(u64, oneshot::Sender<Result<()>>)>,
    reply: oneshot::Sender<Result<()>>,
    operation: F,
) where
    F: FnOnce(&mut Session) -> Result<()>,
{
    let before = session.generation();
    let result = operation(session);

    if result.is_ok() && session.generation() != before {
        if let Some((_, superseded)) = load_reply.take() {
            let _ = superseded.send(Err(Error::cancelled(
                "superseded by a newer playback request",
            )));
        }
        *load_reply = Some((session.generation(), reply));
    } else {
        let _ = reply.send(result);
    }
}
