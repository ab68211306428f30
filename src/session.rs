//! Playback session state machine.
//!
//! Owns the current album, track index, play/pause/time state, audio-vs-video
//! mode, and shuffle state. Starting a track delegates to the fallback
//! orchestrator; computing what plays next delegates to the playlist module.
//!
//! Loads run as spawned tasks and report back through a completion channel,
//! tagged with a monotonically increasing generation. Starting any new
//! playback request cancels the previous run's token and bumps the
//! generation; a superseded run is not forcibly aborted, its eventual
//! outcome is simply discarded by the generation check before any state
//! mutation. Exactly one run's outcome can therefore ever be applied.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    catalog::{Album, PlaylistEntry},
    classify::{classify, StreamKind},
    config::Config,
    element::{ElementEvent, MediaElement},
    error::{Error, Result},
    events::Event,
    hls::HlsBackend,
    orchestrator::{Orchestrator, Started},
    playlist,
};

/// Session lifecycle phase.
///
/// `Loading` is reachable from any phase (a new track request preempts
/// whatever is happening); `Idle` is reachable from any phase via `stop`.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

/// Which media element renders the current track. Determined per-track by
/// classification, not user-selectable.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Audio,
    Video,
}

impl From<StreamKind> for Mode {
    fn from(kind: StreamKind) -> Self {
        if kind.is_video() {
            Self::Video
        } else {
            Self::Audio
        }
    }
}

/// Active shuffle state: a flattened playlist and the position in it.
#[derive(Clone, Debug)]
pub struct Shuffle {
    pub playlist: Vec<PlaylistEntry>,
    pub position: usize,
}

/// How a pending load changes shuffle state once it succeeds.
///
/// Applied only on success; a failed load leaves all session fields
/// untouched.
#[derive(Clone, Debug)]
enum ShuffleIntent {
    /// Keep current shuffle state (album-order auto-advance).
    Keep,

    /// Manual album/track selection takes precedence over shuffle state.
    Clear,

    /// Enter shuffle mode with a freshly built playlist.
    Enter(Vec<PlaylistEntry>, usize),

    /// Move to a new position within the active playlist.
    SetPosition(usize),
}

/// Read-only observable session snapshot for rendering.
#[derive(Clone, Debug, Default)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub album: Option<Arc<Album>>,
    pub track_index: usize,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub mode: Mode,
    pub shuffle_active: bool,
}

impl SessionSnapshot {
    /// True only while a real media element is playing the currently
    /// resolved candidate.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }
}

/// Serializable now-playing state for an external persistence collaborator.
///
/// Restoring tolerates partial or stale snapshots: a referenced album that
/// no longer exists in the catalog leaves the restored fields inert.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PersistedState {
    #[serde(default)]
    pub album_title: Option<String>,
    #[serde(default)]
    pub track_index: usize,
    #[serde(default)]
    pub position_seconds: f64,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

impl From<&SessionSnapshot> for PersistedState {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            album_title: snapshot.album.as_ref().map(|album| album.title.clone()),
            track_index: snapshot.track_index,
            position_seconds: snapshot.position.as_secs_f64(),
            duration_seconds: snapshot.duration.map(|duration| duration.as_secs_f64()),
        }
    }
}

/// Completion of a spawned orchestrator run, tagged with the generation it
/// was started under.
#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub result: Result<Started>,
}

/// A load in flight: everything needed to apply its outcome.
#[derive(Debug)]
struct PendingLoad {
    generation: u64,
    album: Arc<Album>,
    track_index: usize,
    intent: ShuffleIntent,
    previous_phase: Phase,
    mode: Mode,
}

/// The playback session.
pub struct Session {
    orchestrator: Arc<Orchestrator>,
    audio: Arc<dyn MediaElement>,
    video: Arc<dyn MediaElement>,

    phase: Phase,
    current_album: Option<Arc<Album>>,
    current_track: usize,
    position: Duration,
    duration: Option<Duration>,
    mode: Mode,
    shuffle: Option<Shuffle>,

    generation: u64,
    cancel: CancellationToken,
    pending: Option<PendingLoad>,
    end_signalled: bool,

    outcome_tx: mpsc::UnboundedSender<LoadOutcome>,
    events: broadcast::Sender<Event>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl Session {
    /// Creates a session around one audio and one video element.
    ///
    /// Returns the session plus the load-completion receiver the driving
    /// loop must feed back into [`finish_load`](Self::finish_load).
    #[must_use]
    pub fn new(
        config: Config,
        audio: Arc<dyn MediaElement>,
        video: Arc<dyn MediaElement>,
        hls: Option<Arc<dyn HlsBackend>>,
    ) -> (Self, mpsc::UnboundedReceiver<LoadOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(16);
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());

        let session = Self {
            orchestrator: Arc::new(Orchestrator::new(config, hls)),
            audio,
            video,
            phase: Phase::Idle,
            current_album: None,
            current_track: 0,
            position: Duration::ZERO,
            duration: None,
            mode: Mode::Audio,
            shuffle: None,
            generation: 0,
            cancel: CancellationToken::new(),
            pending: None,
            end_signalled: false,
            outcome_tx,
            events,
            snapshot_tx,
        };

        (session, outcome_rx)
    }

    /// Current generation; completions from older generations are discarded.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn shuffle_active(&self) -> bool {
        self.shuffle.is_some()
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// The event channel itself, for handing to a control surface that
    /// creates subscriptions on demand.
    #[must_use]
    pub fn event_channel(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    /// Observes session snapshots.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// The current read-only snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            album: self.current_album.clone(),
            track_index: self.current_track,
            position: self.position,
            duration: self.duration,
            mode: self.mode,
            shuffle_active: self.shuffle.is_some(),
        }
    }

    /// Starts playback of `index` within `album`.
    ///
    /// Explicit selection exits shuffle mode once the load succeeds.
    /// Returns immediately after validation; the load outcome arrives
    /// through the completion channel.
    pub fn play_album(&mut self, album: Arc<Album>, index: usize) -> Result<()> {
        self.begin_load(album, index, ShuffleIntent::Clear)
    }

    /// Starts playback of entry `index` of the active shuffle playlist.
    pub fn play_shuffled(&mut self, index: usize) -> Result<()> {
        let Some(shuffle) = &self.shuffle else {
            return Err(Error::invalid_request("shuffle mode is not active"));
        };
        let Some(entry) = shuffle.playlist.get(index) else {
            return Err(Error::invalid_request(format!(
                "shuffle position {index} out of range ({} entries)",
                shuffle.playlist.len()
            )));
        };

        let album = Arc::clone(&entry.album);
        let track_index = entry.track_index;
        self.begin_load(album, track_index, ShuffleIntent::SetPosition(index))
    }

    /// Builds a fresh shuffle playlist over `albums` and starts playback at
    /// position 0. An empty catalog is a logged no-op.
    pub fn shuffle_all(&mut self, albums: &[Arc<Album>]) -> Result<()> {
        let entries = playlist::build_shuffle(albums);
        let Some(first) = entries.first() else {
            debug!("shuffle requested over an empty catalog; nothing to do");
            return Ok(());
        };

        let album = Arc::clone(&first.album);
        let track_index = first.track_index;
        self.begin_load(album, track_index, ShuffleIntent::Enter(entries, 0))
    }

    /// Advances to the next track, wrapping past the end.
    pub fn next(&mut self) -> Result<()> {
        if let Some(shuffle) = &self.shuffle {
            let Some(position) = playlist::advance(shuffle.playlist.len(), shuffle.position) else {
                debug!("next in shuffle mode with an empty playlist; nothing to do");
                return Ok(());
            };
            let entry = &shuffle.playlist[position];
            let album = Arc::clone(&entry.album);
            let track_index = entry.track_index;
            return self.begin_load(album, track_index, ShuffleIntent::SetPosition(position));
        }

        let Some(album) = self.current_album.clone() else {
            debug!("next without a current album; nothing to do");
            return Ok(());
        };
        let Some(index) = playlist::advance(album.tracks.len(), self.current_track) else {
            return Ok(());
        };
        self.begin_load(album, index, ShuffleIntent::Keep)
    }

    /// Moves to the previous track, wrapping below the start.
    pub fn previous(&mut self) -> Result<()> {
        if let Some(shuffle) = &self.shuffle {
            let Some(position) = playlist::retreat(shuffle.playlist.len(), shuffle.position) else {
                debug!("previous in shuffle mode with an empty playlist; nothing to do");
                return Ok(());
            };
            let entry = &shuffle.playlist[position];
            let album = Arc::clone(&entry.album);
            let track_index = entry.track_index;
            return self.begin_load(album, track_index, ShuffleIntent::SetPosition(position));
        }

        let Some(album) = self.current_album.clone() else {
            debug!("previous without a current album; nothing to do");
            return Ok(());
        };
        let Some(index) = playlist::retreat(album.tracks.len(), self.current_track) else {
            return Ok(());
        };
        self.begin_load(album, index, ShuffleIntent::Keep)
    }

    /// Pauses playback. Only valid while playing; otherwise a logged no-op.
    pub async fn pause(&mut self) -> Result<()> {
        if self.phase != Phase::Playing {
            debug!("pause while {:?}; nothing to do", self.phase);
            return Ok(());
        }

        self.active_element().pause().await;
        self.phase = Phase::Paused;
        self.emit(Event::Pause);
        self.publish();
        Ok(())
    }

    /// Resumes playback. Only valid while paused; otherwise a logged no-op.
    pub async fn resume(&mut self) -> Result<()> {
        if self.phase != Phase::Paused {
            debug!("resume while {:?}; nothing to do", self.phase);
            return Ok(());
        }

        self.active_element().play().await.map_err(|e| {
            if e == crate::element::PlayError::NotAllowed {
                Error::permission_denied(e)
            } else {
                Error::transient_network(e)
            }
        })?;
        self.phase = Phase::Playing;
        self.emit(Event::Play);
        self.publish();
        Ok(())
    }

    /// Seeks to `position`, clamped to `[0, duration]`.
    pub async fn seek(&mut self, position: Duration) -> Result<()> {
        if !matches!(self.phase, Phase::Playing | Phase::Paused) {
            return Err(Error::invalid_request("no media loaded to seek in"));
        }

        let clamped = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.active_element().seek(clamped).await;
        self.position = clamped;
        self.publish();
        Ok(())
    }

    /// Halts playback and resets the session to its initial state,
    /// discarding any shuffle playlist and any load in flight.
    pub async fn stop(&mut self) {
        self.supersede();
        self.pending = None;

        self.audio.reset().await;
        self.video.reset().await;

        self.phase = Phase::Idle;
        self.current_album = None;
        self.current_track = 0;
        self.position = Duration::ZERO;
        self.duration = None;
        self.mode = Mode::Audio;
        self.shuffle = None;
        self.end_signalled = false;

        self.emit(Event::Stopped);
        self.publish();
    }

    /// Applies the outcome of a spawned load.
    ///
    /// Returns `None` when the outcome belongs to a superseded generation
    /// and was discarded without touching state; otherwise the result as
    /// applied, for the driving loop to relay to the original caller.
    pub async fn finish_load(&mut self, outcome: LoadOutcome) -> Option<Result<()>> {
        if outcome.generation != self.generation {
            debug!(
                "discarding stale load outcome (generation {} != {})",
                outcome.generation, self.generation
            );
            return None;
        }

        let pending = self.pending.take()?;
        debug_assert_eq!(pending.generation, outcome.generation);

        match outcome.result {
            Ok(started) => {
                let shuffle_changed = self.apply_shuffle_intent(pending.intent);

                self.current_album = Some(Arc::clone(&pending.album));
                self.current_track = pending.track_index;
                self.mode = pending.mode;
                self.end_signalled = false;

                let track = &pending.album.tracks[pending.track_index];
                let element = Arc::clone(self.active_element());

                // A chapter-style track starts at its configured offset; the
                // seek happens before playback is reported as started.
                if let Some(start) = track.start_time() {
                    element.seek(start).await;
                    self.position = start;
                } else {
                    self.position = Duration::ZERO;
                }
                self.duration = element
                    .duration()
                    .or_else(|| track.duration_seconds.map(Duration::from_secs_f64));

                self.phase = Phase::Playing;
                info!(
                    "now playing {} from {} via {}",
                    track, pending.album, started.candidate
                );

                if shuffle_changed {
                    self.emit(Event::ShuffleChanged);
                }
                self.emit(Event::TrackChanged);
                self.emit(Event::Play);
                self.publish();
                Some(Ok(()))
            }
            Err(e) => {
                // Terminal failure: the previously recorded track keeps its
                // state even though nothing is actually playing anymore.
                self.phase = pending.previous_phase;
                self.publish();
                Some(Err(e))
            }
        }
    }

    /// Processes a progress event from one of the media elements.
    ///
    /// Events from the inactive element, or arriving outside an active
    /// playback phase, originate from a torn-down or superseded source and
    /// are ignored.
    pub async fn handle_element_event(&mut self, source: Mode, event: ElementEvent) {
        if source != self.mode || !matches!(self.phase, Phase::Playing | Phase::Paused) {
            return;
        }

        match event {
            ElementEvent::MetadataLoaded { duration } => {
                self.duration = Some(duration);
                self.publish();
            }
            ElementEvent::TimeUpdate { position } => {
                self.position = position;
                self.publish();

                // A sub-segment track ends at its configured end time; the
                // synthesized end-of-track fires exactly once.
                if let Some(end) = self.current_end_time() {
                    if position >= end && !self.end_signalled {
                        self.end_signalled = true;
                        debug!("reached configured end time at {position:?}");
                        if let Err(e) = self.next() {
                            warn!("failed to advance past segment end: {e}");
                        }
                    }
                }
            }
            ElementEvent::Ended => {
                if !self.end_signalled {
                    self.end_signalled = true;
                    if let Err(e) = self.next() {
                        warn!("failed to advance past track end: {e}");
                    }
                }
            }
        }
    }

    /// Restores a persisted now-playing snapshot.
    ///
    /// The snapshot may be partial or stale. When the referenced album no
    /// longer exists in `catalog` (or the index no longer fits), the
    /// restored fields stay inert: no album is bound and nothing plays.
    pub fn restore(&mut self, saved: &PersistedState, catalog: &[Arc<Album>]) {
        if self.phase != Phase::Idle {
            warn!("ignoring restore while {:?}", self.phase);
            return;
        }

        if let Some(title) = &saved.album_title {
            let album = catalog.iter().find(|album| &album.title == title);
            match album {
                Some(album) if saved.track_index < album.tracks.len() => {
                    self.current_album = Some(Arc::clone(album));
                    self.current_track = saved.track_index;
                }
                _ => {
                    debug!("restored album {title:?} not in catalog; keeping position inert");
                }
            }
        }

        self.position = Duration::from_secs_f64(saved.position_seconds.max(0.0));
        self.duration = saved.duration_seconds.map(Duration::from_secs_f64);
        self.publish();
    }

    /// The current state as a persistable snapshot.
    #[must_use]
    pub fn persisted(&self) -> PersistedState {
        PersistedState::from(&self.snapshot())
    }

    /// Validates a track request and spawns its orchestrator run.
    ///
    /// Invalid requests are rejected here, before any run is attempted.
    /// Starting a load supersedes any run still in flight.
    fn begin_load(
        &mut self,
        album: Arc<Album>,
        track_index: usize,
        intent: ShuffleIntent,
    ) -> Result<()> {
        let Some(track) = album.tracks.get(track_index) else {
            return Err(Error::invalid_request(format!(
                "track index {track_index} out of range for album {album}"
            )));
        };
        if !track.has_url() {
            return Err(Error::invalid_request(format!(
                "track {track} of album {album} has no URL"
            )));
        }

        let previous_phase = self.phase;
        self.supersede();

        let kind = classify(&track.url);
        let mode = Mode::from(kind);

        self.pending = Some(PendingLoad {
            generation: self.generation,
            album: Arc::clone(&album),
            track_index,
            intent,
            previous_phase,
            mode,
        });

        // Playing must read false the moment the new attempt begins.
        self.phase = Phase::Loading;
        self.publish();

        let orchestrator = Arc::clone(&self.orchestrator);
        let element = match mode {
            Mode::Audio => Arc::clone(&self.audio),
            Mode::Video => Arc::clone(&self.video),
        };
        let cancel = self.cancel.clone();
        let url = track.url.clone();
        let generation = self.generation;
        let outcome_tx = self.outcome_tx.clone();

        tokio::spawn(async move {
            let result = orchestrator.start(&url, element.as_ref(), &cancel).await;
            // The receiver only closes when the session is gone.
            let _ = outcome_tx.send(LoadOutcome { generation, result });
        });

        Ok(())
    }

    /// Cancels any run in flight and bumps the generation so its eventual
    /// outcome is discarded.
    fn supersede(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.generation = self.generation.wrapping_add(1);
        if self.pending.take().is_some() {
            trace!("superseded load in flight");
        }
    }

    /// Applies the pending shuffle intent; returns whether shuffle
    /// active-ness flipped.
    fn apply_shuffle_intent(&mut self, intent: ShuffleIntent) -> bool {
        match intent {
            ShuffleIntent::Keep => false,
            ShuffleIntent::Clear => self.shuffle.take().is_some(),
            ShuffleIntent::Enter(playlist, position) => {
                let was_active = self.shuffle.is_some();
                self.shuffle = Some(Shuffle { playlist, position });
                !was_active
            }
            ShuffleIntent::SetPosition(position) => {
                if let Some(shuffle) = &mut self.shuffle {
                    shuffle.position = position;
                }
                false
            }
        }
    }

    fn current_end_time(&self) -> Option<Duration> {
        self.current_album
            .as_ref()
            .and_then(|album| album.tracks.get(self.current_track))
            .and_then(crate::catalog::Track::end_time)
    }

    fn active_element(&self) -> &Arc<dyn MediaElement> {
        match self.mode {
            Mode::Audio => &self.audio,
            Mode::Video => &self.video,
        }
    }

    fn emit(&self, event: Event) {
        // No receivers is fine; events are advisory.
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
