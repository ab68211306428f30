//! Scripted media element and HLS backend for integration tests.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::broadcast;

use tonearm::{
    element::{ElementEvent, MediaElement, PlayError},
    hls::HlsBackend,
};

/// What a mock element does when asked to load and play a URL.
#[derive(Clone, Copy, Debug)]
pub enum Script {
    /// Load and play succeed; metadata reports this duration.
    Play { duration: Option<Duration> },

    /// Loading the source fails.
    FailLoad(PlayError),

    /// Loading succeeds but playing fails.
    FailPlay(PlayError),

    /// Loading never resolves; only a timeout or cancellation ends it.
    Hang,
}

#[derive(Debug, Default)]
struct State {
    current: Option<String>,
    duration: Option<Duration>,
    position: Duration,
    volume: f32,
    muted: bool,
}

/// A media element driven entirely by per-URL scripts.
pub struct MockElement {
    scripts: Mutex<HashMap<String, Script>>,
    default_script: Script,
    attempts: Mutex<Vec<String>>,
    seeks: Mutex<Vec<Duration>>,
    state: Mutex<State>,
    native_hls: bool,
    events: broadcast::Sender<ElementEvent>,
}

impl MockElement {
    pub fn new() -> Self {
        Self::with_default(Script::Play {
            duration: Some(Duration::from_secs(100)),
        })
    }

    pub fn with_default(default_script: Script) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_script,
            attempts: Mutex::new(Vec::new()),
            seeks: Mutex::new(Vec::new()),
            state: Mutex::new(State::default()),
            native_hls: false,
            events,
        }
    }

    pub fn with_native_hls(mut self) -> Self {
        self.native_hls = true;
        self
    }

    /// Scripts the behavior for one exact URL.
    pub fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_owned(), script);
    }

    /// URLs attempted, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Positions seeked to, in order.
    pub fn seeks(&self) -> Vec<Duration> {
        self.seeks.lock().unwrap().clone()
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    /// Emits a progress event as the platform element would.
    pub fn emit(&self, event: ElementEvent) {
        let _ = self.events.send(event);
    }

    fn script_for(&self, url: &str) -> Script {
        self.scripts
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(self.default_script)
    }
}

#[async_trait]
impl MediaElement for MockElement {
    async fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.current = None;
        state.duration = None;
        state.position = Duration::ZERO;
    }

    async fn load(&self, url: &str) -> Result<(), PlayError> {
        self.attempts.lock().unwrap().push(url.to_owned());

        match self.script_for(url) {
            Script::Play { duration } => {
                let mut state = self.state.lock().unwrap();
                state.current = Some(url.to_owned());
                state.duration = duration;
                Ok(())
            }
            Script::FailLoad(e) => Err(e),
            Script::FailPlay(_) => {
                self.state.lock().unwrap().current = Some(url.to_owned());
                Ok(())
            }
            Script::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn play(&self) -> Result<(), PlayError> {
        let current = self.state.lock().unwrap().current.clone();
        match current {
            Some(url) => match self.script_for(&url) {
                Script::FailPlay(e) => Err(e),
                _ => Ok(()),
            },
            None => Err(PlayError::Aborted),
        }
    }

    async fn pause(&self) {}

    async fn seek(&self, position: Duration) {
        self.seeks.lock().unwrap().push(position);
        self.state.lock().unwrap().position = position;
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> Option<Duration> {
        self.state.lock().unwrap().duration
    }

    fn supports_native_hls(&self) -> bool {
        self.native_hls
    }

    fn events(&self) -> broadcast::Receiver<ElementEvent> {
        self.events.subscribe()
    }
}

/// An HLS backend whose attach outcome is scripted per manifest URL.
pub struct MockHls {
    scripts: Mutex<HashMap<String, Script>>,
    default_script: Script,
    pub attaches: Mutex<Vec<String>>,
}

impl MockHls {
    pub fn with_default(default_script: Script) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_script,
            attaches: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_owned(), script);
    }
}

#[async_trait]
impl HlsBackend for MockHls {
    async fn attach(
        &self,
        element: &dyn MediaElement,
        manifest_url: &str,
    ) -> Result<(), PlayError> {
        self.attaches.lock().unwrap().push(manifest_url.to_owned());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(manifest_url)
            .copied()
            .unwrap_or(self.default_script);

        match script {
            Script::Play { .. } | Script::FailPlay(_) => {
                // Attach counts as loading the manifest into the element.
                element.load(manifest_url).await
            }
            Script::FailLoad(e) => Err(e),
            Script::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn detach(&self, _element: &dyn MediaElement) {}
}
