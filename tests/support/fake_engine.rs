// ABOUTME: In-memory container engine for exercising the manager without a daemon.
// ABOUTME: Records every call and can be switched unreachable at any time.

use async_trait::async_trait;
use futures::StreamExt;
use labs_launcher::engine::{
    ContainerStats, ContainerSummary, Engine, EngineConnector, EngineError, EngineVersion,
    ImageInfo, PullEvent, PullStream, RunSpec,
};
use labs_launcher::types::{ContainerId, ContainerStatus, ImageId, ImageRef};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// An engine call, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Version,
    FindContainer(String),
    InspectImage(String),
    Run(String),
    Kill(String),
    Remove(String),
    Stats(String),
    Pull(String),
}

#[derive(Default)]
struct State {
    reachable: bool,
    calls: Vec<Call>,
    container: Option<ContainerSummary>,
    images: HashSet<String>,
    run_error: Option<String>,
    pull_events: Vec<PullEvent>,
    pull_gate: Option<Arc<Notify>>,
    runs: usize,
}

#[derive(Clone)]
pub struct FakeEngine {
    state: Arc<Mutex<State>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                reachable: true,
                ..State::default()
            })),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    pub fn add_image(&self, name: &str) {
        self.state.lock().images.insert(name.to_string());
    }

    pub fn has_image(&self, name: &str) -> bool {
        self.state.lock().images.contains(name)
    }

    pub fn set_container(&self, name: &str, status: ContainerStatus) {
        self.state.lock().container = Some(ContainerSummary {
            id: ContainerId::new("0123456789abcdef"),
            name: name.to_string(),
            image: "repo:v1.0.0".to_string(),
            status,
        });
    }

    pub fn container_status(&self) -> Option<ContainerStatus> {
        self.state.lock().container.as_ref().map(|c| c.status.clone())
    }

    pub fn fail_runs_with(&self, message: &str) {
        self.state.lock().run_error = Some(message.to_string());
    }

    pub fn allow_runs(&self) {
        self.state.lock().run_error = None;
    }

    /// Hold every pull stream open after its events until `gate` is notified.
    pub fn gate_pulls(&self, gate: Arc<Notify>) {
        self.state.lock().pull_gate = Some(gate);
    }

    pub fn script_pull(&self, events: Vec<PullEvent>) {
        self.state.lock().pull_events = events;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn runs(&self) -> usize {
        self.state.lock().runs
    }

    fn enter(&self, call: Call) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.reachable {
            Ok(())
        } else {
            Err(EngineError::Connection("connection refused".to_string()))
        }
    }
}

/// Download events for `layers` layers of `size` bytes each, in `steps` chunks.
pub fn layer_events(layers: usize, size: u64, steps: u64) -> Vec<PullEvent> {
    let mut events = Vec::new();
    for layer in 0..layers {
        let id = format!("layer{layer}");
        events.push(PullEvent {
            id: Some(id.clone()),
            status: Some("Pulling fs layer".to_string()),
            ..PullEvent::default()
        });
        for step in 1..=steps {
            events.push(PullEvent {
                id: Some(id.clone()),
                status: Some("Downloading".to_string()),
                current: Some(size * step / steps),
                total: Some(size),
            });
        }
        events.push(PullEvent {
            id: Some(id),
            status: Some("Pull complete".to_string()),
            ..PullEvent::default()
        });
    }
    events
}

#[async_trait]
impl Engine for FakeEngine {
    async fn version(&self) -> Result<EngineVersion, EngineError> {
        self.enter(Call::Version)?;
        Ok(EngineVersion {
            version: "27.0.0".to_string(),
            api_version: "1.47".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        })
    }

    async fn find_container(&self, name: &str) -> Result<Option<ContainerSummary>, EngineError> {
        self.enter(Call::FindContainer(name.to_string()))?;
        Ok(self
            .state
            .lock()
            .container
            .clone()
            .filter(|c| c.name == name))
    }

    async fn inspect_image(&self, image: &ImageRef) -> Result<Option<ImageInfo>, EngineError> {
        let name = image.to_string();
        self.enter(Call::InspectImage(name.clone()))?;
        let present = self.state.lock().images.contains(&name);
        Ok(present.then(|| ImageInfo {
            id: ImageId::new(format!("sha256:{:0>64}", name.len())),
            reference: image.clone(),
            size: Some(1024),
        }))
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<ContainerId, EngineError> {
        self.enter(Call::Run(spec.image.clone()))?;
        let mut state = self.state.lock();
        state.runs += 1;
        if let Some(ref message) = state.run_error {
            return Err(EngineError::Runtime(message.clone()));
        }
        let id = ContainerId::new(format!("container{}", state.runs));
        state.container = Some(ContainerSummary {
            id: id.clone(),
            name: spec.name.clone(),
            image: spec.image.clone(),
            status: ContainerStatus::Running,
        });
        Ok(id)
    }

    async fn kill_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        self.enter(Call::Kill(id.to_string()))?;
        if let Some(ref mut container) = self.state.lock().container {
            container.status = ContainerStatus::Exited;
        }
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        self.enter(Call::Remove(id.to_string()))?;
        self.state.lock().container = None;
        Ok(())
    }

    async fn container_stats(&self, id: &ContainerId) -> Result<ContainerStats, EngineError> {
        self.enter(Call::Stats(id.to_string()))?;
        Ok(ContainerStats::from_json(serde_json::json!({
            "memory_stats": { "usage": 1048576, "limit": 4194304 }
        })))
    }

    fn pull_image(&self, image: &ImageRef) -> PullStream {
        let name = image.to_string();
        if let Err(e) = self.enter(Call::Pull(name.clone())) {
            return Box::pin(futures::stream::once(async move { Err::<PullEvent, EngineError>(e) }));
        }

        let (events, gate) = {
            let state = self.state.lock();
            (state.pull_events.clone(), state.pull_gate.clone())
        };
        let state = Arc::clone(&self.state);
        // The image only appears once the stream has been read to the end
        let finish = futures::stream::once(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            state.lock().images.insert(name);
            None::<Result<PullEvent, EngineError>>
        })
        .filter_map(futures::future::ready);

        Box::pin(futures::stream::iter(events.into_iter().map(Ok)).chain(finish))
    }
}

/// Hands out the fake engine, optionally failing to build a client.
pub struct FakeConnector {
    engine: FakeEngine,
    fail: AtomicBool,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(engine: FakeEngine) -> Self {
        Self {
            engine,
            fail: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl EngineConnector for FakeConnector {
    fn connect(&self) -> Result<Arc<dyn Engine>, EngineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Connection("no engine socket".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.engine.clone()))
    }
}
