//! Main engine - single writer over the application state

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{AiOutcome, AppState, CameraStatus, EventBus, Notification, Scheduler, Severity};
use crate::ai::{
    prepare_report_input, ImageRef, InflightRegistry, ReportGenerator, SceneAnalyzer, Ticket, Trigger,
};
use crate::alerts::{Alert, AlertQuery};
use crate::config::{Config, ConfigChange, MonitorConfig};
use crate::error::{AiError, CameraAccessError, WatchError};
use crate::simulation::Simulator;
use crate::stats::Stats;

const SIMULATION_TASK: &str = "simulation";
const COMMAND_QUEUE: usize = 256;

enum Command {
    Tick,
    DeleteAlert(u64),
    DeleteAllAlerts,
    UpdateConfig(MonitorConfig),
    RefreshAlerts,
    RefreshStats,
    CameraFailed {
        camera_id: String,
        error: CameraAccessError,
    },
    CameraRestored(String),
    AnalyzeImage {
        trigger: Trigger,
        image: ImageRef,
        reply: oneshot::Sender<Result<(), WatchError>>,
    },
    GenerateReport {
        start: NaiveDate,
        end: NaiveDate,
        reply: oneshot::Sender<Result<(), WatchError>>,
    },
    Cancel(Trigger),
    AiFinished {
        trigger: Trigger,
        ticket: Ticket,
        result: Result<AiOutcome, AiError>,
    },
    Snapshot(oneshot::Sender<StateSnapshot>),
}

/// Point-in-time copy of the application state
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub config: MonitorConfig,
    pub config_history: Vec<ConfigChange>,
    pub alerts: Vec<Alert>,
    pub stats: Stats,
    pub cameras: BTreeMap<String, CameraStatus>,
    pub ai_views: HashMap<Trigger, AiOutcome>,
}

impl StateSnapshot {
    pub fn ai_view(&self, trigger: &Trigger) -> Option<&AiOutcome> {
        self.ai_views.get(trigger)
    }

    /// Alert log view for `query`, newest first
    pub fn filtered(&self, query: &AlertQuery) -> Vec<Alert> {
        query.apply(&self.alerts)
    }
}

/// Cloneable front door to a running engine. Every call is queued and applied
/// in order by the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    async fn send(&self, command: Command) -> Result<(), WatchError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| WatchError::EngineStopped)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, WatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| WatchError::EngineStopped)
    }

    /// Run one simulation step now, outside the timer
    pub async fn tick(&self) -> Result<(), WatchError> {
        self.send(Command::Tick).await
    }

    pub async fn delete_alert(&self, id: u64) -> Result<(), WatchError> {
        self.send(Command::DeleteAlert(id)).await
    }

    pub async fn delete_all_alerts(&self) -> Result<(), WatchError> {
        self.send(Command::DeleteAllAlerts).await
    }

    /// Validate and apply a complete configuration
    pub async fn update_config(&self, config: MonitorConfig) -> Result<(), WatchError> {
        config.validate()?;
        self.send(Command::UpdateConfig(config)).await
    }

    pub async fn refresh_alerts(&self) -> Result<(), WatchError> {
        self.send(Command::RefreshAlerts).await
    }

    pub async fn refresh_stats(&self) -> Result<(), WatchError> {
        self.send(Command::RefreshStats).await
    }

    pub async fn report_camera_error(
        &self,
        camera_id: &str,
        error: CameraAccessError,
    ) -> Result<(), WatchError> {
        self.send(Command::CameraFailed {
            camera_id: camera_id.to_string(),
            error,
        })
        .await
    }

    pub async fn camera_restored(&self, camera_id: &str) -> Result<(), WatchError> {
        self.send(Command::CameraRestored(camera_id.to_string())).await
    }

    /// Start an image analysis for `trigger`. Fails with [`WatchError::Busy`]
    /// while one is already running there.
    pub async fn analyze_image(&self, trigger: Trigger, image: ImageRef) -> Result<(), WatchError> {
        self.request(|reply| Command::AnalyzeImage {
            trigger,
            image,
            reply,
        })
        .await?
    }

    /// Start report generation for the inclusive range `[start, end]`
    pub async fn generate_report(&self, start: NaiveDate, end: NaiveDate) -> Result<(), WatchError> {
        self.request(|reply| Command::GenerateReport { start, end, reply })
            .await?
    }

    /// Drop the request running for `trigger`; a late response is ignored
    pub async fn cancel(&self, trigger: Trigger) -> Result<(), WatchError> {
        self.send(Command::Cancel(trigger)).await
    }

    pub async fn snapshot(&self) -> Result<StateSnapshot, WatchError> {
        self.request(Command::Snapshot).await
    }
}

/// Main Watchpost engine
pub struct Engine {
    pub config: Arc<Config>,
    bus: Arc<EventBus>,
    analyzer: Option<Arc<dyn SceneAnalyzer>>,
    reporter: Option<Arc<dyn ReportGenerator>>,
    scheduler: Scheduler,
    shutdown: Option<broadcast::Sender<()>>,
    worker: Option<JoinHandle<AppState>>,
    handle: Option<EngineHandle>,
    start_time: Option<Instant>,
}

impl Engine {
    pub fn new(config: Config, bus: Arc<EventBus>) -> Self {
        Self {
            config: Arc::new(config),
            bus,
            analyzer: None,
            reporter: None,
            scheduler: Scheduler::new(),
            shutdown: None,
            worker: None,
            handle: None,
            start_time: None,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn SceneAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ReportGenerator>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Attach the HTTP client to both AI seams when `ai.enabled` is set
    #[cfg(feature = "ai-client")]
    pub fn with_configured_ai(self) -> Result<Self, WatchError> {
        if !self.config.ai.enabled {
            debug!("AI collaborator disabled in config");
            return Ok(self);
        }
        let client = Arc::new(crate::ai::OpenAiClient::new(&self.config.ai)?);
        info!("AI collaborator: {} at {}", client.model_name(), self.config.ai.base_url);
        Ok(self.with_analyzer(client.clone()).with_reporter(client))
    }

    #[cfg(not(feature = "ai-client"))]
    pub fn with_configured_ai(self) -> Result<Self, WatchError> {
        if self.config.ai.enabled {
            warn!("ai.enabled is set but this build lacks the ai-client feature");
        }
        Ok(self)
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    /// Spawn the engine task and the simulation timer
    pub async fn start(&mut self) -> Result<EngineHandle, WatchError> {
        if let Some(handle) = &self.handle {
            return Ok(handle.clone());
        }
        info!("Starting Watchpost engine...");

        let simulator = Simulator::from_config(&self.config.simulation)?;
        let state = AppState::from_config(&self.config, Utc::now());

        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let worker = Worker {
            state,
            simulator,
            bus: self.bus.clone(),
            analyzer: self.analyzer.clone(),
            reporter: self.reporter.clone(),
            inflight: InflightRegistry::new(),
            ai_timeout: self.config.ai.timeout(),
            commands: rx,
            loopback: tx.clone(),
        };
        self.worker = Some(tokio::spawn(worker.run(shutdown_rx)));

        let tick_tx = tx.clone();
        let interval = self.config.simulation.tick_interval();
        self.scheduler.add_task(SIMULATION_TASK, interval, move || {
            if tick_tx.try_send(Command::Tick).is_err() {
                debug!("Command queue full, dropping simulation tick");
            }
        });

        let handle = EngineHandle { tx };
        self.handle = Some(handle.clone());
        self.shutdown = Some(shutdown_tx);
        self.start_time = Some(Instant::now());

        info!("Watchpost engine started (tick every {:?})", interval);
        Ok(handle)
    }

    /// Stop the timer and the engine task, returning the final state
    pub async fn stop(&mut self) -> Result<Option<AppState>, WatchError> {
        info!("Stopping Watchpost engine...");
        self.scheduler.remove_task(SIMULATION_TASK);
        self.handle = None;

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let state = match self.worker.take() {
            Some(worker) => match worker.await {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("Engine task ended abnormally: {}", e);
                    None
                }
            },
            None => None,
        };
        self.start_time = None;

        info!("Watchpost engine stopped");
        Ok(state)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Whole seconds since `start`, 0 when stopped
    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }
}

/// The engine task. Holds the only mutable reference to the state.
struct Worker {
    state: AppState,
    simulator: Simulator<ChaCha8Rng>,
    bus: Arc<EventBus>,
    analyzer: Option<Arc<dyn SceneAnalyzer>>,
    reporter: Option<Arc<dyn ReportGenerator>>,
    inflight: InflightRegistry,
    ai_timeout: Duration,
    commands: mpsc::Receiver<Command>,
    /// Used by AI tasks to hand results back
    loopback: mpsc::Sender<Command>,
}

impl Worker {
    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> AppState {
        loop {
            let command = tokio::select! {
                command = self.commands.recv() => command,
                _ = shutdown.recv() => None,
            };
            match command {
                Some(command) => self.apply(command),
                None => {
                    debug!("Engine task shutting down...");
                    break;
                }
            }
        }
        self.state
    }

    fn apply(&mut self, command: Command) {
        let bus = self.bus.clone();
        match command {
            Command::Tick => {
                if let Some(alert) = self.simulator.tick(&mut self.state, &*bus) {
                    bus.publish_alert(alert);
                }
            }
            Command::DeleteAlert(id) => {
                self.state.delete_alert(id, &*bus);
            }
            Command::DeleteAllAlerts => self.state.delete_all_alerts(&*bus),
            Command::UpdateConfig(config) => {
                self.state.config.update(config.clone(), &*bus);
                bus.publish_config(config);
            }
            Command::RefreshAlerts => self.state.refresh_alerts(self.simulator.rng_mut(), &*bus),
            Command::RefreshStats => self.state.refresh_stats(&*bus),
            Command::CameraFailed { camera_id, error } => {
                let banner = self.state.camera_failed(&camera_id, &error);
                bus.publish_banner(&camera_id, Some(banner));
            }
            Command::CameraRestored(camera_id) => {
                self.state.camera_restored(&camera_id);
                bus.publish_banner(&camera_id, None);
            }
            Command::AnalyzeImage {
                trigger,
                image,
                reply,
            } => {
                let _ = reply.send(self.dispatch_analysis(trigger, image));
            }
            Command::GenerateReport { start, end, reply } => {
                let _ = reply.send(self.dispatch_report(start, end));
            }
            Command::Cancel(trigger) => {
                if self.inflight.cancel(&trigger) {
                    debug!("Cancelled request for {}", trigger);
                }
                self.state.clear_ai_view(&trigger);
            }
            Command::AiFinished {
                trigger,
                ticket,
                result,
            } => self.finish(trigger, ticket, result),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn dispatch_analysis(&mut self, trigger: Trigger, image: ImageRef) -> Result<(), WatchError> {
        let analyzer = self.analyzer.clone().ok_or(WatchError::AiUnavailable)?;
        let ticket = self.claim(&trigger)?;
        info!("Analyzing image for {}: {}", trigger, image);

        self.spawn_ai(trigger, ticket, async move {
            analyzer
                .analyze_image(&image)
                .await
                .map(|a| AiOutcome::Analysis(a.normalized()))
        });
        Ok(())
    }

    fn dispatch_report(&mut self, start: NaiveDate, end: NaiveDate) -> Result<(), WatchError> {
        let reporter = self.reporter.clone().ok_or(WatchError::AiUnavailable)?;
        let stats = self.state.stats.snapshot();
        let input = prepare_report_input(
            start,
            end,
            self.state.alerts.iter(),
            &stats,
            self.state.config.history(),
        )?;
        let ticket = self.claim(&Trigger::Report)?;
        info!("Generating security report for {} to {}", start, end);

        self.spawn_ai(Trigger::Report, ticket, async move {
            reporter.generate_report(&input).await.map(AiOutcome::Report)
        });
        Ok(())
    }

    fn claim(&mut self, trigger: &Trigger) -> Result<Ticket, WatchError> {
        let ticket = self
            .inflight
            .begin(trigger)
            .ok_or_else(|| WatchError::Busy(trigger.to_string()))?;
        // previous result is hidden while the new one loads
        self.state.set_ai_view(trigger.clone(), AiOutcome::Pending);
        Ok(ticket)
    }

    fn spawn_ai<F>(&self, trigger: Trigger, ticket: Ticket, call: F)
    where
        F: std::future::Future<Output = Result<AiOutcome, AiError>> + Send + 'static,
    {
        let loopback = self.loopback.clone();
        let cap = self.ai_timeout;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(cap, call).await {
                Ok(result) => result,
                Err(_) => Err(AiError::Timeout(cap)),
            };
            let _ = loopback
                .send(Command::AiFinished {
                    trigger,
                    ticket,
                    result,
                })
                .await;
        });
    }

    fn finish(&mut self, trigger: Trigger, ticket: Ticket, result: Result<AiOutcome, AiError>) {
        if !self.inflight.finish(&trigger, ticket) {
            debug!("Discarding stale response for {}", trigger);
            return;
        }

        match result {
            Ok(outcome) => {
                debug!("Result ready for {}", trigger);
                self.state.set_ai_view(trigger, outcome);
            }
            Err(e) => {
                warn!("AI request for {} failed: {}", trigger, e);
                self.state.clear_ai_view(&trigger);
                let (title, description) = match trigger {
                    Trigger::Report => (
                        "Report Generation Failed",
                        "Could not generate the security report.",
                    ),
                    _ => ("Analysis Failed", "Could not analyze the snapshot image."),
                };
                self.bus
                    .publish_notification(Notification::new(title, description, Severity::Destructive));
            }
        }
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            config: self.state.config.get(),
            config_history: self.state.config.history().to_vec(),
            alerts: self.state.alerts.list(),
            stats: self.state.stats.snapshot(),
            cameras: self.state.cameras().clone(),
            ai_views: self.state.ai_views().clone(),
        }
    }
}
