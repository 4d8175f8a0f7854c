//! Engine session: owns the foreign engine end-to-end.
//!
//! `start()` schedules the blocking foreign initializer on the runtime's
//! blocking pool and returns immediately; readiness arrives later through
//! the engine's callback. `stop()` is the one deliberately synchronous
//! boundary: it does not resolve until the background task has unwound, so
//! callers may assume the engine is fully released when it returns.

use crate::assets::AssetProvider;
use crate::bus::{EventBus, Subscription, DEFAULT_CAPACITY};
use crate::engine::{EngineBridge, EventDispatcher};
use crate::error::ControlError;
use crate::lifecycle::{LifecycleObserver, LifecycleState, StateCell};
use crate::model::{AddonInfo, EnginePaths, InputMethodEntry, RawConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// How long `stop()` waits for the background task before giving up and
/// proceeding. The engine loop normally exits promptly once `shutdown` is
/// issued; a task stuck past this bound is logged and abandoned.
pub const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub paths: EnginePaths,
    /// Name of the runtime-asset directory materialized before each start.
    pub asset_name: String,
    /// Per-subscriber event buffer size.
    pub bus_capacity: usize,
    pub stop_timeout: Duration,
}

impl SessionConfig {
    pub fn new(paths: EnginePaths, asset_name: impl Into<String>) -> Self {
        Self {
            paths,
            asset_name: asset_name.into(),
            bus_capacity: DEFAULT_CAPACITY,
            stop_timeout: STOP_JOIN_TIMEOUT,
        }
    }
}

/// The control layer's context object. At most one may be live per process;
/// construction fails fast with [`ControlError::AlreadyRunning`] while
/// another session is not stopped.
pub struct EngineSession {
    bridge: Arc<dyn EngineBridge>,
    assets: Arc<dyn AssetProvider>,
    config: SessionConfig,
    cell: Arc<StateCell>,
    bus: Arc<EventBus>,
    runtime: Handle,
    task: Option<JoinHandle<()>>,
}

impl EngineSession {
    /// Checked before any foreign call: the live-instance invariant and the
    /// presence of a runtime to schedule background work on.
    pub fn new(
        bridge: Arc<dyn EngineBridge>,
        assets: Arc<dyn AssetProvider>,
        config: SessionConfig,
    ) -> Result<Self, ControlError> {
        let runtime = Handle::try_current().map_err(|_| ControlError::NoRuntime)?;
        let cell = StateCell::acquire()?;
        let bus = Arc::new(EventBus::new(config.bus_capacity));
        Ok(Self {
            bridge,
            assets,
            config,
            cell,
            bus,
            runtime,
            task: None,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.cell.get()
    }

    /// Subscribe to subsequent engine events. No history is replayed.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Replace the lifecycle observer. Single slot: passing a new observer
    /// drops the previous one, `None` clears it.
    pub fn set_observer(&self, observer: Option<Arc<dyn LifecycleObserver>>) {
        self.cell.set_observer(observer);
    }

    /// The handle the host's binding layer feeds raw engine callbacks into.
    pub fn dispatcher(&self) -> EventDispatcher {
        EventDispatcher::new(self.bus.clone(), self.cell.clone())
    }

    /// Begin startup. No-op unless the state is `Stopped` and no other
    /// session holds the live slot; returns as soon as the background task
    /// is scheduled.
    ///
    /// A failure during asset preparation or foreign initialization has no
    /// recovery path here: it is logged and the state stays `Starting`
    /// (readiness simply never arrives).
    pub fn start(&mut self) {
        if !StateCell::begin_start(&self.cell) {
            return;
        }
        let bridge = self.bridge.clone();
        let assets = self.assets.clone();
        let paths = self.config.paths.clone();
        let asset_name = self.config.asset_name.clone();
        let dispatcher = self.dispatcher();
        self.task = Some(self.runtime.spawn_blocking(move || {
            if let Err(err) = assets.ensure(&asset_name, &paths.external_data_dir) {
                error!(error = %err, "asset preparation failed; engine will not become ready");
                return;
            }
            // The dispatcher stays owned here for the task's whole life: it
            // pins the state cell, so the live slot cannot be reclaimed
            // while the engine loop is still running.
            let status = bridge.initialize(&paths, dispatcher.clone());
            if status == 0 {
                info!("engine loop exited");
            } else {
                error!(error = %ControlError::Startup { status }, "engine loop exited abnormally");
            }
        }));
    }

    /// Shut the engine down. No-op unless the state is `Ready`.
    ///
    /// Issues the foreign shutdown request, then waits for the background
    /// task to unwind before flipping to `Stopped`, so `start()` is safe to
    /// call again the moment this returns. The wait is bounded by
    /// `stop_timeout`; on expiry the task is abandoned with an error log
    /// rather than hanging the caller forever.
    pub async fn stop(&mut self) {
        if !self
            .cell
            .transition(LifecycleState::Ready, LifecycleState::Stopping)
        {
            return;
        }
        self.bridge.shutdown();
        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            match tokio::time::timeout(self.config.stop_timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.is_panic() => {
                    error!(error = %err, "engine task panicked during shutdown");
                }
                Ok(Err(_)) => {}
                Err(_) => {
                    error!("engine task did not unwind in time; abandoning it");
                    abort.abort();
                }
            }
        }
        self.cell.mark_stopped();
    }

    fn ready(&self) -> Result<&dyn EngineBridge, ControlError> {
        match self.cell.get() {
            LifecycleState::Ready => Ok(self.bridge.as_ref()),
            _ => Err(ControlError::NotReady),
        }
    }

    // Command facade. Each call is a blocking round-trip into the foreign
    // engine, guarded by an explicit readiness check.

    pub fn save_config(&self) -> Result<(), ControlError> {
        self.ready().map(|e| e.save_config())
    }

    /// Send a key by its symbolic name (e.g. `"Control+space"`).
    pub fn send_key(&self, key: &str) -> Result<(), ControlError> {
        self.ready().map(|e| e.send_key(key))
    }

    pub fn send_key_char(&self, c: char) -> Result<(), ControlError> {
        self.ready().map(|e| e.send_key_char(c))
    }

    pub fn select(&self, idx: usize) -> Result<(), ControlError> {
        self.ready().map(|e| e.select_candidate(idx))
    }

    pub fn is_empty(&self) -> Result<bool, ControlError> {
        self.ready().map(|e| e.is_input_panel_empty())
    }

    pub fn reset(&self) -> Result<(), ControlError> {
        self.ready().map(|e| e.reset_input_panel())
    }

    pub fn list_ime(&self) -> Result<Vec<InputMethodEntry>, ControlError> {
        self.ready().map(|e| e.list_input_methods())
    }

    pub fn ime_status(&self) -> Result<InputMethodEntry, ControlError> {
        self.ready().map(|e| e.input_method_status())
    }

    pub fn set_ime(&self, ime: &str) -> Result<(), ControlError> {
        self.ready().map(|e| e.set_input_method(ime))
    }

    pub fn available_ime(&self) -> Result<Vec<InputMethodEntry>, ControlError> {
        self.ready().map(|e| e.available_input_methods())
    }

    pub fn set_enabled_ime(&self, imes: &[String]) -> Result<(), ControlError> {
        self.ready().map(|e| e.set_enabled_input_methods(imes))
    }

    pub fn global_config(&self) -> Result<RawConfig, ControlError> {
        self.ready().map(|e| e.global_config())
    }

    pub fn set_global_config(&self, config: &RawConfig) -> Result<(), ControlError> {
        self.ready().map(|e| e.set_global_config(config))
    }

    /// `Ok(None)` when no addon with that name exists; absence is not an
    /// error.
    pub fn addon_config(&self, addon: &str) -> Result<Option<RawConfig>, ControlError> {
        self.ready().map(|e| e.addon_config(addon))
    }

    pub fn set_addon_config(&self, addon: &str, config: &RawConfig) -> Result<(), ControlError> {
        self.ready().map(|e| e.set_addon_config(addon, config))
    }

    /// `Ok(None)` when no input method with that name exists.
    pub fn ime_config(&self, im: &str) -> Result<Option<RawConfig>, ControlError> {
        self.ready().map(|e| e.input_method_config(im))
    }

    pub fn set_ime_config(&self, im: &str, config: &RawConfig) -> Result<(), ControlError> {
        self.ready().map(|e| e.set_input_method_config(im, config))
    }

    pub fn addons(&self) -> Result<Vec<AddonInfo>, ControlError> {
        self.ready().map(|e| e.addons())
    }

    pub fn set_addon_state(&self, names: &[String], states: &[bool]) -> Result<(), ControlError> {
        self.ready().map(|e| e.set_addon_state(names, states))
    }

    pub fn trigger_quick_phrase(&self) -> Result<(), ControlError> {
        self.ready().map(|e| e.trigger_quick_phrase())
    }
}
