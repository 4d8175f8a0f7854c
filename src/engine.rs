//! The foreign-call boundary.
//!
//! [`EngineBridge`] is the synchronous contract the native engine's binding
//! layer implements; [`EventDispatcher`] is the entry point its callback
//! thread drives. The engine itself is an external collaborator: this crate
//! ships no `extern "C"` glue, only the seam.

use crate::bus::EventBus;
use crate::lifecycle::StateCell;
use crate::model::{AddonInfo, EngineEvent, EnginePaths, InputMethodEntry, RawConfig};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Blocking entry points into the foreign engine.
///
/// Every method is a direct round-trip on the caller's thread. None of them
/// are called by this crate outside the `Ready` state except `initialize`
/// (during `Starting`) and `shutdown` (during `Stopping`).
pub trait EngineBridge: Send + Sync + 'static {
    /// Run the engine: perform startup with the given paths, then block on
    /// its event loop until [`EngineBridge::shutdown`] is called from
    /// another thread. Returns the engine's exit status; non-zero means
    /// startup or the loop failed.
    ///
    /// The engine must signal readiness by delivering the distinguished
    /// ready event through `dispatcher` once it accepts commands.
    fn initialize(&self, paths: &EnginePaths, dispatcher: EventDispatcher) -> i32;

    /// Ask the engine loop to exit. Callable from any thread.
    fn shutdown(&self);

    fn save_config(&self);
    fn send_key(&self, key: &str);
    fn send_key_char(&self, c: char);
    fn select_candidate(&self, idx: usize);
    fn is_input_panel_empty(&self) -> bool;
    fn reset_input_panel(&self);
    fn list_input_methods(&self) -> Vec<InputMethodEntry>;
    fn input_method_status(&self) -> InputMethodEntry;
    fn set_input_method(&self, ime: &str);
    fn available_input_methods(&self) -> Vec<InputMethodEntry>;
    fn set_enabled_input_methods(&self, imes: &[String]);
    fn global_config(&self) -> RawConfig;
    fn set_global_config(&self, config: &RawConfig);
    /// `None` when no addon with that name exists.
    fn addon_config(&self, addon: &str) -> Option<RawConfig>;
    fn set_addon_config(&self, addon: &str, config: &RawConfig);
    /// `None` when no input method with that name exists.
    fn input_method_config(&self, im: &str) -> Option<RawConfig>;
    fn set_input_method_config(&self, im: &str, config: &RawConfig);
    fn addons(&self) -> Vec<AddonInfo>;
    fn set_addon_state(&self, names: &[String], states: &[bool]);
    fn trigger_quick_phrase(&self);
}

/// Receiver for the engine's asynchronous callback channel.
///
/// Cheap to clone; the binding layer keeps one and calls
/// [`EventDispatcher::deliver`] from the engine's own thread. Work done per
/// call is O(1) bookkeeping plus one lossy publish, so the callback thread
/// is never blocked behind slow consumers.
#[derive(Clone)]
pub struct EventDispatcher {
    bus: Arc<EventBus>,
    cell: Arc<StateCell>,
}

impl EventDispatcher {
    pub(crate) fn new(bus: Arc<EventBus>, cell: Arc<StateCell>) -> Self {
        Self { bus, cell }
    }

    /// Decode one raw callback into a typed event and publish it.
    ///
    /// The ready event additionally drives the `Starting → Ready` state
    /// transition before publication, so readiness is observable through
    /// the (reliable) state machine even if the bus drops the event.
    pub fn deliver(&self, event_type: i32, params: Vec<Value>) {
        debug!(event_type, params = params.len(), "engine callback");
        let event = EngineEvent::decode(event_type, params);
        if event.is_ready() {
            self.cell.mark_ready();
        }
        self.bus.publish(&event);
    }
}
