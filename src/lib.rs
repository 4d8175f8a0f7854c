//! Control layer for a long-lived native input-method engine.
//!
//! The engine itself lives behind a foreign-call boundary ([`EngineBridge`])
//! with synchronous entry points and an asynchronous callback channel
//! ([`EventDispatcher`]). This crate supplies everything around it: the
//! process-wide lifecycle state machine, a lossy multicast [`EventBus`] fed
//! by the engine's callback thread, and the blocking command facade on
//! [`EngineSession`].

mod assets;
mod bus;
mod engine;
mod error;
mod lifecycle;
mod model;
mod session;

pub use assets::{AssetProvider, DirAssetProvider};
pub use bus::{EventBus, Subscription, DEFAULT_CAPACITY};
pub use engine::{EngineBridge, EventDispatcher};
pub use error::ControlError;
pub use lifecycle::{LifecycleObserver, LifecycleState};
pub use model::{AddonInfo, EngineEvent, EnginePaths, InputMethodEntry, RawConfig};
pub use session::{EngineSession, SessionConfig, STOP_JOIN_TIMEOUT};
