use thiserror::Error;

/// Errors surfaced by the control layer itself.
///
/// Foreign-call results are returned unchanged; these cover only invariant
/// violations at the API boundary and startup status codes. Event-bus
/// overflow is a deliberate resource bound, never an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    /// A control layer instance is already live in this process.
    #[error("engine control layer is already running")]
    AlreadyRunning,

    /// A command was issued while the engine is not in the `Ready` state.
    #[error("engine is not ready")]
    NotReady,

    /// Construction happened outside a tokio runtime context.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// The foreign initializer returned a non-zero status.
    #[error("engine startup failed with status {status}")]
    Startup { status: i32 },
}
