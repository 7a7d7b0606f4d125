use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a session is already active; end it before beginning another")]
    SessionAlreadyActive,

    #[error("no session is active")]
    NoActiveSession,

    #[error("ledger actor is no longer running")]
    ActorUnavailable,
}
