pub mod actor;
pub mod error;
pub mod estimate;
pub mod gate;
pub mod ledger;
pub mod model;

pub use actor::{LedgerHandle, spawn};
pub use error::SessionError;
pub use model::{InventoryDelta, LookupJob, LookupOutcome, SessionId, SessionState};
