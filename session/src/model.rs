use std::fmt;
use std::str::FromStr;

use market::types::{FilterConfig, PriceCandidate};

use crate::error::SessionError;
use crate::ledger::CommodityLedger;

pub type SessionId = uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Paused,
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Active => "Active",
            SessionState::Paused => "Paused",
            SessionState::Ended => "Ended",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(SessionState::Active),
            "Paused" => Ok(SessionState::Paused),
            "Ended" => Ok(SessionState::Ended),
            other => Err(format!("Invalid SessionState value: {other}")),
        }
    }
}

/// One cargo change as reported by the journal.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryDelta {
    pub localized_name: String,
    pub canonical_name: String,
    pub delta_tons: i64,
}

/// Everything the dispatcher needs to resolve one price, frozen at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupJob {
    pub commodity_key: String,
    pub localized_name: String,
    pub canonical_name: String,
    pub reference_system: String,
    pub filter: FilterConfig,
    pub session_id: SessionId,
}

/// Final result of a job after every name attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Priced(PriceCandidate),
    Unavailable,
}

/// Activity state plus the ledger of the session in force.
///
/// There is at most one live session. `end` drops its ledger; `begin`
/// always starts from an empty one under a fresh id.
pub struct SessionContext {
    state: SessionState,
    reference_system: Option<String>,
    ledger: Option<CommodityLedger>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            state: SessionState::Ended,
            reference_system: None,
            ledger: None,
        }
    }

    pub fn begin(&mut self, reference_system: &str) -> Result<SessionId, SessionError> {
        if self.state != SessionState::Ended {
            return Err(SessionError::SessionAlreadyActive);
        }

        let id = SessionId::new_v4();
        self.state = SessionState::Active;
        self.reference_system = Some(reference_system.trim().to_string());
        self.ledger = Some(CommodityLedger::new(id));
        Ok(id)
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ended => Err(SessionError::NoActiveSession),
            _ => {
                self.state = SessionState::Paused;
                Ok(())
            }
        }
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ended => Err(SessionError::NoActiveSession),
            _ => {
                self.state = SessionState::Active;
                Ok(())
            }
        }
    }

    /// Ends the live session, discarding its ledger. Returns the ended id.
    pub fn end(&mut self) -> Option<SessionId> {
        self.state = SessionState::Ended;
        self.reference_system = None;
        self.ledger.take().map(|l| l.session_id())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.ledger.as_ref().map(CommodityLedger::session_id)
    }

    pub fn reference_system(&self) -> Option<&str> {
        self.reference_system.as_deref()
    }

    pub fn ledger(&self) -> Option<&CommodityLedger> {
        self.ledger.as_ref()
    }

    pub fn ledger_mut(&mut self) -> Option<&mut CommodityLedger> {
        self.ledger.as_mut()
    }

    /// True only while `id` names the live session.
    pub fn is_current(&self, id: SessionId) -> bool {
        self.session_id() == Some(id)
    }
}
