use async_trait::async_trait;
use session::gate::RecordOutcome;
use session::model::{LookupOutcome, SessionId};
use session::{LedgerHandle, SessionError};

/// Where resolved lookups are delivered.
#[async_trait]
pub trait ResultSink: Send + Sync + 'static {
    async fn deliver(
        &self,
        commodity_key: String,
        session_id: SessionId,
        outcome: LookupOutcome,
    ) -> Result<RecordOutcome, SessionError>;
}

#[async_trait]
impl ResultSink for LedgerHandle {
    async fn deliver(
        &self,
        commodity_key: String,
        session_id: SessionId,
        outcome: LookupOutcome,
    ) -> Result<RecordOutcome, SessionError> {
        self.deliver_result(commodity_key, session_id, outcome).await
    }
}
