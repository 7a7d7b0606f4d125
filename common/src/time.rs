use chrono::{DateTime, Utc};

/// Wall-clock now in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

