//! `now` and `uuid7`

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use uuid::{NoContext, Timestamp, Uuid};

/// Current UTC time, RFC 3339 with whole seconds (`2024-05-01T12:00:00Z`)
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A version 7 UUID, or a random version 4 UUID when the system clock is
/// set before the Unix epoch.
pub fn uuid7() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => {
            let ts = Timestamp::from_unix(NoContext, elapsed.as_secs(), elapsed.subsec_nanos());
            Uuid::new_v7(ts).to_string()
        }
        Err(_) => Uuid::new_v4().to_string(),
    }
}
