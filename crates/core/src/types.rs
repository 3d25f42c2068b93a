use chrono::SubsecRound;

/// Opaque user identifier assigned by the durable store.
pub type UserId = String;

/// Identifier of a persisted chat message.
pub type MessageId = String;

/// Identifier of a persisted call record.
pub type CallId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current time truncated to millisecond precision.
///
/// Every server-assigned timestamp goes through this so values survive a
/// round trip through storage unchanged and call durations stay exact.
pub fn now() -> Timestamp {
    chrono::Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn now_has_millisecond_precision() {
        let ts = now();
        assert_eq!(ts.nanosecond() % 1_000_000, 0);
    }
}
