//! Call-signaling records.
//!
//! A call is persisted on initiation with the pessimistic `Missed` status.
//! Only an explicit end overwrites the status, and it also sets the end time
//! and duration exactly once.

use serde::{Deserialize, Serialize};

use crate::types::{CallId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    Voice,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    Completed,
    Missed,
    Rejected,
    Failed,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Voice => "VOICE",
            CallType::Video => "VIDEO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "VOICE" => Some(CallType::Voice),
            "VIDEO" => Some(CallType::Video),
            _ => None,
        }
    }
}

impl CallStatus {
    /// Status assigned to every call at initiation.
    pub const INITIAL: CallStatus = CallStatus::Missed;

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Completed => "COMPLETED",
            CallStatus::Missed => "MISSED",
            CallStatus::Rejected => "REJECTED",
            CallStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "COMPLETED" => Some(CallStatus::Completed),
            "MISSED" => Some(CallStatus::Missed),
            "REJECTED" => Some(CallStatus::Rejected),
            "FAILED" => Some(CallStatus::Failed),
            _ => None,
        }
    }
}

/// A persisted call between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: CallId,
    pub caller_id: UserId,
    pub receiver_id: UserId,
    pub call_type: CallType,
    pub status: CallStatus,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    /// `end_time - start_time` in milliseconds, set together with `end_time`.
    pub duration_ms: Option<i64>,
}

impl CallRecord {
    pub fn is_ended(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.caller_id == user_id || self.receiver_id == user_id
    }

    /// The participant on the other side from `user_id`.
    pub fn counterpart(&self, user_id: &str) -> &str {
        if self.caller_id == user_id {
            &self.receiver_id
        } else {
            &self.caller_id
        }
    }
}

/// Input for persisting a newly initiated call.
#[derive(Debug, Clone)]
pub struct NewCallRecord {
    pub caller_id: UserId,
    pub receiver_id: UserId,
    pub call_type: CallType,
    pub start_time: Timestamp,
}

impl NewCallRecord {
    pub fn initiate(caller_id: UserId, receiver_id: UserId, call_type: CallType, at: Timestamp) -> Self {
        Self {
            caller_id,
            receiver_id,
            call_type,
            start_time: at,
        }
    }
}

/// The fields written when a call ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallCompletion {
    pub end_time: Timestamp,
    pub duration_ms: i64,
    pub status: CallStatus,
}

impl CallCompletion {
    /// Build the completion for a call that started at `start_time`.
    ///
    /// An end time before the start (clock skew) is clamped to the start so
    /// the duration is never negative and always equals `end - start`.
    pub fn at(start_time: Timestamp, end_time: Timestamp, status: CallStatus) -> Self {
        let end_time = end_time.max(start_time);
        Self {
            end_time,
            duration_ms: (end_time - start_time).num_milliseconds(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn duration_equals_end_minus_start() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let end = start + Duration::milliseconds(93_250);
        let c = CallCompletion::at(start, end, CallStatus::Completed);
        assert_eq!(c.duration_ms, 93_250);
        assert_eq!(c.end_time, end);
        assert_eq!(c.end_time - start, Duration::milliseconds(c.duration_ms));
    }

    #[test]
    fn end_before_start_is_clamped() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let c = CallCompletion::at(start, start - Duration::seconds(2), CallStatus::Failed);
        assert_eq!(c.end_time, start);
        assert_eq!(c.duration_ms, 0);
    }

    #[test]
    fn initial_status_is_missed() {
        assert_eq!(CallStatus::INITIAL, CallStatus::Missed);
    }

    #[test]
    fn enums_use_uppercase_wire_names() {
        assert_eq!(serde_json::to_string(&CallType::Video).unwrap(), "\"VIDEO\"");
        assert_eq!(
            serde_json::from_str::<CallStatus>("\"REJECTED\"").unwrap(),
            CallStatus::Rejected
        );
        for status in [
            CallStatus::Completed,
            CallStatus::Missed,
            CallStatus::Rejected,
            CallStatus::Failed,
        ] {
            assert_eq!(CallStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CallType::parse("AUDIO"), None);
    }

    #[test]
    fn counterpart_is_other_side() {
        let call = CallRecord {
            id: "c1".into(),
            caller_id: "a".into(),
            receiver_id: "b".into(),
            call_type: CallType::Voice,
            status: CallStatus::Missed,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
        };
        assert_eq!(call.counterpart("a"), "b");
        assert_eq!(call.counterpart("b"), "a");
        assert!(call.is_participant("a"));
        assert!(!call.is_participant("c"));
    }
}
