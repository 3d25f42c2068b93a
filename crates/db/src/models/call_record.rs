use parley_core::call::{CallRecord, CallStatus, CallType};
use parley_core::types::Timestamp;
use sqlx::FromRow;

/// Row from the `call_records` table. Enum columns are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct CallRecordRow {
    pub id: String,
    pub caller_id: String,
    pub receiver_id: String,
    pub call_type: String,
    pub status: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration_ms: Option<i64>,
}

impl TryFrom<CallRecordRow> for CallRecord {
    type Error = String;

    fn try_from(row: CallRecordRow) -> Result<Self, Self::Error> {
        let call_type = CallType::parse(&row.call_type)
            .ok_or_else(|| format!("unknown call_type '{}' on call {}", row.call_type, row.id))?;
        let status = CallStatus::parse(&row.status)
            .ok_or_else(|| format!("unknown status '{}' on call {}", row.status, row.id))?;
        Ok(CallRecord {
            id: row.id,
            caller_id: row.caller_id,
            receiver_id: row.receiver_id,
            call_type,
            status,
            start_time: row.start_time,
            end_time: row.end_time,
            duration_ms: row.duration_ms,
        })
    }
}
