use crate::db::UsageRecord;
use crate::error::KeeperError;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Serialize, Serializer};

/// Default number of buckets when the caller does not ask for one.
pub const DEFAULT_STEP_COUNT: i64 = 12;

/// Upper bound on buckets per report; each bucket is allocated up front.
pub const MAX_STEP_COUNT: i64 = 1_000;

/// Requests counted in one reporting window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageBucket {
    #[serde(serialize_with = "rfc3339_seconds")]
    pub timestamp: DateTime<Utc>,
    pub request_count: i64,
}

fn rfc3339_seconds<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Rejects a report window that cannot be bucketed.
pub fn check_window(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    step_count: i64,
) -> Result<(), KeeperError> {
    if step_count <= 0 {
        return Err(KeeperError::validation("step must be a positive integer"));
    }
    if step_count > MAX_STEP_COUNT {
        return Err(KeeperError::validation(format!(
            "step must not exceed {MAX_STEP_COUNT}"
        )));
    }
    if to <= from {
        return Err(KeeperError::validation("`to` must be later than `from`"));
    }
    Ok(())
}

/// Bucket `records` into `step_count` windows spanning `[from, to]`.
///
/// The width is `(to - from) / step_count` truncated to whole milliseconds.
/// Window `i` is `[from + i*width, from + (i+1)*width]`, closed on both ends,
/// so a record sitting exactly on an inner edge counts towards both neighbours.
pub fn aggregate(
    records: &[UsageRecord],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    step_count: i64,
) -> Result<Vec<UsageBucket>, KeeperError> {
    check_window(from, to, step_count)?;

    let width_ms = (to - from).num_milliseconds() / step_count;
    let width = TimeDelta::milliseconds(width_ms);

    let buckets = (0..step_count)
        .map(|i| {
            let start = from + TimeDelta::milliseconds(width_ms * i);
            let end = start + width;
            let request_count = records
                .iter()
                .filter(|r| r.timestamp >= start && r.timestamp <= end)
                .map(|r| r.request_count)
                .sum();
            UsageBucket {
                timestamp: start,
                request_count,
            }
        })
        .collect();

    Ok(buckets)
}
