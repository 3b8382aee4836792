use crate::config::{WeekClock, MAX_TIMESTAMP};
use crate::error::AppError;
use crate::models::weeklog::{AddEntryRequest, LogEntry};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Numbers arrive either as JSON numbers or as decimal strings (command args).
fn unsigned(field: &str, value: Option<&Value>) -> Result<Option<u64>, AppError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| AppError::Encode(format!("{} must be a non-negative integer", field))),
        Some(Value::String(s)) => {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AppError::Encode(format!("{} is not an integer: {:?}", field, s)));
            }
            s.parse()
                .map(Some)
                .map_err(|_| AppError::Encode(format!("{} does not fit 64 bits: {}", field, s)))
        }
        Some(other) => Err(AppError::Encode(format!("{} must be an integer, got {}", field, other))),
    }
}

fn required(field: &str, value: Option<&Value>) -> Result<u64, AppError> {
    unsigned(field, value)?.ok_or_else(|| AppError::Args(field.to_string()))
}

fn bounded(field: &str, value: u64, max: u64) -> Result<u64, AppError> {
    if value > max {
        return Err(AppError::Encode(format!("{} {} exceeds {}", field, value, max)));
    }
    Ok(value)
}

pub fn validate_timestamp(value: Option<&Value>) -> Result<u32, AppError> {
    let ts = required("timestamp", value)?;
    Ok(bounded("timestamp", ts, MAX_TIMESTAMP as u64)? as u32)
}

/// Checks every field of an `add` request and fills in a missing timestamp
/// from the week clock.
pub fn validate_entry(
    req: &AddEntryRequest,
    clock: &WeekClock,
    now: DateTime<Utc>,
) -> Result<LogEntry, AppError> {
    let steamid = required("steamid", req.steamid.as_ref())?;
    let category = match &req.category {
        None | Some(Value::Null) => return Err(AppError::Args("category".into())),
        Some(Value::String(id)) => id.clone(),
        Some(other) => return Err(AppError::Category(other.to_string())),
    };
    let time = bounded("time", required("time", req.time.as_ref())?, u32::MAX as u64)? as u32;
    let portals = bounded("portals", required("portals", req.portals.as_ref())?, u8::MAX as u64)? as u8;
    let timestamp = match unsigned("timestamp", req.timestamp.as_ref())? {
        Some(ts) => bounded("timestamp", ts, MAX_TIMESTAMP as u64)? as u32,
        None => clock.elapsed(now)?,
    };

    Ok(LogEntry {
        steamid,
        category,
        time,
        portals,
        timestamp,
    })
}

/// Positional `add` arguments: steamid, category, time, portals, timestamp?
pub fn add_request_from_args(args: &[Value]) -> AddEntryRequest {
    AddEntryRequest {
        steamid: args.first().cloned(),
        category: args.get(1).cloned(),
        time: args.get(2).cloned(),
        portals: args.get(3).cloned(),
        timestamp: args.get(4).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const WEEK_START: i64 = 1_700_000_000;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(WEEK_START + 3600, 0).unwrap()
    }

    fn request(steamid: Value, time: Value, portals: Value, timestamp: Value) -> AddEntryRequest {
        AddEntryRequest {
            steamid: Some(steamid),
            category: Some("main".into()),
            time: Some(time),
            portals: Some(portals),
            timestamp: Some(timestamp),
        }
    }

    fn check(req: &AddEntryRequest) -> Result<LogEntry, AppError> {
        validate_entry(req, &WeekClock::new(WEEK_START), now())
    }

    #[test]
    fn test_accepts_boundary_values() {
        let entry = check(&request(
            json!("18446744073709551615"),
            json!(4294967295u64),
            json!(255),
            json!(16777215),
        ))
        .unwrap();
        assert_eq!(entry.steamid, u64::MAX);
        assert_eq!(entry.time, u32::MAX);
        assert_eq!(entry.portals, 255);
        assert_eq!(entry.timestamp, MAX_TIMESTAMP);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let cases = [
            request(json!("18446744073709551616"), json!(1), json!(1), json!(1)),
            request(json!("1"), json!(4294967296u64), json!(1), json!(1)),
            request(json!("1"), json!(1), json!(256), json!(1)),
            request(json!("1"), json!(1), json!(1), json!(16777216)),
        ];
        for req in &cases {
            assert_eq!(check(req).unwrap_err().code(), "ERR_ENCODE");
        }
    }

    #[test]
    fn test_rejects_malformed_steamid() {
        for steamid in [json!("-1"), json!("12a"), json!(""), json!(" 1"), json!(-5), json!(1.5)] {
            let req = request(steamid, json!(1), json!(1), json!(1));
            assert_eq!(check(&req).unwrap_err().code(), "ERR_ENCODE");
        }
    }

    #[test]
    fn test_missing_fields() {
        let mut req = request(json!("1"), json!(1), json!(1), json!(1));
        req.portals = None;
        assert_eq!(check(&req).unwrap_err().code(), "ERR_ARGS");

        let mut req = request(json!("1"), json!(1), json!(1), json!(1));
        req.category = None;
        assert_eq!(check(&req).unwrap_err().code(), "ERR_ARGS");

        assert_eq!(validate_timestamp(None).unwrap_err().code(), "ERR_ARGS");
    }

    #[test]
    fn test_missing_timestamp_uses_week_clock() {
        let req = request(json!("7"), json!(1), json!(1), Value::Null);
        assert_eq!(check(&req).unwrap().timestamp, 3600);
    }

    #[test]
    fn test_non_string_category() {
        let args = [json!("1"), json!(3), json!(100), json!(2), json!(5)];
        let err = check(&add_request_from_args(&args)).unwrap_err();
        assert_eq!(err.code(), "ERR_CATEGORY");

        let args = [json!("1"), Value::Null, json!(100), json!(2), json!(5)];
        let err = check(&add_request_from_args(&args)).unwrap_err();
        assert_eq!(err.code(), "ERR_ARGS");
    }

    #[test]
    fn test_positional_args() {
        let args = [json!("76561198000000001"), json!("lp"), json!("1200"), json!("3")];
        let entry = check(&add_request_from_args(&args)).unwrap();
        assert_eq!(entry.steamid, 76561198000000001);
        assert_eq!(entry.category, "lp");
        assert_eq!((entry.time, entry.portals, entry.timestamp), (1200, 3, 3600));
    }
}
