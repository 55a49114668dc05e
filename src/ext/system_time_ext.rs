use std::time::{Duration, SystemTime};

/// Conversions between `SystemTime` and the millisecond timestamps stored in
/// snapshots.
pub trait SystemTimeExt {
    fn to_unix_millis(&self) -> i64;
}

impl SystemTimeExt for SystemTime {
    fn to_unix_millis(&self) -> i64 {
        match self.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_millis())
                .map(|millis| -millis)
                .unwrap_or(i64::MIN),
        }
    }
}

pub fn system_time_from_unix_millis(millis: i64) -> SystemTime {
    let offset = Duration::from_millis(millis.unsigned_abs());
    if millis >= 0 {
        SystemTime::UNIX_EPOCH + offset
    } else {
        SystemTime::UNIX_EPOCH - offset
    }
}
