// src/ingest/providers/mod.rs
pub mod bilibili;
pub mod steam;
pub mod xiaoheihe;

pub use bilibili::BilibiliAdapter;
pub use steam::SteamAdapter;
pub use xiaoheihe::XiaoheiheAdapter;

use chrono::{DateTime, Utc};

/// Unix seconds → UTC timestamp; out-of-range values collapse to the epoch.
pub(crate) fn unix_to_utc(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}
