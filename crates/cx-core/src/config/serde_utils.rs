//! Shared serde helpers for configuration
//!
//! Durations are written as seconds so config files stay readable.

/// Serialize a `Duration` as (possibly fractional) seconds
///
/// Whole seconds are written as integers; sub-second values such as a
/// `0.25` reconnect delay round-trip as floats.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Config {
///     #[serde(with = "cx_core::config::serde_utils::duration_secs")]
///     delay: Duration,
/// }
/// ```
pub mod duration_secs {
    use serde::{self, de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize a Duration as seconds
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    /// Deserialize a Duration from integer or float seconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
