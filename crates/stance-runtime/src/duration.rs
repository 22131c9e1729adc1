//! Serde helpers for durations in configuration files.
//!
//! Accepts either a bare number of seconds (`120`) or a human-readable
//! string (`"2m"`, `"90s"`). Serializes to the human-readable form.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Secs(u64),
    Text(String),
}

impl RawDuration {
    fn into_duration<E: serde::de::Error>(self) -> Result<Duration, E> {
        match self {
            RawDuration::Secs(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(text) => humantime::parse_duration(text.trim())
                .map_err(|e| E::custom(format!("invalid duration '{}': {}", text, e))),
        }
    }
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    RawDuration::deserialize(deserializer)?.into_duration()
}

/// Same as the parent module, for optional fields.
pub mod option {
    use super::RawDuration;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => super::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<RawDuration>::deserialize(deserializer)?
            .map(|raw| raw.into_duration::<D::Error>())
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "super")]
        timeout: Duration,
        #[serde(default, with = "super::option")]
        probe: Option<Duration>,
    }

    #[test]
    fn test_seconds_and_text_forms() {
        let holder: Holder = serde_yaml::from_str("timeout: 120\nprobe: 5s").unwrap();
        assert_eq!(holder.timeout, Duration::from_secs(120));
        assert_eq!(holder.probe, Some(Duration::from_secs(5)));

        let holder: Holder = serde_yaml::from_str("timeout: 2m").unwrap();
        assert_eq!(holder.timeout, Duration::from_secs(120));
        assert_eq!(holder.probe, None);
    }

    #[test]
    fn test_invalid_text_rejected() {
        let result: Result<Holder, _> = serde_yaml::from_str("timeout: soon");
        assert!(result.is_err());
    }

    #[test]
    fn test_serializes_human_readable() {
        let holder = Holder {
            timeout: Duration::from_secs(90),
            probe: None,
        };
        let yaml = serde_yaml::to_string(&holder).unwrap();
        assert!(yaml.contains("1m 30s"));

        let back: Holder = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, holder);
    }
}
