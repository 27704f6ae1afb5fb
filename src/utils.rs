use crate::prelude::*;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

pub fn now() -> DateTime {
  Utc::now().naive_utc()
}

/// Whole days left until `expires_at`, rounded up. Zero or negative once expired.
pub fn remaining_days(expires_at: DateTime, now: DateTime) -> i64 {
  let millis = (expires_at - now).num_milliseconds();
  -(-millis).div_euclid(DAY_MILLIS)
}

pub fn format_date(date: DateTime) -> String {
  date.format("%d.%m.%Y %H:%M").to_string()
}

/// Wire form of timestamps: RFC 3339 in UTC with a `Z` suffix on the way
/// out. Accepts any RFC 3339 offset, a bare `YYYY-MM-DDTHH:MM:SS` (taken as
/// UTC) or a plain `YYYY-MM-DD` (midnight UTC) on the way in.
pub mod timestamp {
  use chrono::{NaiveDate, SecondsFormat};
  use serde::{Deserialize, Deserializer, Serializer, de};

  use super::DateTime;

  pub fn parse(raw: &str) -> Option<DateTime> {
    let raw = raw.trim();
    if let Ok(at) = chrono::DateTime::parse_from_rfc3339(raw) {
      return Some(at.naive_utc());
    }
    if let Ok(at) = raw.parse::<DateTime>() {
      return Some(at);
    }
    raw.parse::<NaiveDate>().ok().and_then(|day| day.and_hms_opt(0, 0, 0))
  }

  pub fn format(at: DateTime) -> String {
    at.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true)
  }

  pub fn serialize<S: Serializer>(
    at: &DateTime,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(*at))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<DateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw)
      .ok_or_else(|| de::Error::custom(format!("invalid timestamp `{raw}`")))
  }

  pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
      at: &Option<DateTime>,
      serializer: S,
    ) -> Result<S::Ok, S::Error> {
      match at {
        Some(at) => super::serialize(at, serializer),
        None => serializer.serialize_none(),
      }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
      deserializer: D,
    ) -> Result<Option<DateTime>, D::Error> {
      match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse(&raw).map(Some).ok_or_else(|| {
          de::Error::custom(format!("invalid timestamp `{raw}`"))
        }),
        None => Ok(None),
      }
    }
  }
}
