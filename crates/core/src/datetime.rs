//! Conversion between local datetimes and the Dataverse wire format.
//!
//! Dataverse stores and returns dates in UTC as `YYYY-mm-ddTHH:MM:SSZ`.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, thiserror::Error)]
pub enum DateTimeError {
  #[error("failed to parse dataverse date '{0}'")]
  Parse(String),
  #[error("local time {0} does not exist in time zone {1}")]
  NonExistentLocalTime(NaiveDateTime, Tz),
}

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Convert a datetime to a Dataverse compatible ISO formatted date string.
///
/// `from_tz` names the IANA time zone the naive value is in. Dataverse dates
/// are in UTC, so zoned values are converted to it. With no zone given the
/// value is taken to already be UTC.
pub fn to_dataverse_format(date: NaiveDateTime, from_tz: Option<Tz>) -> Result<String, DateTimeError> {
  let utc: DateTime<Utc> = match from_tz {
    Some(tz) => tz
      .from_local_datetime(&date)
      .earliest()
      .ok_or(DateTimeError::NonExistentLocalTime(date, tz))?
      .with_timezone(&Utc),
    None => Utc.from_utc_datetime(&date),
  };

  Ok(format!("{}Z", utc.format(WIRE_FORMAT)))
}

/// Convert a Dataverse compatible ISO formatted date string to a datetime.
///
/// `to_tz` names the IANA time zone to convert the date to. The returned
/// value is the wall-clock time in that zone, without zone information.
pub fn from_dataverse_format(date: &str, to_tz: Tz) -> Result<NaiveDateTime, DateTimeError> {
  let trimmed = date.trim_end_matches('Z');

  // Responses may carry fractional seconds even though requests do not.
  let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
    .or_else(|_| NaiveDateTime::parse_from_str(trimmed, WIRE_FORMAT))
    .map_err(|_| DateTimeError::Parse(date.to_string()))?;

  Ok(Utc.from_utc_datetime(&naive).with_timezone(&to_tz).naive_local())
}
