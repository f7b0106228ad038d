use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use twilight_model::id::Id;

use crate::Error;

/// Milliseconds between the Unix epoch and the first second of 2015, where snowflakes start.
pub const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Creation time encoded in a snowflake.
pub fn snowflake_timestamp<T>(id: Id<T>) -> DateTime<Utc> {
    let ms = (id.get() >> 22) as i64 + DISCORD_EPOCH_MS;
    Utc.timestamp_millis_opt(ms).single().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Smallest snowflake that could have been minted at `time`.
/// Times before the epoch clamp to zero.
pub fn snowflake_from_time(time: DateTime<Utc>) -> u64 {
    let ms = time.timestamp_millis() - DISCORD_EPOCH_MS;
    if ms <= 0 { 0 } else { (ms as u64) << 22 }
}

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^((?P<years>\d+?) ?(years|year|Y|y) ?)?",
        r"((?P<months>\d+?) ?(months|month|m) ?)?",
        r"((?P<weeks>\d+?) ?(weeks|week|W|w) ?)?",
        r"((?P<days>\d+?) ?(days|day|D|d) ?)?",
        r"((?P<hours>\d+?) ?(hours|hour|H|h) ?)?",
        r"((?P<minutes>\d+?) ?(minutes|minute|M) ?)?",
        r"((?P<seconds>\d+?) ?(seconds|second|S|s))?$",
    ))
    .expect("duration pattern compiles")
});

/// A calendar-aware span such as `1y2m3w`. Months and years are applied
/// relative to a point in time, so they are kept apart from the fixed part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalendarDuration {
    pub months: u32,
    pub fixed: Duration,
}

impl CalendarDuration {
    /// The instant this long before `now`.
    pub fn before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let shifted = now
            .checked_sub_months(Months::new(self.months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        shifted.checked_sub_signed(self.fixed).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Collapses months using the distance they cover ending at `now`.
    pub fn as_duration_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.before(now)
    }
}

/// Parses `1y2m3w4d5h6M7s` style durations. Capital `M` is minutes,
/// lowercase `m` months. Returns `None` for anything else, including the empty string.
pub fn parse_duration(input: &str) -> Option<CalendarDuration> {
    let caps = DURATION_RE.captures(input)?;

    let mut any = false;
    let mut get = |name: &str| -> Option<i64> {
        match caps.name(name) {
            Some(m) => {
                any = true;
                m.as_str().parse::<i64>().ok()
            }
            None => Some(0),
        }
    };

    let years = get("years")?;
    let months = get("months")?;
    let weeks = get("weeks")?;
    let days = get("days")?;
    let hours = get("hours")?;
    let minutes = get("minutes")?;
    let seconds = get("seconds")?;

    if !any {
        return None;
    }

    let total_months = u32::try_from(years.checked_mul(12)?.checked_add(months)?).ok()?;
    let fixed = Duration::try_weeks(weeks)?
        .checked_add(&Duration::try_days(days)?)?
        .checked_add(&Duration::try_hours(hours)?)?
        .checked_add(&Duration::try_minutes(minutes)?)?
        .checked_add(&Duration::try_seconds(seconds)?)?;

    Some(CalendarDuration { months: total_months, fixed })
}

/// Parses an ISO 8601 date-time. Inputs without an offset are taken as UTC.
pub fn parse_iso_datetime(input: &str) -> Result<DateTime<Utc>, Error> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(naive.and_utc());
        }
    }

    let date = chrono::NaiveDate::parse_from_str(input, "%Y-%m-%d")?;
    Ok(date.and_hms_opt(0, 0, 0).map(|n| n.and_utc()).unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
}
