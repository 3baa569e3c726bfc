use std::fmt::{Display, Write as _};
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::PsrpError;

/// A .NET `DateTime` together with its `DateTimeKind`.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/a4b07cec-f2d1-4834-9d6e-9f82cd0d95a9
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PsDateTime {
    /// No timezone information; encodes without a suffix.
    Unspecified(NaiveDateTime),
    /// Encodes with a `Z` suffix.
    Utc(DateTime<Utc>),
    /// Fixed offset; encodes with a `+HH:MM`/`-HH:MM` suffix.
    Local(DateTime<FixedOffset>),
}

impl PsDateTime {
    /// ISO-8601 text for a `<DT>` element, nanosecond precision, trailing
    /// zeros in the fraction trimmed.
    pub fn to_clixml(&self) -> String {
        match self {
            Self::Unspecified(dt) => format_naive(*dt, ""),
            Self::Utc(dt) => format_naive(dt.naive_utc(), "Z"),
            Self::Local(dt) => {
                let offset = *dt.offset();
                format_naive(dt.naive_local(), &format_offset(offset))
            }
        }
    }

    pub fn from_clixml(text: &str) -> Result<Self, PsrpError> {
        let trimmed = text.trim();
        if let Some(naive) = trimmed.strip_suffix(['Z', 'z']) {
            let dt = parse_naive(naive)?;
            return Ok(Self::Utc(DateTime::from_naive_utc_and_offset(dt, Utc)));
        }
        // An offset suffix has a +/- after the time part; the date's own
        // dashes sit before the 'T'.
        if let Some(t_pos) = trimmed.find('T')
            && let Some(sign_pos) = trimmed[t_pos..]
                .rfind(['+', '-'])
                .map(|p| p + t_pos)
        {
            let (body, offset) = trimmed.split_at(sign_pos);
            let offset = parse_offset(offset)?;
            let naive = parse_naive(body)?;
            let dt = DateTime::from_naive_utc_and_offset(naive - offset_delta(offset), offset);
            return Ok(Self::Local(dt));
        }
        Ok(Self::Unspecified(parse_naive(trimmed)?))
    }
}

impl Display for PsDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_clixml())
    }
}

fn format_naive(dt: NaiveDateTime, suffix: &str) -> String {
    let mut out = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = dt.nanosecond() % 1_000_000_000;
    if nanos > 0 {
        let frac = format!("{nanos:09}");
        let _ = write!(out, ".{}", frac.trim_end_matches('0'));
    }
    out.push_str(suffix);
    out
}

fn format_offset(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    format!("{sign}{:02}:{:02}", secs / 3600, (secs % 3600) / 60)
}

fn parse_naive(text: &str) -> Result<NaiveDateTime, PsrpError> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| PsrpError::MalformedXml(format!("invalid datetime '{text}': {e}")))
}

fn parse_offset(text: &str) -> Result<FixedOffset, PsrpError> {
    static OFFSET: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^([+-])(\d{2}):(\d{2})$").unwrap());
    let caps = OFFSET
        .captures(text)
        .ok_or_else(|| PsrpError::MalformedXml(format!("invalid timezone offset '{text}'")))?;
    let hours: i32 = caps[2].parse().unwrap();
    let minutes: i32 = caps[3].parse().unwrap();
    let secs = hours * 3600 + minutes * 60;
    let secs = if &caps[1] == "-" { -secs } else { secs };
    FixedOffset::east_opt(secs)
        .ok_or_else(|| PsrpError::MalformedXml(format!("timezone offset out of range '{text}'")))
}

fn offset_delta(offset: FixedOffset) -> TimeDelta {
    TimeDelta::seconds(i64::from(offset.local_minus_utc()))
}

/// A .NET `TimeSpan`: a signed nanosecond span.
///
/// Stored as whole nanoseconds (±292 years of range) so the value hashes,
/// orders, and serde-serialises without help; [`Self::delta`] bridges to
/// `chrono` arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PsDuration {
    nanos: i64,
}

impl PsDuration {
    pub fn new(delta: TimeDelta) -> Self {
        Self {
            nanos: delta.num_nanoseconds().unwrap_or(i64::MAX),
        }
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    pub fn as_nanos(&self) -> i64 {
        self.nanos
    }

    pub fn delta(&self) -> TimeDelta {
        TimeDelta::nanoseconds(self.nanos)
    }

    /// ISO-8601 duration (`PnDTnHnMn.nS`) for a `<TS>` element.
    pub fn to_clixml(&self) -> String {
        let negative = self.nanos < 0;
        let total = self.nanos.unsigned_abs();

        let total_secs = total / 1_000_000_000;
        let nanos = total % 1_000_000_000;
        let days = total_secs / 86_400;
        let hours = (total_secs % 86_400) / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;

        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push('P');
        if days > 0 {
            let _ = write!(out, "{days}D");
        }
        let has_time = hours > 0 || minutes > 0 || seconds > 0 || nanos > 0;
        if has_time || days == 0 {
            out.push('T');
            if hours > 0 {
                let _ = write!(out, "{hours}H");
            }
            if minutes > 0 {
                let _ = write!(out, "{minutes}M");
            }
            if nanos > 0 {
                let frac = format!("{nanos:09}");
                let _ = write!(out, "{seconds}.{}S", frac.trim_end_matches('0'));
            } else if seconds > 0 || (days == 0 && hours == 0 && minutes == 0) {
                let _ = write!(out, "{seconds}S");
            }
        }
        out
    }

    pub fn from_clixml(text: &str) -> Result<Self, PsrpError> {
        static DURATION: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d{1,9}))?S)?)?$",
            )
            .unwrap()
        });

        let caps = DURATION
            .captures(text.trim())
            .ok_or_else(|| PsrpError::MalformedXml(format!("invalid duration '{text}'")))?;

        let int = |idx: usize| -> i64 {
            caps.get(idx)
                .map_or(0, |m| m.as_str().parse::<i64>().unwrap_or(0))
        };
        let days = int(2);
        let hours = int(3);
        let minutes = int(4);
        let seconds = int(5);
        let frac_nanos = caps.get(6).map_or(0, |m| {
            let digits = m.as_str();
            let padded = format!("{digits:0<9}");
            padded.parse::<i64>().unwrap_or(0)
        });

        let mut nanos = (days * 86_400 + hours * 3600 + minutes * 60 + seconds)
            .saturating_mul(1_000_000_000)
            .saturating_add(frac_nanos);
        if caps.get(1).is_some() {
            nanos = -nanos;
        }
        Ok(Self { nanos })
    }
}

impl Display for PsDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_clixml())
    }
}

impl From<TimeDelta> for PsDuration {
    fn from(delta: TimeDelta) -> Self {
        Self::new(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn naive_datetime_has_no_suffix() {
        let dt = PsDateTime::Unspecified(naive(2024, 1, 2, 3, 4, 5));
        assert_eq!(dt.to_clixml(), "2024-01-02T03:04:05");
        assert_eq!(PsDateTime::from_clixml("2024-01-02T03:04:05").unwrap(), dt);
    }

    #[test]
    fn utc_datetime_uses_z() {
        let dt = PsDateTime::Utc(DateTime::from_naive_utc_and_offset(
            naive(2024, 1, 2, 3, 4, 5),
            Utc,
        ));
        assert_eq!(dt.to_clixml(), "2024-01-02T03:04:05Z");
        assert_eq!(PsDateTime::from_clixml("2024-01-02T03:04:05Z").unwrap(), dt);
    }

    #[test]
    fn offset_datetime_round_trips() {
        let text = "2024-01-02T03:04:05+05:30";
        let dt = PsDateTime::from_clixml(text).unwrap();
        let PsDateTime::Local(inner) = dt else {
            panic!("expected Local kind");
        };
        assert_eq!(inner.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!(dt.to_clixml(), text);
    }

    #[test]
    fn nanosecond_fraction_is_trimmed() {
        let dt = PsDateTime::Unspecified(
            naive(2024, 1, 2, 3, 4, 5).with_nanosecond(123_400_000).unwrap(),
        );
        assert_eq!(dt.to_clixml(), "2024-01-02T03:04:05.1234");
        assert_eq!(PsDateTime::from_clixml("2024-01-02T03:04:05.1234").unwrap(), dt);
    }

    #[test]
    fn duration_round_trips() {
        let cases = [
            (TimeDelta::seconds(0), "PT0S"),
            (TimeDelta::seconds(90), "PT1M30S"),
            (
                TimeDelta::days(2) + TimeDelta::hours(3) + TimeDelta::nanoseconds(500),
                "P2DT3H0.0000005S",
            ),
            (-TimeDelta::seconds(61), "-PT1M1S"),
        ];
        for (delta, text) in cases {
            let duration = PsDuration::new(delta);
            assert_eq!(duration.to_clixml(), text);
            assert_eq!(PsDuration::from_clixml(text).unwrap(), duration);
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(PsDateTime::from_clixml("not-a-date").is_err());
        assert!(PsDuration::from_clixml("P1X").is_err());
    }
}
