//! Schedule string grammar.
//!
//! Every schedulable module stores a single schedule string in the
//! `schedule` config document. The accepted forms are:
//!
//! | Form                                | Example                      |
//! |-------------------------------------|------------------------------|
//! | `hourly(MM)`                        | `hourly(15)`                 |
//! | `daily(HH:MM[\|HH:MM...])`          | `daily(08:00\|20:00)`        |
//! | `weekly(Day@HH:MM[\|Day@HH:MM...])` | `weekly(mon@09:00)`          |
//! | `monthly(D@HH:MM[\|D@HH:MM...])`    | `monthly(1@03:30)`           |
//! | `cron(<raw expression>)`            | `cron(*/5 * * * *)`          |
//!
//! Matching is case-insensitive. Hours and minutes always carry two digits.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

const TIME: &str = r"(?:[01][0-9]|2[0-3]):[0-5][0-9]";
const DAY: &str = r"(?:mon(?:day)?|tue(?:sday)?|wed(?:nesday)?|thu(?:rsday)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?)";
const DAY_OF_MONTH: &str = r"(?:0?[1-9]|[12][0-9]|3[01])";

static HOURLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^hourly\(([0-5][0-9])\)$").expect("valid regex"));

static DAILY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^daily\(({TIME}(?:\|{TIME})*)\)$")).expect("valid regex")
});

static WEEKLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^weekly\(({DAY}@{TIME}(?:\|{DAY}@{TIME})*)\)$"
    ))
    .expect("valid regex")
});

static MONTHLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^monthly\(({DAY_OF_MONTH}@{TIME}(?:\|{DAY_OF_MONTH}@{TIME})*)\)$"
    ))
    .expect("valid regex")
});

static CRON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^cron\((.*\S.*)\)$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Schedule must not be empty")]
    Empty,

    #[error("Invalid schedule '{0}': expected hourly(MM), daily(HH:MM), weekly(Day@HH:MM), monthly(D@HH:MM) or cron(...)")]
    Malformed(String),
}

/// Wall-clock time of day with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    fn from_prefix(day: &str) -> Option<Self> {
        let day = day.to_ascii_lowercase();
        let weekday = match day.get(..3)? {
            "mon" => Self::Monday,
            "tue" => Self::Tuesday,
            "wed" => Self::Wednesday,
            "thu" => Self::Thursday,
            "fri" => Self::Friday,
            "sat" => Self::Saturday,
            "sun" => Self::Sunday,
            _ => return None,
        };
        Some(weekday)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

/// A parsed schedule string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Hourly { minute: u8 },
    Daily(Vec<TimeOfDay>),
    Weekly(Vec<(Weekday, TimeOfDay)>),
    Monthly(Vec<(u8, TimeOfDay)>),
    Cron(String),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Returns `true` when `input` matches the schedule grammar exactly.
pub fn is_valid_schedule(input: &str) -> bool {
    Schedule::parse(input).is_ok()
}

impl Schedule {
    /// Parse `input` as given. Surrounding whitespace is malformed; callers
    /// holding user text trim it first.
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        if input.trim().is_empty() {
            return Err(ScheduleError::Empty);
        }
        let malformed = || ScheduleError::Malformed(input.to_string());

        if let Some(caps) = HOURLY_RE.captures(input) {
            let minute = caps[1].parse().map_err(|_| malformed())?;
            return Ok(Self::Hourly { minute });
        }

        if let Some(caps) = DAILY_RE.captures(input) {
            let times = caps[1]
                .split('|')
                .map(parse_time)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(malformed)?;
            return Ok(Self::Daily(times));
        }

        if let Some(caps) = WEEKLY_RE.captures(input) {
            let slots = caps[1]
                .split('|')
                .map(|slot| {
                    let (day, time) = slot.split_once('@')?;
                    Some((Weekday::from_prefix(day)?, parse_time(time)?))
                })
                .collect::<Option<Vec<_>>>()
                .ok_or_else(malformed)?;
            return Ok(Self::Weekly(slots));
        }

        if let Some(caps) = MONTHLY_RE.captures(input) {
            let slots = caps[1]
                .split('|')
                .map(|slot| {
                    let (day, time) = slot.split_once('@')?;
                    Some((day.parse().ok()?, parse_time(time)?))
                })
                .collect::<Option<Vec<_>>>()
                .ok_or_else(malformed)?;
            return Ok(Self::Monthly(slots));
        }

        if let Some(caps) = CRON_RE.captures(input) {
            return Ok(Self::Cron(caps[1].trim().to_string()));
        }

        Err(malformed())
    }
}

fn parse_time(text: &str) -> Option<TimeOfDay> {
    let (hour, minute) = text.split_once(':')?;
    Some(TimeOfDay {
        hour: hour.parse().ok()?,
        minute: minute.parse().ok()?,
    })
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Canonical lowercase rendering, e.g. `weekly(monday@09:00)`.
impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly { minute } => write!(f, "hourly({minute:02})"),
            Self::Daily(times) => {
                let joined: Vec<String> = times.iter().map(ToString::to_string).collect();
                write!(f, "daily({})", joined.join("|"))
            }
            Self::Weekly(slots) => {
                let joined: Vec<String> = slots
                    .iter()
                    .map(|(day, time)| format!("{}@{time}", day.name()))
                    .collect();
                write!(f, "weekly({})", joined.join("|"))
            }
            Self::Monthly(slots) => {
                let joined: Vec<String> = slots
                    .iter()
                    .map(|(day, time)| format!("{day}@{time}"))
                    .collect();
                write!(f, "monthly({})", joined.join("|"))
            }
            Self::Cron(expr) => write!(f, "cron({expr})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
