//! Wall-time and job-flavour grammars, and translation between them.
//!
//! SLURM takes a literal `HH:MM:SS` wall time. HTCondor sites express the same
//! request as a named job flavour ("tier"), each standing for a fixed maximum
//! duration:
//!
//! | Tier           | Canonical wall time |
//! |----------------|---------------------|
//! | `espresso`     | `00:00:20`          |
//! | `microcentury` | `00:01:00`          |
//! | `longlunch`    | `00:02:00`          |
//! | `workday`      | `00:08:00`          |
//! | `tomorrow`     | `01:00:00`          |
//! | `testmatch`    | `03:00:00`          |
//! | `nextweek`     | `07:00:00`          |

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SchedError, SchedResult};

/// A named HTCondor job flavour, ordered from shortest to longest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Espresso,
    Microcentury,
    Longlunch,
    Workday,
    Tomorrow,
    Testmatch,
    Nextweek,
}

impl Tier {
    /// All tiers in ascending order of canonical duration.
    pub const ALL: [Tier; 7] = [
        Tier::Espresso,
        Tier::Microcentury,
        Tier::Longlunch,
        Tier::Workday,
        Tier::Tomorrow,
        Tier::Testmatch,
        Tier::Nextweek,
    ];

    /// The flavour name as written in a submit description.
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Espresso => "espresso",
            Tier::Microcentury => "microcentury",
            Tier::Longlunch => "longlunch",
            Tier::Workday => "workday",
            Tier::Tomorrow => "tomorrow",
            Tier::Testmatch => "testmatch",
            Tier::Nextweek => "nextweek",
        }
    }

    /// Look a tier up by its exact name.
    pub fn from_name(name: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|t| t.name() == name)
    }

    /// The maximum duration this tier stands for.
    pub fn canonical(&self) -> WallTime {
        match self {
            Tier::Espresso => WallTime::new(0, 0, 20),
            Tier::Microcentury => WallTime::new(0, 1, 0),
            Tier::Longlunch => WallTime::new(0, 2, 0),
            Tier::Workday => WallTime::new(0, 8, 0),
            Tier::Tomorrow => WallTime::new(1, 0, 0),
            Tier::Testmatch => WallTime::new(3, 0, 0),
            Tier::Nextweek => WallTime::new(7, 0, 0),
        }
    }

    /// The longest tier.
    pub fn largest() -> Tier {
        Tier::Nextweek
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tier {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::from_name(s).ok_or_else(|| {
            SchedError::ConfigError(format!("'{s}' is not a valid HTCondor job flavour"))
        })
    }
}

/// An `hours:minutes:seconds` wall-time request.
///
/// Fields are kept as written; `00:90:00` is valid and means ninety minutes.
/// Ordering compares total seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WallTime {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl WallTime {
    pub const fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Parse `HH:MM:SS`. Returns `None` for anything [`is_wall_time`] rejects.
    pub fn parse(s: &str) -> Option<WallTime> {
        let mut fields = s.split(':');
        let hours = fields.next()?;
        let minutes = fields.next()?;
        let seconds = fields.next()?;
        if fields.next().is_some() {
            return None;
        }

        let digits = |f: &str| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit());
        if !digits(hours) || !digits(minutes) || !digits(seconds) {
            return None;
        }
        if hours.len() < 2 || minutes.len() != 2 || seconds.len() != 2 {
            return None;
        }

        Some(WallTime {
            hours: hours.parse().ok()?,
            minutes: minutes.parse().ok()?,
            seconds: seconds.parse().ok()?,
        })
    }

    pub fn total_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }
}

impl PartialOrd for WallTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let fields = |w: &WallTime| (w.hours, w.minutes, w.seconds);
        self.total_seconds()
            .cmp(&other.total_seconds())
            .then_with(|| fields(self).cmp(&fields(other)))
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

impl FromStr for WallTime {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WallTime::parse(s)
            .ok_or_else(|| SchedError::ConfigError(format!("'{s}' is not a valid SLURM wall time")))
    }
}

/// Whether `s` is a SLURM wall time: three colon-separated digit fields,
/// hours at least two digits wide, minutes and seconds exactly two.
pub fn is_wall_time(s: &str) -> bool {
    WallTime::parse(s).is_some()
}

/// Whether `s` names an HTCondor job flavour.
pub fn is_tier_name(s: &str) -> bool {
    Tier::from_name(s).is_some()
}

/// The shortest tier whose canonical duration covers `time`.
///
/// A request longer than every tier is clamped to [`Tier::largest`] with a warning.
pub fn wall_time_to_tier(time: &str) -> SchedResult<Tier> {
    let requested: WallTime = time.parse()?;
    Ok(tier_covering(requested))
}

/// Same as [`wall_time_to_tier`] for an already-parsed wall time.
pub fn tier_covering(requested: WallTime) -> Tier {
    match Tier::ALL.into_iter().find(|tier| tier.canonical() >= requested) {
        Some(tier) => tier,
        None => {
            let largest = Tier::largest();
            tracing::warn!(
                "requested wall time {} exceeds every job flavour; using '{}' ({})",
                requested,
                largest,
                largest.canonical()
            );
            largest
        }
    }
}

/// The canonical wall time of a tier.
pub fn tier_to_wall_time(tier: &str) -> SchedResult<WallTime> {
    let tier: Tier = tier.parse()?;
    Ok(tier.canonical())
}
