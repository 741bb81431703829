use std::{fmt::Display, str::FromStr};

use time::Time;

/// A position inside a video, as a time of day.
///
/// Videos longer than a day are clamped to `23:59:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClipTime(Time);

impl ClipTime {
    pub const ZERO: ClipTime = ClipTime(Time::MIDNIGHT);

    const MAX_SECONDS: u64 = 24 * 60 * 60 - 1;

    pub fn from_seconds(seconds: u64) -> Self {
        let seconds = seconds.min(Self::MAX_SECONDS);

        // Every component is in range after the clamp
        let time = Time::from_hms(
            (seconds / 3600) as u8,
            (seconds / 60 % 60) as u8,
            (seconds % 60) as u8,
        )
        .unwrap_or(Time::MIDNIGHT);

        Self(time)
    }

    pub fn as_seconds(self) -> u64 {
        let (h, m, s) = self.0.as_hms();
        u64::from(h) * 3600 + u64::from(m) * 60 + u64::from(s)
    }
}

impl FromStr for ClipTime {
    type Err = Box<dyn std::error::Error + Sync + Send>;

    /// Accept `SS`, `MM:SS` or `HH:MM:SS`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() > 3 {
            return Err(Box::from("Time has more than 3 components"));
        }

        let mut seconds = 0u64;
        for (i, part) in parts.iter().enumerate() {
            let n: u64 = part.parse()?;
            if i > 0 && n >= 60 {
                return Err(Box::from("Minutes and seconds must be below 60"));
            }
            seconds = 60 * seconds + n;
        }

        if seconds > Self::MAX_SECONDS {
            return Err(Box::from("Time must be below 24:00:00"));
        }

        Ok(Self::from_seconds(seconds))
    }
}

impl Display for ClipTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (h, m, s) = self.0.as_hms();
        write!(f, "{h:02}:{m:02}:{s:02}")
    }
}
