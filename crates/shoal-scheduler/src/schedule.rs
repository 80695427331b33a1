//! Posting-day schedule.
//!
//! Sessions fire on configured weekdays at a fixed local time. The
//! weekday/time pair compiles to a cron expression evaluated in the
//! configured IANA timezone.

use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use cron::Schedule;

#[derive(Debug, Clone)]
pub struct PostingSchedule {
    schedule: Schedule,
    tz: Tz,
}

impl PostingSchedule {
    /// `days` are weekday names ("wednesday", "sat"), `time` is `HH:MM`,
    /// `timezone` an IANA zone name.
    pub fn new(days: &[String], time: &str, timezone: &str) -> Result<Self> {
        if days.is_empty() {
            return Err(anyhow!("posting schedule needs at least one day"));
        }
        let time = NaiveTime::parse_from_str(time, "%H:%M")
            .with_context(|| format!("invalid post time {time:?}, expected HH:MM"))?;
        let day_tokens: Vec<String> = days
            .iter()
            .map(|d| {
                d.parse::<Weekday>()
                    .map(|w| w.to_string())
                    .map_err(|_| anyhow!("invalid posting day {d:?}"))
            })
            .collect::<Result<_>>()?;

        let expr = format!(
            "0 {} {} * * {}",
            time.format("%M"),
            time.format("%H"),
            day_tokens.join(",")
        );
        let schedule = Schedule::from_str(&expr)
            .with_context(|| format!("failed to compile schedule expression {expr:?}"))?;
        let tz: Tz = timezone
            .parse()
            .map_err(|_| anyhow!("unknown timezone {timezone:?}"))?;

        Ok(Self { schedule, tz })
    }

    /// Next firing strictly after `after`, in UTC.
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.tz))
            .next()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
