use std::time::Duration;

use chrono::{
    DateTime, Days, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Timelike,
    Utc,
};

use super::SchedulerError;

/// When a job fires.
///
/// Every recurring trigger answers "what is the first occurrence strictly
/// after now", so a job that was held up past several occurrences fires
/// once and then lines up with the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Fire once at an instant, then retire. An instant in the past fires
    /// on the next check.
    Once(DateTime<Utc>),
    /// Fire every day at a local time of day.
    Daily(NaiveTime),
    /// Fire every hour at a minute and second past the hour.
    Hourly { minute: u32, second: u32 },
    /// Fire every `period`. Without an anchor the first firing is one
    /// period after scheduling; with one, firings land on
    /// `anchor + k * period` local time.
    Interval {
        period: Duration,
        anchor: Option<NaiveTime>,
    },
}

impl Trigger {
    /// # Errors
    ///
    /// `SchedulerError::InvalidTrigger` if minute or second is out of range.
    pub fn hourly(minute: u32, second: u32) -> Result<Self, SchedulerError> {
        if minute > 59 || second > 59 {
            return Err(SchedulerError::InvalidTrigger(format!(
                "hourly offset {minute}:{second} is out of range"
            )));
        }
        Ok(Self::Hourly { minute, second })
    }

    /// # Errors
    ///
    /// `SchedulerError::InvalidTrigger` for a zero period.
    pub fn every(
        period: Duration,
        anchor: Option<NaiveTime>,
    ) -> Result<Self, SchedulerError> {
        if period.is_zero() || TimeDelta::from_std(period).is_err() {
            return Err(SchedulerError::InvalidTrigger(format!(
                "interval period {period:?} is not usable"
            )));
        }
        Ok(Self::Interval { period, anchor })
    }

    #[must_use]
    pub const fn is_recurring(&self) -> bool {
        !matches!(self, Self::Once(_))
    }

    /// When a job registered at `now` fires first.
    #[must_use]
    pub fn first_due<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Option<DateTime<Tz>> {
        match self {
            Self::Once(at) => Some(at.with_timezone(&now.timezone())),
            Self::Interval {
                period,
                anchor: None,
            } => Some(now.clone() + TimeDelta::from_std(*period).ok()?),
            _ => self.after(now),
        }
    }

    /// When a job that was due at `previous` and fired at `now` fires next.
    /// `None` retires the job.
    #[must_use]
    pub fn next_due<Tz: TimeZone>(
        &self,
        previous: &DateTime<Tz>,
        now: &DateTime<Tz>,
    ) -> Option<DateTime<Tz>> {
        match self {
            Self::Once(_) => None,
            Self::Interval {
                period,
                anchor: None,
            } => {
                let step = TimeDelta::from_std(*period).ok()?;
                let mut next = previous.clone() + step;
                if next <= *now {
                    // skip every period that passed while we were away
                    let behind = (now.clone() - previous.clone())
                        .num_milliseconds()
                        / step.num_milliseconds().max(1);
                    next = previous.clone()
                        + TimeDelta::milliseconds(
                            step.num_milliseconds() * (behind + 1),
                        );
                }
                Some(next)
            }
            _ => self.after(now),
        }
    }

    /// First occurrence strictly after `now` for the wall-clock triggers.
    fn after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self {
            Self::Once(at) => Some(at.with_timezone(&now.timezone())),
            Self::Daily(time) => daily_after(now, *time),
            Self::Hourly { minute, second } => {
                Some(hourly_after(now, *minute, *second))
            }
            Self::Interval {
                period,
                anchor: Some(anchor),
            } => anchored_after(now, *anchor, *period),
            Self::Interval { anchor: None, .. } => None,
        }
    }
}

/// The local time of day on `date`. A repeated time resolves to its first
/// occurrence. A skipped time keeps the offset in force before the jump, so
/// it lands just after the jump.
fn local_at<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    time: NaiveTime,
) -> DateTime<Tz> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive).earliest().unwrap_or_else(|| {
        let before = tz
            .offset_from_utc_datetime(&(naive - TimeDelta::days(1)))
            .fix();
        tz.from_utc_datetime(
            &(naive - TimeDelta::seconds(i64::from(before.local_minus_utc()))),
        )
    })
}

fn daily_after<Tz: TimeZone>(
    now: &DateTime<Tz>,
    time: NaiveTime,
) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();

    (0..=2)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .map(|date| local_at(&tz, date, time))
        .find(|candidate| candidate > now)
}

fn hourly_after<Tz: TimeZone>(
    now: &DateTime<Tz>,
    minute: u32,
    second: u32,
) -> DateTime<Tz> {
    // top of the hour, stepped back in absolute time
    let into_hour = TimeDelta::seconds(i64::from(now.minute() * 60 + now.second()))
        + TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    let offset = TimeDelta::seconds(i64::from(minute * 60 + second));

    let candidate = now.clone() - into_hour + offset;
    if candidate > *now {
        candidate
    } else {
        candidate + TimeDelta::hours(1)
    }
}

fn anchored_after<Tz: TimeZone>(
    now: &DateTime<Tz>,
    anchor: NaiveTime,
    period: Duration,
) -> Option<DateTime<Tz>> {
    let step = TimeDelta::from_std(period).ok()?.num_milliseconds();
    if step <= 0 {
        return None;
    }

    let base = local_at(&now.timezone(), now.date_naive(), anchor);
    let elapsed = (now.clone() - base.clone()).num_milliseconds();
    let periods = elapsed.div_euclid(step) + 1;

    Some(base + TimeDelta::milliseconds(periods * step))
}
