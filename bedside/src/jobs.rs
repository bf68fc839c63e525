//! Wiring producers to the scheduler.
//!
//! Every job computes its widget, hands it to the queue and is done. Jobs
//! never wait on the display.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bedside_core::{
    BoxError,
    queue::WidgetSender,
    scheduler::{Clock, Scheduler, SchedulerError, SchedulerHandle},
};
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use rand::Rng;
use tracing::{info, warn};
use types::Widget;

use crate::{
    assets::AssetStore,
    astro,
    config::{Config, PetConfig},
    producers::{self, ClockFace, Mewo, ProducerError, WeatherProducer},
    weather::WeatherSource,
};

/// How long to wait before trying again when the sun neither rises nor
/// sets.
pub const POLAR_RETRY: TimeDelta = TimeDelta::hours(6);

/// Tree refresh, shortly after midnight.
const TREE_AT: NaiveTime = match NaiveTime::from_hms_opt(0, 5, 0) {
    Some(time) => time,
    None => NaiveTime::MIN,
};

/// Enqueue what a producer made, if anything.
async fn draw_maybe(
    queue: WidgetSender,
    widget: Result<Option<Widget>, ProducerError>,
) -> Result<(), BoxError> {
    queue.submit_maybe(widget?).await?;
    Ok(())
}

fn utc_now<C: Clock>(clock: &C) -> DateTime<Utc> {
    clock.now().with_timezone(&Utc)
}

/// Schedule every producer the configuration asks for.
///
/// # Errors
///
/// If a trigger cannot be built from the configuration.
pub fn schedule_all<C, W>(
    scheduler: &mut Scheduler<C>,
    config: &Config,
    assets: &AssetStore,
    weather: W,
    queue: &WidgetSender,
) -> Result<(), SchedulerError>
where
    C: Clock + Clone,
    W: WeatherSource + 'static,
{
    schedule_mewo(
        scheduler,
        Mewo::new(assets.clone(), config.pet.z),
        &config.pet,
        queue,
    )?;

    let day_night = Arc::new(DayNight::new(
        scheduler.clock().clone(),
        WeatherProducer::new(weather, assets.clone(), config.location()),
        queue.clone(),
        config.night_buffer(),
    ));
    day_night.schedule(scheduler)?;

    if config.tree.enabled {
        schedule_tree(scheduler, assets.clone(), config.latitude, queue);
    }

    if config.clock.enabled {
        schedule_clock(
            scheduler,
            ClockFace::new(assets.clone(), config.clock.x, config.clock.y),
            std::time::Duration::from_secs(config.clock.period_secs),
            queue,
        )?;
    }

    Ok(())
}

fn lock(mewo: &Mutex<Mewo>) -> MutexGuard<'_, Mewo> {
    mewo.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A random pose once an hour at a minute picked now, bedtime and wake-up.
///
/// # Errors
///
/// Never in practice: the random minute is always in range.
pub fn schedule_mewo<C: Clock>(
    scheduler: &mut Scheduler<C>,
    mewo: Mewo,
    pet: &PetConfig,
    queue: &WidgetSender,
) -> Result<(), SchedulerError> {
    let minute = rand::thread_rng().gen_range(0..60);
    info!(minute, "mewo moves every hour");

    let mewo = Arc::new(Mutex::new(mewo));

    scheduler.hourly("mewo", minute, 0, {
        let mewo = Arc::clone(&mewo);
        let queue = queue.clone();
        move || draw_maybe(queue.clone(), lock(&mewo).random())
    })?;

    scheduler.daily("mewo-sleep", pet.sleep_at, {
        let mewo = Arc::clone(&mewo);
        let queue = queue.clone();
        move || draw_maybe(queue.clone(), lock(&mewo).sleep())
    });

    scheduler.daily("mewo-wake", pet.wake_at, move || {
        lock(&mewo).awake();
        std::future::ready(Ok(()))
    });

    Ok(())
}

/// Bert, drawn at startup and again every night in case the season turned.
pub fn schedule_tree<C: Clock + Clone>(
    scheduler: &mut Scheduler<C>,
    assets: AssetStore,
    latitude: f64,
    queue: &WidgetSender,
) {
    let clock = scheduler.clock().clone();
    let now = utc_now(&clock);
    let queue = queue.clone();

    let draw = move || {
        let today = clock.now().date_naive();
        draw_maybe(
            queue.clone(),
            producers::bert(&assets, today, latitude).map(Some),
        )
    };

    scheduler.once("bert-startup", now, draw.clone());
    scheduler.daily("bert", TREE_AT, draw);
}

/// The clock face, drawn at startup and then every `period` on the
/// boundaries counted from midnight.
///
/// # Errors
///
/// If `period` is zero.
pub fn schedule_clock<C: Clock + Clone>(
    scheduler: &mut Scheduler<C>,
    face: ClockFace,
    period: std::time::Duration,
    queue: &WidgetSender,
) -> Result<(), SchedulerError> {
    let clock = scheduler.clock().clone();
    let now = utc_now(&clock);
    let queue = queue.clone();

    let draw = move || {
        let time = clock.now().time();
        draw_maybe(queue.clone(), face.render(time).map(Some))
    };

    scheduler.interval("clock", period, Some(NaiveTime::MIN), draw.clone())?;
    scheduler.once("clock-startup", now, draw);
    Ok(())
}

/// The weather slot through the day: the forecast at sunrise, the night
/// overlay at sunset.
///
/// Sunrise and sunset move every day, so they are scheduled as one-shot
/// jobs and recomputed a little after the later of the two.
pub struct DayNight<C, W> {
    clock: C,
    weather: WeatherProducer<W>,
    queue: WidgetSender,
    buffer: TimeDelta,
}

impl<C, W> DayNight<C, W>
where
    C: Clock,
    W: WeatherSource + 'static,
{
    pub const fn new(
        clock: C,
        weather: WeatherProducer<W>,
        queue: WidgetSender,
        buffer: TimeDelta,
    ) -> Self {
        Self {
            clock,
            weather,
            queue,
            buffer,
        }
    }

    /// Fill the slot for the current time of day right away, then start
    /// the sunrise and sunset cycle.
    ///
    /// # Errors
    ///
    /// If the scheduler is gone.
    pub fn schedule(
        self: &Arc<Self>,
        scheduler: &mut Scheduler<C>,
    ) -> Result<(), SchedulerError> {
        let this = Arc::clone(self);
        scheduler.once("day-night-startup", utc_now(&self.clock), move || {
            let this = Arc::clone(&this);
            async move { this.show_current().await.map_err(BoxError::from) }
        });

        self.arm(&scheduler.handle()).map(|_| ())
    }

    /// Draw the forecast during the day and the night overlay otherwise.
    ///
    /// # Errors
    ///
    /// If the chosen producer fails.
    pub async fn show_current(&self) -> Result<(), ProducerError> {
        let now = utc_now(&self.clock);
        let day = match astro::next_sun_events(now, self.weather.location()) {
            Ok(events) => events.is_day(),
            Err(e) => {
                warn!(error = %e, "cannot tell day from night, assuming day");
                true
            }
        };

        if day { self.sunrise().await } else { self.sunset().await }
    }

    /// # Errors
    ///
    /// If the weather cannot be fetched or drawn.
    pub async fn sunrise(&self) -> Result<(), ProducerError> {
        let widget = self.weather.current().await?;
        self.queue.submit(widget).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// If the night overlay cannot be drawn.
    pub async fn sunset(&self) -> Result<(), ProducerError> {
        let widget = self.weather.night()?;
        self.queue.submit(widget).await?;
        Ok(())
    }

    /// Schedule the next sunrise and sunset, and a job after both that
    /// calls this again. Returns when that job is due.
    ///
    /// # Errors
    ///
    /// If the scheduler is gone.
    pub fn arm(
        self: &Arc<Self>,
        handle: &SchedulerHandle,
    ) -> Result<DateTime<Utc>, SchedulerError> {
        let now = utc_now(&self.clock);

        let rearm_at = match astro::next_sun_events(now, self.weather.location())
        {
            Ok(events) => {
                info!(
                    sunrise = %events.sunrise.to_rfc3339(),
                    sunset = %events.sunset.to_rfc3339(),
                    "next sunrise and sunset"
                );

                let this = Arc::clone(self);
                handle.once("sunrise", events.sunrise, move || {
                    let this = Arc::clone(&this);
                    async move { this.sunrise().await.map_err(BoxError::from) }
                })?;

                let this = Arc::clone(self);
                handle.once("sunset", events.sunset, move || {
                    let this = Arc::clone(&this);
                    async move { this.sunset().await.map_err(BoxError::from) }
                })?;

                events.last() + self.buffer
            }
            Err(e) => {
                warn!(error = %e, "no sunrise or sunset, trying again later");
                now + POLAR_RETRY
            }
        };

        let this = Arc::clone(self);
        let rearm = handle.clone();
        handle.once("sun-cycle", rearm_at, move || {
            let result = this.arm(&rearm).map(|_| ()).map_err(BoxError::from);
            std::future::ready(result)
        })?;

        Ok(rearm_at)
    }
}
