use std::{path::Path, sync::Arc, time::Duration};

use bedside::{
    Config, Location,
    assets::AssetStore,
    astro,
    config::PetConfig,
    jobs::{self, DayNight, POLAR_RETRY},
    producers::{self, CLOCK, ClockFace, MEWO, Mewo, WEATHER, WeatherProducer},
    weather::{WeatherError, WeatherSource},
};
use bedside_core::{
    compositor::{Compositor, CompositorConfig, LiveSet},
    queue,
    scheduler::{ManualClock, Scheduler, Trigger},
    sink::{MemorySink, SinkCall},
};
use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use image::{Luma, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use tokio::task::JoinHandle;
use types::{HEIGHT, WIDTH, WeatherKind, Widget};

const CHRISTCHURCH: Location = Location {
    latitude: -43.5333,
    longitude: 172.6333,
};

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A weather service that always reports the same WMO code.
struct Fixed(i64);

impl WeatherSource for Fixed {
    async fn lookup(
        &self,
        _location: Location,
    ) -> Result<WeatherKind, WeatherError> {
        Ok(WeatherKind::from_wmo(self.0))
    }
}

fn save(root: &Path, name: &str, image: &RgbaImage) {
    let path = root.join(format!("{name}.png"));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image.save(path).unwrap();
}

/// Full-panel layer, transparent except for a square of `colour` with its
/// corner at `at`.
fn square(at: (u32, u32), colour: Rgba<u8>) -> RgbaImage {
    let mut layer = types::blank();
    for x in at.0..at.0 + 50 {
        for y in at.1..at.1 + 50 {
            layer.put_pixel(x, y, colour);
        }
    }
    layer
}

/// Assets for every producer. Each sprite inks its own square so frames
/// show which widgets made it onto the panel.
fn assets() -> (tempfile::TempDir, AssetStore) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let mut background = RgbaImage::from_pixel(WIDTH, HEIGHT, PAPER);
    background.put_pixel(700, 400, INK);
    save(root, "background", &background);

    for pose in ["sleep", "desk", "floor"] {
        save(root, &format!("mewo/{pose}"), &square((100, 100), INK));
    }
    for kind in ["cloudy", "overcast", "rain"] {
        save(root, &format!("weather/{kind}"), &square((300, 100), INK));
    }
    save(root, "weather/night", &square((300, 200), INK));
    save(root, "bert/bloom", &square((500, 100), INK));
    save(root, "bert/leafless", &square((500, 200), INK));

    let store = AssetStore::new(root);
    (dir, store)
}

async fn join(handles: Vec<JoinHandle<()>>) -> usize {
    let count = handles.len();
    for handle in handles {
        handle.await.unwrap();
    }
    count
}

fn utc(d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, d, h, mi, s).unwrap()
}

fn start() -> DateTime<Utc> {
    // 16:00 in Christchurch, mid-summer
    Utc.with_ymd_and_hms(2026, 1, 15, 3, 0, 0).unwrap()
}

#[tokio::test(start_paused = true)]
async fn pet_is_layered_over_background() {
    let (_dir, assets) = assets();
    let sink = MemorySink::new(WIDTH, HEIGHT);
    let display = sink.clone();
    let (sender, receiver) = queue::channel(queue::DEFAULT_CAPACITY);

    sender
        .submit(producers::background(&assets).unwrap())
        .await
        .unwrap();
    let mut mewo = Mewo::new(assets.clone(), -99);
    assert!(sender.submit_maybe(mewo.random().unwrap()).await.unwrap());
    drop(sender);

    Compositor::new(sink, receiver, CompositorConfig::default())
        .run(Vec::new(), std::future::pending())
        .await;

    let log = display.log();
    assert_eq!(log.count(SinkCall::Display), 2);
    assert_eq!(log.count(SinkCall::Sleep), 2);
    assert_eq!(log.calls.last(), Some(&SinkCall::Close));

    let (primary, accent) = display.last_frame().unwrap();
    assert_eq!(primary.get_pixel(120, 120), &Luma([0]), "pet");
    assert_eq!(primary.get_pixel(700, 400), &Luma([0]), "background");
    assert_eq!(primary.get_pixel(10, 10), &Luma([255]));
    assert!(accent.pixels().all(|p| p[0] == 255));
}

#[tokio::test]
async fn sleeping_pet_changes_nothing() {
    let (_dir, assets) = assets();
    let (sender, mut receiver) = queue::channel(queue::DEFAULT_CAPACITY);
    let mut mewo = Mewo::new(assets, -99);

    assert!(sender.submit_maybe(mewo.sleep().unwrap()).await.unwrap());
    receiver.try_next().unwrap();

    let widget = mewo.random().unwrap();
    assert!(widget.is_none());
    assert!(!sender.submit_maybe(widget).await.unwrap());
    assert!(receiver.try_next().is_none());
}

#[tokio::test]
async fn rain_replaces_previous_weather() {
    let (_dir, assets) = assets();
    let producer = WeatherProducer::new(Fixed(61), assets, CHRISTCHURCH);

    let mut live: LiveSet = [producer.night().unwrap()].into_iter().collect();
    let rain = producer.current().await.unwrap();
    assert_eq!(rain.name(), WEATHER);
    assert_eq!(rain.z(), -99);

    live.upsert(rain);
    assert_eq!(live.len(), 1);
    let shown = live.get(WEATHER).unwrap().primary_layer();
    assert_eq!(shown.get_pixel(310, 110), &INK);
    assert_eq!(shown.get_pixel(310, 210)[3], 0);
}

#[tokio::test]
async fn sunset_draws_night_and_cycle_rearms() {
    let (_dir, assets) = assets();
    let clock = ManualClock::new(start());
    let mut scheduler = Scheduler::new(clock.clone());
    let (sender, mut receiver) = queue::channel(queue::DEFAULT_CAPACITY);

    let day_night = Arc::new(DayNight::new(
        clock.clone(),
        WeatherProducer::new(Fixed(61), assets, CHRISTCHURCH),
        sender,
        TimeDelta::minutes(5),
    ));
    let rearm_at = day_night.arm(&scheduler.handle()).unwrap();

    let events = astro::next_sun_events(start(), CHRISTCHURCH).unwrap();
    assert!(events.is_day());
    assert_eq!(rearm_at, events.sunrise + TimeDelta::minutes(5));

    assert_eq!(join(scheduler.tick()).await, 0);
    let labels: Vec<String> =
        scheduler.jobs().into_iter().map(|job| job.label).collect();
    assert_eq!(labels, ["sunset", "sunrise", "sun-cycle"]);

    clock.set(events.sunset);
    assert_eq!(join(scheduler.tick()).await, 1);
    let night = receiver.try_next().unwrap();
    assert_eq!(night.name(), WEATHER);
    assert_eq!(night.primary_layer().get_pixel(310, 210), &INK);

    let labels: Vec<String> =
        scheduler.jobs().into_iter().map(|job| job.label).collect();
    assert_eq!(labels, ["sunrise", "sun-cycle"]);

    clock.set(rearm_at);
    assert_eq!(join(scheduler.tick()).await, 2);
    let weather = receiver.try_next().unwrap();
    assert_eq!(weather.primary_layer().get_pixel(310, 110), &INK);

    // the recomputed jobs arrive through the handle
    assert_eq!(join(scheduler.tick()).await, 0);
    let jobs = scheduler.jobs();
    assert_eq!(jobs.len(), 3);
    assert!(jobs.iter().all(|job| job.next_due > rearm_at));
    assert_eq!(jobs[2].label, "sun-cycle");
}

#[tokio::test]
async fn polar_night_retries_later() {
    let (_dir, assets) = assets();
    let svalbard = Location {
        latitude: 78.22,
        longitude: 15.65,
    };
    let now = Utc.with_ymd_and_hms(2026, 12, 21, 12, 0, 0).unwrap();
    let clock = ManualClock::new(now);
    let mut scheduler = Scheduler::new(clock.clone());
    let (sender, _receiver) = queue::channel(queue::DEFAULT_CAPACITY);

    let day_night = Arc::new(DayNight::new(
        clock,
        WeatherProducer::new(Fixed(0), assets, svalbard),
        sender,
        TimeDelta::minutes(5),
    ));

    assert_eq!(
        day_night.arm(&scheduler.handle()).unwrap(),
        now + POLAR_RETRY
    );
    scheduler.tick();
    let labels: Vec<String> =
        scheduler.jobs().into_iter().map(|job| job.label).collect();
    assert_eq!(labels, ["sun-cycle"]);
}

fn config() -> Config {
    Config {
        latitude: CHRISTCHURCH.latitude,
        longitude: CHRISTCHURCH.longitude,
        ..Config::default()
    }
}

#[tokio::test(start_paused = true)]
async fn run_draws_startup_widgets_and_releases_display() {
    let (_dir, assets) = assets();
    let sink = MemorySink::new(WIDTH, HEIGHT);
    let display = sink.clone();

    bedside::run(
        &config(),
        assets,
        Fixed(3),
        sink,
        ManualClock::new(start()),
        tokio::time::sleep(Duration::from_secs(30)),
    )
    .await
    .unwrap();

    let log = display.log();
    // background, then bert and the day's weather from the startup jobs
    assert_eq!(log.count(SinkCall::Display), 3);
    assert_eq!(log.calls.first(), Some(&SinkCall::Init));
    assert_eq!(log.calls.last(), Some(&SinkCall::Close));
    assert_eq!(log.count(SinkCall::Close), 1);

    let (primary, _) = display.last_frame().unwrap();
    assert_eq!(primary.get_pixel(310, 110), &Luma([0]), "weather");
    assert_eq!(primary.get_pixel(510, 110), &Luma([0]), "summer tree");
    assert_eq!(primary.get_pixel(700, 400), &Luma([0]), "background");
}

#[tokio::test]
async fn run_fails_when_display_cannot_start() {
    let (_dir, assets) = assets();
    let sink = MemorySink::new(WIDTH, HEIGHT);
    sink.fail_init(true);
    let display = sink.clone();

    let result = bedside::run(
        &config(),
        assets,
        Fixed(0),
        sink,
        ManualClock::new(start()),
        std::future::pending(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(display.log().calls, [SinkCall::Init, SinkCall::Close]);
}

#[tokio::test]
async fn run_fails_without_background() {
    let dir = tempfile::tempdir().unwrap();
    let sink = MemorySink::new(WIDTH, HEIGHT);
    let display = sink.clone();

    let result = bedside::run(
        &config(),
        AssetStore::new(dir.path()),
        Fixed(0),
        sink,
        ManualClock::new(start()),
        std::future::pending(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(display.log().calls, [SinkCall::Init, SinkCall::Close]);
}

/// Give each pose its own square, so a frame shows which one was drawn.
fn distinct_poses(root: &Path) {
    save(root, "mewo/sleep", &square((100, 100), INK));
    save(root, "mewo/desk", &square((100, 200), INK));
    save(root, "mewo/floor", &square((100, 300), INK));
}

fn is_sleep_sprite(widget: &Widget) -> bool {
    widget.primary_layer().get_pixel(110, 110) == &INK
}

#[tokio::test]
async fn pet_sleeps_through_the_night_and_wakes_in_the_morning() {
    let (dir, assets) = assets();
    distinct_poses(dir.path());
    let clock = ManualClock::new(utc(15, 8, 0, 0));
    let mut scheduler = Scheduler::new(clock.clone());
    let (sender, mut receiver) = queue::channel(queue::DEFAULT_CAPACITY);

    // half a minute past the hour, so bedtime never shares a tick with
    // the hourly move
    let pet = PetConfig {
        sleep_at: NaiveTime::from_hms_opt(21, 0, 30).unwrap(),
        wake_at: NaiveTime::from_hms_opt(7, 0, 30).unwrap(),
        ..PetConfig::default()
    };
    jobs::schedule_mewo(
        &mut scheduler,
        Mewo::new(assets, pet.z),
        &pet,
        &sender,
    )
    .unwrap();

    let jobs = scheduler.jobs();
    assert_eq!(jobs.len(), 3);
    let hourly = jobs.iter().find(|job| job.label == "mewo").unwrap();
    assert!(matches!(hourly.trigger, Trigger::Hourly { second: 0, .. }));

    // the missed hourly moves of the day collapse into one
    clock.set(utc(15, 21, 0, 0));
    assert_eq!(join(scheduler.tick()).await, 1);
    let evening = receiver.try_next().unwrap();
    assert_eq!(evening.name(), MEWO);
    assert_eq!(evening.z(), pet.z);

    clock.set(utc(15, 21, 0, 30));
    assert_eq!(join(scheduler.tick()).await, 1);
    match receiver.try_next() {
        Some(bedtime) => {
            assert!(!is_sleep_sprite(&evening));
            assert!(is_sleep_sprite(&bedtime));
        }
        None => assert!(is_sleep_sprite(&evening), "already curled up"),
    }

    // hourly moves keep firing overnight but draw nothing
    clock.set(utc(15, 22, 0, 0));
    assert_eq!(join(scheduler.tick()).await, 1);
    assert!(receiver.try_next().is_none());

    clock.set(utc(16, 7, 0, 0));
    assert_eq!(join(scheduler.tick()).await, 1);
    assert!(receiver.try_next().is_none());

    // waking up draws nothing by itself
    clock.set(utc(16, 7, 0, 30));
    assert_eq!(join(scheduler.tick()).await, 1);
    assert!(receiver.try_next().is_none());

    clock.set(utc(16, 8, 0, 0));
    assert_eq!(join(scheduler.tick()).await, 1);
    let morning = receiver.try_next().unwrap();
    assert_eq!(morning.name(), MEWO);
    assert_eq!(scheduler.jobs().len(), 3);
}

/// Clock glyphs 10 px wide. Digit `d` inks row `d` of its first column and
/// the colon inks row 15.
fn glyphs(root: &Path) {
    let names = (0..10u32)
        .map(|digit| (digit.to_string(), digit))
        .chain([("colon".to_string(), 15)]);
    for (name, row) in names {
        let mut glyph = RgbaImage::from_pixel(10, 20, types::TRANSPARENT);
        glyph.put_pixel(0, row, INK);
        save(root, &format!("clock/{name}"), &glyph);
    }
}

/// The two minute digits of a clock face drawn at (560, 24).
fn minutes(face: &Widget) -> (Option<u32>, Option<u32>) {
    let digit_at = |x: u32| {
        (0..10).find(|row| face.primary_layer().get_pixel(x, 24 + row) == &INK)
    };
    (digit_at(590), digit_at(600))
}

#[tokio::test]
async fn clock_is_drawn_at_startup_and_on_every_minute() {
    let (dir, assets) = assets();
    glyphs(dir.path());
    let clock = ManualClock::new(utc(15, 8, 14, 30));
    let mut scheduler = Scheduler::new(clock.clone());
    let (sender, mut receiver) = queue::channel(queue::DEFAULT_CAPACITY);

    jobs::schedule_clock(
        &mut scheduler,
        ClockFace::new(assets, 560, 24),
        Duration::from_secs(60),
        &sender,
    )
    .unwrap();

    assert_eq!(join(scheduler.tick()).await, 1);
    let face = receiver.try_next().unwrap();
    assert_eq!(face.name(), CLOCK);
    assert_eq!(minutes(&face), (Some(1), Some(4)));

    clock.set(utc(15, 8, 14, 59));
    assert_eq!(join(scheduler.tick()).await, 0);

    clock.set(utc(15, 8, 15, 0));
    assert_eq!(join(scheduler.tick()).await, 1);
    assert_eq!(minutes(&receiver.try_next().unwrap()), (Some(1), Some(5)));

    // missed boundaries are drawn once, showing the current time
    clock.set(utc(15, 8, 17, 20));
    assert_eq!(join(scheduler.tick()).await, 1);
    assert_eq!(minutes(&receiver.try_next().unwrap()), (Some(1), Some(7)));
    assert!(receiver.try_next().is_none());

    let jobs = scheduler.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].next_due, utc(15, 8, 18, 0));
}
