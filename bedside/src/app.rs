use bedside_core::{
    BoxError,
    compositor::{Compositor, CompositorConfig},
    queue,
    scheduler::{Clock, Scheduler},
    sink::DisplaySink,
};
use tracing::{error, info, warn};

use crate::{
    assets::AssetStore, config::Config, jobs, producers, weather::WeatherSource,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("expected <latitude> <longitude>")]
    Usage,
    #[error("{name} must be a number between -{max} and {max}, got {value:?}")]
    OutOfRange {
        name: &'static str,
        max: u32,
        value: String,
    },
}

/// Read the latitude and longitude from the command line arguments that
/// follow the program name.
///
/// # Errors
///
/// If there are not exactly two arguments or they are not valid
/// coordinates.
pub fn parse_location(args: &[String]) -> Result<(f64, f64), ArgsError> {
    let [latitude, longitude] = args else {
        return Err(ArgsError::Usage);
    };

    Ok((
        coordinate("latitude", latitude, 90)?,
        coordinate("longitude", longitude, 180)?,
    ))
}

fn coordinate(
    name: &'static str,
    value: &str,
    max: u32,
) -> Result<f64, ArgsError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.abs() <= f64::from(max))
        .ok_or_else(|| ArgsError::OutOfRange {
            name,
            max,
            value: value.to_string(),
        })
}

/// Run the display until `shutdown` resolves.
///
/// The display is initialised and the background loaded before anything
/// else starts; either failing is fatal. Both ways out release the display.
/// Returns the released display.
///
/// # Errors
///
/// If the display cannot be initialised, the background is unavailable or
/// the jobs cannot be scheduled.
pub async fn run<S, C, W>(
    config: &Config,
    assets: AssetStore,
    weather: W,
    mut sink: S,
    clock: C,
    shutdown: impl Future<Output = ()>,
) -> Result<S, BoxError>
where
    S: DisplaySink,
    C: Clock + Clone,
    W: WeatherSource + 'static,
{
    if let Err(e) = sink.init().await {
        error!(error = %e, "display could not be initialised");
        release(&mut sink).await;
        return Err(e.into());
    }

    let background = match producers::background(&assets) {
        Ok(widget) => widget,
        Err(e) => {
            error!(error = %e, "background is unavailable");
            release(&mut sink).await;
            return Err(e.into());
        }
    };

    let (sender, receiver) = queue::channel(config.queue_capacity.max(1));
    let mut scheduler =
        Scheduler::new(clock).with_poll_interval(config.poll_interval());

    if let Err(e) =
        jobs::schedule_all(&mut scheduler, config, &assets, weather, &sender)
    {
        error!(error = %e, "failed to schedule producers");
        release(&mut sink).await;
        return Err(e.into());
    }
    drop(sender);

    let jobs = tokio::spawn(scheduler.run());
    info!("bedside display running");

    let compositor = Compositor::new(
        sink,
        receiver,
        CompositorConfig {
            settle: config.settle(),
            redraw_interval: config.redraw_interval(),
        },
    );
    let sink = compositor.run(vec![background], shutdown).await;

    jobs.abort();
    Ok(sink)
}

async fn release<S: DisplaySink>(sink: &mut S) {
    if let Err(e) = sink.close().await {
        warn!(error = %e, "failed to release display");
    }
}
