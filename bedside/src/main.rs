use bedside::{AppContext, Config, preview::PreviewSink};
use bedside_app::{BoxError, create_app_context, shutdown_signal};
use bedside_core::scheduler::SystemClock;
use figment::Figment;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("bedside", String::as_str);

    let (latitude, longitude) =
        match bedside::parse_location(args.get(1..).unwrap_or_default()) {
            Ok(location) => location,
            Err(e) => {
                eprintln!("{e}");
                eprintln!("Usage: {program} <latitude> <longitude>");
                std::process::exit(2);
            }
        };

    let overrides = Figment::new()
        .merge(("latitude", latitude))
        .merge(("longitude", longitude));
    let context =
        create_app_context::<AppContext, Config>(overrides).await?;

    let sink = PreviewSink::new(&context.config.output_dir);
    bedside::run(
        &context.config,
        context.assets,
        context.weather,
        sink,
        SystemClock,
        shutdown_signal(),
    )
    .await?;

    Ok(())
}
