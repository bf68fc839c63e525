use std::time::Duration;

use image::{GrayImage, Luma, Rgba, RgbaImage};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use types::{TRANSPARENT, Widget};

use crate::{
    queue::WidgetReceiver,
    sink::{DisplaySink, SinkError},
};

/// Pause between writing a frame and putting the panel to sleep.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

/// The widgets currently on screen, one per name.
///
/// Entries keep the position of the first widget submitted under their
/// name, which is what breaks ties between equal `z` values.
#[derive(Debug, Clone, Default)]
pub struct LiveSet {
    widgets: Vec<Widget>,
}

impl LiveSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            widgets: Vec::new(),
        }
    }

    /// Insert the widget, replacing any widget with the same name.
    pub fn upsert(&mut self, widget: Widget) {
        match self.widgets.iter_mut().find(|w| w.name() == widget.name()) {
            Some(slot) => *slot = widget,
            None => self.widgets.push(widget),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.name() == name)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.widgets.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Widgets in drawing order: ascending `z`, ties in arrival order.
    #[must_use]
    pub fn ordered(&self) -> Vec<&Widget> {
        let mut ordered: Vec<&Widget> = self.widgets.iter().collect();
        ordered.sort_by_key(|w| w.z());
        ordered
    }
}

impl FromIterator<Widget> for LiveSet {
    fn from_iter<I: IntoIterator<Item = Widget>>(iter: I) -> Self {
        let mut live = Self::new();
        for widget in iter {
            live.upsert(widget);
        }
        live
    }
}

/// The two composited planes of one frame, before quantization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub primary: RgbaImage,
    pub accent: RgbaImage,
}

/// Blend every widget of the live set onto two blank canvases, lowest `z`
/// first.
#[must_use]
pub fn render(live: &LiveSet, width: u32, height: u32) -> Frame {
    let mut primary = RgbaImage::from_pixel(width, height, TRANSPARENT);
    let mut accent = RgbaImage::from_pixel(width, height, TRANSPARENT);

    for widget in live.ordered() {
        composite_over(&mut primary, widget.primary_layer());
        composite_over(&mut accent, widget.accent_layer());
    }

    Frame { primary, accent }
}

/// Porter-Duff "over": draw `layer` on top of `canvas` in place.
///
/// Both images are expected to have the same size; pixels outside the
/// overlap are left alone.
pub fn composite_over(canvas: &mut RgbaImage, layer: &RgbaImage) {
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        *dst = blend(*dst, *src);
    }
}

fn blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src_alpha = u32::from(src[3]);
    match src_alpha {
        0 => return dst,
        255 => return src,
        _ => {}
    }

    // alphas scaled by 255 to stay in integers
    let dst_weight = u32::from(dst[3]) * (255 - src_alpha);
    let src_weight = src_alpha * 255;
    let out_alpha = src_weight + dst_weight;

    let channel = |i: usize| {
        let value = (u32::from(src[i]) * src_weight
            + u32::from(dst[i]) * dst_weight
            + out_alpha / 2)
            / out_alpha;
        u8::try_from(value).unwrap_or(u8::MAX)
    };

    Rgba([
        channel(0),
        channel(1),
        channel(2),
        u8::try_from((out_alpha + 127) / 255).unwrap_or(u8::MAX),
    ])
}

/// Reduce a composited plane to the panel's single bit per pixel.
///
/// Alpha is ignored: an untouched canvas pixel is white. Luma at or above
/// 128 is paper, anything darker is ink.
#[must_use]
pub fn quantize(plane: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        let Rgba([r, g, b, _]) = *plane.get_pixel(x, y);
        let luma =
            (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114)
                / 1000;
        if luma >= 128 { Luma([255]) } else { Luma([0]) }
    })
}

#[derive(Debug, Clone)]
pub struct CompositorConfig {
    /// Pause between a display write and the sleep command.
    pub settle: Duration,
    /// Rewrite the current frame when no widget arrived for this long.
    pub redraw_interval: Option<Duration>,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
            redraw_interval: None,
        }
    }
}

enum Wake {
    Widget(Widget),
    Redraw,
    Closed,
}

/// Owns the live set and the display. Nothing else touches either.
#[derive(Debug)]
pub struct Compositor<S> {
    sink: S,
    receiver: WidgetReceiver,
    live: LiveSet,
    config: CompositorConfig,
}

impl<S: DisplaySink> Compositor<S> {
    pub const fn new(
        sink: S,
        receiver: WidgetReceiver,
        config: CompositorConfig,
    ) -> Self {
        Self {
            sink,
            receiver,
            live: LiveSet::new(),
            config,
        }
    }

    #[must_use]
    pub const fn live_set(&self) -> &LiveSet {
        &self.live
    }

    /// Compose the live set and write it to the display, then let the panel
    /// settle and put it to sleep.
    ///
    /// Once the panel is awake it is put back to sleep even when the write
    /// fails.
    ///
    /// # Errors
    ///
    /// The first sink failure. The live set is unaffected.
    pub async fn draw(&mut self) -> Result<(), SinkError> {
        self.sink.init().await?;

        let written = self.write_frame().await;
        if written.is_ok() {
            tokio::time::sleep(self.config.settle).await;
        }

        let slept = self.sink.sleep().await;
        written.and(slept)
    }

    async fn write_frame(&mut self) -> Result<(), SinkError> {
        let width = self.sink.width();
        let height = self.sink.height();

        self.sink.clear().await?;

        let frame = render(&self.live, width, height);
        let primary = self.sink.buffer(&quantize(&frame.primary))?;
        let accent = self.sink.buffer(&quantize(&frame.accent))?;

        self.sink.display(&primary, &accent).await?;
        debug!(widgets = self.live.len(), "frame written");
        Ok(())
    }

    /// Run the refresh loop until `shutdown` resolves or every producer is
    /// gone, then release the display and hand it back.
    ///
    /// The initial widgets are drawn before waiting for the queue, so the
    /// panel is not left blank on boot. After that each widget taken from
    /// the queue causes exactly one redraw of the whole live set. Errors
    /// are logged and the loop carries on.
    pub async fn run(
        mut self,
        initial: Vec<Widget>,
        shutdown: impl Future<Output = ()>,
    ) -> S {
        tokio::pin!(shutdown);

        if !initial.is_empty() {
            for widget in initial {
                self.live.upsert(widget);
            }
            self.refresh().await;
        }

        loop {
            let wake = tokio::select! {
                () = &mut shutdown => break,
                wake = self.wait() => wake,
            };

            match wake {
                Wake::Widget(widget) => {
                    info!(widget = %widget.name(), z = widget.z(), "updating widget");
                    self.live.upsert(widget);
                }
                Wake::Redraw if self.live.is_empty() => continue,
                Wake::Redraw => info!("periodic redraw"),
                Wake::Closed => {
                    warn!("all producers are gone, stopping compositor");
                    break;
                }
            }

            self.refresh().await;
        }

        if let Err(e) = self.sink.close().await {
            error!(error = %e, "failed to release display");
        } else {
            info!("display released");
        }

        self.sink
    }

    async fn wait(&mut self) -> Wake {
        let next = match self.config.redraw_interval {
            Some(interval) => {
                match timeout(interval, self.receiver.next()).await {
                    Ok(next) => next,
                    Err(_) => return Wake::Redraw,
                }
            }
            None => self.receiver.next().await,
        };

        next.map_or(Wake::Closed, Wake::Widget)
    }

    async fn refresh(&mut self) {
        if let Err(e) = self.draw().await {
            error!(error = %e, "failed to refresh display");
        }
    }
}
