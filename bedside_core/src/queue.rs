use tokio::sync::mpsc;
use types::Widget;

/// Queue capacity used when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("widget queue is closed")]
    Closed,
}

/// Create the widget queue.
///
/// Widgets from one sender are received in the order they were submitted.
/// A full queue suspends `submit` until the compositor takes an item; it
/// never drops a widget.
///
/// # Panics
///
/// If `capacity` is zero.
#[must_use]
pub fn channel(capacity: usize) -> (WidgetSender, WidgetReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (WidgetSender { tx }, WidgetReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct WidgetSender {
    tx: mpsc::Sender<Widget>,
}

impl WidgetSender {
    /// Enqueue a widget, waiting for space if the queue is full.
    ///
    /// # Errors
    ///
    /// `QueueError::Closed` once the receiving side is gone.
    pub async fn submit(&self, widget: Widget) -> Result<(), QueueError> {
        tracing::debug!(widget = %widget.name(), z = widget.z(), "submitting widget");
        self.tx.send(widget).await.map_err(|_| QueueError::Closed)
    }

    /// Enqueue the widget if there is one. Returns whether anything was
    /// enqueued.
    ///
    /// # Errors
    ///
    /// `QueueError::Closed` once the receiving side is gone.
    pub async fn submit_maybe(
        &self,
        widget: Option<Widget>,
    ) -> Result<bool, QueueError> {
        match widget {
            Some(widget) => self.submit(widget).await.map(|()| true),
            None => Ok(false),
        }
    }
}

#[derive(Debug)]
pub struct WidgetReceiver {
    rx: mpsc::Receiver<Widget>,
}

impl WidgetReceiver {
    /// Wait for the next widget. `None` once every sender is gone and the
    /// queue is drained.
    pub async fn next(&mut self) -> Option<Widget> {
        self.rx.recv().await
    }

    /// Take a widget if one is already waiting.
    pub fn try_next(&mut self) -> Option<Widget> {
        self.rx.try_recv().ok()
    }
}
