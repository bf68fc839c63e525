use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::GrayImage;

use super::{DisplaySink, SinkError, buffer_len, unpack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    Init,
    Clear,
    Display,
    Sleep,
    Close,
}

/// Everything a [`MemorySink`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct SinkLog {
    pub calls: Vec<SinkCall>,
    pub last_primary: Option<Vec<u8>>,
    pub last_accent: Option<Vec<u8>>,
    fail_init: bool,
    fail_displays: usize,
}

impl SinkLog {
    #[must_use]
    pub fn count(&self, call: SinkCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

/// A display that keeps frames in memory.
///
/// Clones share the same log, so a test can keep a handle while the
/// compositor owns the sink.
#[derive(Debug, Clone)]
pub struct MemorySink {
    width: u32,
    height: u32,
    log: Arc<Mutex<SinkLog>>,
}

impl MemorySink {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            log: Arc::new(Mutex::new(SinkLog::default())),
        }
    }

    /// Snapshot of the calls made so far.
    #[must_use]
    pub fn log(&self) -> SinkLog {
        self.lock().clone()
    }

    /// Make the next `count` display calls fail.
    pub fn fail_displays(&self, count: usize) {
        self.lock().fail_displays = count;
    }

    pub fn fail_init(&self, fail: bool) {
        self.lock().fail_init = fail;
    }

    /// The last frame written, as (primary, accent) bitmaps.
    #[must_use]
    pub fn last_frame(&self) -> Option<(GrayImage, GrayImage)> {
        let log = self.lock();
        let primary = log.last_primary.as_deref()?;
        let accent = log.last_accent.as_deref()?;
        Some((
            unpack(primary, self.width, self.height).ok()?,
            unpack(accent, self.width, self.height).ok()?,
        ))
    }

    fn lock(&self) -> MutexGuard<'_, SinkLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: SinkCall) {
        self.lock().calls.push(call);
    }
}

impl DisplaySink for MemorySink {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    async fn init(&mut self) -> Result<(), SinkError> {
        self.record(SinkCall::Init);
        if self.lock().fail_init {
            return Err(SinkError::Device("init failed".to_string()));
        }
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), SinkError> {
        self.record(SinkCall::Clear);
        Ok(())
    }

    async fn display(
        &mut self,
        primary: &[u8],
        accent: &[u8],
    ) -> Result<(), SinkError> {
        let expected = buffer_len(self.width, self.height);
        for plane in [primary, accent] {
            if plane.len() != expected {
                return Err(SinkError::BufferSize {
                    actual: plane.len(),
                    expected,
                });
            }
        }

        let mut log = self.lock();
        log.calls.push(SinkCall::Display);
        if log.fail_displays > 0 {
            log.fail_displays -= 1;
            return Err(SinkError::Device("display write failed".to_string()));
        }
        log.last_primary = Some(primary.to_vec());
        log.last_accent = Some(accent.to_vec());
        Ok(())
    }

    async fn sleep(&mut self) -> Result<(), SinkError> {
        self.record(SinkCall::Sleep);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.record(SinkCall::Close);
        Ok(())
    }
}
