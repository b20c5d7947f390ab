//! Mock peripherals for integration tests.
//!
//! Pins and the code reader are handles onto shared state so a test can
//! flip levels or put a QR code "in view" while the code under test owns
//! the device.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use changeomatic::app::events::DisplayEvent;
use changeomatic::app::ports::{CodeReader, EventSink};
use changeomatic::error::HardwareError;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};

// ── GPIO line ─────────────────────────────────────────────────

/// Input line whose level the test drives.
#[derive(Clone)]
pub struct MockLine {
    level: Rc<Cell<bool>>,
    broken: Rc<Cell<bool>>,
}

#[allow(dead_code)]
impl MockLine {
    pub fn new(level: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(level)),
            broken: Rc::new(Cell::new(false)),
        }
    }

    pub fn set(&self, level: bool) {
        self.level.set(level);
    }

    pub fn set_broken(&self, broken: bool) {
        self.broken.set(broken);
    }
}

impl ErrorType for MockLine {
    type Error = ErrorKind;
}

impl InputPin for MockLine {
    fn is_high(&mut self) -> Result<bool, ErrorKind> {
        if self.broken.get() {
            Err(ErrorKind::Other)
        } else {
            Ok(self.level.get())
        }
    }

    fn is_low(&mut self) -> Result<bool, ErrorKind> {
        self.is_high().map(|h| !h)
    }
}

// ── QR code reader ────────────────────────────────────────────

/// Code reader that reports "nothing in view" until a code is shown.
#[derive(Clone, Default)]
pub struct MockCodeReader {
    image: Arc<Mutex<Option<Vec<u8>>>>,
}

#[allow(dead_code)]
impl MockCodeReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `payload` in front of the camera.
    pub fn show(&self, payload: &str) {
        let mut image = (payload.len() as u16).to_le_bytes().to_vec();
        image.extend_from_slice(payload.as_bytes());
        *self.image.lock().unwrap() = Some(image);
    }

    pub fn hide(&self) {
        *self.image.lock().unwrap() = None;
    }
}

impl CodeReader for MockCodeReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), HardwareError> {
        buf.fill(0);
        if let Some(image) = self.image.lock().unwrap().as_ref() {
            let n = buf.len().min(image.len());
            buf[..n].copy_from_slice(&image[..n]);
        }
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: RefCell<Vec<DisplayEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Screen names in the order they were announced.
    pub fn screens(&self) -> Vec<&'static str> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::ScreenChange { screen, .. } => Some(screen.name()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.borrow().iter().filter(|e| e.name() == name).count()
    }

    pub fn last(&self) -> Option<DisplayEvent> {
        self.events.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &DisplayEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
