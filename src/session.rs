//! Per-session context shared between the overlay and the code that runs
//! after it closes.
//!
//! The overlay lives inside druid's event loop, which only hands control
//! back once the window is gone. `SessionContext` is how the selected region
//! or the cancellation reason gets out. Everything runs on the UI thread, so
//! plain `Rc` cells are enough.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::Local;

use crate::capture::{CaptureFinalizer, ScreenGrabber};
use crate::geometry::Rectangle;
use crate::outcome::CaptureOutcome;
use crate::region;
use crate::selection_logic::{OverlayEvent, SelectionSession, Transition};

pub const CLOSED_WITHOUT_SELECTION: &str = "Overlay closed without a selection";

#[derive(Debug, Clone)]
pub struct SessionContext {
    id: Rc<str>,
    region: Rc<Cell<Option<Rectangle>>>,
    outcome: Rc<RefCell<Option<CaptureOutcome>>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::with_id(Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let id: String = id.into();
        SessionContext {
            id: id.into(),
            region: Rc::new(Cell::new(None)),
            outcome: Rc::new(RefCell::new(None)),
        }
    }

    /// Tag used on every log line of this session.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn submit_region(&self, region: Rectangle) {
        self.region.set(Some(region));
    }

    pub fn take_region(&self) -> Option<Rectangle> {
        self.region.take()
    }

    /// Records the terminal outcome. Only the first call wins.
    pub fn settle(&self, outcome: CaptureOutcome) -> bool {
        let mut slot = self.outcome.borrow_mut();
        if let Some(existing) = slot.as_ref() {
            log::warn!(
                "[session {}] Outcome already settled as {:?}, dropping {:?}",
                self.id, existing, outcome
            );
            return false;
        }
        *slot = Some(outcome);
        true
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    pub fn take_outcome(&self) -> Option<CaptureOutcome> {
        self.outcome.borrow_mut().take()
    }
}

/// Feeds overlay events into the selection state machine and records what
/// the session decided.
#[derive(Debug, Clone)]
pub struct OverlayController {
    ctx: SessionContext,
    screen: (u32, u32),
    min_size: u32,
}

impl OverlayController {
    pub fn new(ctx: SessionContext, screen_width: u32, screen_height: u32, min_size: u32) -> Self {
        OverlayController {
            ctx,
            screen: (screen_width, screen_height),
            min_size,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn screen(&self) -> (u32, u32) {
        self.screen
    }

    pub fn dispatch(&self, session: &mut SelectionSession, event: OverlayEvent) -> Transition {
        let transition = session.handle(event);
        match &transition {
            Transition::Finalize { begin, end } => {
                let raw = Rectangle::from_corners(*begin, *end);
                log::info!(
                    "[session {}] Selected area: ({}, {}) to ({}, {})",
                    self.ctx.id(), raw.min_x, raw.min_y, raw.max_x, raw.max_y
                );
                if raw.width() < self.min_size || raw.height() < self.min_size {
                    log::warn!(
                        "[session {}] Selected area is too small ({}x{})",
                        self.ctx.id(), raw.width(), raw.height()
                    );
                }
                let fitted = region::normalize(*begin, *end, self.screen.0, self.screen.1, self.min_size);
                if fitted != raw {
                    log::info!(
                        "[session {}] Expanded area to: ({}, {}) to ({}, {})",
                        self.ctx.id(), fitted.min_x, fitted.min_y, fitted.max_x, fitted.max_y
                    );
                }
                self.ctx.submit_region(fitted);
            }
            Transition::Cancel { reason } => {
                log::info!("[session {}] Capture rejected: {}", self.ctx.id(), reason);
                self.ctx.settle(CaptureOutcome::cancelled(reason.clone()));
            }
            Transition::Redraw | Transition::Ignored => {}
        }
        transition
    }
}

/// Resolves the session once the overlay window is gone: a settled outcome
/// wins, otherwise a pending region is finalized, otherwise the overlay was
/// closed some other way.
pub fn conclude<G: ScreenGrabber + ?Sized>(
    ctx: &SessionContext,
    finalizer: &CaptureFinalizer<'_, G>,
) -> CaptureOutcome {
    if !ctx.is_settled() {
        let outcome = match ctx.take_region() {
            Some(region) => finalizer.finalize(region, ctx),
            None => CaptureOutcome::cancelled(CLOSED_WITHOUT_SELECTION),
        };
        ctx.settle(outcome);
    }
    let outcome = ctx
        .take_outcome()
        .unwrap_or_else(|| CaptureOutcome::cancelled(CLOSED_WITHOUT_SELECTION));
    match &outcome {
        CaptureOutcome::Accepted { .. } => log::info!("[session {}] Capture accepted", ctx.id()),
        CaptureOutcome::Cancelled { reason } => log::info!("[session {}] Capture cancelled: {}", ctx.id(), reason),
        CaptureOutcome::Failed { error } => log::error!("[session {}] Capture failed: {}", ctx.id(), error),
    }
    outcome
}
