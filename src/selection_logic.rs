// src/selection_logic.rs
// Pure selection state. The druid widget feeds events in and reacts to the
// returned `Transition`; nothing here knows about windows or painting.

use crate::geometry::{Point, Rectangle};

pub const CANCELLED_BY_USER: &str = "Cancelled by user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Selecting,
    /// Terminal: the overlay is about to close.
    Closed,
}

/// Input the overlay understands, already in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    CancelKey,
}

/// What the caller has to do after feeding an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Event not valid in the current phase; state untouched.
    Ignored,
    Redraw,
    /// Pointer released: the raw corners go to finalization.
    Finalize { begin: Point, end: Point },
    Cancel { reason: String },
}

impl Transition {
    /// Every mutation asks for a repaint.
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, Transition::Ignored)
    }

    pub fn closes_overlay(&self) -> bool {
        matches!(self, Transition::Finalize { .. } | Transition::Cancel { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSession {
    pub begin: Option<Point>,
    pub end: Option<Point>,
    pub active: bool,
    pub magnifier_visible: bool,
    phase: Phase,
}

impl Default for SelectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionSession {
    pub fn new() -> Self {
        SelectionSession {
            begin: None,
            end: None,
            active: false,
            magnifier_visible: false,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn handle(&mut self, event: OverlayEvent) -> Transition {
        match event {
            OverlayEvent::PointerDown(p) => self.on_pointer_down(p),
            OverlayEvent::PointerMove(p) => self.on_pointer_move(p),
            OverlayEvent::PointerUp(p) => self.on_pointer_up(p),
            OverlayEvent::CancelKey => self.on_cancel_key(),
        }
    }

    pub fn on_pointer_down(&mut self, p: Point) -> Transition {
        if self.phase != Phase::Idle {
            return Transition::Ignored;
        }
        self.begin = Some(p);
        self.end = Some(p);
        self.active = true;
        self.magnifier_visible = true;
        self.phase = Phase::Selecting;
        Transition::Redraw
    }

    pub fn on_pointer_move(&mut self, p: Point) -> Transition {
        if self.phase != Phase::Selecting {
            return Transition::Ignored;
        }
        self.end = Some(p);
        Transition::Redraw
    }

    pub fn on_pointer_up(&mut self, p: Point) -> Transition {
        if self.phase != Phase::Selecting {
            return Transition::Ignored;
        }
        self.end = Some(p);
        self.active = false;
        self.magnifier_visible = false;
        self.phase = Phase::Closed;
        match self.begin {
            Some(begin) => Transition::Finalize { begin, end: p },
            // begin is always set on the way into Selecting
            None => Transition::Cancel { reason: CANCELLED_BY_USER.to_string() },
        }
    }

    /// Valid from Idle and Selecting. Once closed the outcome is already decided.
    pub fn on_cancel_key(&mut self) -> Transition {
        if self.phase == Phase::Closed {
            return Transition::Ignored;
        }
        self.active = false;
        self.magnifier_visible = false;
        self.phase = Phase::Closed;
        Transition::Cancel { reason: CANCELLED_BY_USER.to_string() }
    }

    /// The raw (not minimum-size-enforced) rectangle currently drawn on screen.
    pub fn current_rect(&self) -> Option<Rectangle> {
        match (self.begin, self.end) {
            (Some(b), Some(e)) => Some(Rectangle::from_corners(b, e)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_with_nothing_set() {
        let s = SelectionSession::new();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.begin.is_none() && s.end.is_none());
        assert!(!s.active && !s.magnifier_visible);
        assert!(s.current_rect().is_none());
    }

    #[test]
    fn drag_runs_through_all_phases() {
        let mut s = SelectionSession::new();
        assert_eq!(s.on_pointer_down(Point::new(10, 20)), Transition::Redraw);
        assert_eq!(s.phase(), Phase::Selecting);
        assert_eq!(s.begin, Some(Point::new(10, 20)));
        assert_eq!(s.end, Some(Point::new(10, 20)));
        assert!(s.active && s.magnifier_visible);

        assert_eq!(s.on_pointer_move(Point::new(40, 5)), Transition::Redraw);
        assert_eq!(s.end, Some(Point::new(40, 5)));
        assert_eq!(s.phase(), Phase::Selecting);

        let t = s.on_pointer_up(Point::new(60, 70));
        assert_eq!(t, Transition::Finalize { begin: Point::new(10, 20), end: Point::new(60, 70) });
        assert!(t.closes_overlay());
        assert_eq!(s.phase(), Phase::Closed);
        assert!(!s.active && !s.magnifier_visible);
        assert_eq!(s.current_rect(), Some(Rectangle { min_x: 10, min_y: 20, max_x: 60, max_y: 70 }));
    }

    #[test]
    fn out_of_phase_events_are_ignored() {
        let mut s = SelectionSession::new();
        assert_eq!(s.on_pointer_move(Point::new(1, 1)), Transition::Ignored);
        assert_eq!(s.on_pointer_up(Point::new(1, 1)), Transition::Ignored);
        assert!(s.end.is_none());

        s.on_pointer_down(Point::new(0, 0));
        assert_eq!(s.on_pointer_down(Point::new(5, 5)), Transition::Ignored);
        assert_eq!(s.begin, Some(Point::new(0, 0)));

        s.on_pointer_up(Point::new(9, 9));
        assert_eq!(s.on_pointer_down(Point::new(3, 3)), Transition::Ignored);
        assert_eq!(s.on_pointer_move(Point::new(3, 3)), Transition::Ignored);
        assert!(!Transition::Ignored.needs_redraw());
    }

    #[test]
    fn cancel_before_any_pointer_down() {
        let mut s = SelectionSession::new();
        let t = s.handle(OverlayEvent::CancelKey);
        assert_eq!(t, Transition::Cancel { reason: "Cancelled by user".into() });
        assert!(t.needs_redraw());
        assert_eq!(s.phase(), Phase::Closed);
    }

    #[test]
    fn cancel_mid_drag_hides_magnifier_and_blocks_finalize() {
        let mut s = SelectionSession::new();
        s.handle(OverlayEvent::PointerDown(Point::new(1, 1)));
        assert!(matches!(s.handle(OverlayEvent::CancelKey), Transition::Cancel { .. }));
        assert!(!s.magnifier_visible);
        assert_eq!(s.handle(OverlayEvent::PointerUp(Point::new(50, 50))), Transition::Ignored);
        assert_eq!(s.handle(OverlayEvent::CancelKey), Transition::Ignored);
    }
}
