// src/overlay.rs
// Full-screen druid window showing the frozen snapshot. Pointer and key
// events go through `OverlayController`; painting only reads the session.

use druid::kurbo::Line;
use druid::piet::{
    FontFamily, FontWeight, ImageFormat, InterpolationMode, PietImage, Text, TextLayout,
    TextLayoutBuilder,
};
use druid::{
    AppLauncher, BoxConstraints, Color, Cursor, Data, Env, Event, EventCtx, KbKey, LayoutCtx,
    LifeCycle, LifeCycleCtx, PaintCtx, Rect, RenderContext, Scale, Size, UpdateCtx, Widget,
    WindowDesc, WindowState,
};
use image::RgbaImage;
use std::sync::Arc;

use crate::geometry::{Point, Rectangle};
use crate::magnifier::{MagnifierConfig, MagnifierLayout};
use crate::selection_logic::{OverlayEvent, Phase, SelectionSession};
use crate::session::OverlayController;

pub const INSTRUCTION_TEXT: &str = "Select an area for OCR";
pub const CANCEL_TEXT: &str = "Cancel (ESC)";

const MASK: Color = Color::rgba8(0, 0, 0, 160);
const LABEL_BG: Color = Color::rgba8(0, 0, 0, 180);
const BORDER: Color = Color::rgb8(46, 125, 246);
const CANCEL_BG: Color = Color::rgb8(0xdc, 0x35, 0x45);
const CROSSHAIR: Color = Color::rgb8(255, 0, 0);

#[derive(Clone, Data)]
pub struct OverlayState {
    snapshot: Arc<RgbaImage>,
    #[data(same_fn = "PartialEq::eq")]
    session: SelectionSession,
}

impl OverlayState {
    pub fn new(snapshot: RgbaImage) -> Self {
        OverlayState {
            snapshot: Arc::new(snapshot),
            session: SelectionSession::new(),
        }
    }
}

/// `"{w} × {h} px"` for the rectangle currently being dragged.
pub fn size_label(rect: &Rectangle) -> String {
    format!("{} × {} px", rect.width(), rect.height())
}

/// Label box just under the lower-left corner of the selection.
pub fn label_rect(selection: &Rectangle) -> Rectangle {
    Rectangle::from_origin_size(selection.min_x, selection.max_y + 5, 150, 20)
}

pub fn instruction_rect(screen_width: u32) -> Rectangle {
    Rectangle::from_origin_size((screen_width as i32 - 400) / 2, 20, 400, 40)
}

pub fn cancel_button_rect(screen_width: u32, screen_height: u32) -> Rectangle {
    Rectangle::from_origin_size(screen_width as i32 - 120, screen_height as i32 - 60, 100, 40)
}

/// A left press on the cancel button counts as the cancel key, but only before
/// a drag has started; everywhere else it starts a selection.
pub fn classify_press(p: Point, phase: Phase, screen: (u32, u32)) -> OverlayEvent {
    if phase == Phase::Idle && cancel_button_rect(screen.0, screen.1).contains(p) {
        OverlayEvent::CancelKey
    } else {
        OverlayEvent::PointerDown(p)
    }
}

/// Pixel-space rectangle as a piet rect, for sampling the snapshot.
fn to_rect(r: Rectangle) -> Rect {
    Rect::new(r.min_x as f64, r.min_y as f64, r.max_x as f64, r.max_y as f64)
}

/// Screen pixels to window display points.
fn to_dp(r: Rectangle, scale: Scale) -> Rect {
    Rect::new(
        r.min_x as f64 / scale.x(),
        r.min_y as f64 / scale.y(),
        r.max_x as f64 / scale.x(),
        r.max_y as f64 / scale.y(),
    )
}

/// Window display points to screen pixels.
fn to_screen(pos: druid::Point, scale: Scale) -> Point {
    Point::new((pos.x * scale.x()).round() as i32, (pos.y * scale.y()).round() as i32)
}

pub struct OverlayWidget {
    controller: OverlayController,
    magnifier: MagnifierConfig,
    cached_image: Option<PietImage>,
    scale: Scale,
}

impl OverlayWidget {
    pub fn new(controller: OverlayController, magnifier: MagnifierConfig) -> Self {
        OverlayWidget {
            controller,
            magnifier,
            cached_image: None,
            scale: Scale::default(),
        }
    }

    fn translate(&self, event: &Event, session: &SelectionSession) -> Option<OverlayEvent> {
        let scale = self.scale;
        match event {
            Event::MouseDown(e) if e.button.is_left() => Some(classify_press(
                to_screen(e.pos, scale),
                session.phase(),
                self.controller.screen(),
            )),
            Event::MouseMove(e) => Some(OverlayEvent::PointerMove(to_screen(e.pos, scale))),
            Event::MouseUp(e) if e.button.is_left() => {
                Some(OverlayEvent::PointerUp(to_screen(e.pos, scale)))
            }
            Event::KeyDown(k) if k.key == KbKey::Escape => Some(OverlayEvent::CancelKey),
            _ => None,
        }
    }

    fn paint_label(ctx: &mut PaintCtx, area: Rect, text: &str, size: f64, bold: bool) {
        let weight = if bold { FontWeight::BOLD } else { FontWeight::REGULAR };
        let layout = ctx
            .text()
            .new_text_layout(text.to_string())
            .font(FontFamily::SYSTEM_UI, size)
            .default_attribute(weight)
            .text_color(Color::WHITE)
            .build();
        if let Ok(layout) = layout {
            let s = layout.size();
            let origin = (
                area.x0 + (area.width() - s.width) / 2.0,
                area.y0 + (area.height() - s.height) / 2.0,
            );
            ctx.draw_text(&layout, origin);
        }
    }

    fn paint_magnifier(&self, ctx: &mut PaintCtx, cursor: Point) {
        let (w, h) = self.controller.screen();
        let Some(layout) = MagnifierLayout::compute(&self.magnifier, cursor, w, h) else {
            return;
        };
        let target = to_dp(layout.target, self.scale);
        if let Some(img) = &self.cached_image {
            ctx.draw_image_area(img, to_rect(layout.source), target, InterpolationMode::NearestNeighbor);
        }
        ctx.stroke(target, &Color::WHITE, 1.0);

        let c = layout.crosshair();
        let (cx, cy) = (c.x as f64 / self.scale.x(), c.y as f64 / self.scale.y());
        ctx.stroke(Line::new((cx - 5.0, cy), (cx + 5.0, cy)), &CROSSHAIR, 1.0);
        ctx.stroke(Line::new((cx, cy - 5.0), (cx, cy + 5.0)), &CROSSHAIR, 1.0);
    }
}

impl Widget<OverlayState> for OverlayWidget {
    fn event(&mut self, ctx: &mut EventCtx, event: &Event, data: &mut OverlayState, _env: &Env) {
        self.scale = ctx.scale();
        match event {
            Event::WindowConnected => {
                ctx.request_focus();
                ctx.set_cursor(&Cursor::Crosshair);
                return;
            }
            Event::MouseMove(_) => ctx.set_cursor(&Cursor::Crosshair),
            _ => {}
        }

        let Some(overlay_event) = self.translate(event, &data.session) else {
            return;
        };
        let transition = self.controller.dispatch(&mut data.session, overlay_event);
        if transition.needs_redraw() {
            ctx.request_paint();
        }
        if transition.closes_overlay() {
            ctx.set_handled();
            ctx.submit_command(druid::commands::QUIT_APP);
        }
    }

    fn lifecycle(&mut self, ctx: &mut LifeCycleCtx, event: &LifeCycle, _data: &OverlayState, _env: &Env) {
        if let LifeCycle::BuildFocusChain = event {
            ctx.register_for_focus();
        }
    }

    fn update(&mut self, ctx: &mut UpdateCtx, old: &OverlayState, data: &OverlayState, _env: &Env) {
        if !Arc::ptr_eq(&old.snapshot, &data.snapshot) {
            self.cached_image = None;
            ctx.request_paint();
        } else if old.session != data.session {
            ctx.request_paint();
        }
    }

    fn layout(&mut self, _ctx: &mut LayoutCtx, bc: &BoxConstraints, _data: &OverlayState, _env: &Env) -> Size {
        bc.max()
    }

    fn paint(&mut self, ctx: &mut PaintCtx, data: &OverlayState, _env: &Env) {
        self.scale = ctx.scale();
        let scale = self.scale;
        let full_rect = ctx.size().to_rect();
        let (w, h) = self.controller.screen();

        if self.cached_image.is_none() {
            let (iw, ih) = data.snapshot.dimensions();
            self.cached_image = ctx
                .make_image(iw as usize, ih as usize, data.snapshot.as_raw(), ImageFormat::RgbaSeparate)
                .ok();
        }
        if let Some(img) = &self.cached_image {
            ctx.draw_image(img, full_rect, InterpolationMode::NearestNeighbor);
        }

        match data.session.current_rect() {
            Some(sel) => {
                let r = to_dp(sel, scale);
                // darken everything around the selection window
                ctx.fill(Rect::new(0.0, 0.0, full_rect.width(), r.y0), &MASK);
                ctx.fill(Rect::new(0.0, r.y1, full_rect.width(), full_rect.height()), &MASK);
                ctx.fill(Rect::new(0.0, r.y0, r.x0, r.y1), &MASK);
                ctx.fill(Rect::new(r.x1, r.y0, full_rect.width(), r.y1), &MASK);
                ctx.stroke(r, &BORDER, 2.0);

                let label = to_dp(label_rect(&sel), scale);
                ctx.fill(label, &LABEL_BG);
                Self::paint_label(ctx, label, &size_label(&sel), 12.0, false);
            }
            None => {
                ctx.fill(full_rect, &MASK);
                let banner = to_dp(instruction_rect(w), scale);
                ctx.fill(banner, &LABEL_BG);
                Self::paint_label(ctx, banner, INSTRUCTION_TEXT, 14.0, true);
            }
        }

        let cancel = to_dp(cancel_button_rect(w, h), scale);
        ctx.fill(cancel, &CANCEL_BG);
        Self::paint_label(ctx, cancel, CANCEL_TEXT, 12.0, true);

        if data.session.magnifier_visible {
            if let Some(cursor) = data.session.end {
                self.paint_magnifier(ctx, cursor);
            }
        }
    }
}

/// Opens the overlay and blocks until it closes. The session's region or
/// outcome is left in the controller's `SessionContext`.
///
/// The window is maximized rather than sized from the snapshot, since the
/// snapshot is in pixels and druid sizes windows in display points. Pointer
/// positions are scaled back to pixels with the window's scale factor.
pub fn run_overlay(
    snapshot: RgbaImage,
    controller: OverlayController,
    magnifier: MagnifierConfig,
) -> anyhow::Result<()> {
    let window = WindowDesc::new(OverlayWidget::new(controller, magnifier))
        .title("ocrsnip")
        .set_position(druid::Point::ORIGIN)
        .set_window_state(WindowState::Maximized)
        .show_titlebar(false)
        .resizable(false);
    AppLauncher::with_window(window).launch(OverlayState::new(snapshot))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::CaptureOutcome;
    use crate::selection_logic::{Transition, CANCELLED_BY_USER};
    use crate::session::SessionContext;

    #[test]
    fn label_reads_width_by_height() {
        let sel = Rectangle::from_corners(Point::new(120, 40), Point::new(20, 10));
        assert_eq!(size_label(&sel), "100 × 30 px");
        assert_eq!(label_rect(&sel), Rectangle::from_origin_size(20, 45, 150, 20));
    }

    #[test]
    fn chrome_sits_inside_the_screen() {
        let banner = instruction_rect(1920);
        assert_eq!(banner, Rectangle::from_origin_size(760, 20, 400, 40));
        let cancel = cancel_button_rect(1920, 1080);
        assert!(cancel.contains(Point::new(1850, 1030)));
        assert!(!cancel.contains(Point::new(960, 540)));
        assert_eq!(cancel.max_x, 1900);
        assert_eq!(cancel.max_y, 1060);
    }

    #[test]
    fn rect_conversion_keeps_edges() {
        let r = to_rect(Rectangle { min_x: 1, min_y: 2, max_x: 30, max_y: 40 });
        assert_eq!((r.x0, r.y0, r.x1, r.y1), (1.0, 2.0, 30.0, 40.0));
        assert_eq!(to_screen(druid::Point::new(10.4, 19.6), Scale::default()), Point::new(10, 20));
    }

    #[test]
    fn hidpi_points_map_to_snapshot_pixels() {
        let scale = Scale::new(2.0, 2.0);
        assert_eq!(to_screen(druid::Point::new(250.0, 200.0), scale), Point::new(500, 400));
        assert_eq!(to_screen(druid::Point::new(10.25, 0.75), scale), Point::new(21, 2));

        let r = to_dp(Rectangle::from_origin_size(100, 60, 500, 400), scale);
        assert_eq!((r.x0, r.y0, r.x1, r.y1), (50.0, 30.0, 300.0, 230.0));
        let r = to_dp(Rectangle::from_origin_size(100, 60, 500, 400), Scale::new(1.5, 1.5));
        assert_eq!((r.x0, r.y0, r.x1, r.y1), (100.0 / 1.5, 40.0, 400.0, 460.0 / 1.5));
    }

    #[test]
    fn cancel_button_press_only_cancels_before_a_drag() {
        let screen = (1920, 1080);
        let on_button = Point::new(1850, 1030);
        assert_eq!(classify_press(on_button, Phase::Idle, screen), OverlayEvent::CancelKey);
        assert_eq!(classify_press(on_button, Phase::Selecting, screen), OverlayEvent::PointerDown(on_button));

        let elsewhere = Point::new(960, 540);
        assert_eq!(classify_press(elsewhere, Phase::Idle, screen), OverlayEvent::PointerDown(elsewhere));
    }

    #[test]
    fn cancel_button_press_settles_cancelled() {
        let ctx = SessionContext::new();
        let controller = OverlayController::new(ctx.clone(), 1920, 1080, 30);
        let mut session = SelectionSession::new();

        let press = classify_press(Point::new(1850, 1030), session.phase(), controller.screen());
        let t = controller.dispatch(&mut session, press);
        assert!(t.closes_overlay());
        assert_eq!(ctx.take_outcome(), Some(CaptureOutcome::cancelled(CANCELLED_BY_USER)));
        assert_eq!(ctx.take_region(), None);
    }

    #[test]
    fn press_on_button_mid_drag_is_ignored() {
        let ctx = SessionContext::new();
        let controller = OverlayController::new(ctx.clone(), 1920, 1080, 30);
        let mut session = SelectionSession::new();
        controller.dispatch(&mut session, OverlayEvent::PointerDown(Point::new(100, 100)));

        let press = classify_press(Point::new(1850, 1030), session.phase(), controller.screen());
        assert_eq!(controller.dispatch(&mut session, press), Transition::Ignored);
        assert_eq!(session.phase(), Phase::Selecting);
        assert_eq!(session.begin, Some(Point::new(100, 100)));
        assert!(!ctx.is_settled());
    }
}
