use std::time::Instant;

use super::loader::{FieldLoader, FieldState};
use super::scheduler::RenderScheduler;
use super::state::{ViewSettings, ViewState};
use crate::annotate::{AnnotationEngine, Gesture, LabelId, LabelLayout, PointerButton, PressOutcome};
use crate::audio::{AnalysisParams, SampleBuffer};
use crate::error::Result;
use crate::render::{FieldSource, Frame, FrameRenderer, Overlay, Viewport};

/// Zoom factor applied per 100 units of wheel delta.
const ZOOM_STEP: f64 = 1.15;
/// Fraction of the plot width the playhead may reach before the view follows.
const FOLLOW_MARGIN: f64 = 0.9;

/// Notifications for the host UI, drained with [`ViewController::drain_events`].
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    /// The visible window length changed; carries the new `window_seconds`.
    ZoomChanged(f64),
    LabelsChanged,
    SelectionChanged(Option<LabelId>),
    /// A label was just created and its text should be edited.
    EditLabel(LabelId),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Ctrl or Cmd held.
    pub ctrl: bool,
}

/// Owns the view, the label engine and the analysis loader, and routes
/// device-coordinate input between them.
pub struct ViewController {
    /// Requested view settings. The frequency range is re-derived from these
    /// against each loaded file's nyquist.
    settings: ViewSettings,
    view: ViewState,
    viewport: Viewport,
    layout: LabelLayout,
    engine: AnnotationEngine,
    loader: FieldLoader,
    renderer: FrameRenderer,
    scheduler: RenderScheduler,
    duration: f64,
    nyquist: f64,
    playhead: Option<f64>,
    follow_playhead: bool,
    pan_anchor: Option<f64>,
    moved: bool,
    events: Vec<ViewEvent>,
}

impl ViewController {
    pub fn new(
        settings: ViewSettings,
        nyquist: f64,
        viewport: Viewport,
        engine: AnnotationEngine,
        renderer: FrameRenderer,
        fps: u32,
    ) -> Self {
        let duration = engine.duration();
        let view = ViewState::from_settings(&settings, nyquist);
        Self {
            settings,
            view,
            viewport,
            layout: LabelLayout::default(),
            engine,
            loader: FieldLoader::new(),
            renderer,
            scheduler: RenderScheduler::new(fps),
            duration,
            nyquist,
            playhead: None,
            follow_playhead: true,
            pan_anchor: None,
            moved: false,
            events: Vec::new(),
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn engine(&self) -> &AnnotationEngine {
        &self.engine
    }

    /// Direct engine access for category management and programmatic edits.
    /// Callers are responsible for calling [`ViewController::invalidate`].
    pub fn engine_mut(&mut self) -> &mut AnnotationEngine {
        &mut self.engine
    }

    pub fn field_state(&self) -> &FieldState {
        self.loader.state()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn invalidate(&mut self) {
        self.scheduler.invalidate();
    }

    /// Load a new decoded file. Labels from the previous file are dropped and
    /// any analysis still running for it is discarded.
    pub fn load(&mut self, buffer: SampleBuffer, params: AnalysisParams) -> Result<u64> {
        self.duration = buffer.duration();
        self.nyquist = buffer.nyquist();
        self.engine.reset(self.duration);
        self.view.scroll_offset_px = 0.0;
        let max = self.settings.max_freq.unwrap_or(self.nyquist);
        if !self.view.set_frequency_range(self.settings.min_freq, max, self.nyquist) {
            self.view.set_frequency_range(0.0, self.nyquist, self.nyquist);
        }
        self.playhead = None;
        self.events.push(ViewEvent::LabelsChanged);
        self.events.push(ViewEvent::SelectionChanged(None));
        self.scheduler.invalidate();
        let generation = self.loader.load(buffer, params);
        if generation.is_err() {
            self.loader.clear();
        }
        generation
    }

    /// Pick up finished analysis. Call once per loop iteration.
    pub fn poll(&mut self) {
        if self.loader.poll() {
            self.scheduler.invalidate();
        }
    }

    /// Block until the running analysis finishes.
    pub fn wait_for_field(&mut self) -> &FieldState {
        self.scheduler.invalidate();
        self.loader.wait()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.view.clamp_scroll(self.plot_width(), self.duration);
        self.scheduler.invalidate();
    }

    pub fn set_window_seconds(&mut self, seconds: f64) {
        let anchor = self.plot_width() / 2.0;
        self.zoom_about(seconds, anchor);
    }

    /// Scroll so that `t` is at the left edge of the plot.
    pub fn scroll_to_time(&mut self, t: f64) {
        let width = self.plot_width();
        self.view.scroll_to(t, 0.0, width, self.duration);
        self.scheduler.invalidate();
    }

    /// Set the displayed band. An accepted range is also kept for files
    /// loaded later, clamped to their nyquist.
    pub fn set_frequency_range(&mut self, min_freq: f64, max_freq: f64) -> bool {
        let applied = self.view.set_frequency_range(min_freq, max_freq, self.nyquist);
        if applied {
            self.settings.min_freq = min_freq;
            self.settings.max_freq = Some(max_freq);
        }
        self.scheduler.invalidate();
        applied
    }

    pub fn set_tone(&mut self, intensity: f64, contrast: f64) {
        self.view.intensity = intensity.max(0.0);
        self.view.contrast = contrast.max(0.0);
        self.scheduler.invalidate();
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        self.scheduler.invalidate();
        &mut self.view
    }

    /// Update the playback position. While playing, the view scrolls so the
    /// playhead stays inside the window.
    pub fn set_playhead(&mut self, t: Option<f64>, playing: bool) {
        self.playhead = t.map(|t| t.clamp(0.0, self.duration));
        self.scheduler.set_continuous(playing);
        if let (Some(t), true) = (self.playhead, playing && self.follow_playhead) {
            let width = self.plot_width();
            let x = self.view.time_axis(width).x_of(t);
            if x < 0.0 || x > width * FOLLOW_MARGIN {
                self.view.scroll_to(t, width * (1.0 - FOLLOW_MARGIN), width, self.duration);
            }
        }
        self.scheduler.invalidate();
    }

    pub fn set_follow_playhead(&mut self, follow: bool) {
        self.follow_playhead = follow;
    }

    // ---- input -----------------------------------------------------------

    /// Wheel input at device point `(x, y)`. Ctrl zooms around the cursor;
    /// otherwise both wheel axes pan in time.
    pub fn wheel(&mut self, x: f64, y: f64, delta_x: f64, delta_y: f64, modifiers: Modifiers) {
        if !self.viewport.in_plot(x, y) {
            return;
        }
        let (px, _) = self.viewport.to_plot(x, y);
        if modifiers.ctrl {
            let seconds = self.view.window_seconds * ZOOM_STEP.powf(delta_y / 100.0);
            self.zoom_about(seconds, px);
        } else {
            self.view.scroll_offset_px += delta_x + delta_y;
            self.view.clamp_scroll(self.plot_width(), self.duration);
            self.scheduler.invalidate();
        }
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, button: PointerButton) {
        if !self.viewport.in_plot(x, y) {
            return;
        }
        let (px, py) = self.viewport.to_plot(x, y);
        if button == PointerButton::Secondary {
            self.pan_anchor = Some(px);
            return;
        }

        let before = self.engine.selected();
        let axis = self.time_axis();
        self.moved = false;
        match self.engine.pointer_down(px, py, button, &axis, &self.layout) {
            PressOutcome::Ignored => return,
            PressOutcome::Deleted(_) => self.events.push(ViewEvent::LabelsChanged),
            PressOutcome::BeganCreate | PressOutcome::BeganResize(_) | PressOutcome::BeganDrag(_) => {}
        }
        self.push_selection_change(before);
        self.scheduler.invalidate();
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let (px, _) = self.viewport.to_plot(x, y);
        if let Some(anchor) = self.pan_anchor {
            self.view.scroll_offset_px -= px - anchor;
            self.view.clamp_scroll(self.plot_width(), self.duration);
            self.pan_anchor = Some(px);
            self.scheduler.invalidate();
            return;
        }
        let axis = self.time_axis();
        if self.engine.pointer_move(px, &axis) {
            self.moved |= !matches!(self.engine.gesture(), Gesture::Creating { .. });
            self.scheduler.invalidate();
        }
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) {
        if self.pan_anchor.take().is_some() {
            return;
        }
        let (px, _) = self.viewport.to_plot(x, y);
        let gesture = self.engine.gesture();
        if gesture == Gesture::Idle {
            return;
        }
        let before = self.engine.selected();
        let axis = self.time_axis();
        let created = self.engine.pointer_up(px, &axis);
        let changed = created.is_some()
            || (self.moved && matches!(gesture, Gesture::Resizing { .. } | Gesture::Dragging { .. }));
        if changed {
            self.events.push(ViewEvent::LabelsChanged);
        }
        self.push_selection_change(before);
        if let Some(id) = created {
            self.events.push(ViewEvent::EditLabel(id));
        }
        self.moved = false;
        self.scheduler.invalidate();
    }

    /// Abort the running gesture, e.g. on Escape.
    pub fn cancel_gesture(&mut self) {
        self.engine.cancel_gesture();
        self.pan_anchor = None;
        self.scheduler.invalidate();
    }

    // ---- label edits from the host -----------------------------------------

    pub fn set_label_text(&mut self, id: LabelId, text: &str) {
        if self.engine.set_label_text(id, text) {
            self.events.push(ViewEvent::LabelsChanged);
            self.scheduler.invalidate();
        }
    }

    /// Focus left the label editor.
    pub fn commit_label_text(&mut self, id: LabelId) {
        let before = self.engine.selected();
        if self.engine.commit_label_text(id) {
            self.events.push(ViewEvent::LabelsChanged);
            self.push_selection_change(before);
            self.scheduler.invalidate();
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(id) = self.engine.selected() {
            self.engine.delete_label(id);
            self.events.push(ViewEvent::LabelsChanged);
            self.events.push(ViewEvent::SelectionChanged(None));
            self.scheduler.invalidate();
        }
    }

    pub fn drain_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- rendering ---------------------------------------------------------

    /// Render if the scheduler says a frame is due.
    pub fn frame(&mut self, now: Instant) -> Option<Frame> {
        self.poll();
        if !self.scheduler.should_render(now) {
            return None;
        }
        let frame = self.render();
        self.scheduler.mark_rendered(now);
        Some(frame)
    }

    /// Render unconditionally.
    pub fn render(&self) -> Frame {
        let source = match self.loader.state() {
            FieldState::Ready(field) => FieldSource::Ready(field),
            FieldState::Pending { .. } => FieldSource::Pending,
            FieldState::Empty | FieldState::Unavailable(_) => FieldSource::Unavailable,
        };
        let overlay = Overlay {
            labels: self.engine.labels(),
            selected: self.engine.selected(),
            draft: self.engine.draft(),
            playhead: self.playhead,
            layout: self.layout,
        };
        self.renderer.render(source, &self.view, &self.viewport, self.duration, &overlay)
    }

    // ---- helpers -----------------------------------------------------------

    fn plot_width(&self) -> f64 {
        self.viewport.plot_width() as f64
    }

    fn time_axis(&self) -> crate::render::TimeAxis {
        self.view.time_axis(self.plot_width())
    }

    /// Change the window length keeping the time under plot x `px` fixed.
    fn zoom_about(&mut self, seconds: f64, px: f64) {
        let width = self.plot_width();
        let t = self.view.time_axis(width).time_at(px);
        let previous = self.view.window_seconds;
        let applied = self.view.set_window_seconds(seconds);
        self.view.scroll_to(t, px, width, self.duration);
        if applied != previous {
            log::debug!("Zoom {:.2}s -> {:.2}s", previous, applied);
            self.events.push(ViewEvent::ZoomChanged(applied));
        }
        self.scheduler.invalidate();
    }

    fn push_selection_change(&mut self, before: Option<LabelId>) {
        let after = self.engine.selected();
        if after != before {
            self.events.push(ViewEvent::SelectionChanged(after));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::Categories;
    use crate::render::ColorMap;

    const W: u32 = 1048;
    const H: u32 = 220;

    /// 1000 px plot over a 10 s window of 60 s audio: 100 px per second.
    fn controller() -> ViewController {
        let settings = ViewSettings { window_seconds: 10.0, ..ViewSettings::default() };
        let engine = AnnotationEngine::new(60.0, Categories::with_definitions([("Call", "#ff0000")]));
        ViewController::new(
            settings,
            4000.0,
            Viewport::new(W, H),
            engine,
            FrameRenderer::new(ColorMap::default(), None),
            30,
        )
    }

    fn tone(sample_rate: u32) -> SampleBuffer {
        let samples = (0..sample_rate).map(|i| (i as f32 * 0.2).sin()).collect();
        SampleBuffer::new(samples, sample_rate)
    }

    fn device_x(plot_x: f64) -> f64 {
        plot_x + 48.0
    }

    #[test]
    fn drag_on_empty_area_creates_and_requests_edit() {
        let mut c = controller();
        c.pointer_down(device_x(100.0), 10.0, PointerButton::Primary);
        c.pointer_move(device_x(200.0), 10.0);
        c.pointer_up(device_x(300.0), 10.0);

        let labels = c.engine().labels();
        assert_eq!(labels.len(), 1);
        assert!((labels[0].start - 1.0).abs() < 1e-9);
        assert!((labels[0].end - 3.0).abs() < 1e-9);

        let id = labels[0].id;
        let events = c.drain_events();
        assert!(events.contains(&ViewEvent::LabelsChanged));
        assert!(events.contains(&ViewEvent::SelectionChanged(Some(id))));
        assert_eq!(events.last(), Some(&ViewEvent::EditLabel(id)));
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn presses_on_the_axis_margin_are_ignored() {
        let mut c = controller();
        c.pointer_down(10.0, 10.0, PointerButton::Primary);
        c.pointer_up(device_x(300.0), 10.0);
        assert!(c.engine().labels().is_empty());
        // below the plot, on the time ruler
        c.pointer_down(device_x(100.0), H as f64 - 5.0, PointerButton::Primary);
        c.pointer_up(device_x(300.0), H as f64 - 5.0);
        assert!(c.engine().labels().is_empty());
    }

    #[test]
    fn blank_label_is_removed_when_editing_ends() {
        let mut c = controller();
        c.pointer_down(device_x(100.0), 10.0, PointerButton::Primary);
        c.pointer_up(device_x(300.0), 10.0);
        let id = c.engine().labels()[0].id;
        c.drain_events();

        c.commit_label_text(id);
        assert!(c.engine().labels().is_empty());
        let events = c.drain_events();
        assert!(events.contains(&ViewEvent::LabelsChanged));
        assert!(events.contains(&ViewEvent::SelectionChanged(None)));
    }

    #[test]
    fn ctrl_wheel_zooms_around_cursor() {
        let mut c = controller();
        c.view_mut().scroll_offset_px = 1000.0;
        let px = 250.0;
        let before = c.view().time_axis(1000.0).time_at(px);

        c.wheel(device_x(px), 50.0, 0.0, 100.0, Modifiers { ctrl: true });
        let after = c.view().time_axis(1000.0).time_at(px);
        assert!((before - after).abs() < 1e-9);
        assert!((c.view().window_seconds - 11.5).abs() < 1e-9);
        assert_eq!(c.drain_events(), vec![ViewEvent::ZoomChanged(c.view().window_seconds)]);
    }

    #[test]
    fn zoom_stops_at_limits_without_event() {
        let mut c = controller();
        c.set_window_seconds(60.0);
        c.drain_events();
        c.wheel(device_x(10.0), 50.0, 0.0, 500.0, Modifiers { ctrl: true });
        assert_eq!(c.view().window_seconds, 60.0);
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn plain_wheel_pans_and_clamps() {
        let mut c = controller();
        c.wheel(device_x(10.0), 50.0, 0.0, 300.0, Modifiers::default());
        assert_eq!(c.view().scroll_offset_px, 300.0);
        c.wheel(device_x(10.0), 50.0, 0.0, -1000.0, Modifiers::default());
        assert_eq!(c.view().scroll_offset_px, 0.0);
        c.wheel(device_x(10.0), 50.0, 0.0, 1.0e6, Modifiers::default());
        assert_eq!(c.view().scroll_offset_px, 5000.0);
    }

    #[test]
    fn secondary_drag_pans() {
        let mut c = controller();
        c.view_mut().scroll_offset_px = 500.0;
        c.pointer_down(device_x(400.0), 50.0, PointerButton::Secondary);
        c.pointer_move(device_x(300.0), 50.0);
        c.pointer_up(device_x(300.0), 50.0);
        assert_eq!(c.view().scroll_offset_px, 600.0);
        assert!(c.engine().labels().is_empty());
    }

    #[test]
    fn middle_click_deletes_label() {
        let mut c = controller();
        let id = c.engine_mut().add_label(1.0, 3.0, "1", None).unwrap();
        c.pointer_down(device_x(200.0), 10.0, PointerButton::Middle);
        assert!(c.engine().label(id).is_none());
        assert_eq!(c.drain_events(), vec![ViewEvent::LabelsChanged]);
    }

    #[test]
    fn dragging_a_label_reports_change() {
        let mut c = controller();
        let id = c.engine_mut().add_label(1.0, 3.0, "1", None).unwrap();
        c.pointer_down(device_x(200.0), 10.0, PointerButton::Primary);
        c.pointer_move(device_x(250.0), 10.0);
        c.pointer_up(device_x(250.0), 10.0);
        let label = c.engine().label(id).unwrap();
        assert!((label.start - 1.5).abs() < 1e-9);
        assert!((label.end - 3.5).abs() < 1e-9);
        let events = c.drain_events();
        assert_eq!(events, vec![ViewEvent::SelectionChanged(Some(id)), ViewEvent::LabelsChanged]);
    }

    #[test]
    fn playhead_follow_scrolls_view() {
        let mut c = controller();
        c.set_playhead(Some(5.0), true);
        assert_eq!(c.view().scroll_offset_px, 0.0);
        c.set_playhead(Some(9.5), true);
        let x = c.view().time_axis(1000.0).x_of(9.5);
        assert!((0.0..=900.0).contains(&x), "playhead at {x}");
        c.set_follow_playhead(false);
        c.set_playhead(Some(40.0), true);
        assert!(c.view().time_axis(1000.0).x_of(40.0) > 1000.0);
    }

    #[test]
    fn scroll_to_time_puts_time_at_left_edge() {
        let mut c = controller();
        c.scroll_to_time(12.0);
        assert_eq!(c.view().visible_range(1000.0).0, 12.0);
        c.scroll_to_time(59.0);
        assert_eq!(c.view().scroll_offset_px, 5000.0);
    }

    #[test]
    fn frame_is_only_produced_when_due() {
        let mut c = controller();
        let now = Instant::now();
        assert!(c.frame(now).is_some());
        assert!(c.frame(now).is_none());
        c.set_tone(1.2, 0.8);
        let frame = c.frame(now).unwrap();
        assert_eq!((frame.width, frame.height), (W, H));
    }

    #[test]
    fn load_resets_labels_and_waits_for_field() {
        let mut c = controller();
        c.engine_mut().add_label(1.0, 3.0, "0", Some("a".into())).unwrap();
        let samples: Vec<f32> = (0..16000).map(|i| (i as f32 * 0.2).sin()).collect();
        c.load(SampleBuffer::new(samples, 8000), AnalysisParams::new(256, 128)).unwrap();
        assert!(c.engine().labels().is_empty());
        assert_eq!(c.duration(), 2.0);
        assert!(matches!(c.wait_for_field(), FieldState::Ready(_)));
        assert!(c.view().max_freq <= 4000.0);
    }

    #[test]
    fn frequency_range_follows_each_file_nyquist() {
        let mut c = controller();
        c.load(tone(8000), AnalysisParams::new(256, 128)).unwrap();
        assert_eq!((c.view().min_freq, c.view().max_freq), (0.0, 4000.0));
        c.load(tone(44100), AnalysisParams::new(256, 128)).unwrap();
        assert_eq!((c.view().min_freq, c.view().max_freq), (0.0, 22050.0));
    }

    #[test]
    fn chosen_frequency_range_survives_reload() {
        let mut c = controller();
        assert!(c.set_frequency_range(100.0, 3000.0));
        c.load(tone(44100), AnalysisParams::new(256, 128)).unwrap();
        assert_eq!((c.view().min_freq, c.view().max_freq), (100.0, 3000.0));
        // clamped, not lost, on a file with a lower nyquist
        c.load(tone(4000), AnalysisParams::new(256, 128)).unwrap();
        assert_eq!((c.view().min_freq, c.view().max_freq), (100.0, 2000.0));
    }

    #[test]
    fn explicit_max_below_nyquist_is_kept() {
        let settings = ViewSettings { max_freq: Some(1500.0), ..ViewSettings::default() };
        let engine = AnnotationEngine::new(10.0, Categories::new());
        let mut c = ViewController::new(
            settings,
            22050.0,
            Viewport::new(W, H),
            engine,
            FrameRenderer::new(ColorMap::default(), None),
            30,
        );
        assert_eq!(c.view().max_freq, 1500.0);
        c.load(tone(44100), AnalysisParams::new(256, 128)).unwrap();
        assert_eq!(c.view().max_freq, 1500.0);
    }
}
