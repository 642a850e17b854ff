use super::axes::{frequency_ticks, time_ticks};
use super::color::{parse_hex_color, ColorMap};
use super::scale::{FrequencyAxis, TimeAxis};
use super::text::{fill_rect, TextOverlay};
use crate::annotate::layout::{label_rect, span_rect, LabelLayout, Rect};
use crate::annotate::{Label, LabelId};
use crate::audio::MagnitudeField;
use crate::view::state::ViewState;

const BACKGROUND: [u8; 4] = [12, 12, 16, 255];
const PLACEHOLDER: [u8; 4] = [36, 36, 44, 255];
const GUTTER: [u8; 4] = [24, 24, 30, 255];
const TICK: [u8; 4] = [170, 170, 180, 255];
const TICK_TEXT: [u8; 4] = [210, 210, 220, 255];
const PLAYHEAD: [u8; 4] = [255, 60, 60, 230];
const DRAFT: [u8; 4] = [255, 255, 255, 50];
const LABEL_FILL_ALPHA: u8 = 80;
const TICK_LEN: i32 = 6;

/// Device-pixel layout of the drawing surface: a frequency axis gutter on
/// the left, a time ruler along the bottom, the plot in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub axis_width: u32,
    pub ruler_height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            axis_width: 48,
            ruler_height: 20,
        }
    }

    pub fn plot_width(&self) -> u32 {
        self.width.saturating_sub(self.axis_width)
    }

    pub fn plot_height(&self) -> u32 {
        self.height.saturating_sub(self.ruler_height)
    }

    /// Convert device coordinates to plot coordinates.
    pub fn to_plot(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.axis_width as f64, y)
    }

    /// Whether a device point lies inside the plot (not on an axis).
    pub fn in_plot(&self, x: f64, y: f64) -> bool {
        let (px, py) = self.to_plot(x, y);
        px >= 0.0 && px < self.plot_width() as f64 && py >= 0.0 && py < self.plot_height() as f64
    }
}

/// RGBA8 pixel buffer, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&color);
        }
        Self { width, height, pixels }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(out)
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        fill_rect(&mut self.pixels, self.width, self.height, x, y, w, h, color);
    }
}

/// What the renderer has to draw from.
#[derive(Clone, Copy, Debug)]
pub enum FieldSource<'a> {
    Ready(&'a MagnitudeField),
    /// Analysis still running for the current load.
    Pending,
    /// Analysis failed or there is no input.
    Unavailable,
}

/// Annotation state drawn on top of the spectrogram.
#[derive(Clone, Copy, Debug)]
pub struct Overlay<'a> {
    pub labels: &'a [Label],
    pub selected: Option<LabelId>,
    pub draft: Option<(f64, f64)>,
    pub playhead: Option<f64>,
    pub layout: LabelLayout,
}

impl Default for Overlay<'_> {
    fn default() -> Self {
        Self {
            labels: &[],
            selected: None,
            draft: None,
            playhead: None,
            layout: LabelLayout::default(),
        }
    }
}

/// Projects a magnitude field through the current view onto a pixel buffer.
///
/// Rendering is a pure function of its inputs: same field, view, viewport
/// and overlay give the same pixels.
pub struct FrameRenderer {
    colormap: ColorMap,
    text: Option<TextOverlay>,
}

impl FrameRenderer {
    pub fn new(colormap: ColorMap, text: Option<TextOverlay>) -> Self {
        Self { colormap, text }
    }

    pub fn set_colormap(&mut self, colormap: ColorMap) {
        self.colormap = colormap;
    }

    pub fn render(
        &self,
        source: FieldSource<'_>,
        view: &ViewState,
        viewport: &Viewport,
        duration: f64,
        overlay: &Overlay<'_>,
    ) -> Frame {
        let mut frame = Frame::filled(viewport.width, viewport.height, BACKGROUND);
        let plot_w = viewport.plot_width();
        let plot_h = viewport.plot_height();
        if plot_w == 0 || plot_h == 0 {
            return frame;
        }

        let taxis = view.time_axis(plot_w as f64);
        let faxis = view.frequency_axis(plot_h as f64);

        match source {
            FieldSource::Ready(field) => {
                self.draw_field(&mut frame, field, view, viewport, &taxis, &faxis, duration)
            }
            FieldSource::Pending => self.draw_placeholder(&mut frame, viewport, "analyzing..."),
            FieldSource::Unavailable => {
                self.draw_placeholder(&mut frame, viewport, "visualization unavailable")
            }
        }

        self.draw_labels(&mut frame, viewport, &taxis, overlay);
        if let Some(t) = overlay.playhead {
            let x = viewport.axis_width as i32 + taxis.x_of(t).floor() as i32;
            frame.rect(x, 0, 2, plot_h as i32, PLAYHEAD);
        }
        self.draw_axes(&mut frame, viewport, &taxis, &faxis, duration);
        frame
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_field(
        &self,
        frame: &mut Frame,
        field: &MagnitudeField,
        view: &ViewState,
        viewport: &Viewport,
        taxis: &TimeAxis,
        faxis: &FrequencyAxis,
        duration: f64,
    ) {
        let plot_w = viewport.plot_width() as usize;
        let plot_h = viewport.plot_height() as usize;

        let columns: Vec<Option<usize>> = (0..plot_w)
            .map(|x| {
                let t = taxis.time_at(x as f64);
                if t > duration {
                    return None;
                }
                field.column_at_time(t)
            })
            .collect();
        let rows: Vec<usize> = (0..plot_h)
            .map(|y| field.row_at_frequency(faxis.frequency_at(y as f64)))
            .collect();

        let palette = self.tone_palette(view.contrast, view.intensity);

        let stride = frame.width as usize * 4;
        for (y, &row) in rows.iter().enumerate() {
            let line = y * stride;
            for (x, col) in columns.iter().enumerate() {
                let Some(col) = *col else { continue };
                let Some(v) = field.get(col, row) else { continue };
                let idx = line + (viewport.axis_width as usize + x) * 4;
                let [r, g, b] = palette[v as usize];
                frame.pixels[idx] = r;
                frame.pixels[idx + 1] = g;
                frame.pixels[idx + 2] = b;
                frame.pixels[idx + 3] = 255;
            }
        }
    }

    /// Stored intensity → RGB with contrast and brightness applied.
    fn tone_palette(&self, contrast: f64, intensity: f64) -> [[u8; 3]; 256] {
        let mut palette = [[0u8; 3]; 256];
        for (v, entry) in palette.iter_mut().enumerate() {
            let n = v as f64 / 255.0;
            let n = ((n - 0.5) * contrast + 0.5) * intensity;
            let level = (n * 255.0).round().clamp(0.0, 255.0) as u8;
            *entry = self.colormap.color_of(level);
        }
        palette
    }

    fn draw_placeholder(&self, frame: &mut Frame, viewport: &Viewport, message: &str) {
        let plot_w = viewport.plot_width() as i32;
        let plot_h = viewport.plot_height() as i32;
        frame.rect(viewport.axis_width as i32, 0, plot_w, plot_h, PLACEHOLDER);
        if let Some(text) = &self.text {
            let tw = text.measure_width(message) as i32;
            let x = viewport.axis_width as i32 + (plot_w - tw) / 2;
            let y = (plot_h - text.font_size() as i32) / 2;
            text.composite(&mut frame.pixels, frame.width, frame.height, message, x, y, TICK_TEXT);
        }
    }

    fn draw_labels(&self, frame: &mut Frame, viewport: &Viewport, taxis: &TimeAxis, overlay: &Overlay<'_>) {
        let ox = viewport.axis_width as f64;
        let plot_h = viewport.plot_height() as i32;

        if let Some((start, end)) = overlay.draft {
            let r = span_rect(start, end, 0, taxis, &overlay.layout);
            frame.rect((ox + r.x).floor() as i32, 0, r.w.ceil() as i32, plot_h, DRAFT);
        }

        // selected label last so it sits on top
        let ordered = overlay
            .labels
            .iter()
            .filter(|l| Some(l.id) != overlay.selected)
            .chain(overlay.labels.iter().filter(|l| Some(l.id) == overlay.selected));

        for label in ordered {
            let rect = label_rect(label, taxis, &overlay.layout);
            let rect = Rect { x: rect.x + ox, ..rect };
            if rect.right() < ox || rect.x > frame.width as f64 || rect.y > plot_h as f64 {
                continue;
            }
            let [r, g, b] = parse_hex_color(&label.color).unwrap_or([255, 255, 255]);
            let (x, y, w, h) = (
                rect.x.floor() as i32,
                rect.y.floor() as i32,
                rect.w.ceil() as i32,
                rect.h.ceil() as i32,
            );
            frame.rect(x, y, w, h, [r, g, b, LABEL_FILL_ALPHA]);

            let selected = Some(label.id) == overlay.selected;
            let border = if selected { 2 } else { 1 };
            let edge = [r, g, b, 255];
            frame.rect(x, y, w, border, edge);
            frame.rect(x, y + h - border, w, border, edge);
            frame.rect(x, y, border, h, edge);
            frame.rect(x + w - border, y, border, h, edge);
            if selected {
                let handle = overlay.layout.handle_px as i32;
                frame.rect(x - handle / 2, y, handle, h, [255, 255, 255, 160]);
                frame.rect(x + w - handle / 2, y, handle, h, [255, 255, 255, 160]);
            }

            if let Some(text) = &self.text {
                if !label.text.is_empty() {
                    text.composite(
                        &mut frame.pixels,
                        frame.width,
                        frame.height,
                        &label.text,
                        x + 4,
                        y + 1,
                        [255, 255, 255, 255],
                    );
                }
            }
        }
    }

    fn draw_axes(&self, frame: &mut Frame, viewport: &Viewport, taxis: &TimeAxis, faxis: &FrequencyAxis, duration: f64) {
        let axis_w = viewport.axis_width as i32;
        let plot_h = viewport.plot_height() as i32;
        let width = frame.width;
        let height = frame.height;

        frame.rect(0, 0, axis_w, height as i32, GUTTER);
        frame.rect(0, plot_h, width as i32, viewport.ruler_height as i32, GUTTER);

        for tick in frequency_ticks(faxis) {
            let y = (tick.pos.round() as i32).min(plot_h - 1);
            frame.rect(axis_w - TICK_LEN, y, TICK_LEN, 1, TICK);
            if let Some(text) = &self.text {
                let tw = text.measure_width(&tick.label) as i32;
                let ty = (y - text.font_size() as i32 / 2).clamp(0, (plot_h - text.font_size() as i32).max(0));
                text.composite(&mut frame.pixels, width, height, &tick.label, axis_w - TICK_LEN - 2 - tw, ty, TICK_TEXT);
            }
        }

        for tick in time_ticks(taxis, viewport.plot_width() as f64, duration) {
            let x = axis_w + tick.pos.round() as i32;
            frame.rect(x, plot_h, 1, TICK_LEN, TICK);
            if let Some(text) = &self.text {
                text.composite(&mut frame.pixels, width, height, &tick.label, x + 3, plot_h + 2, TICK_TEXT);
            }
        }
    }
}
