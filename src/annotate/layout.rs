use super::label::Label;
use crate::render::scale::TimeAxis;

/// Placement of label lanes inside the plot area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelLayout {
    /// Top of lane 0, in plot pixels.
    pub top: f64,
    pub lane_height: f64,
    /// Half-width of the grab zone around each label edge.
    pub handle_px: f64,
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self {
            top: 4.0,
            lane_height: 20.0,
            handle_px: 5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.y && y < self.bottom()
    }
}

/// Screen rectangle of a label span in plot coordinates.
pub fn span_rect(start: f64, end: f64, lane: usize, axis: &TimeAxis, layout: &LabelLayout) -> Rect {
    let x0 = axis.x_of(start);
    let x1 = axis.x_of(end);
    Rect {
        x: x0,
        y: layout.top + lane as f64 * layout.lane_height,
        w: (x1 - x0).max(1.0),
        h: layout.lane_height - 2.0,
    }
}

pub fn label_rect(label: &Label, axis: &TimeAxis, layout: &LabelLayout) -> Rect {
    span_rect(label.start, label.end, label.layer(), axis, layout)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitPart {
    Body,
    Handle(Edge),
}

/// Which part of `rect` the point `(x, y)` falls on, if any.
///
/// Edge zones extend `handle_px` to both sides of each edge; on labels too
/// narrow to hold both zones the nearer edge wins.
pub fn hit_rect(rect: &Rect, x: f64, y: f64, handle_px: f64) -> Option<HitPart> {
    if !rect.contains_y(y) {
        return None;
    }
    if x < rect.x - handle_px || x > rect.right() + handle_px {
        return None;
    }
    let to_start = (x - rect.x).abs();
    let to_end = (x - rect.right()).abs();
    if to_start <= handle_px || to_end <= handle_px {
        return Some(if to_start <= to_end {
            HitPart::Handle(Edge::Start)
        } else {
            HitPart::Handle(Edge::End)
        });
    }
    if x >= rect.x && x <= rect.right() {
        return Some(HitPart::Body);
    }
    None
}
