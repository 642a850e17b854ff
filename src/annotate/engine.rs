use super::category::{Categories, LabelConfig, DEFAULT_COLOR, DEFAULT_KEY};
use super::label::{clamp_span, Label, LabelId, MIN_LABEL_SECONDS};
use super::layering::{assign_lanes, lane_count};
use super::layout::{hit_rect, label_rect, Edge, HitPart, LabelLayout};
use crate::error::{EngineError, Result};
use crate::render::scale::TimeAxis;

/// Slack for comparing spans computed from pixel positions.
const SPAN_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// What to do with labels that reference a deleted category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryDeletion {
    /// Move them to the default category with the default color.
    Reassign,
    /// Delete them together with the category.
    Cascade,
}

/// Active pointer gesture. Only one runs at a time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    Idle,
    Creating { anchor: f64, current: f64 },
    Resizing { id: LabelId, edge: Edge },
    Dragging { id: LabelId, grab_offset: f64 },
}

/// Result of a pointer press, for the caller to react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    Ignored,
    BeganCreate,
    BeganResize(LabelId),
    BeganDrag(LabelId),
    Deleted(LabelId),
}

/// Label store, lane layout, category table and pointer state machine.
///
/// All mutation is synchronous; every change re-runs lane assignment so the
/// next render sees consistent layers.
#[derive(Debug)]
pub struct AnnotationEngine {
    labels: Vec<Label>,
    categories: Categories,
    duration: f64,
    next_id: u64,
    selected: Option<LabelId>,
    gesture: Gesture,
    lanes: usize,
}

impl AnnotationEngine {
    pub fn new(duration: f64, categories: Categories) -> Self {
        Self {
            labels: Vec::new(),
            categories,
            duration: duration.max(0.0),
            next_id: 1,
            selected: None,
            gesture: Gesture::Idle,
            lanes: 0,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Drop all labels and start over for a new file of `duration` seconds.
    pub fn reset(&mut self, duration: f64) {
        self.labels.clear();
        self.duration = duration.max(0.0);
        self.selected = None;
        self.gesture = Gesture::Idle;
        self.lanes = 0;
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Labels ordered by start time, then id.
    pub fn labels_by_start(&self) -> Vec<&Label> {
        let mut sorted: Vec<&Label> = self.labels.iter().collect();
        sorted.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.id.cmp(&b.id)));
        sorted
    }

    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.iter().find(|l| l.id == id)
    }

    pub fn lane_count(&self) -> usize {
        self.lanes
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn selected(&self) -> Option<LabelId> {
        self.selected
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Span of the label being drawn, if a create gesture is running.
    pub fn draft(&self) -> Option<(f64, f64)> {
        match self.gesture {
            Gesture::Creating { anchor, current } => Some((anchor.min(current), anchor.max(current))),
            _ => None,
        }
    }

    pub fn select(&mut self, id: Option<LabelId>) {
        self.selected = id.filter(|id| self.label(*id).is_some());
    }

    // ---- label mutations -------------------------------------------------

    /// Insert a label bound to category `config_key`. The span is clamped into
    /// `[0, duration]`; spans with no positive length are rejected.
    pub fn add_label(&mut self, start: f64, end: f64, config_key: &str, text: Option<String>) -> Result<LabelId> {
        let (start, end) = clamp_span(start, end, self.duration).ok_or_else(|| {
            EngineError::BoundsViolation(format!(
                "[{start}, {end}] has no extent inside [0, {}]",
                self.duration
            ))
        })?;
        let config = self.categories.resolve(config_key).clone();
        let text = text.unwrap_or_else(|| default_text_for(&config));
        let id = self.insert(start, end, &config, text);
        Ok(id)
    }

    fn insert(&mut self, start: f64, end: f64, config: &LabelConfig, text: String) -> LabelId {
        let id = LabelId(self.next_id);
        self.next_id += 1;
        self.labels.push(Label {
            id,
            config_id: config.key.clone(),
            start,
            end,
            text,
            color: config.color.clone(),
            layer: 0,
        });
        self.relayout();
        log::debug!("Label {} created [{:.3}, {:.3}] in category {}", id, start, end, config.key);
        id
    }

    /// Move both edges of a label, clamped into range. Returns false if the
    /// label is unknown or the clamped span is too short.
    pub fn set_label_span(&mut self, id: LabelId, start: f64, end: f64) -> bool {
        let Some((start, end)) = clamp_span(start, end, self.duration) else {
            return false;
        };
        if end - start < MIN_LABEL_SECONDS {
            return false;
        }
        let Some(label) = self.labels.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        label.start = start;
        label.end = end;
        self.relayout();
        true
    }

    pub fn delete_label(&mut self, id: LabelId) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l.id != id);
        if self.labels.len() == before {
            return false;
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        if matches!(self.gesture, Gesture::Resizing { id: g, .. } | Gesture::Dragging { id: g, .. } if g == id) {
            self.gesture = Gesture::Idle;
        }
        self.relayout();
        log::debug!("Label {} deleted", id);
        true
    }

    /// Change a label's text, re-binding it to the category whose name
    /// matches, or to the default category when nothing matches.
    pub fn set_label_text(&mut self, id: LabelId, text: &str) -> bool {
        let binding = self
            .categories
            .match_text(text)
            .cloned()
            .unwrap_or_else(|| self.categories.default_config().clone());
        let Some(label) = self.labels.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        label.text = text.to_string();
        if label.config_id != binding.key {
            log::debug!("Label {} re-bound {} -> {}", id, label.config_id, binding.key);
            label.config_id = binding.key;
            label.color = binding.color;
        }
        true
    }

    /// Finish editing a label's text. Labels left with blank text are deleted;
    /// returns true when that happened.
    pub fn commit_label_text(&mut self, id: LabelId) -> bool {
        let blank = self.label(id).is_some_and(|l| l.text.trim().is_empty());
        if blank {
            self.delete_label(id);
        }
        blank
    }

    /// Bind a label to a category, taking its color and (for non-default
    /// categories) its text.
    pub fn assign_category(&mut self, id: LabelId, key: &str) -> Result<()> {
        let config = self
            .categories
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCategory(key.to_string()))?;
        let label = self
            .labels
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| EngineError::BoundsViolation(format!("no label {id}")))?;
        if config.key != DEFAULT_KEY {
            label.text = config.text.clone();
        }
        label.config_id = config.key;
        label.color = config.color;
        Ok(())
    }

    // ---- categories ------------------------------------------------------

    pub fn set_active_category(&mut self, key: &str) -> Result<()> {
        self.categories.set_active(key)
    }

    pub fn add_category(&mut self, text: String, color: String) -> Result<String> {
        Ok(self.categories.add(text, color)?.key.clone())
    }

    /// Rename or recolor a category. Bound labels take the new color; those
    /// still showing the old name take the new name.
    pub fn update_category(&mut self, key: &str, text: String, color: String) -> Result<()> {
        let previous = self.categories.update(key, text, color)?;
        let current = self.categories.resolve(key).clone();
        for label in self.labels.iter_mut().filter(|l| l.config_id == key) {
            label.color = current.color.clone();
            if label.text.trim().eq_ignore_ascii_case(previous.text.trim()) {
                label.text = current.text.clone();
            }
        }
        Ok(())
    }

    /// Delete a category and apply `policy` to every label that references it.
    /// Labels of later categories follow their category's new key. Returns the
    /// number of labels reassigned or removed.
    pub fn delete_category(&mut self, key: &str, policy: CategoryDeletion) -> Result<usize> {
        let removal = self.categories.remove(key)?;
        let removed_key = removal.removed.key;

        let affected = self.labels.iter().filter(|l| l.config_id == removed_key).count();
        match policy {
            CategoryDeletion::Reassign => {
                for label in self.labels.iter_mut().filter(|l| l.config_id == removed_key) {
                    label.config_id = DEFAULT_KEY.to_string();
                    label.color = DEFAULT_COLOR.to_string();
                }
            }
            CategoryDeletion::Cascade => {
                self.labels.retain(|l| l.config_id != removed_key);
                if self.selected.is_some_and(|id| self.labels.iter().all(|l| l.id != id)) {
                    self.selected = None;
                }
                self.gesture = Gesture::Idle;
            }
        }

        for label in &mut self.labels {
            if let Some((_, new_key)) = removal.rekeyed.iter().find(|(old, _)| *old == label.config_id) {
                label.config_id = new_key.clone();
            }
        }

        self.relayout();
        log::info!(
            "Deleted category {:?} ({}), {} label(s) {}",
            removal.removed.text,
            removed_key,
            affected,
            match policy {
                CategoryDeletion::Reassign => "reassigned",
                CategoryDeletion::Cascade => "removed",
            }
        );
        Ok(affected)
    }

    // ---- pointer gestures ------------------------------------------------

    /// Topmost label part under plot point `(x, y)`. The selected label wins
    /// over overlapping ones.
    pub fn hit_test(&self, x: f64, y: f64, axis: &TimeAxis, layout: &LabelLayout) -> Option<(LabelId, HitPart)> {
        let hit = |label: &Label| hit_rect(&label_rect(label, axis, layout), x, y, layout.handle_px);
        if let Some(sel) = self.selected.and_then(|id| self.label(id)) {
            if let Some(part) = hit(sel) {
                return Some((sel.id, part));
            }
        }
        self.labels
            .iter()
            .rev()
            .find_map(|label| hit(label).map(|part| (label.id, part)))
    }

    /// Start a gesture at plot point `(x, y)`. Points left of the plot are the
    /// axis margin and never start a gesture.
    pub fn pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: PointerButton,
        axis: &TimeAxis,
        layout: &LabelLayout,
    ) -> PressOutcome {
        if x < 0.0 || y < 0.0 || self.duration <= 0.0 {
            return PressOutcome::Ignored;
        }
        let hit = self.hit_test(x, y, axis, layout);

        match (button, hit) {
            (PointerButton::Middle, Some((id, _))) => {
                self.delete_label(id);
                PressOutcome::Deleted(id)
            }
            (PointerButton::Primary, Some((id, HitPart::Handle(edge)))) => {
                self.selected = Some(id);
                self.gesture = Gesture::Resizing { id, edge };
                PressOutcome::BeganResize(id)
            }
            (PointerButton::Primary, Some((id, HitPart::Body))) => {
                self.selected = Some(id);
                let start = self.label(id).map_or(0.0, |l| l.start);
                self.gesture = Gesture::Dragging {
                    id,
                    grab_offset: axis.time_at(x) - start,
                };
                PressOutcome::BeganDrag(id)
            }
            (PointerButton::Primary, None) => {
                let t = axis.time_at(x).clamp(0.0, self.duration);
                self.selected = None;
                self.gesture = Gesture::Creating { anchor: t, current: t };
                PressOutcome::BeganCreate
            }
            _ => PressOutcome::Ignored,
        }
    }

    /// Update the running gesture for pointer column `x`. Returns true when
    /// anything visible changed.
    pub fn pointer_move(&mut self, x: f64, axis: &TimeAxis) -> bool {
        let t = axis.time_at(x);
        match self.gesture {
            Gesture::Idle => false,
            Gesture::Creating { anchor, .. } => {
                self.gesture = Gesture::Creating {
                    anchor,
                    current: t.clamp(0.0, self.duration),
                };
                true
            }
            Gesture::Resizing { id, edge } => self.resize_edge(id, edge, t),
            Gesture::Dragging { id, grab_offset } => self.drag_to(id, t - grab_offset),
        }
    }

    /// End the running gesture. Returns the id of a newly created label.
    pub fn pointer_up(&mut self, x: f64, axis: &TimeAxis) -> Option<LabelId> {
        self.pointer_move(x, axis);
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        let Gesture::Creating { anchor, current } = gesture else {
            return None;
        };

        if (current - anchor).abs() <= MIN_LABEL_SECONDS + SPAN_EPSILON {
            log::debug!("Discarding {:.3}s drag below creation threshold", (current - anchor).abs());
            return None;
        }
        let (start, end) = (anchor.min(current), anchor.max(current));
        let config = self.categories.active().clone();
        let text = default_text_for(&config);
        let id = self.insert(start, end, &config, text);
        self.selected = Some(id);
        Some(id)
    }

    pub fn cancel_gesture(&mut self) {
        self.gesture = Gesture::Idle;
    }

    fn resize_edge(&mut self, id: LabelId, edge: Edge, t: f64) -> bool {
        let duration = self.duration;
        let Some(label) = self.labels.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        match edge {
            Edge::Start => {
                let limit = label.end - MIN_LABEL_SECONDS;
                label.start = t.min(limit).max(0.0);
            }
            Edge::End => {
                let limit = label.start + MIN_LABEL_SECONDS;
                label.end = t.max(limit).min(duration);
            }
        }
        self.relayout();
        true
    }

    fn drag_to(&mut self, id: LabelId, start: f64) -> bool {
        let duration = self.duration;
        let Some(label) = self.labels.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        let length = label.duration();
        let start = start.min(duration - length).max(0.0);
        label.start = start;
        label.end = start + length;
        self.relayout();
        true
    }

    fn relayout(&mut self) {
        let spans: Vec<(f64, f64)> = self.labels.iter().map(|l| (l.start, l.end)).collect();
        let lanes = assign_lanes(&spans);
        for (label, lane) in self.labels.iter_mut().zip(lanes.iter()) {
            label.layer = *lane;
        }
        self.lanes = lane_count(&lanes);
    }
}

/// New labels carry their category's name, except the default category,
/// whose labels start blank so the user names them.
fn default_text_for(config: &LabelConfig) -> String {
    if config.key == DEFAULT_KEY {
        String::new()
    } else {
        config.text.clone()
    }
}
