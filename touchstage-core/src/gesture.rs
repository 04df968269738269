//! Per-element gesture state machine
//!
//! An `ElementTransformState` holds an element's committed transform and, while
//! a gesture is in progress, a `GestureSnapshot` describing it. Pointer moves
//! are composed onto the snapshot's `initial_matrix` and pushed to the stage;
//! ending the gesture commits the live transform as the new baseline.
//!
//! States are `Idle` (no snapshot), single-touch and multi-touch. A change in
//! pointer count mid-gesture is a *transition*: the live transform becomes the
//! new initial matrix and a fresh snapshot is built from the current pointers,
//! so the element does not jump.

use crate::config::EngineConfig;
use crate::element::ElementId;
use crate::geometry::{angle, distance, midpoint, DEFAULT_PRESSURE};
use crate::stage::Stage;
use crate::transform::compose;
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Gesture classification by pointer count
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GestureKind {
    SingleTouch,
    MultiTouch,
}

impl GestureKind {
    /// One pointer drags; two or more pinch/rotate. No pointers, no gesture.
    pub fn for_pointer_count(count: usize) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(GestureKind::SingleTouch),
            _ => Some(GestureKind::MultiTouch),
        }
    }
}

/// Working state of an in-progress gesture
#[derive(Clone, Debug, PartialEq)]
pub enum GestureSnapshot {
    SingleTouch {
        start_point: Point,
        last_known_point: Point,
        /// Visual center of the element when the gesture started
        element_start: Point,
        initial_matrix: Affine,
    },
    MultiTouch {
        start_midpoint: Point,
        /// Never below `EngineConfig::min_pinch_distance`
        start_distance: f64,
        start_angle: f64,
        last_known_points: [Point; 2],
        /// False while the pointers have not yet been far enough apart to
        /// define a distance and angle
        anchored: bool,
        initial_matrix: Affine,
    },
}

/// Result of one gesture update
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GestureUpdate {
    pub kind: GestureKind,
    /// Pointer (or midpoint) movement since the snapshot was taken
    pub translation: Vec2,
    pub scale: f64,
    /// Rotation delta in radians
    pub rotation: f64,
    /// Pivot of the scale/rotation; the current midpoint for multi touch
    pub pivot: Option<Point>,
    /// Live transform pushed to the stage
    pub matrix: Affine,
    /// Mean pressure of the participating pointers
    pub pressure: f64,
}

impl GestureUpdate {
    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = pressure;
        self
    }
}

impl GestureSnapshot {
    /// Build a snapshot of the type matching `points.len()`
    pub fn begin(
        points: &[Point],
        initial_matrix: Affine,
        element_start: Point,
        config: &EngineConfig,
    ) -> Option<Self> {
        match points {
            [] => None,
            [p] => Some(GestureSnapshot::SingleTouch {
                start_point: *p,
                last_known_point: *p,
                element_start,
                initial_matrix,
            }),
            [p0, p1, ..] => {
                let raw_distance = distance(*p0, *p1);
                let anchored = raw_distance >= config.min_pinch_distance;
                Some(GestureSnapshot::MultiTouch {
                    start_midpoint: midpoint(*p0, *p1),
                    start_distance: raw_distance.max(config.min_pinch_distance),
                    start_angle: if anchored { angle(*p0, *p1) } else { 0.0 },
                    last_known_points: [*p0, *p1],
                    anchored,
                    initial_matrix,
                })
            }
        }
    }

    pub fn kind(&self) -> GestureKind {
        match self {
            GestureSnapshot::SingleTouch { .. } => GestureKind::SingleTouch,
            GestureSnapshot::MultiTouch { .. } => GestureKind::MultiTouch,
        }
    }

    pub fn initial_matrix(&self) -> Affine {
        match self {
            GestureSnapshot::SingleTouch { initial_matrix, .. }
            | GestureSnapshot::MultiTouch { initial_matrix, .. } => *initial_matrix,
        }
    }

    /// Live transform at the last known pointer positions
    pub fn live_matrix(&self, config: &EngineConfig) -> Affine {
        match self {
            GestureSnapshot::SingleTouch { last_known_point, .. } => {
                self.evaluate(&[*last_known_point], config).matrix
            }
            GestureSnapshot::MultiTouch { last_known_points, .. } => {
                self.evaluate(last_known_points, config).matrix
            }
        }
    }

    /// Move the gesture to new pointer positions
    ///
    /// `points` must match the snapshot type (one point for single touch, at
    /// least two for multi touch); extra points are ignored.
    fn advance(&mut self, points: &[Point], config: &EngineConfig) -> GestureUpdate {
        match self {
            GestureSnapshot::SingleTouch { last_known_point, .. } => {
                *last_known_point = points[0];
            }
            GestureSnapshot::MultiTouch {
                start_distance,
                start_angle,
                last_known_points,
                anchored,
                ..
            } => {
                let (p0, p1) = (points[0], points[1]);
                if !*anchored {
                    let d = distance(p0, p1);
                    if d >= config.min_pinch_distance {
                        log::debug!("Pinch anchored at distance {:.2}", d);
                        *start_distance = d;
                        *start_angle = angle(p0, p1);
                        *anchored = true;
                    }
                }
                *last_known_points = [p0, p1];
            }
        }
        self.evaluate(points, config)
    }

    fn evaluate(&self, points: &[Point], config: &EngineConfig) -> GestureUpdate {
        match self {
            GestureSnapshot::SingleTouch {
                start_point,
                initial_matrix,
                ..
            } => {
                let translation = points[0] - *start_point;
                GestureUpdate {
                    kind: GestureKind::SingleTouch,
                    translation,
                    scale: 1.0,
                    rotation: 0.0,
                    pivot: None,
                    matrix: *initial_matrix * Affine::translate(translation),
                    pressure: DEFAULT_PRESSURE,
                }
            }
            GestureSnapshot::MultiTouch {
                start_midpoint,
                start_distance,
                start_angle,
                anchored,
                initial_matrix,
                ..
            } => {
                let (p0, p1) = (points[0], points[1]);
                let current_midpoint = midpoint(p0, p1);
                let (scale, rotation) = if *anchored {
                    (
                        config.clamp_scale(distance(p0, p1) / *start_distance),
                        angle(p0, p1) - *start_angle,
                    )
                } else {
                    (1.0, 0.0)
                };
                let translation = current_midpoint - *start_midpoint;

                // Pivot on the current midpoint so the content stays under the fingers
                let gesture = compose(Some(current_midpoint), rotation, scale, translation);
                GestureUpdate {
                    kind: GestureKind::MultiTouch,
                    translation,
                    scale,
                    rotation,
                    pivot: Some(current_midpoint),
                    matrix: *initial_matrix * gesture,
                    pressure: DEFAULT_PRESSURE,
                }
            }
        }
    }
}

/// Transform state of one manipulable element
#[derive(Clone, Debug)]
pub struct ElementTransformState {
    element_id: ElementId,

    /// Committed, at-rest transform
    base_matrix: Affine,

    /// Present only while a gesture is in progress
    gesture: Option<GestureSnapshot>,
}

impl ElementTransformState {
    /// Create state for an element, adopting its rendered transform
    pub fn new(element_id: ElementId, stage: &Stage) -> Self {
        Self {
            element_id,
            base_matrix: stage.rendered_transform(&element_id).unwrap_or(Affine::IDENTITY),
            gesture: None,
        }
    }

    pub fn element_id(&self) -> ElementId {
        self.element_id
    }

    pub fn base_matrix(&self) -> Affine {
        self.base_matrix
    }

    pub fn gesture(&self) -> Option<&GestureSnapshot> {
        self.gesture.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Live transform if a gesture is in progress, otherwise the baseline
    pub fn live_matrix(&self, config: &EngineConfig) -> Affine {
        match &self.gesture {
            Some(snapshot) => snapshot.live_matrix(config),
            None => self.base_matrix,
        }
    }

    /// Re-read the baseline from the stage, discarding drift
    pub fn sync_from_rendered(&mut self, stage: &Stage) {
        if let Some(rendered) = stage.rendered_transform(&self.element_id) {
            self.base_matrix = rendered;
        }
    }

    /// Start a gesture from the given pointer positions
    ///
    /// Returns None (and stays idle) when `points` is empty.
    pub fn start(
        &mut self,
        stage: &Stage,
        points: &[Point],
        config: &EngineConfig,
    ) -> Option<&GestureSnapshot> {
        self.sync_from_rendered(stage);
        let element_start = stage
            .visual_center(&self.element_id)
            .unwrap_or_else(|| self.base_matrix * Point::ORIGIN);

        self.gesture = GestureSnapshot::begin(points, self.base_matrix, element_start, config);
        if let Some(snapshot) = &self.gesture {
            log::debug!(
                "Gesture start on {}: {:?} with {} pointer(s)",
                self.element_id,
                snapshot.kind(),
                points.len()
            );
        }
        self.gesture.as_ref()
    }

    /// Reclassify an in-flight gesture after the pointer set changed
    ///
    /// The live transform becomes the new initial matrix. With no pointers
    /// left this ends the gesture. No-op when idle.
    pub fn transition(
        &mut self,
        stage: &mut Stage,
        points: &[Point],
        config: &EngineConfig,
    ) -> Option<&GestureSnapshot> {
        if points.is_empty() {
            self.end(stage, config);
            return None;
        }

        let previous = self.gesture.as_ref()?;
        let live = previous.live_matrix(config);
        let from = previous.kind();
        let element_start = stage
            .visual_center(&self.element_id)
            .unwrap_or_else(|| live * Point::ORIGIN);

        self.gesture = GestureSnapshot::begin(points, live, element_start, config);
        if let Some(snapshot) = &self.gesture {
            log::debug!(
                "Gesture transition on {}: {:?} -> {:?}",
                self.element_id,
                from,
                snapshot.kind()
            );
        }
        self.gesture.as_ref()
    }

    /// Recompute the live transform for new pointer positions and push it to the stage
    ///
    /// Returns None when no gesture is active or there are no pointers. If the
    /// pointer count no longer matches the gesture type, transitions first.
    pub fn update(
        &mut self,
        stage: &mut Stage,
        points: &[Point],
        config: &EngineConfig,
    ) -> Option<GestureUpdate> {
        let kind = self.gesture.as_ref()?.kind();
        let wanted = GestureKind::for_pointer_count(points.len())?;
        if kind != wanted {
            self.transition(stage, points, config);
        }

        let update = self.gesture.as_mut()?.advance(points, config);
        log::trace!(
            "Gesture update on {}: translation=({:.2}, {:.2}) scale={:.3} rotation={:.2}°",
            self.element_id,
            update.translation.x,
            update.translation.y,
            update.scale,
            update.rotation.to_degrees()
        );
        stage.apply_transform(&self.element_id, update.matrix);
        Some(update)
    }

    /// Commit the live transform as the new baseline and return to idle
    ///
    /// Returns the committed transform, or None when no gesture was active.
    pub fn end(&mut self, stage: &mut Stage, config: &EngineConfig) -> Option<Affine> {
        let snapshot = self.gesture.take()?;
        let committed = snapshot.live_matrix(config);
        stage.apply_transform(&self.element_id, committed);
        self.base_matrix = committed;
        log::debug!("Gesture end on {}: {:?}", self.element_id, committed.as_coeffs());
        Some(committed)
    }
}
