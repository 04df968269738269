//! Gesture dispatcher
//!
//! Routes pointer events to the hit tester, the per-element gesture state
//! machines and the resize handle. The dispatcher is the one context object
//! that owns all interaction state (registry, handle, active pointers), so
//! there is no global state; construct it once and call `teardown` when done.
//!
//! Only one element gesture is in flight at a time. Pointers pressed while a
//! gesture is active join it; the first two pointers in arrival order drive
//! multi-touch gestures.

use crate::config::EngineConfig;
use crate::element::ElementId;
use crate::geometry::{mean_pressure, PointerId, PointerSample};
use crate::gesture::{GestureKind, GestureUpdate};
use crate::handle::ResizeHandle;
use crate::hit_test::HitTester;
use crate::registry::TransformRegistry;
use crate::stage::Stage;
use crate::transform::{decompose, DecomposedTransform};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Phase of a pointer event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Input device that produced a pointer event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub kind: PointerKind,
    pub pointer: PointerSample,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, kind: PointerKind, id: u64, x: f64, y: f64) -> Self {
        Self {
            phase,
            kind,
            pointer: PointerSample::new(id, x, y),
        }
    }

    pub fn touch(phase: PointerPhase, id: u64, x: f64, y: f64) -> Self {
        Self::new(phase, PointerKind::Touch, id, x, y)
    }

    pub fn mouse(phase: PointerPhase, x: f64, y: f64) -> Self {
        Self::new(phase, PointerKind::Mouse, 0, x, y)
    }
}

/// Callbacks for application logic layered on top of the engine
///
/// Each receives the element and the decomposition of its current transform.
pub trait GestureObserver {
    fn on_start(&mut self, _element: ElementId, _transform: &DecomposedTransform) {}
    fn on_move(&mut self, _element: ElementId, _transform: &DecomposedTransform) {}
    fn on_end(&mut self, _element: ElementId, _transform: &DecomposedTransform) {}
}

/// Why a gesture was not started
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GestureRejected {
    /// The target is being resized through the handle
    HandleResizing,
}

/// What a dispatched event did
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DispatchOutcome {
    /// The event didn't concern any gesture
    Ignored,
    /// A press hit nothing interactable
    NoTarget,
    Rejected { reason: GestureRejected },
    Started {
        element: ElementId,
        kind: GestureKind,
        /// The target was cloned from a spawner for this press
        spawned: bool,
    },
    Transitioned { element: ElementId, kind: GestureKind },
    Updated { element: ElementId, update: GestureUpdate },
    Ended { element: ElementId, transform: DecomposedTransform },
    HandleStarted { element: ElementId },
    HandleDragged { element: ElementId, transform: DecomposedTransform },
    HandleReleased { element: ElementId, transform: DecomposedTransform },
}

#[derive(Clone, Copy, Debug)]
struct ActiveGesture {
    element: ElementId,
    /// Device of the pointer that started the gesture
    kind: PointerKind,
}

/// Interaction context: owns all gesture state for one stage
pub struct GestureDispatcher {
    config: EngineConfig,
    registry: TransformRegistry,
    handle: ResizeHandle,
    hit_tester: HitTester,

    /// Pointers taking part in the active gesture, in arrival order
    pointers: Vec<PointerSample>,
    active: Option<ActiveGesture>,

    /// Pointer driving the resize handle
    handle_pointer: Option<PointerId>,

    observers: Vec<Box<dyn GestureObserver>>,
}

impl GestureDispatcher {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: TransformRegistry::new(),
            handle: ResizeHandle::new(&config),
            hit_tester: HitTester::new(&config),
            pointers: Vec::new(),
            active: None,
            handle_pointer: None,
            observers: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn handle(&self) -> &ResizeHandle {
        &self.handle
    }

    pub fn hit_tester(&self) -> &HitTester {
        &self.hit_tester
    }

    /// Element with a gesture in flight, if any
    pub fn active_element(&self) -> Option<ElementId> {
        self.active.map(|a| a.element)
    }

    pub fn add_observer(&mut self, observer: Box<dyn GestureObserver>) {
        self.observers.push(observer);
    }

    /// Render-tree notification: a manipulable element was added
    pub fn element_added(&mut self, id: ElementId, stage: &Stage) -> bool {
        self.registry.register(id, stage)
    }

    /// Process one pointer event
    pub fn handle_event(&mut self, stage: &mut Stage, event: PointerEvent) -> DispatchOutcome {
        match event.phase {
            PointerPhase::Down => self.pointer_down(stage, event),
            PointerPhase::Move => self.pointer_move(stage, event.pointer),
            PointerPhase::Up | PointerPhase::Cancel => self.pointer_up(stage, event.pointer.id),
        }
    }

    /// The host lost focus or pointer capture: finish everything in flight
    pub fn focus_lost(&mut self, stage: &mut Stage) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        if let Some(id) = self.handle_pointer {
            outcomes.push(self.pointer_up(stage, id));
        }
        if self.active.is_some() {
            // Drop every pointer but the last so the final release ends the gesture
            while self.pointers.len() > 1 {
                self.pointers.remove(0);
            }
            if let Some(last) = self.pointers.first().map(|p| p.id) {
                outcomes.push(self.pointer_up(stage, last));
            }
        }
        outcomes
    }

    /// Commit anything in flight, detach the handle and clear interaction state
    pub fn teardown(&mut self, stage: &mut Stage) {
        self.focus_lost(stage);
        self.handle.detach();
        self.pointers.clear();
        self.active = None;
        self.handle_pointer = None;
    }

    fn pointer_down(&mut self, stage: &mut Stage, event: PointerEvent) -> DispatchOutcome {
        let sample = event.pointer;

        if let Some(active) = self.active {
            if self.pointers.iter().any(|p| p.id == sample.id) {
                return DispatchOutcome::Ignored;
            }
            let before = self.participating_ids();
            self.pointers.push(sample);
            return self.transition_if_changed(stage, active.element, &before);
        }

        if self.handle_pointer.is_none() && self.handle.grip_contains(sample.point) {
            match self.handle.begin(sample.point, stage, &self.registry) {
                Ok(()) => {
                    self.handle_pointer = Some(sample.id);
                    if let Some(element) = self.handle.attached() {
                        return DispatchOutcome::HandleStarted { element };
                    }
                }
                Err(reason) => log::debug!("Resize handle refused drag: {:?}", reason),
            }
        }

        let (target, spawned) = match self.resolve_target(stage, sample.point) {
            Some(found) => found,
            None => return DispatchOutcome::NoTarget,
        };

        if self.handle.is_resizing() && self.handle.attached() == Some(target) {
            log::debug!("Gesture on {} rejected: handle resize in progress", target);
            return DispatchOutcome::Rejected {
                reason: GestureRejected::HandleResizing,
            };
        }

        stage.set_z_index(&target, self.config.drag_z_index);
        self.pointers = vec![sample];
        let points = self.participating_points();

        let Some(state) = self.registry.get_or_create(target, stage) else {
            self.pointers.clear();
            return DispatchOutcome::NoTarget;
        };
        let Some(kind) = state.start(stage, &points, &self.config).map(|s| s.kind()) else {
            self.pointers.clear();
            return DispatchOutcome::NoTarget;
        };
        let baseline = decompose(state.base_matrix());

        self.active = Some(ActiveGesture {
            element: target,
            kind: event.kind,
        });

        if event.kind == PointerKind::Mouse && !self.handle.is_resizing() {
            self.handle.attach(target, stage);
        }

        for observer in &mut self.observers {
            observer.on_start(target, &baseline);
        }

        DispatchOutcome::Started {
            element: target,
            kind,
            spawned,
        }
    }

    fn pointer_move(&mut self, stage: &mut Stage, sample: PointerSample) -> DispatchOutcome {
        if self.handle_pointer == Some(sample.id) {
            let Some(element) = self.handle.attached() else {
                return DispatchOutcome::Ignored;
            };
            let Some(live) = self.handle.drag_to(sample.point, stage) else {
                return DispatchOutcome::Ignored;
            };
            let transform = decompose(live);
            for observer in &mut self.observers {
                observer.on_move(element, &transform);
            }
            return DispatchOutcome::HandleDragged { element, transform };
        }

        let Some(active) = self.active else {
            return DispatchOutcome::Ignored;
        };
        let Some(tracked) = self.pointers.iter_mut().find(|p| p.id == sample.id) else {
            return DispatchOutcome::Ignored;
        };
        *tracked = sample;

        let points = self.participating_points();
        let pressure = mean_pressure(&self.pointers[..self.pointers.len().min(2)]);
        let Some(state) = self.registry.get_mut(&active.element) else {
            return DispatchOutcome::Ignored;
        };
        let Some(update) = state.update(stage, &points, &self.config) else {
            return DispatchOutcome::Ignored;
        };
        let update = update.with_pressure(pressure);

        if self.handle.attached() == Some(active.element) {
            self.handle.update_position(stage);
        }

        let transform = decompose(update.matrix);
        for observer in &mut self.observers {
            observer.on_move(active.element, &transform);
        }

        DispatchOutcome::Updated {
            element: active.element,
            update,
        }
    }

    fn pointer_up(&mut self, stage: &mut Stage, id: PointerId) -> DispatchOutcome {
        if self.handle_pointer == Some(id) {
            self.handle_pointer = None;
            let Some(element) = self.handle.attached() else {
                return DispatchOutcome::Ignored;
            };
            let Some(committed) = self.handle.release(stage, &mut self.registry) else {
                return DispatchOutcome::Ignored;
            };
            let transform = decompose(committed);
            for observer in &mut self.observers {
                observer.on_end(element, &transform);
            }
            return DispatchOutcome::HandleReleased { element, transform };
        }

        let Some(active) = self.active else {
            return DispatchOutcome::Ignored;
        };
        let Some(index) = self.pointers.iter().position(|p| p.id == id) else {
            return DispatchOutcome::Ignored;
        };

        let before = self.participating_ids();
        self.pointers.remove(index);
        if !self.pointers.is_empty() {
            return self.transition_if_changed(stage, active.element, &before);
        }

        self.active = None;
        let committed = self
            .registry
            .get_mut(&active.element)
            .and_then(|state| state.end(stage, &self.config));
        stage.raise_to_top(&active.element);

        if active.kind == PointerKind::Mouse {
            self.handle.update_position(stage);
        } else if !self.handle.is_resizing() {
            // A resize driven by another pointer keeps its handle
            self.handle.detach();
        }

        let transform = committed.map(decompose).unwrap_or_default();
        for observer in &mut self.observers {
            observer.on_end(active.element, &transform);
        }

        DispatchOutcome::Ended {
            element: active.element,
            transform,
        }
    }

    /// Topmost of the hit-tested element and any spawner under the point
    ///
    /// A spawner on top is cloned and the clone becomes the target.
    fn resolve_target(&mut self, stage: &mut Stage, point: Point) -> Option<(ElementId, bool)> {
        let hit = self.hit_tester.find_topmost_at(stage, point);
        let template = stage.spawner_at(point);

        let spawner_on_top = match (hit, template) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(hit), Some(template)) => stacking_key(stage, &template) > stacking_key(stage, &hit),
        };
        if !spawner_on_top {
            return hit.map(|id| (id, false));
        }

        let Some(clone) = template.and_then(|t| stage.spawn_from(&t)) else {
            return hit.map(|id| (id, false));
        };
        self.registry.register(clone, stage);
        Some((clone, true))
    }

    fn transition_if_changed(
        &mut self,
        stage: &mut Stage,
        element: ElementId,
        before: &[PointerId],
    ) -> DispatchOutcome {
        if self.participating_ids() == before {
            return DispatchOutcome::Ignored;
        }

        let points = self.participating_points();
        let Some(state) = self.registry.get_mut(&element) else {
            return DispatchOutcome::Ignored;
        };
        match state.transition(stage, &points, &self.config) {
            Some(snapshot) => DispatchOutcome::Transitioned {
                element,
                kind: snapshot.kind(),
            },
            None => DispatchOutcome::Ignored,
        }
    }

    fn participating_ids(&self) -> Vec<PointerId> {
        self.pointers.iter().take(2).map(|p| p.id).collect()
    }

    fn participating_points(&self) -> Vec<Point> {
        self.pointers.iter().take(2).map(|p| p.point).collect()
    }
}

/// Stacking position: z-index, then most recently raised
fn stacking_key(stage: &Stage, id: &ElementId) -> Option<(i32, u64)> {
    stage.element(id).map(|e| (e.z_index, e.raise_seq))
}
