//! Resize handle controller
//!
//! A single scale/rotate affix that follows whichever element is selected.
//! Dragging its grip scales and rotates the element about its visual center.
//! The handle drives the element's rendered transform directly instead of
//! going through the element's gesture state machine, and on release asks
//! that state to re-read its baseline from the stage.

use crate::config::EngineConfig;
use crate::element::ElementId;
use crate::geometry::{angle, distance};
use crate::registry::TransformRegistry;
use crate::stage::Stage;
use crate::transform::{compose, decompose};
use kurbo::{Affine, Point, Size, Vec2};
use serde::Serialize;

/// Where the handle is drawn
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HandlePlacement {
    /// Visual center of the attached element
    pub center: Point,
    /// Untransformed layout size of the element (scale is not applied)
    pub size: Size,
    /// Rotation of the element in radians
    pub rotation: f64,
    /// On-screen position of the grip (the element's bottom-right corner)
    pub grip: Point,
}

impl HandlePlacement {
    fn parked(at: Point) -> Self {
        Self {
            center: at,
            size: Size::ZERO,
            rotation: 0.0,
            grip: at,
        }
    }
}

/// Data captured when a handle drag begins
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandleDrag {
    pub start_point: Point,
    /// Visual center in screen space; distances and angles are measured from here
    pub center: Point,
    /// The same center in the element's local frame; the composition pivot
    pub local_pivot: Point,
    pub initial_matrix: Affine,
    pub initial_distance: f64,
    pub initial_angle: f64,
}

/// Why a handle drag could not begin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleRejection {
    /// The handle isn't attached to anything
    Detached,
    /// The attached element is in the middle of a touch or mouse gesture
    GestureActive,
    /// The attached element is no longer on the stage
    ElementMissing,
}

/// The shared resize handle
#[derive(Clone, Debug)]
pub struct ResizeHandle {
    attached: Option<ElementId>,
    drag: Option<HandleDrag>,
    placement: HandlePlacement,
    config: EngineConfig,
}

impl ResizeHandle {
    /// Create a detached handle parked off-screen
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            attached: None,
            drag: None,
            placement: HandlePlacement::parked(config.handle_offscreen),
            config: config.clone(),
        }
    }

    pub fn attached(&self) -> Option<ElementId> {
        self.attached
    }

    pub fn is_resizing(&self) -> bool {
        self.drag.is_some()
    }

    pub fn drag(&self) -> Option<&HandleDrag> {
        self.drag.as_ref()
    }

    pub fn placement(&self) -> HandlePlacement {
        self.placement
    }

    /// Bind the handle to an element and move it there
    ///
    /// Refused while a resize of a different element is in progress, or when
    /// the element isn't on the stage.
    pub fn attach(&mut self, id: ElementId, stage: &Stage) -> bool {
        if self.is_resizing() && self.attached != Some(id) {
            return false;
        }
        if stage.element(&id).is_none() {
            return false;
        }
        self.attached = Some(id);
        self.update_position(stage);
        true
    }

    /// Unbind and park the handle off-screen
    pub fn detach(&mut self) {
        if let Some(id) = self.attached.take() {
            log::debug!("Resize handle detached from {}", id);
        }
        self.drag = None;
        self.placement = HandlePlacement::parked(self.config.handle_offscreen);
    }

    /// Follow the attached element's current transform
    pub fn update_position(&mut self, stage: &Stage) {
        let Some(id) = self.attached else {
            return;
        };
        let Some(element) = stage.element(&id) else {
            // Element left the stage
            self.detach();
            return;
        };

        self.placement = HandlePlacement {
            center: element.visual_center(),
            size: element.layout_size(),
            rotation: decompose(element.transform).rotation,
            grip: element.screen_corner(),
        };
    }

    /// Whether a press at `point` lands on the grip
    pub fn grip_contains(&self, point: Point) -> bool {
        self.attached.is_some() && distance(point, self.placement.grip) <= self.config.handle_grip_radius
    }

    /// Begin a handle drag at `point`
    pub fn begin(
        &mut self,
        point: Point,
        stage: &Stage,
        registry: &TransformRegistry,
    ) -> Result<(), HandleRejection> {
        let id = self.attached.ok_or(HandleRejection::Detached)?;
        if registry.is_gesture_active(&id) {
            return Err(HandleRejection::GestureActive);
        }
        let element = stage.element(&id).ok_or(HandleRejection::ElementMissing)?;

        let center = element.visual_center();
        let raw_distance = distance(center, point);
        self.drag = Some(HandleDrag {
            start_point: point,
            center,
            local_pivot: element.layout_rect.center(),
            initial_matrix: element.transform,
            initial_distance: raw_distance.max(self.config.min_pinch_distance),
            initial_angle: angle(center, point),
        });
        log::debug!("Resize handle drag started on {} at ({:.1}, {:.1})", id, point.x, point.y);
        Ok(())
    }

    /// Scale and rotate the attached element for a pointer at `point`
    ///
    /// Returns the transform pushed to the stage, or None when not resizing.
    pub fn drag_to(&mut self, point: Point, stage: &mut Stage) -> Option<Affine> {
        let drag = self.drag?;
        let id = self.attached?;

        let scale = self.config.clamp_scale(distance(drag.center, point) / drag.initial_distance);
        let rotation = angle(drag.center, point) - drag.initial_angle;
        let live = drag.initial_matrix * compose(Some(drag.local_pivot), rotation, scale, Vec2::ZERO);

        log::trace!("Resize handle drag: scale={:.3} rotation={:.2}°", scale, rotation.to_degrees());
        stage.apply_transform(&id, live);
        self.update_position(stage);
        Some(live)
    }

    /// Finish a handle drag and let the element adopt the rendered result
    pub fn release(&mut self, stage: &Stage, registry: &mut TransformRegistry) -> Option<Affine> {
        self.drag.take()?;
        let id = self.attached?;
        let state = registry.get_or_create(id, stage)?;
        state.sync_from_rendered(stage);
        log::debug!("Resize handle drag released on {}", id);
        Some(state.base_matrix())
    }
}
