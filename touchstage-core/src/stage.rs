//! Stage: the engine's view of the host render tree
//!
//! Holds every element with its rendered transform and stacking order. The
//! engine writes transforms through `apply_transform`; the host drains
//! `take_dirty` before its next paint.

use crate::element::{Element, ElementId, ElementRole};
use kurbo::{Affine, Point, Rect};

/// Render tree model
#[derive(Clone, Debug, Default)]
pub struct Stage {
    /// Elements in insertion order
    elements: Vec<Element>,

    /// Highest resting z-index handed out so far
    max_z_index: i32,

    /// Counter behind `Element::raise_seq`
    raise_counter: u64,

    /// Elements whose transform changed since the last `take_dirty`
    dirty: Vec<ElementId>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, returning its ID
    pub fn add_element(&mut self, mut element: Element) -> ElementId {
        self.raise_counter += 1;
        element.raise_seq = self.raise_counter;
        self.max_z_index = self.max_z_index.max(element.z_index);
        let id = element.id;
        self.elements.push(element);
        id
    }

    /// Remove an element from the render tree
    ///
    /// Any transform state kept for it elsewhere is simply abandoned.
    pub fn remove_element(&mut self, id: &ElementId) -> Option<Element> {
        let index = self.elements.iter().position(|e| &e.id == id)?;
        self.dirty.retain(|d| d != id);
        Some(self.elements.remove(index))
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub fn element_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The transform the element is currently rendered with
    pub fn rendered_transform(&self, id: &ElementId) -> Option<Affine> {
        self.element(id).map(|e| e.transform)
    }

    /// Set an element's rendered transform; takes effect at the next paint
    ///
    /// Returns false if the element is not on the stage.
    pub fn apply_transform(&mut self, id: &ElementId, transform: Affine) -> bool {
        let Some(element) = self.element_mut(id) else {
            return false;
        };
        element.transform = transform;
        if !self.dirty.contains(id) {
            self.dirty.push(*id);
        }
        true
    }

    /// Drain the list of elements that need repainting
    pub fn take_dirty(&mut self) -> Vec<ElementId> {
        std::mem::take(&mut self.dirty)
    }

    pub fn screen_bounds(&self, id: &ElementId) -> Option<Rect> {
        self.element(id).map(Element::screen_bounds)
    }

    pub fn visual_center(&self, id: &ElementId) -> Option<Point> {
        self.element(id).map(Element::visual_center)
    }

    /// Set an element's z-index, marking it as the most recently raised
    pub fn set_z_index(&mut self, id: &ElementId, z_index: i32) -> bool {
        self.raise_counter += 1;
        let seq = self.raise_counter;
        let Some(element) = self.element_mut(id) else {
            return false;
        };
        element.z_index = z_index;
        element.raise_seq = seq;
        true
    }

    /// Give an element the next resting z-index, above everything placed so far
    pub fn raise_to_top(&mut self, id: &ElementId) -> Option<i32> {
        self.element(id)?;
        self.max_z_index += 1;
        let z = self.max_z_index;
        self.set_z_index(id, z);
        Some(z)
    }

    pub fn max_z_index(&self) -> i32 {
        self.max_z_index
    }

    /// Clone a spawner template into a new draggable element on top
    ///
    /// Returns None if the template doesn't exist or isn't a spawner.
    pub fn spawn_from(&mut self, template_id: &ElementId) -> Option<ElementId> {
        let template = self.element(template_id)?;
        if template.role != ElementRole::Spawner {
            return None;
        }

        let mut clone = template.clone();
        clone.id = ElementId::new();
        clone.role = ElementRole::Draggable;
        clone.name = format!("{} copy", template.name);
        self.max_z_index += 1;
        clone.z_index = self.max_z_index;

        log::debug!("Spawned {} ({}) from template {}", clone.name, clone.id, template_id);
        Some(self.add_element(clone))
    }

    /// Topmost spawner template under a point
    pub fn spawner_at(&self, point: Point) -> Option<ElementId> {
        self.elements
            .iter()
            .filter(|e| e.role == ElementRole::Spawner && e.covers(point))
            .max_by_key(|e| (e.z_index, e.raise_seq))
            .map(|e| e.id)
    }
}
