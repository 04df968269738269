//! Element transform state registry
//!
//! Maps element identity to its `ElementTransformState`. Entries are created
//! lazily on first lookup and are never evicted: removing an element from the
//! stage just abandons its record. The registry is only ever consulted by key.

use crate::element::ElementId;
use crate::gesture::ElementTransformState;
use crate::stage::Stage;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct TransformRegistry {
    states: HashMap<ElementId, ElementTransformState>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly added manipulable element
    ///
    /// Returns false if the element isn't on the stage or isn't manipulable.
    pub fn register(&mut self, id: ElementId, stage: &Stage) -> bool {
        self.get_or_create(id, stage).is_some()
    }

    /// Look up an element's state, creating it on first use
    ///
    /// Only manipulable elements present on the stage get a state.
    pub fn get_or_create(&mut self, id: ElementId, stage: &Stage) -> Option<&mut ElementTransformState> {
        if !self.states.contains_key(&id) {
            let element = stage.element(&id)?;
            if !element.is_manipulable() {
                return None;
            }
            log::debug!("Tracking transform state for {} ({})", element.name, id);
            self.states.insert(id, ElementTransformState::new(id, stage));
        }
        self.states.get_mut(&id)
    }

    pub fn get(&self, id: &ElementId) -> Option<&ElementTransformState> {
        self.states.get(id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut ElementTransformState> {
        self.states.get_mut(id)
    }

    /// Whether the element currently has a gesture in progress
    pub fn is_gesture_active(&self, id: &ElementId) -> bool {
        self.states.get(id).is_some_and(ElementTransformState::is_active)
    }
}
