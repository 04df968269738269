//! Replay runner
//!
//! Feeds a script's events through a `GestureDispatcher` and collects one
//! record per event: what the dispatcher did and what the observers saw.

use crate::script::Script;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use touchstage_core::dispatcher::{DispatchOutcome, GestureDispatcher, GestureObserver, PointerEvent};
use touchstage_core::element::ElementId;
use touchstage_core::stage::Stage;
use touchstage_core::transform::{decompose, DecomposedTransform};
use touchstage_core::EngineConfig;

/// One observer callback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub callback: &'static str,
    pub element: ElementId,
    pub transform: DecomposedTransform,
}

/// Output record for one replayed event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: usize,
    pub event: PointerEvent,
    pub outcome: DispatchOutcome,
    pub observed: Vec<Observation>,
}

/// Final placement of one element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSummary {
    pub id: ElementId,
    pub name: String,
    pub z_index: i32,
    pub transform: DecomposedTransform,
}

#[derive(Clone, Default)]
struct ObservationLog {
    entries: Rc<RefCell<Vec<Observation>>>,
}

impl ObservationLog {
    fn push(&self, callback: &'static str, element: ElementId, transform: &DecomposedTransform) {
        self.entries.borrow_mut().push(Observation {
            callback,
            element,
            transform: *transform,
        });
    }

    fn drain(&self) -> Vec<Observation> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

impl GestureObserver for ObservationLog {
    fn on_start(&mut self, element: ElementId, transform: &DecomposedTransform) {
        self.push("onStart", element, transform);
    }

    fn on_move(&mut self, element: ElementId, transform: &DecomposedTransform) {
        self.push("onMove", element, transform);
    }

    fn on_end(&mut self, element: ElementId, transform: &DecomposedTransform) {
        self.push("onEnd", element, transform);
    }
}

/// Replays scripted events against a stage
pub struct Replay {
    stage: Stage,
    dispatcher: GestureDispatcher,
    log: ObservationLog,
}

impl Replay {
    pub fn new(stage: Stage, config: EngineConfig) -> Self {
        let log = ObservationLog::default();
        let mut dispatcher = GestureDispatcher::new(config);
        dispatcher.add_observer(Box::new(log.clone()));

        let ids: Vec<ElementId> = stage.elements().iter().map(|e| e.id).collect();
        for id in ids {
            dispatcher.element_added(id, &stage);
        }

        Self { stage, dispatcher, log }
    }

    /// Dispatch every event of the script, in order
    pub fn run(&mut self, script: &Script) -> Vec<StepRecord> {
        script
            .events
            .iter()
            .enumerate()
            .map(|(step, event)| self.step(step, *event))
            .collect()
    }

    pub fn step(&mut self, step: usize, event: PointerEvent) -> StepRecord {
        let outcome = self.dispatcher.handle_event(&mut self.stage, event);
        // The host would repaint here
        self.stage.take_dirty();
        StepRecord {
            step,
            event,
            outcome,
            observed: self.log.drain(),
        }
    }

    /// Commit anything still in flight and report where every element ended up
    pub fn finish(mut self) -> Vec<ElementSummary> {
        self.dispatcher.teardown(&mut self.stage);
        self.log.drain();

        self.stage
            .elements()
            .iter()
            .map(|e| ElementSummary {
                id: e.id,
                name: e.name.clone(),
                z_index: e.z_index,
                transform: decompose(e.transform),
            })
            .collect()
    }
}
