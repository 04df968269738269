//! Integration tests for the gesture dispatcher
//!
//! Feeds pointer event sequences through `GestureDispatcher` and checks
//! stacking order, spawner cloning, resize handle routing and observer
//! callbacks.

use kurbo::{Affine, Point, Rect};
use std::cell::RefCell;
use std::rc::Rc;
use touchstage_core::dispatcher::{
    DispatchOutcome, GestureDispatcher, GestureObserver, GestureRejected, PointerEvent, PointerPhase,
};
use touchstage_core::element::{Element, ElementId, ElementRole};
use touchstage_core::gesture::GestureKind;
use touchstage_core::stage::Stage;
use touchstage_core::transform::DecomposedTransform;
use touchstage_core::EngineConfig;

const EPS: f64 = 1e-9;

/// Records observer callbacks as (event, element, transform)
#[derive(Clone, Default)]
struct Recorder {
    calls: Rc<RefCell<Vec<(&'static str, ElementId, DecomposedTransform)>>>,
}

impl GestureObserver for Recorder {
    fn on_start(&mut self, element: ElementId, transform: &DecomposedTransform) {
        self.calls.borrow_mut().push(("start", element, *transform));
    }

    fn on_move(&mut self, element: ElementId, transform: &DecomposedTransform) {
        self.calls.borrow_mut().push(("move", element, *transform));
    }

    fn on_end(&mut self, element: ElementId, transform: &DecomposedTransform) {
        self.calls.borrow_mut().push(("end", element, *transform));
    }
}

/// Two overlapping cards and a spawner template off to the side
fn setup() -> (Stage, GestureDispatcher, ElementId, ElementId, ElementId) {
    let mut stage = Stage::new();
    let lower = stage.add_element(Element::new("lower", Rect::new(50.0, 50.0, 250.0, 250.0)).with_z_index(1));
    let upper = stage.add_element(Element::new("upper", Rect::new(200.0, 200.0, 300.0, 300.0)).with_z_index(2));
    let template = stage.add_element(
        Element::new("template", Rect::new(400.0, 400.0, 500.0, 500.0)).with_role(ElementRole::Spawner),
    );

    let mut dispatcher = GestureDispatcher::new(EngineConfig::default());
    for id in [lower, upper, template] {
        dispatcher.element_added(id, &stage);
    }
    (stage, dispatcher, lower, upper, template)
}

fn touch(phase: PointerPhase, id: u64, x: f64, y: f64) -> PointerEvent {
    PointerEvent::touch(phase, id, x, y)
}

fn mouse(phase: PointerPhase, x: f64, y: f64) -> PointerEvent {
    PointerEvent::mouse(phase, x, y)
}

#[test]
fn test_z_index_bookkeeping() {
    let (mut stage, mut dispatcher, lower, upper, _template) = setup();

    let started = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 1, 100.0, 100.0));
    assert_eq!(
        started,
        DispatchOutcome::Started {
            element: lower,
            kind: GestureKind::SingleTouch,
            spawned: false
        }
    );
    assert_eq!(stage.element(&lower).unwrap().z_index, 100_000);
    assert_eq!(dispatcher.active_element(), Some(lower));

    dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 1, 100.0, 100.0));
    assert_eq!(stage.element(&lower).unwrap().z_index, 3);
    assert_eq!(dispatcher.active_element(), None);

    // The previously lower card now wins the overlap
    let started = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 2, 225.0, 225.0));
    assert!(matches!(started, DispatchOutcome::Started { element, .. } if element == lower));
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 2, 225.0, 225.0));

    // Dragging the other card puts it on top again
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 3, 280.0, 280.0));
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 3, 280.0, 280.0));
    assert_eq!(stage.element(&upper).unwrap().z_index, 5);
}

#[test]
fn test_spawner_press_clones_and_drags_copy() {
    let (mut stage, mut dispatcher, _lower, _upper, template) = setup();

    let outcome = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 1, 450.0, 450.0));
    let DispatchOutcome::Started { element: clone, spawned, .. } = outcome else {
        panic!("expected a spawned gesture, got {:?}", outcome);
    };
    assert!(spawned);
    assert_ne!(clone, template);
    assert_eq!(stage.len(), 4);
    assert_eq!(stage.element(&clone).unwrap().role, ElementRole::Draggable);

    dispatcher.handle_event(&mut stage, touch(PointerPhase::Move, 1, 470.0, 430.0));
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 1, 470.0, 430.0));

    assert_eq!(stage.rendered_transform(&clone), Some(Affine::translate((20.0, -20.0))));
    assert_eq!(stage.rendered_transform(&template), Some(Affine::IDENTITY));
}

#[test]
fn test_press_on_nothing() {
    let (mut stage, mut dispatcher, _lower, _upper, _template) = setup();
    let outcome = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 1, 700.0, 10.0));
    assert_eq!(outcome, DispatchOutcome::NoTarget);
    assert_eq!(stage.len(), 3);
}

#[test]
fn test_mouse_keeps_handle_touch_detaches_it() {
    let (mut stage, mut dispatcher, lower, _upper, _template) = setup();

    dispatcher.handle_event(&mut stage, mouse(PointerPhase::Down, 100.0, 100.0));
    assert_eq!(dispatcher.handle().attached(), Some(lower));
    dispatcher.handle_event(&mut stage, mouse(PointerPhase::Move, 110.0, 100.0));
    assert_eq!(dispatcher.handle().placement().grip, Point::new(260.0, 250.0));
    dispatcher.handle_event(&mut stage, mouse(PointerPhase::Up, 110.0, 100.0));
    assert_eq!(dispatcher.handle().attached(), Some(lower));

    // A touch drag elsewhere leaves the handle parked once it ends
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 1, 120.0, 120.0));
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 1, 120.0, 120.0));
    assert_eq!(dispatcher.handle().attached(), None);
    assert_eq!(dispatcher.handle().placement().grip, EngineConfig::default().handle_offscreen);
}

#[test]
fn test_handle_resize_excludes_touch_gesture() {
    let (mut stage, mut dispatcher, lower, _upper, _template) = setup();

    // A click attaches the handle; its grip sits at the bottom-right corner (250, 250)
    dispatcher.handle_event(&mut stage, mouse(PointerPhase::Down, 100.0, 100.0));
    dispatcher.handle_event(&mut stage, mouse(PointerPhase::Up, 100.0, 100.0));

    let grabbed = dispatcher.handle_event(&mut stage, mouse(PointerPhase::Down, 250.0, 250.0));
    assert_eq!(grabbed, DispatchOutcome::HandleStarted { element: lower });

    let rejected = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 7, 100.0, 100.0));
    assert_eq!(
        rejected,
        DispatchOutcome::Rejected {
            reason: GestureRejected::HandleResizing
        }
    );
    assert_eq!(
        dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 7, 100.0, 100.0)),
        DispatchOutcome::Ignored
    );

    // Drag the grip to twice its distance from the center (150, 150)
    let dragged = dispatcher.handle_event(&mut stage, mouse(PointerPhase::Move, 350.0, 350.0));
    let DispatchOutcome::HandleDragged { transform, .. } = dragged else {
        panic!("expected a handle drag, got {:?}", dragged);
    };
    assert!((transform.scale - 2.0).abs() < EPS);
    assert!(transform.rotation.abs() < EPS);

    let released = dispatcher.handle_event(&mut stage, mouse(PointerPhase::Up, 350.0, 350.0));
    assert!(matches!(released, DispatchOutcome::HandleReleased { element, .. } if element == lower));
    assert!(!dispatcher.handle().is_resizing());

    // The element's state adopted the handle's result
    let baseline = dispatcher.registry().get(&lower).unwrap().base_matrix();
    assert_eq!(Some(baseline), stage.rendered_transform(&lower));

    // Touch works again once the resize is over
    let started = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 8, 150.0, 150.0));
    assert!(matches!(started, DispatchOutcome::Started { element, .. } if element == lower));
}

#[test]
fn test_observers_receive_decomposed_transforms() {
    let (mut stage, mut dispatcher, lower, _upper, _template) = setup();
    let recorder = Recorder::default();
    dispatcher.add_observer(Box::new(recorder.clone()));

    dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 1, 100.0, 100.0));
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Move, 1, 130.0, 140.0));
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Cancel, 1, 130.0, 140.0));

    let calls = recorder.calls.borrow();
    let names: Vec<_> = calls.iter().map(|(name, _, _)| *name).collect();
    assert_eq!(names, vec!["start", "move", "end"]);
    assert!(calls.iter().all(|(_, element, _)| *element == lower));

    let (_, _, start) = calls[0];
    assert_eq!(start, DecomposedTransform::default());
    let (_, _, end) = calls[2];
    assert_eq!(end.translation, kurbo::Vec2::new(30.0, 40.0));
    assert_eq!(end.scale, 1.0);
}

#[test]
fn test_pinch_through_dispatcher() {
    let (mut stage, mut dispatcher, lower, _upper, _template) = setup();

    dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 1, 100.0, 150.0));
    let joined = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 2, 200.0, 150.0));
    assert_eq!(
        joined,
        DispatchOutcome::Transitioned {
            element: lower,
            kind: GestureKind::MultiTouch
        }
    );

    dispatcher.handle_event(&mut stage, touch(PointerPhase::Move, 1, 50.0, 150.0));
    let outcome = dispatcher.handle_event(&mut stage, touch(PointerPhase::Move, 2, 250.0, 150.0));
    let DispatchOutcome::Updated { update, .. } = outcome else {
        panic!("expected an update, got {:?}", outcome);
    };
    assert!((update.scale - 2.0).abs() < EPS);

    let back_to_one = dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 1, 50.0, 150.0));
    assert_eq!(
        back_to_one,
        DispatchOutcome::Transitioned {
            element: lower,
            kind: GestureKind::SingleTouch
        }
    );

    let ended = dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 2, 250.0, 150.0));
    let DispatchOutcome::Ended { transform, .. } = ended else {
        panic!("expected the gesture to end, got {:?}", ended);
    };
    assert!((transform.scale - 2.0).abs() < EPS);
}

#[test]
fn test_focus_lost_commits_everything() {
    let (mut stage, mut dispatcher, lower, _upper, _template) = setup();

    dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 1, 100.0, 100.0));
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 2, 140.0, 100.0));
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Move, 2, 160.0, 100.0));

    let outcomes = dispatcher.focus_lost(&mut stage);
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], DispatchOutcome::Ended { element, .. } if element == lower));
    assert_eq!(dispatcher.active_element(), None);
    assert!(!dispatcher.registry().is_gesture_active(&lower));

    // Stray events for the lost pointers are ignored
    assert_eq!(
        dispatcher.handle_event(&mut stage, touch(PointerPhase::Move, 1, 0.0, 0.0)),
        DispatchOutcome::Ignored
    );
}

#[test]
fn test_teardown_parks_handle() {
    let (mut stage, mut dispatcher, _lower, _upper, _template) = setup();
    dispatcher.handle_event(&mut stage, mouse(PointerPhase::Down, 100.0, 100.0));
    dispatcher.teardown(&mut stage);

    assert_eq!(dispatcher.handle().attached(), None);
    assert_eq!(dispatcher.active_element(), None);
}

#[test]
fn test_touch_on_other_element_keeps_resize_alive() {
    let (mut stage, mut dispatcher, lower, upper, _template) = setup();

    dispatcher.handle_event(&mut stage, mouse(PointerPhase::Down, 100.0, 100.0));
    dispatcher.handle_event(&mut stage, mouse(PointerPhase::Up, 100.0, 100.0));
    let grabbed = dispatcher.handle_event(&mut stage, mouse(PointerPhase::Down, 250.0, 250.0));
    assert_eq!(grabbed, DispatchOutcome::HandleStarted { element: lower });

    // A touch drag on the other card starts and ends during the resize
    let started = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 4, 280.0, 280.0));
    assert!(matches!(started, DispatchOutcome::Started { element, .. } if element == upper));
    let ended = dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 4, 280.0, 280.0));
    assert!(matches!(ended, DispatchOutcome::Ended { element, .. } if element == upper));

    assert!(dispatcher.handle().is_resizing());
    assert_eq!(dispatcher.handle().attached(), Some(lower));

    let dragged = dispatcher.handle_event(&mut stage, mouse(PointerPhase::Move, 350.0, 350.0));
    let DispatchOutcome::HandleDragged { element, transform } = dragged else {
        panic!("expected a handle drag, got {:?}", dragged);
    };
    assert_eq!(element, lower);
    assert!((transform.scale - 2.0).abs() < EPS);

    let released = dispatcher.handle_event(&mut stage, mouse(PointerPhase::Up, 350.0, 350.0));
    assert!(matches!(released, DispatchOutcome::HandleReleased { element, .. } if element == lower));
}

#[test]
fn test_spawner_above_draggable_is_cloned() {
    let mut stage = Stage::new();
    let card = stage.add_element(Element::new("card", Rect::new(0.0, 0.0, 100.0, 100.0)).with_z_index(1));
    let template = stage.add_element(
        Element::new("template", Rect::new(50.0, 50.0, 150.0, 150.0))
            .with_role(ElementRole::Spawner)
            .with_z_index(2),
    );
    let mut dispatcher = GestureDispatcher::new(EngineConfig::default());
    dispatcher.element_added(card, &stage);

    // Overlap: the template is on top
    let outcome = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 1, 75.0, 75.0));
    let DispatchOutcome::Started { element, spawned, .. } = outcome else {
        panic!("expected a gesture, got {:?}", outcome);
    };
    assert!(spawned);
    assert_ne!(element, card);
    assert_ne!(element, template);
    dispatcher.handle_event(&mut stage, touch(PointerPhase::Up, 1, 75.0, 75.0));

    // Once the card is raised above the template, the card wins
    stage.set_z_index(&card, 10);
    let outcome = dispatcher.handle_event(&mut stage, touch(PointerPhase::Down, 2, 60.0, 60.0));
    assert_eq!(
        outcome,
        DispatchOutcome::Started {
            element: card,
            kind: GestureKind::SingleTouch,
            spawned: false
        }
    );
}

#[test]
fn test_updates_report_mean_pressure() {
    let (mut stage, mut dispatcher, _lower, _upper, _template) = setup();

    let mut first = touch(PointerPhase::Down, 1, 100.0, 150.0);
    first.pointer = first.pointer.with_pressure(0.2);
    dispatcher.handle_event(&mut stage, first);

    let mut moved = touch(PointerPhase::Move, 1, 110.0, 150.0);
    moved.pointer = moved.pointer.with_pressure(0.9);
    let DispatchOutcome::Updated { update, .. } = dispatcher.handle_event(&mut stage, moved) else {
        panic!("expected an update");
    };
    assert!((update.pressure - 0.9).abs() < EPS);

    let mut second = touch(PointerPhase::Down, 2, 200.0, 150.0);
    second.pointer = second.pointer.with_pressure(0.3);
    dispatcher.handle_event(&mut stage, second);

    let mut pressed = touch(PointerPhase::Move, 2, 210.0, 150.0);
    pressed.pointer = pressed.pointer.with_pressure(0.5);
    let DispatchOutcome::Updated { update, .. } = dispatcher.handle_event(&mut stage, pressed) else {
        panic!("expected an update");
    };
    assert!((update.pressure - 0.7).abs() < EPS);
}
