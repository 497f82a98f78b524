//! Tests for listener dispatch, filters, bounds checking and selection.

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_bridge::prelude::*;
use horizon_bridge::{HandleClass, NativeSignal};

fn headless() -> (DisplayRegistry, Display, HeadlessController, Shell) {
    let registry = DisplayRegistry::new();
    let toolkit = HeadlessToolkit::new();
    let controller = toolkit.controller();
    let display = Display::builder(&registry).toolkit(toolkit).build().unwrap();
    let shell = Shell::new(&display, Style::NONE).unwrap();
    (registry, display, controller, shell)
}

fn tagged(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Listener {
    let log = log.clone();
    Listener::from_fn(move |_| log.lock().push(tag))
}

#[test]
fn test_listeners_run_in_insertion_order() {
    let (_registry, display, _controller, shell) = headless();
    let combo = Combo::new(&shell, Style::DROP_DOWN).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = tagged(&log, "L1");
    let second = tagged(&log, "L2");
    let third = tagged(&log, "L3");
    for listener in [&first, &second, &third] {
        combo.add_listener(EventType::Modify, listener.clone()).unwrap();
    }

    combo
        .notify_listeners(EventType::Modify, Event::new(EventType::Modify))
        .unwrap();
    assert_eq!(*log.lock(), vec!["L1", "L2", "L3"]);

    log.lock().clear();
    combo.remove_listener(EventType::Modify, &second).unwrap();
    combo
        .notify_listeners(EventType::Modify, Event::new(EventType::Modify))
        .unwrap();
    assert_eq!(*log.lock(), vec!["L1", "L3"]);
    display.dispose().unwrap();
}

#[test]
fn test_duplicate_listener_runs_twice() {
    let (_registry, display, _controller, shell) = headless();
    let spinner = Spinner::new(&shell, Style::NONE).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let listener = tagged(&log, "twice");
    spinner.add_listener(EventType::Selection, listener.clone()).unwrap();
    spinner.add_listener(EventType::Selection, listener.clone()).unwrap();

    spinner
        .notify_listeners(EventType::Selection, Event::new(EventType::Selection))
        .unwrap();
    assert_eq!(log.lock().len(), 2);

    spinner.remove_listener(EventType::Selection, &listener).unwrap();
    assert!(spinner.is_listening(EventType::Selection).unwrap());
    display.dispose().unwrap();
}

#[test]
fn test_failing_listener_stops_delivery() {
    let (_registry, display, controller, shell) = headless();
    let combo = Combo::new(&shell, Style::DROP_DOWN).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    combo
        .add_listener(
            EventType::DefaultSelection,
            Listener::new(|_| Err(ListenerError::msg("rejected"))),
        )
        .unwrap();
    combo
        .add_listener(EventType::DefaultSelection, tagged(&log, "after"))
        .unwrap();

    let entry = controller.handles_of_class(HandleClass::Entry)[0];
    controller.emit(entry, NativeSignal::Activate);
    let result = display.read_and_dispatch();
    assert!(matches!(result, Err(Error::Listener(_))));
    assert!(log.lock().is_empty());

    // The loop keeps working after a failed turn.
    combo.add("next").unwrap();
    assert_eq!(combo.item_count().unwrap(), 1);
    display.dispose().unwrap();
}

#[test]
fn test_filter_can_veto_an_edit() {
    let (_registry, display, controller, shell) = headless();
    let combo = Combo::new(&shell, Style::DROP_DOWN).unwrap();
    combo.set_text("abc").unwrap();
    display
        .add_filter(
            EventType::Verify,
            Listener::from_fn(|event| {
                if event.text.chars().any(|c| c.is_ascii_digit()) {
                    event.doit = false;
                }
            }),
        )
        .unwrap();

    let entry = controller.handles_of_class(HandleClass::Entry)[0];
    controller.emit(
        entry,
        NativeSignal::Insert {
            text: "1".into(),
            position: 3,
        },
    );
    controller.emit(
        entry,
        NativeSignal::Insert {
            text: "d".into(),
            position: 3,
        },
    );
    while display.read_and_dispatch().unwrap() {}
    assert_eq!(combo.text().unwrap(), "abcd");
    display.dispose().unwrap();
}

#[test]
fn test_item_bounds() {
    let (_registry, display, _controller, shell) = headless();
    let combo = Combo::new(&shell, Style::DROP_DOWN).unwrap();
    combo.set_items(["a", "b", "c"]).unwrap();

    for index in 0..3 {
        assert!(combo.item(index).is_ok());
    }
    assert!(matches!(
        combo.item(3),
        Err(Error::InvalidRange { index: 3, len: 3 })
    ));
    assert!(matches!(
        combo.item(-1),
        Err(Error::InvalidRange { index: -1, len: 3 })
    ));

    let menu = Menu::new(&shell, Style::BAR).unwrap();
    MenuItem::new(&menu, Style::CASCADE).unwrap();
    assert!(menu.item(0).is_ok());
    assert!(matches!(menu.item(1), Err(Error::InvalidRange { .. })));
    display.dispose().unwrap();
}

#[test]
fn test_single_table_selection_round_trip() {
    let (_registry, display, _controller, shell) = headless();
    let table = Table::new(&shell, Style::SINGLE).unwrap();
    for label in ["a", "b", "c"] {
        TableItem::new(&table, Style::NONE)
            .unwrap()
            .set_text(label)
            .unwrap();
    }

    table.select(1).unwrap();
    assert_eq!(table.selection_index().unwrap(), 1);
    assert_eq!(table.selection().unwrap()[0].text().unwrap(), "b");

    table.deselect_all().unwrap();
    assert_eq!(table.selection_index().unwrap(), -1);
    display.dispose().unwrap();
}

#[test]
fn test_combo_selection_round_trip() {
    let (_registry, display, _controller, shell) = headless();
    let combo = Combo::new(&shell, Style::DROP_DOWN | Style::READ_ONLY).unwrap();
    combo.set_items(["a", "b", "c"]).unwrap();

    combo.select(1).unwrap();
    assert_eq!(combo.selection_index().unwrap(), 1);
    assert_eq!(combo.text().unwrap(), "b");

    combo.deselect_all().unwrap();
    assert_eq!(combo.selection_index().unwrap(), -1);
    display.dispose().unwrap();
}

#[test]
fn test_multi_table_range_beyond_rows() {
    let (_registry, display, _controller, shell) = headless();
    let table = Table::new(&shell, Style::MULTI).unwrap();
    for label in ["a", "b", "c"] {
        TableItem::new(&table, Style::NONE)
            .unwrap()
            .set_text(label)
            .unwrap();
    }

    table.set_selection_range(1, i32::MAX).unwrap();
    assert_eq!(table.selection_indices().unwrap(), vec![1, 2]);
    table.select_range(i32::MIN, i32::MAX).unwrap();
    assert_eq!(table.selection_count().unwrap(), 3);
    display.dispose().unwrap();
}
