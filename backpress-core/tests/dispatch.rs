use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use backpress_core::{
    BackPressCategory, BackPressConfig, BackPressHandler, BackPressManager, BackPressSignal,
    CategoryMetricIds, DispatchOptions, InMemoryMetricsRecorder, handler,
};

/// Counts presses through a shared counter so the test keeps no handle to
/// the handler itself.
struct Feature {
    signal: BackPressSignal,
    presses: Arc<AtomicUsize>,
}

impl BackPressHandler for Feature {
    fn handle_back_press(&mut self) {
        self.presses.fetch_add(1, Ordering::Relaxed);
    }

    fn back_press_signal(&self) -> BackPressSignal {
        self.signal.clone()
    }

    fn name(&self) -> &'static str {
        "feature"
    }
}

fn register(
    manager: &BackPressManager,
    category: BackPressCategory,
    wants: bool,
) -> (BackPressSignal, Arc<AtomicUsize>) {
    let signal = BackPressSignal::new(wants);
    let presses = Arc::new(AtomicUsize::new(0));
    manager
        .register_handler(
            category,
            handler::shared(Feature {
                signal: signal.clone(),
                presses: Arc::clone(&presses),
            }),
        )
        .unwrap();
    (signal, presses)
}

#[test]
fn test_host_intercepts_only_while_armed() {
    let metrics = Arc::new(InMemoryMetricsRecorder::new());
    let manager = BackPressManager::new(CategoryMetricIds::new(), metrics.clone());

    let intercepting = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&intercepting);
    manager
        .armed_signal()
        .subscribe(move |armed| flag.store(usize::from(armed), Ordering::Relaxed));

    let (sheet, sheet_presses) = register(&manager, BackPressCategory::BottomSheet, false);
    let (find, find_presses) = register(&manager, BackPressCategory::FindToolbar, false);
    assert_eq!(intercepting.load(Ordering::Relaxed), 0);

    // The user opens find-in-page, then a bottom sheet on top of it.
    find.set(true);
    sheet.set(true);
    assert_eq!(intercepting.load(Ordering::Relaxed), 1);

    assert_eq!(manager.dispatch(), Some(BackPressCategory::BottomSheet));
    sheet.set(false);
    assert_eq!(manager.dispatch(), Some(BackPressCategory::FindToolbar));
    find.set(false);

    assert_eq!(intercepting.load(Ordering::Relaxed), 0);
    assert!(!manager.is_armed());
    assert_eq!(sheet_presses.load(Ordering::Relaxed), 1);
    assert_eq!(find_presses.load(Ordering::Relaxed), 1);

    let samples: Vec<i32> = metrics.samples().into_iter().map(|s| s.sample).collect();
    assert_eq!(samples, vec![5, 13]);
}

#[test]
fn test_config_drives_metric_ids_and_options() {
    let mut overrides = BTreeMap::new();
    overrides.insert("tab-switcher".to_string(), 42);

    let config = BackPressConfig {
        histogram_name: "Test.BackPress".to_string(),
        predictive_back: false,
        metric_ids: overrides,
        ..BackPressConfig::default()
    };

    let metrics = Arc::new(InMemoryMetricsRecorder::new());
    let manager = BackPressManager::new(config.metric_ids().unwrap(), metrics.clone())
        .with_options(config.dispatch_options());
    register(&manager, BackPressCategory::TabSwitcher, true);

    assert_eq!(manager.on_back_started(Default::default()), None);
    assert_eq!(manager.dispatch(), Some(BackPressCategory::TabSwitcher));
    assert_eq!(metrics.count("Test.BackPress", 42), 1);
    assert_eq!(
        manager.options(),
        &DispatchOptions {
            histogram: "Test.BackPress".to_string(),
            predictive_back: false,
            ..DispatchOptions::default()
        }
    );
}

#[test]
fn test_reregistration_after_teardown() {
    let metrics = Arc::new(InMemoryMetricsRecorder::new());
    let manager = BackPressManager::new(CategoryMetricIds::new(), metrics);

    let (old_signal, old_presses) = register(&manager, BackPressCategory::TabModal, true);
    manager.deregister_category(BackPressCategory::TabModal).unwrap();
    let (_, new_presses) = register(&manager, BackPressCategory::TabModal, false);

    // The torn-down handler's signal no longer affects the slot.
    old_signal.set(false);
    old_signal.set(true);
    assert!(!manager.is_armed());
    assert_eq!(manager.dispatch(), None);

    assert_eq!(old_presses.load(Ordering::Relaxed), 0);
    assert_eq!(new_presses.load(Ordering::Relaxed), 0);
    assert_eq!(manager.registered_count(), 1);
    assert!(manager.has_handler(BackPressCategory::TabModal));
}
