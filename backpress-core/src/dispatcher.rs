//! BackPressManager: priority-ordered back-press dispatch
//!
//! Holds one slot per [`BackPressCategory`] and routes each back press to the
//! first registered handler (in category order) whose signal currently reads
//! `true`:
//! - Want-states are cached and kept live through signal subscriptions
//! - `enabled_count` is maintained incrementally and drives the armed signal
//! - One histogram sample per consumed press, recorded before the handler runs
//! - Predictive back gestures and escape keys are routed through the same table
//!
//! The table lock is never held while a handler runs.

use std::fmt;
use std::sync::{Arc, Weak};

use enum_map::EnumMap;
use parking_lot::Mutex;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, info, trace};

use crate::category::BackPressCategory;
use crate::error::{BackPressError, BackPressResult};
use crate::handler::{BackEvent, EscapeResult, SharedHandler};
use crate::metrics::{
    CategoryMetricIds, DEFAULT_ESCAPE_HISTOGRAM, DEFAULT_HISTOGRAM, MetricsRecorder,
};
use crate::signal::{BackPressSignal, SubscriptionId};
use crate::thread_check::ThreadChecker;

/// Behaviour switches, usually taken from [`crate::config::BackPressConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    pub histogram: String,
    pub escape_histogram: String,
    pub predictive_back: bool,
    pub escape_routing: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            histogram: DEFAULT_HISTOGRAM.to_string(),
            escape_histogram: DEFAULT_ESCAPE_HISTOGRAM.to_string(),
            predictive_back: true,
            escape_routing: true,
        }
    }
}

/// Per-slot snapshot for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStats {
    pub category: BackPressCategory,
    pub handler_name: &'static str,
    pub wants_press: bool,
    pub handled_count: u64,
}

#[derive(Default)]
struct HandlerSlot {
    handler: Option<SharedHandler>,
    handler_name: &'static str,
    signal: Option<BackPressSignal>,
    subscription: Option<SubscriptionId>,
    // Guards against notifications from a previous registration of this slot.
    generation: u64,
    wants_press: bool,
    handled_count: u64,
}

impl HandlerSlot {
    fn is_eligible(&self) -> bool {
        self.wants_press && self.handler.is_some()
    }
}

#[derive(Default)]
struct DispatchTable {
    slots: EnumMap<BackPressCategory, HandlerSlot>,
    enabled_count: usize,
    next_generation: u64,
    last_handled: Option<BackPressCategory>,
    active_gesture: Option<BackPressCategory>,
}

impl DispatchTable {
    fn first_eligible(&self) -> Option<(BackPressCategory, SharedHandler)> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.is_eligible())
            .and_then(|(category, slot)| slot.handler.clone().map(|h| (category, h)))
    }

    fn is_armed(&self) -> bool {
        self.enabled_count != 0
    }
}

pub struct BackPressManager {
    table: Arc<Mutex<DispatchTable>>,
    armed: BackPressSignal,
    metric_ids: CategoryMetricIds,
    metrics: Arc<dyn MetricsRecorder>,
    options: DispatchOptions,
    thread_checker: ThreadChecker,
}

impl BackPressManager {
    /// Create an empty manager bound to the calling thread.
    pub fn new(metric_ids: CategoryMetricIds, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            table: Arc::new(Mutex::new(DispatchTable::default())),
            armed: BackPressSignal::new(false),
            metric_ids,
            metrics,
            options: DispatchOptions::default(),
            thread_checker: ThreadChecker::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Register `handler` for `category`.
    ///
    /// Fails if the category is occupied or the same handler instance is
    /// already registered elsewhere; the existing registration is kept.
    pub fn register_handler(
        &self,
        category: BackPressCategory,
        handler: SharedHandler,
    ) -> BackPressResult<()> {
        self.thread_checker.assert_on_owner_thread("register_handler");

        let (signal, handler_name) = {
            let guard = handler.lock();
            (guard.back_press_signal(), guard.name())
        };

        let armed_now = {
            let mut guard = self.table.lock();
            let table = &mut *guard;

            if table.slots[category].handler.is_some() {
                return Err(BackPressError::AlreadyRegistered { category }.trace());
            }

            if let Some((existing, _)) = table.slots.iter().find(|(_, slot)| {
                slot.handler
                    .as_ref()
                    .is_some_and(|registered| Arc::ptr_eq(registered, &handler))
            }) {
                return Err(BackPressError::AlreadyRegistered { category: existing }.trace());
            }

            table.next_generation += 1;
            let generation = table.next_generation;

            let weak_table: Weak<Mutex<DispatchTable>> = Arc::downgrade(&self.table);
            let armed = self.armed.clone();
            let subscription = signal.subscribe(move |wants| {
                if let Some(table) = weak_table.upgrade() {
                    Self::on_handler_want_state_changed(&table, &armed, category, generation, wants);
                }
            });

            let wants_press = signal.get();
            let slot = &mut table.slots[category];
            slot.handler = Some(handler);
            slot.handler_name = handler_name;
            slot.signal = Some(signal);
            slot.subscription = Some(subscription);
            slot.generation = generation;
            slot.wants_press = wants_press;
            slot.handled_count = 0;

            if wants_press {
                table.enabled_count += 1;
            }

            info!(
                category = category.name(),
                handler = handler_name,
                wants_press,
                enabled_count = table.enabled_count,
                "Registered back-press handler"
            );

            table.is_armed()
        };

        self.armed.set(armed_now);
        Ok(())
    }

    /// Remove whatever handler occupies `category`.
    pub fn deregister_category(&self, category: BackPressCategory) -> BackPressResult<()> {
        self.thread_checker.assert_on_owner_thread("deregister_category");

        let armed_now = {
            let mut guard = self.table.lock();
            let table = &mut *guard;
            let slot = &mut table.slots[category];

            if slot.handler.take().is_none() {
                return Err(BackPressError::NotRegistered { category }.trace());
            }

            if let (Some(signal), Some(subscription)) = (slot.signal.take(), slot.subscription.take())
            {
                signal.unsubscribe(subscription);
            }

            let handler_name = std::mem::take(&mut slot.handler_name);
            let was_enabled = std::mem::take(&mut slot.wants_press);
            slot.handled_count = 0;

            if was_enabled {
                table.enabled_count -= 1;
            }

            if table.active_gesture == Some(category) {
                table.active_gesture = None;
            }

            info!(
                category = category.name(),
                handler = handler_name,
                enabled_count = table.enabled_count,
                "Deregistered back-press handler"
            );

            table.is_armed()
        };

        self.armed.set(armed_now);
        Ok(())
    }

    /// Remove `handler` from whichever category it occupies.
    pub fn deregister_handler(&self, handler: &SharedHandler) -> BackPressResult<BackPressCategory> {
        self.thread_checker.assert_on_owner_thread("deregister_handler");

        let category = {
            let table = self.table.lock();
            table
                .slots
                .iter()
                .find(|(_, slot)| {
                    slot.handler
                        .as_ref()
                        .is_some_and(|registered| Arc::ptr_eq(registered, handler))
                })
                .map(|(category, _)| category)
        };

        let category = category.ok_or_else(|| BackPressError::HandlerNotFound.trace())?;
        self.deregister_category(category)?;
        Ok(category)
    }

    /// Route one back press. Returns the category that consumed it, if any.
    pub fn dispatch(&self) -> Option<BackPressCategory> {
        self.thread_checker.assert_on_owner_thread("dispatch");

        let (category, handler) = {
            let mut guard = self.table.lock();
            let table = &mut *guard;
            table.active_gesture = None;

            let Some((category, slot)) = table.slots.iter_mut().find(|(_, slot)| slot.is_eligible())
            else {
                trace!("No handler wants the back press");
                return None;
            };

            slot.handled_count += 1;
            let handler = slot.handler.clone()?;
            table.last_handled = Some(category);
            (category, handler)
        };

        // Recorded first so a misbehaving handler still shows up.
        self.metrics.record_enumeration(
            &self.options.histogram,
            self.metric_ids.id(category),
            self.metric_ids.boundary(),
        );

        let mut guard = handler.lock();
        debug!(category = category.name(), handler = guard.name(), "Dispatching back press");
        guard.handle_back_press();

        Some(category)
    }

    /// Offer an escape key press to interested handlers in category order.
    pub fn process_escape_key(&self) -> Option<BackPressCategory> {
        self.thread_checker.assert_on_owner_thread("process_escape_key");

        if !self.options.escape_routing {
            return None;
        }

        let candidates: SmallVec<[(BackPressCategory, SharedHandler); 4]> = {
            let table = self.table.lock();
            table
                .slots
                .iter()
                .filter(|(_, slot)| slot.is_eligible())
                .filter_map(|(category, slot)| slot.handler.clone().map(|h| (category, h)))
                .collect()
        };

        for (category, handler) in candidates {
            let result = handler.lock().handle_escape_press();
            if result == EscapeResult::Handled {
                self.metrics.record_enumeration(
                    &self.options.escape_histogram,
                    self.metric_ids.id(category),
                    self.metric_ids.boundary(),
                );
                debug!(category = category.name(), "Escape key handled");
                return Some(category);
            }
        }

        trace!("Escape key not handled");
        None
    }

    /// Start of a predictive back gesture; pins the handler that would fire now.
    pub fn on_back_started(&self, event: BackEvent) -> Option<BackPressCategory> {
        self.thread_checker.assert_on_owner_thread("on_back_started");

        if !self.options.predictive_back {
            return None;
        }

        let (category, handler) = {
            let mut table = self.table.lock();
            let target = table.first_eligible();
            table.active_gesture = target.as_ref().map(|(category, _)| *category);
            target?
        };

        debug!(category = category.name(), progress = event.progress, "Back gesture started");
        handler.lock().on_back_started(event);
        Some(category)
    }

    pub fn on_back_progressed(&self, event: BackEvent) {
        self.thread_checker.assert_on_owner_thread("on_back_progressed");

        if let Some(handler) = self.active_gesture_handler() {
            handler.lock().on_back_progressed(event);
        }
    }

    pub fn on_back_cancelled(&self) {
        self.thread_checker.assert_on_owner_thread("on_back_cancelled");

        let handler = {
            let mut table = self.table.lock();
            table
                .active_gesture
                .take()
                .and_then(|category| table.slots[category].handler.clone())
        };

        if let Some(handler) = handler {
            debug!("Back gesture cancelled");
            handler.lock().on_back_cancelled();
        }
    }

    fn active_gesture_handler(&self) -> Option<SharedHandler> {
        let table = self.table.lock();
        table
            .active_gesture
            .and_then(|category| table.slots[category].handler.clone())
    }

    /// Whether the host should intercept the platform back gesture at all.
    pub fn is_armed(&self) -> bool {
        self.thread_checker.assert_on_owner_thread("is_armed");
        self.table.lock().is_armed()
    }

    /// Observable form of [`Self::is_armed`].
    pub fn armed_signal(&self) -> BackPressSignal {
        self.armed.clone()
    }

    pub fn has_handler(&self, category: BackPressCategory) -> bool {
        self.table.lock().slots[category].handler.is_some()
    }

    pub fn enabled_count(&self) -> usize {
        self.table.lock().enabled_count
    }

    pub fn registered_count(&self) -> usize {
        self.table
            .lock()
            .slots
            .values()
            .filter(|slot| slot.handler.is_some())
            .count()
    }

    pub fn last_handled_category(&self) -> Option<BackPressCategory> {
        self.table.lock().last_handled
    }

    pub fn active_gesture_category(&self) -> Option<BackPressCategory> {
        self.table.lock().active_gesture
    }

    pub fn stats(&self) -> Vec<SlotStats> {
        self.table
            .lock()
            .slots
            .iter()
            .filter(|(_, slot)| slot.handler.is_some())
            .map(|(category, slot)| SlotStats {
                category,
                handler_name: slot.handler_name,
                wants_press: slot.wants_press,
                handled_count: slot.handled_count,
            })
            .collect()
    }

    pub fn set_thread_asserts_disabled_for_testing(&self, disabled: bool) {
        self.thread_checker.set_disabled_for_testing(disabled);
    }

    /// Applies a want-state flip for `category`; only the delta is counted.
    fn on_handler_want_state_changed(
        table: &Mutex<DispatchTable>,
        armed: &BackPressSignal,
        category: BackPressCategory,
        generation: u64,
        wants: bool,
    ) {
        let armed_now = {
            let mut guard = table.lock();
            let table = &mut *guard;
            let slot = &mut table.slots[category];

            if slot.handler.is_none() || slot.generation != generation || slot.wants_press == wants
            {
                trace!(category = category.name(), wants, "Ignoring stale want-state notification");
                return;
            }

            slot.wants_press = wants;
            if wants {
                table.enabled_count += 1;
            } else {
                table.enabled_count -= 1;
            }

            debug!(
                category = category.name(),
                wants,
                enabled_count = table.enabled_count,
                "Handler want-state changed"
            );

            table.is_armed()
        };

        armed.set(armed_now);
    }
}

impl fmt::Debug for BackPressManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.lock();
        f.debug_struct("BackPressManager")
            .field("enabled_count", &table.enabled_count)
            .field("last_handled", &table.last_handled)
            .field("options", &self.options)
            .finish()
    }
}
