//! The capability every feature implements to take part in back-press dispatch.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::signal::BackPressSignal;

/// Shared, non-owning-from-the-manager's-view handle to a handler.
pub type SharedHandler = Arc<Mutex<dyn BackPressHandler>>;

/// Wrap a concrete handler into the handle type the manager stores.
pub fn shared<H: BackPressHandler + 'static>(handler: H) -> SharedHandler {
    Arc::new(Mutex::new(handler))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SwipeEdge {
    Left,
    Right,
    #[default]
    None,
}

/// Progress report for a predictive back gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BackEvent {
    pub touch_x: f32,
    pub touch_y: f32,
    pub progress: f32,
    pub swipe_edge: SwipeEdge,
}

impl BackEvent {
    #[must_use]
    pub fn new(touch_x: f32, touch_y: f32, progress: f32, swipe_edge: SwipeEdge) -> Self {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };

        Self {
            touch_x,
            touch_y,
            progress,
            swipe_edge,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeResult {
    Handled,
    NotHandled,
    /// The handler does not take part in escape routing.
    #[default]
    Unsupported,
}

pub trait BackPressHandler: Send {
    /// Consume one back press. Only called while the signal reads `true`.
    fn handle_back_press(&mut self);

    /// Observable "wants back press" state. Must return the same signal for
    /// the lifetime of a registration.
    fn back_press_signal(&self) -> BackPressSignal;

    /// Handler name for diagnostics.
    fn name(&self) -> &'static str;

    fn handle_escape_press(&mut self) -> EscapeResult {
        EscapeResult::Unsupported
    }

    fn on_back_started(&mut self, _event: BackEvent) {}

    fn on_back_progressed(&mut self, _event: BackEvent) {}

    fn on_back_cancelled(&mut self) {}
}
