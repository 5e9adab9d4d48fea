//! # backpress-core - priority-ordered back-press dispatch
//!
//! Features register a [`BackPressHandler`] under a fixed
//! [`BackPressCategory`]; the [`BackPressManager`] routes each back press to
//! the first interested handler in category order and reports whether the
//! host should intercept the platform back gesture at all.

pub mod error;

pub mod config;

pub mod category;
pub use category::BackPressCategory;

pub mod signal;
pub use signal::{BackPressSignal, SubscriptionId};

pub mod handler;
pub use handler::{BackEvent, BackPressHandler, EscapeResult, SharedHandler, SwipeEdge};

pub mod metrics;
pub use metrics::{
    CategoryMetricIds, InMemoryMetricsRecorder, MetricsRecorder, TracingMetricsRecorder,
};

pub mod dispatcher;
pub use dispatcher::{BackPressManager, DispatchOptions, SlotStats};

pub mod thread_check;

pub mod logging;
pub use logging::{LoggerBuilder, LoggerConfig};

pub use config::BackPressConfig;
pub use error::{BackPressError, BackPressResult};
