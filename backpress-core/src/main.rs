//! src/main.rs
//! Terminal harness: drives a BackPressManager from key presses.
//!
//! Backspace dispatches a back press, Esc goes through escape routing, digits
//! open/close the demo features, `g`/`c` play a predictive back gesture that
//! completes or is cancelled, `s` prints slot stats, `q` quits.

use std::io::{self, Stdout, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event as TerminalEvent, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::{info, warn};

use backpress_core::{
    BackEvent, BackPressCategory, BackPressConfig, BackPressHandler, BackPressManager,
    BackPressSignal, EscapeResult, LoggerBuilder, SharedHandler, SwipeEdge,
    TracingMetricsRecorder, handler,
};

/// A feature that can be opened and is closed by back.
struct DemoFeature {
    name: &'static str,
    signal: BackPressSignal,
    closes_on_escape: bool,
}

impl BackPressHandler for DemoFeature {
    fn handle_back_press(&mut self) {
        info!(feature = self.name, "Closing on back press");
        self.signal.set(false);
    }

    fn back_press_signal(&self) -> BackPressSignal {
        self.signal.clone()
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn handle_escape_press(&mut self) -> EscapeResult {
        if self.closes_on_escape {
            self.signal.set(false);
            EscapeResult::Handled
        } else {
            EscapeResult::NotHandled
        }
    }

    fn on_back_started(&mut self, event: BackEvent) {
        info!(feature = self.name, progress = event.progress, "Preview started");
    }

    fn on_back_progressed(&mut self, event: BackEvent) {
        info!(feature = self.name, progress = event.progress, "Preview progressed");
    }

    fn on_back_cancelled(&mut self) {
        info!(feature = self.name, "Preview cancelled");
    }
}

/// Always armed; the last stop before leaving the app.
struct MinimizeApp {
    signal: BackPressSignal,
}

impl BackPressHandler for MinimizeApp {
    fn handle_back_press(&mut self) {
        info!("Minimizing app");
    }

    fn back_press_signal(&self) -> BackPressSignal {
        self.signal.clone()
    }

    fn name(&self) -> &'static str {
        "minimize-app"
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

struct Harness {
    manager: BackPressManager,
    features: Vec<(BackPressCategory, BackPressSignal)>,
    out: Stdout,
}

impl Harness {
    fn new(config: &BackPressConfig) -> Result<Self> {
        let manager = BackPressManager::new(
            config.metric_ids().context("Invalid metric id overrides")?,
            Arc::new(TracingMetricsRecorder),
        )
        .with_options(config.dispatch_options());

        let mut features = Vec::new();
        for (category, name, closes_on_escape) in [
            (BackPressCategory::BottomSheet, "bottom-sheet", true),
            (BackPressCategory::TabSwitcher, "tab-switcher", false),
            (BackPressCategory::FindToolbar, "find-toolbar", true),
        ] {
            let signal = BackPressSignal::new(false);
            let feature: SharedHandler = handler::shared(DemoFeature {
                name,
                signal: signal.clone(),
                closes_on_escape,
            });
            manager.register_handler(category, feature)?;
            features.push((category, signal));
        }

        manager.register_handler(
            BackPressCategory::MinimizeAppAndCloseTab,
            handler::shared(MinimizeApp {
                signal: BackPressSignal::new(true),
            }),
        )?;

        Ok(Self {
            manager,
            features,
            out: io::stdout(),
        })
    }

    fn say(&mut self, line: &str) -> Result<()> {
        write!(self.out, "{line}\r\n")?;
        self.out.flush()?;
        Ok(())
    }

    fn describe(category: Option<BackPressCategory>) -> String {
        category.map_or_else(|| "nobody".to_string(), |c| c.to_string())
    }

    /// Returns false when the harness should exit.
    fn on_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(false),

            KeyCode::Backspace => {
                if self.manager.is_armed() {
                    let handled = Self::describe(self.manager.dispatch());
                    self.say(&format!("back handled by {handled}"))?;
                } else {
                    self.say("back not intercepted, platform default")?;
                }
            }

            KeyCode::Esc => {
                let handled = Self::describe(self.manager.process_escape_key());
                self.say(&format!("escape handled by {handled}"))?;
            }

            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if let Some((category, signal)) = self.features.get(index).cloned() {
                    signal.set(!signal.get());
                    let state = if signal.get() { "open" } else { "closed" };
                    self.say(&format!("{category} {state}"))?;
                }
            }

            KeyCode::Char(c @ ('g' | 'c')) => {
                let start = BackEvent::new(0.0, 400.0, 0.0, SwipeEdge::Left);
                let target = Self::describe(self.manager.on_back_started(start));
                self.manager
                    .on_back_progressed(BackEvent::new(120.0, 400.0, 0.5, SwipeEdge::Left));

                if c == 'g' {
                    let handled = Self::describe(self.manager.dispatch());
                    self.say(&format!("gesture on {target} completed by {handled}"))?;
                } else {
                    self.manager.on_back_cancelled();
                    self.say(&format!("gesture on {target} cancelled"))?;
                }
            }

            KeyCode::Char('s') => {
                let stats = serde_json::to_string(&self.manager.stats())?;
                self.say(&stats)?;
            }

            _ => {}
        }

        Ok(true)
    }

    fn run(&mut self) -> Result<()> {
        self.say("backspace: back | esc: escape | 1-3: toggle | g/c: gesture | s: stats | q: quit")?;

        loop {
            match event::read().context("Failed to read terminal event")? {
                TerminalEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    if !self.on_key(key)? {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    let config = BackPressConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        BackPressConfig::default()
    });

    let _log_guard = LoggerBuilder::new()
        .with_config(config.logging.clone())
        .build()
        .context("Failed to initialize logging")?;
    info!("Starting back-press harness");

    let mut harness = Harness::new(&config).context("Failed to set up handlers")?;
    let _raw_mode = RawModeGuard::enter()?;
    harness.run()?;

    info!("Harness exited cleanly");
    Ok(())
}
