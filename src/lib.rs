//! a compact telemetry dashboard for rockchip boards.

use {
    self::{
        config::Config,
        controller::{Controller, ExitStatus},
        engine::SampleEngine,
        input::Key,
        registry::Registry,
        source::SystemClock,
        terminal::Crossterm,
        window::Window,
    },
    std::{io, sync::mpsc::Sender, time::Duration},
};

pub mod config;
pub mod controller;
pub mod engine;
pub mod format;
pub mod input;
pub mod meter;
pub mod metric;
pub mod rate;
pub mod registry;
pub mod sentinel;
pub mod source;
pub mod terminal;
pub mod topology;
pub mod window;

/// kernel statistics facilities.
///
/// this file provides tools to interact with `/proc/stat`.
pub mod stat;

/// the dashboard, wired to the real board and terminal.
pub struct App {
    controller: Controller<SystemClock, Crossterm, Window<io::Stdout>>,
}

// === impl App ===

impl App {
    /// initializes a new application.
    pub fn new(config: &Config) -> Self {
        let (registry, board) = Registry::board(config);
        let engine = SampleEngine::new(SystemClock, registry);
        let window = Window::stdout().top(config.top_processes);
        let controller = Controller::new(engine, board, Crossterm, window)
            .interval(Duration::from_millis(config.interval_ms))
            .require_root(config.require_root);

        Self { controller }
    }

    /// a handle for injecting keys, e.g. from a signal handler.
    pub fn keys(&self) -> Sender<Key> {
        self.controller.keys()
    }

    /// runs the application, reading keys from standard input.
    pub fn run(mut self) -> ExitStatus {
        self.controller.run(io::stdin())
    }
}
