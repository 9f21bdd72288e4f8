//! Terminal rendering of progress events.
//! Used by both `weibodcast generate` and `weibodcast run`.

use crate::pipeline::sink::EventSink;
use crate::pipeline::types::{DialogueLine, ProgressEvent, Role};
use std::io::IsTerminal;

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Format one event as a single line, optionally wrapped in ANSI colors.
pub fn format_event(event: &ProgressEvent, color: bool) -> String {
    let (style, text) = match event {
        ProgressEvent::Log { message } => (DIM, message.clone()),
        ProgressEvent::Error { message } => (RED, format!("Error: {message}")),
        ProgressEvent::Complete { audio_id, script } => (
            GREEN,
            format!("Done: {} lines, audio id {}", script.len(), audio_id),
        ),
    };
    if color {
        format!("{style}{text}{RESET}")
    } else {
        text
    }
}

/// Print one event to stderr, colored when stderr is a terminal.
pub fn render_event(event: &ProgressEvent) {
    let color = std::io::stderr().is_terminal();
    eprintln!("{}", format_event(event, color));
}

/// Renders events of an in-process run straight to the terminal.
#[derive(Debug, Default)]
pub struct TerminalSink {
    /// Only terminal errors are shown
    pub quiet: bool,
}

impl TerminalSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn shows(&self, event: &ProgressEvent) -> bool {
        !self.quiet || matches!(event, ProgressEvent::Error { .. })
    }
}

impl EventSink for TerminalSink {
    fn emit(&self, event: ProgressEvent) {
        if self.shows(&event) {
            render_event(&event);
        }
    }

    fn name(&self) -> &'static str {
        "terminal"
    }
}

/// Format a script in the same `HOST:` / `GUEST:` layout the generator uses.
pub fn format_script(script: &[DialogueLine]) -> String {
    script
        .iter()
        .map(|line| {
            let prefix = match line.role {
                Role::Host => "HOST",
                Role::Guest => "GUEST",
            };
            format!("{prefix}: {}", line.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
