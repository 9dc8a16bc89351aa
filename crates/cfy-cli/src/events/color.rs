//! ANSI color decoration with nesting.
//!
//! A [`Painter`] tracks the color of the enclosing context. Painting a value
//! emits its color, the value, and then the enclosing color again, so a
//! decorated fragment embedded in a decorated span does not cut the outer
//! span's color short.

use std::fmt;

use colored::Color;

/// A foreground color, optionally bold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    color: Color,
    bold: bool,
}

impl Style {
    /// Plain foreground color.
    #[must_use]
    pub const fn plain(color: Color) -> Self {
        Self { color, bold: false }
    }

    /// Bold foreground color.
    #[must_use]
    pub const fn bold(color: Color) -> Self {
        Self { color, bold: true }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bold {
            f.write_str("\x1b[1m")?;
        }
        write!(f, "\x1b[{}m", self.color.to_fg_str())
    }
}

/// Foreground blue.
pub const BLUE: Style = Style::plain(Color::Blue);
/// Foreground cyan.
pub const CYAN: Style = Style::plain(Color::Cyan);
/// Foreground green.
pub const GREEN: Style = Style::plain(Color::Green);
/// Foreground magenta.
pub const MAGENTA: Style = Style::plain(Color::Magenta);
/// Foreground red.
pub const RED: Style = Style::plain(Color::Red);
/// Foreground yellow.
pub const YELLOW: Style = Style::plain(Color::Yellow);
/// Bold green.
pub const BRIGHT_GREEN: Style = Style::bold(Color::Green);
/// Bold red.
pub const BRIGHT_RED: Style = Style::bold(Color::Red);
/// Bold yellow.
pub const BRIGHT_YELLOW: Style = Style::bold(Color::Yellow);
/// Default foreground, then reset all attributes.
pub const RESET: &str = "\x1b[39m\x1b[0m";

/// Color of the timestamp.
pub const TIMESTAMP: Style = BLUE;
/// Color of the `LOG` indicator.
pub const LOG_INDICATOR: Style = YELLOW;
/// Color of the `CFY` indicator.
pub const EVENT_INDICATOR: Style = MAGENTA;
/// Color of the deployment id.
pub const DEPLOYMENT_ID: Style = CYAN;
/// Color of the bracketed operation info.
pub const OPERATION_INFO: Style = GREEN;
/// Color of node, source and target ids inside the operation info.
pub const NODE_ID: Style = BLUE;
/// Color of the operation name inside the operation info.
pub const OPERATION: Style = YELLOW;

/// Color of a whole lifecycle message, by event type.
#[must_use]
pub fn message_color(event_type: &str) -> Option<Style> {
    match event_type {
        "workflow_started" | "workflow_succeeded" => Some(BRIGHT_GREEN),
        "workflow_failed" => Some(BRIGHT_RED),
        "workflow_cancelled" => Some(BRIGHT_YELLOW),
        "sending_task" | "task_started" => Some(MAGENTA),
        "task_succeeded" => Some(GREEN),
        "task_rescheduled" => Some(YELLOW),
        "task_failed" => Some(RED),
        _ => None,
    }
}

/// Color of an upper-cased log level.
#[must_use]
pub fn level_color(level: &str) -> Option<Style> {
    match level {
        "INFO" => Some(CYAN),
        "WARN" | "WARNING" => Some(YELLOW),
        "ERROR" | "FATAL" => Some(RED),
        _ => None,
    }
}

/// Applies colors relative to the enclosing color context.
#[derive(Debug, Clone)]
pub struct Painter {
    enabled: bool,
    context: Option<Style>,
}

impl Painter {
    /// A painter at the outermost context. A disabled painter returns
    /// every value unchanged.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            context: None,
        }
    }

    /// Wrap `value` in `color`, restoring the enclosing color afterwards.
    #[must_use]
    pub fn paint(&self, value: &str, style: Option<Style>) -> String {
        match (style, self.context) {
            (Some(style), Some(context)) if self.enabled => format!("{style}{value}{context}"),
            (Some(style), None) if self.enabled => format!("{style}{value}{RESET}"),
            _ => value.to_owned(),
        }
    }

    /// Run `f` with `color` as the enclosing context.
    pub fn nest<R>(&mut self, style: Option<Style>, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.context;
        if style.is_some() {
            self.context = style;
        }
        let result = f(self);
        self.context = previous;
        result
    }
}
