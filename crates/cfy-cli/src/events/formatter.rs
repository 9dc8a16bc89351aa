//! Event rendering for terminal and machine consumption.

use std::borrow::Cow;
use std::io::Write;

use cfy_rest::{Event, EventKind};
use chrono::{DateTime, NaiveDateTime};

use super::color::{self, Painter};
use crate::error::CliError;

/// Lifecycle events that only describe task dispatch.
pub const DISPATCH_EVENT_TYPES: [&str; 3] = ["sending_task", "task_received", "task_started"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatterConfig {
    /// Emit each event as one JSON object per line.
    pub json: bool,
    /// Decorate text output with ANSI colors.
    pub colors: bool,
    /// Keep debug logs and task dispatch events in text output.
    pub verbose: bool,
}

/// Renders events as text lines or JSON lines.
#[derive(Debug, Clone)]
pub struct EventFormatter {
    config: FormatterConfig,
}

impl EventFormatter {
    /// Create a formatter.
    #[must_use]
    pub const fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// Render one event. `None` means the event produces no output.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format(&self, event: &Event) -> Result<Option<String>, CliError> {
        if self.config.json {
            return serde_json::to_string(event)
                .map(Some)
                .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")));
        }
        Ok(self.render_text(event))
    }

    /// Write events in order, one line each, and flush.
    ///
    /// Returns the number of lines written.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_events<W: Write>(&self, writer: &mut W, events: &[Event]) -> Result<usize, CliError> {
        let mut written = 0;
        for event in events {
            if let Some(line) = self.format(event)? {
                writeln!(writer, "{line}")?;
                written += 1;
            }
        }
        writer.flush()?;
        Ok(written)
    }

    fn render_text(&self, event: &Event) -> Option<String> {
        let mut painter = Painter::new(self.config.colors);
        let message = self.message(event, &painter)?;

        let mut parts = Vec::with_capacity(5);
        if let Some(timestamp) = event.timestamp() {
            parts.push(painter.paint(&printable_timestamp(timestamp), Some(color::TIMESTAMP)));
        }
        parts.push(indicator(event, &painter));
        if let Some(deployment_id) = event.deployment_id() {
            parts.push(format!(
                "<{}>",
                painter.paint(deployment_id, Some(color::DEPLOYMENT_ID))
            ));
        }
        if let Some(info) = operation_info(event, &mut painter) {
            parts.push(info);
        }
        parts.push(message);
        Some(parts.join(" "))
    }

    fn message(&self, event: &Event, painter: &Painter) -> Option<String> {
        let text = event.message().filter(|m| !m.trim().is_empty())?;
        let text = single_line(text, self.config.verbose);
        let text = text.as_ref();

        match event.kind() {
            EventKind::Log => {
                let level = event.level().unwrap_or("info").to_uppercase();
                if level == "DEBUG" && !self.config.verbose {
                    return None;
                }
                let level = painter.paint(&level, color::level_color(&level));
                Some(format!("{level}: {text}"))
            }
            EventKind::Event => {
                let event_type = event.event_type();
                if !self.config.verbose
                    && event_type.is_some_and(|t| DISPATCH_EVENT_TYPES.contains(&t))
                {
                    return None;
                }
                Some(painter.paint(text, event_type.and_then(color::message_color)))
            }
        }
    }
}

/// Keep one output line per event. Multi-line messages show their first
/// line, or every line with breaks escaped when verbose.
fn single_line(text: &str, verbose: bool) -> Cow<'_, str> {
    const BREAKS: [char; 2] = ['\r', '\n'];
    if !text.contains(BREAKS) {
        return Cow::Borrowed(text);
    }
    if verbose {
        let lines: Vec<&str> = text.split(BREAKS).filter(|l| !l.is_empty()).collect();
        Cow::Owned(lines.join("\\n"))
    } else {
        Cow::Borrowed(
            text.split(BREAKS)
                .find(|l| !l.trim().is_empty())
                .unwrap_or_default(),
        )
    }
}

fn indicator(event: &Event, painter: &Painter) -> String {
    match event.kind() {
        EventKind::Log => painter.paint("LOG", Some(color::LOG_INDICATOR)),
        EventKind::Event => painter.paint("CFY", Some(color::EVENT_INDICATOR)),
    }
}

/// `[source->target|op]` for relationship operations, `[node.op]` or
/// `[node]` for node operations.
fn operation_info(event: &Event, painter: &mut Painter) -> Option<String> {
    let operation = event.operation().map(short_operation);

    let info = painter.nest(Some(color::OPERATION_INFO), |p| {
        let op = operation.map(|op| p.paint(op, Some(color::OPERATION)));
        if let (Some(source), Some(target)) = (event.source_id(), event.target_id()) {
            let source = p.paint(source, Some(color::NODE_ID));
            let target = p.paint(target, Some(color::NODE_ID));
            Some(match op {
                Some(op) => format!("[{source}->{target}|{op}]"),
                None => format!("[{source}->{target}]"),
            })
        } else {
            let node = event.node_instance_id().or_else(|| event.node_name())?;
            let node = p.paint(node, Some(color::NODE_ID));
            Some(match op {
                Some(op) => format!("[{node}.{op}]"),
                None => format!("[{node}]"),
            })
        }
    })?;

    Some(painter.paint(&info, Some(color::OPERATION_INFO)))
}

fn short_operation(operation: &str) -> &str {
    operation.rsplit('.').next().unwrap_or(operation)
}

/// `YYYY-MM-DD HH:MM:SS` in the timestamp's own offset.
pub fn printable_timestamp(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format(TIMESTAMP_FORMAT).to_string();
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return parsed.format(TIMESTAMP_FORMAT).to_string();
        }
    }
    raw.split('.').next().unwrap_or(raw).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::color::{BLUE, CYAN, GREEN, MAGENTA, RED, RESET, YELLOW};
    use serde_json::json;
    use test_case::test_case;

    fn text() -> EventFormatter {
        EventFormatter::new(FormatterConfig::default())
    }

    fn colored() -> EventFormatter {
        EventFormatter::new(FormatterConfig {
            colors: true,
            ..FormatterConfig::default()
        })
    }

    fn node_event() -> Event {
        Event::lifecycle("task_succeeded", "Task succeeded 'script.runner.tasks.run'")
            .with_field("timestamp", "2024-03-01T10:00:00.123Z")
            .with_field("deployment_id", "dep")
            .with_field("node_instance_id", "vm_abc123")
            .with_field("operation", "cloudify.interfaces.lifecycle.create")
    }

    #[test_case("2024-03-01T10:00:00.123Z", "2024-03-01 10:00:00" ; "rfc3339 utc")]
    #[test_case("2024-03-01T10:00:00+02:00", "2024-03-01 10:00:00" ; "rfc3339 offset")]
    #[test_case("2024-03-01 10:00:00.456", "2024-03-01 10:00:00" ; "manager format")]
    #[test_case("2024-03-01T10:00:00.456", "2024-03-01 10:00:00" ; "naive iso")]
    #[test_case("yesterday.afternoon", "yesterday" ; "unparsable")]
    fn timestamps(raw: &str, expected: &str) {
        assert_eq!(printable_timestamp(raw), expected);
    }

    #[test]
    fn node_operation_line() {
        let line = text().format(&node_event()).unwrap().unwrap();
        assert_eq!(
            line,
            "2024-03-01 10:00:00 CFY <dep> [vm_abc123.create] Task succeeded 'script.runner.tasks.run'"
        );
    }

    #[test]
    fn relationship_operation_line() {
        let event = Event::lifecycle("task_succeeded", "done")
            .with_field("source_id", "app_1")
            .with_field("target_id", "db_1")
            .with_field("operation", "cloudify.interfaces.relationship_lifecycle.establish");
        let line = text().format(&event).unwrap().unwrap();
        assert_eq!(line, "CFY [app_1->db_1|establish] done");
    }

    #[test]
    fn node_without_operation() {
        let event = Event::lifecycle("workflow_node_event", "Creating node")
            .with_field("node_name", "vm");
        assert_eq!(text().format(&event).unwrap().unwrap(), "CFY [vm] Creating node");
    }

    #[test]
    fn log_line_prefixes_level() {
        let event = Event::log("warning", "disk almost full")
            .with_field("timestamp", "2024-03-01T10:00:00Z")
            .with_field("deployment_id", "dep");
        assert_eq!(
            text().format(&event).unwrap().unwrap(),
            "2024-03-01 10:00:00 LOG <dep> WARNING: disk almost full"
        );
    }

    #[test]
    fn nested_context_layout_renders() {
        let event: Event = serde_json::from_value(json!({
            "type": "cloudify_event",
            "event_type": "workflow_started",
            "@timestamp": "2024-03-01T10:00:00.000Z",
            "message": {"text": "Starting 'install' workflow execution"},
            "context": {"deployment_id": "dep"}
        }))
        .unwrap();
        assert_eq!(
            text().format(&event).unwrap().unwrap(),
            "2024-03-01 10:00:00 CFY <dep> Starting 'install' workflow execution"
        );
    }

    #[test_case(Event::lifecycle("task_succeeded", "") ; "empty message")]
    #[test_case(Event::lifecycle("task_succeeded", "   ") ; "blank message")]
    #[test_case(Event::default().with_field("type", "cloudify_event") ; "missing message")]
    #[test_case(Event::log("debug", "noise") ; "debug log")]
    #[test_case(Event::lifecycle("sending_task", "Sending task") ; "sending task")]
    #[test_case(Event::lifecycle("task_received", "Task received") ; "task received")]
    #[test_case(Event::lifecycle("task_started", "Task started") ; "task started")]
    fn suppressed_in_text_mode(event: Event) {
        assert_eq!(text().format(&event).unwrap(), None);
    }

    #[test]
    fn verbose_keeps_dispatch_and_debug() {
        let formatter = EventFormatter::new(FormatterConfig {
            verbose: true,
            ..FormatterConfig::default()
        });
        assert!(formatter.format(&Event::log("debug", "noise")).unwrap().is_some());
        assert!(formatter
            .format(&Event::lifecycle("task_started", "Task started"))
            .unwrap()
            .is_some());
        assert_eq!(
            formatter.format(&Event::lifecycle("task_started", "")).unwrap(),
            None
        );
    }

    #[test]
    fn json_mode_is_verbatim_and_unsuppressed() {
        let formatter = EventFormatter::new(FormatterConfig {
            json: true,
            colors: true,
            verbose: false,
        });
        let event = Event::lifecycle("sending_task", "")
            .with_field("custom", json!({"k": [1, 2]}));
        let line = formatter.format(&event).unwrap().unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, serde_json::to_value(&event).unwrap());
        assert!(!line.contains('\x1b'));
    }

    #[test]
    fn colored_operation_info_nests() {
        let line = colored().format(&node_event()).unwrap().unwrap();
        let expected_info =
            format!("{GREEN}[{BLUE}vm_abc123{GREEN}.{YELLOW}create{GREEN}]{RESET}");
        assert!(line.contains(&expected_info), "line was {line:?}");
        assert!(line.starts_with(&format!("{BLUE}2024-03-01 10:00:00{RESET}")));
        assert!(line.contains(&format!("{MAGENTA}CFY{RESET}")));
        assert!(line.contains(&format!("<{CYAN}dep{RESET}>")));
        assert!(line.ends_with(&format!("{GREEN}Task succeeded 'script.runner.tasks.run'{RESET}")));
    }

    #[test]
    fn colored_log_level() {
        let line = colored().format(&Event::log("error", "boom")).unwrap().unwrap();
        assert_eq!(line, format!("{YELLOW}LOG{RESET} {RED}ERROR{RESET}: boom"));
    }

    #[test]
    fn colors_disabled_emit_no_escapes() {
        let line = text().format(&node_event()).unwrap().unwrap();
        assert!(!line.contains('\x1b'));
    }

    #[test]
    fn write_events_counts_lines() {
        let events = vec![
            node_event(),
            Event::lifecycle("task_started", "hidden"),
            Event::log("info", "shown"),
        ];
        let mut buf = Vec::new();
        let written = text().write_events(&mut buf, &events).unwrap();
        assert_eq!(written, 2);
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 2);
    }

    #[test]
    fn multi_line_message_stays_on_one_line() {
        let events = vec![Event::log("error", "Traceback:\n  File x\nRuntimeError: boom")];

        let mut buf = Vec::new();
        let written = text().write_events(&mut buf, &events).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(written, 1);
        assert_eq!(out, "LOG ERROR: Traceback:\n");

        let verbose = EventFormatter::new(FormatterConfig {
            verbose: true,
            ..FormatterConfig::default()
        });
        let mut buf = Vec::new();
        let written = verbose.write_events(&mut buf, &events).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(written, 1);
        assert_eq!(out.lines().count(), 1);
        assert_eq!(out, "LOG ERROR: Traceback:\\n  File x\\nRuntimeError: boom\n");
    }

    #[test_case("first\r\nsecond", false, "first" ; "crlf first line")]
    #[test_case("\n\nlate start\nmore", false, "late start" ; "leading blank lines")]
    #[test_case("a\r\nb", true, "a\\nb" ; "crlf escaped")]
    #[test_case("plain", true, "plain" ; "single line untouched")]
    fn single_line_messages(raw: &str, verbose: bool, expected: &str) {
        assert_eq!(single_line(raw, verbose), expected);
    }
}
