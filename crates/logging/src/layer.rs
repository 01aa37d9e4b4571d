use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use boutique_core::model::log::LogLine;
use boutique_core::time::format_log_timestamp;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use crate::trace_context::TraceContext;

/// Writes every event as one JSON line with `trace_id` and `span_id` always present.
///
/// The emitter name is the configured logger name, or the event target when unset.
pub struct JsonLogLayer<W = fn() -> io::Stdout> {
    name: Option<String>,
    make_writer: W,
}

impl JsonLogLayer {
    pub fn new() -> Self {
        Self {
            name: None,
            make_writer: io::stdout,
        }
    }
}

impl Default for JsonLogLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> JsonLogLayer<W> {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_writer<W2>(self, make_writer: W2) -> JsonLogLayer<W2>
    where
        W2: for<'w> MakeWriter<'w> + 'static,
    {
        JsonLogLayer {
            name: self.name,
            make_writer,
        }
    }

    fn render<S>(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> LogLine
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let meta = event.metadata();
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let trace = ctx
            .event_span(event)
            .map(|span| TraceContext::from_span(&span))
            .unwrap_or_default();

        let mut line = LogLine {
            timestamp: format_log_timestamp(Utc::now()),
            severity: severity_label(meta.level()).to_string(),
            name: self
                .name
                .clone()
                .unwrap_or_else(|| meta.target().to_string()),
            filename: meta.file().map(file_name).unwrap_or_default(),
            lineno: meta.line().unwrap_or(0),
            // explicit ids on the event win over the span context
            trace_id: visitor
                .trace_id
                .unwrap_or_else(|| trace.trace_id.to_string()),
            span_id: visitor
                .span_id
                .unwrap_or_else(|| trace.span_id.to_string()),
            message: visitor.message.unwrap_or_default(),
            fields: Map::new(),
        };
        for (key, value) in visitor.fields {
            line.insert_field(&key, value);
        }
        line
    }
}

impl<S, W> Layer<S> for JsonLogLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let line = self.render(event, &ctx).to_json_line();
        let mut writer = self.make_writer.make_writer_for(event.metadata());
        let _ = writer.write_all(line.as_bytes());
    }
}

fn severity_label(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARN",
        Level::ERROR => "ERROR",
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    trace_id: Option<String>,
    span_id: Option<String>,
    fields: Vec<(String, Value)>,
}

impl JsonVisitor {
    fn record_value(&mut self, field: &Field, value: Value) {
        match field.name() {
            // bridged `log` records carry their own metadata fields
            name if name.starts_with("log.") => {}
            "trace_id" | "span_id" => {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                if text.is_empty() {
                    return;
                }
                if field.name() == "trace_id" {
                    self.trace_id = Some(text);
                } else {
                    self.span_id = Some(text);
                }
            }
            name => self.fields.push((name.to_string(), value)),
        }
    }
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
            return;
        }
        self.record_value(field, Value::String(rendered));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
            return;
        }
        self.record_value(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, Value::String(value.to_string()));
    }
}
