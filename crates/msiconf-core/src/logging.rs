use std::fmt::{self, Write as _};

use chrono::{Local, SecondsFormat};
use serde_json::{Map, Number, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};
use crate::settings::{LogFormat, LogSettings};

/// Installs the global console subscriber on stderr. `RUST_LOG` wins over the
/// configured level.
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|err| Error::Logging(format!("invalid log level {:?}: {err}", settings.level)))?;

    let installed = match settings.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .event_format(LineFormat)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init(),
    };
    installed.map_err(|err| Error::Logging(err.to_string()))
}

/// `{timestamp} - {LEVEL} - {message}`, with structured fields as JSON on an
/// indented second line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        let line = render_line(
            &timestamp,
            *event.metadata().level(),
            &visitor.message,
            &visitor.fields,
        );
        writeln!(writer, "{line}")
    }
}

pub fn render_line(
    timestamp: &str,
    level: Level,
    message: &str,
    fields: &Map<String, Value>,
) -> String {
    let mut line = format!("{timestamp} - {level} - {message}");
    if !fields.is_empty() {
        line.push_str("\n\t");
        line.push_str(&Value::Object(fields.clone()).to_string());
    }
    line
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Map<String, Value>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.insert(field, Value::String(rendered));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn line_without_fields_is_single_line() {
        let line = render_line("2024-01-01T00:00:00+00:00", Level::INFO, "ready", &Map::new());
        assert_eq!(line, "2024-01-01T00:00:00+00:00 - INFO - ready");
    }

    #[test]
    fn fields_follow_on_indented_line() {
        let mut fields = Map::new();
        fields.insert("attempt".into(), json!(2));
        fields.insert("dataset_id".into(), json!("2016-09-21_16h06m49s"));

        let line = render_line("ts", Level::WARN, "retrying", &fields);
        assert_eq!(
            line,
            "ts - WARN - retrying\n\t{\"attempt\":2,\"dataset_id\":\"2016-09-21_16h06m49s\"}"
        );
    }
}
