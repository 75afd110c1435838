//! The application log line format
//!
//! ```text
//! 2024/05/01 09:15:02:347 [I] [manager.rs] Session open as conn-1
//! ```
//!
//! Local time with milliseconds, a one-letter level, the source file name and
//! the message with its fields.

use std::fmt;

use chrono::{DateTime, Local};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S:%3f";

/// One-letter level tag: `E`, `W`, `I`, `D`, `V`
pub fn level_letter(level: &Level) -> char {
    match *level {
        Level::ERROR => 'E',
        Level::WARN => 'W',
        Level::INFO => 'I',
        Level::DEBUG => 'D',
        Level::TRACE => 'V',
    }
}

/// Everything before the message
pub fn line_prefix(timestamp: &DateTime<Local>, level: &Level, file: &str) -> String {
    format!(
        "{} [{}] [{}]",
        timestamp.format(TIMESTAMP_FORMAT),
        level_letter(level),
        file_name(file)
    )
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// [`FormatEvent`] rendering the application log line
///
/// Events without source location fall back to their target.
#[derive(Debug, Clone, Default)]
pub struct AppLogFormatter {
    _private: (),
}

impl AppLogFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S, N> FormatEvent<S, N> for AppLogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let meta = event.metadata();
        let source = meta.file().unwrap_or_else(|| meta.target());

        write!(writer, "{} ", line_prefix(&Local::now(), meta.level(), source))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use chrono::TimeZone;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_level_letters() {
        let letters: String = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE]
            .iter()
            .map(level_letter)
            .collect();
        assert_eq!(letters, "EWIDV");
    }

    #[test]
    fn test_line_prefix() {
        let timestamp = Local.with_ymd_and_hms(2024, 5, 1, 9, 15, 2).unwrap()
            + chrono::Duration::milliseconds(47);
        assert_eq!(
            line_prefix(&timestamp, &Level::WARN, "crates/client-core/src/client/manager.rs"),
            "2024/05/01 09:15:02:047 [W] [manager.rs]"
        );
        assert_eq!(line_prefix(&timestamp, &Level::INFO, "main.rs"), "2024/05/01 09:15:02:047 [I] [main.rs]");
    }

    #[test]
    fn test_formats_events() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(AppLogFormatter::new())
            .with_writer(move || writer.clone())
            .with_max_level(Level::TRACE)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Session open as {}", "conn-1");
            tracing::trace!(track = "video", "Polled stats");
        });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" [I] [formatter.rs] Session open as conn-1"), "{}", lines[0]);
        assert!(lines[1].ends_with(" [V] [formatter.rs] Polled stats track=\"video\""), "{}", lines[1]);
        // yyyy/MM/dd HH:mm:ss:SSS
        assert_eq!(lines[0].find(" [I]"), Some(23));
    }
}
