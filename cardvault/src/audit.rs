//! Append-only security audit log.
//!
//! Handlers emit audit events as plain `tracing` events with
//! `target: "audit"`. [`audit_layer`] routes exactly those events (INFO and
//! above) to a file, one line per event:
//!
//! ```text
//! [2026-10-18 14:03:11,482] WARNING in handlers: failed login attempt username="mallory"
//! ```

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

pub const AUDIT_TARGET: &str = "audit";

/// Formats an event as `[timestamp] LEVEL in module: message key=value...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditFormat;

impl<S, N> FormatEvent<S, N> for AuditFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(
            writer,
            "[{}] {} in {}: ",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            level_name(metadata.level()),
            module_name(metadata.module_path()),
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Builds the file layer for audit events. The file is opened for append and
/// created when missing.
pub fn audit_layer<S>(path: &Path) -> std::io::Result<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Ok(tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .event_format(AuditFormat)
        .with_filter(Targets::new().with_target(AUDIT_TARGET, Level::INFO)))
}

fn level_name(level: &Level) -> &'static str {
    if *level == Level::WARN {
        "WARNING"
    } else {
        level.as_str()
    }
}

fn module_name(module_path: Option<&str>) -> &str {
    module_path
        .and_then(|path| path.rsplit("::").next())
        .unwrap_or("unknown")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    use super::{audit_layer, level_name, module_name};

    #[test]
    fn warn_is_spelled_out() {
        assert_eq!(level_name(&Level::WARN), "WARNING");
        assert_eq!(level_name(&Level::INFO), "INFO");
    }

    #[test]
    fn module_name_is_last_path_segment() {
        assert_eq!(module_name(Some("cardvault::http::handlers")), "handlers");
        assert_eq!(module_name(Some("cardvault")), "cardvault");
        assert_eq!(module_name(None), "unknown");
    }

    #[test]
    fn only_audit_events_reach_the_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("security.log");
        let subscriber = Registry::default().with(audit_layer(&path)?);

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "audit", username = ?"mallory", "failed login attempt");
            tracing::info!(target: "audit", "user signed up");
            tracing::debug!(target: "audit", "too chatty");
            tracing::warn!("console only");
        });

        let contents = std::fs::read_to_string(&path)?;
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] WARNING in tests: failed login attempt username=\"mallory\""));
        assert!(lines[1].contains("] INFO in tests: user signed up"));
        assert!(!contents.contains("too chatty"));
        assert!(!contents.contains("console only"));
        Ok(())
    }

    #[test]
    fn existing_log_is_appended_not_truncated() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("security.log");
        std::fs::write(&path, "earlier line\n")?;

        let subscriber = Registry::default().with(audit_layer(&path)?);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "audit", "user logged out");
        });

        let contents = std::fs::read_to_string(&path)?;
        assert!(contents.starts_with("earlier line\n"));
        assert!(contents.contains("INFO in tests: user logged out"));
        Ok(())
    }
}
