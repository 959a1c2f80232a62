use {
    crate::record::LogRecord,
    chrono::FixedOffset,
};

/// Field that overrides the application name of a single record.
pub const APP_NAME_FIELD: &str = "appName";

/// Turns a record into the bytes written to the active file.
pub trait Formatter: Send + 'static {
    fn format(&self, record: &LogRecord) -> String;
}

/// Journalctl-style lines: `Apr 01 19:55:00 host app[pid]: message`.
#[derive(Debug, Clone)]
pub struct JournalFormatter {
    hostname: String,
    app_name: String,
    pid: u32,
    offset: FixedOffset,
}

impl JournalFormatter {
    pub fn new(app_name: impl Into<String>, offset: FixedOffset) -> Self {
        JournalFormatter {
            hostname: hostname(),
            app_name: app_name.into(),
            pid: std::process::id(),
            offset,
        }
    }

    pub fn with_hostname(self, hostname: impl Into<String>) -> Self {
        JournalFormatter {
            hostname: hostname.into(),
            ..self
        }
    }
}

impl Formatter for JournalFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let timestamp = record.timestamp.with_timezone(&self.offset).format("%b %d %H:%M:%S");
        let app_name = record.field(APP_NAME_FIELD);
        format!(
            "{} {} {}[{}]: {}\n",
            timestamp,
            self.hostname,
            app_name.as_deref().unwrap_or(&self.app_name),
            self.pid,
            record.message
        )
    }
}

#[cfg(unix)]
fn hostname() -> String {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(not(unix))]
fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}
