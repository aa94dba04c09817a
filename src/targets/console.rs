use crate::manager::WriteContext;
use crate::targets::{LogEntry, Target};

/// Writes every entry to stdout as it arrives; nothing to flush.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleTarget;

impl Target for ConsoleTarget {
    fn name(&self) -> &str {
        "console"
    }

    #[allow(clippy::print_stdout)]
    fn write(&self, _context: &WriteContext, entry: &LogEntry) {
        println!(
            "{} {:<5} [{}] {}",
            entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            entry.level.as_ref(),
            entry.logger,
            entry.message
        );
    }
}
