use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::models::MatchEvent;

/// Append-only destination for true-positive match lines.
///
/// Delivery is best-effort: implementations log and drop on failure, they never
/// abort ingestion.
pub trait MatchSink {
    fn emit(&mut self, event: &MatchEvent);
    fn flush(&mut self) {}
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl MatchSink for NullSink {
    fn emit(&mut self, _event: &MatchEvent) {}
}

/// Keeps events in memory; used by tests and callers that post-process matches.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<MatchEvent>,
}

impl MatchSink for MemorySink {
    fn emit(&mut self, event: &MatchEvent) {
        self.events.push(event.clone());
    }
}

/// Buffered CRLF-terminated match lines.
pub struct LineSink<W: Write> {
    writer: BufWriter<W>,
    written: u64,
    dropped: u64,
}

impl LineSink<File> {
    pub fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> LineSink<W> {
    pub fn new(inner: W) -> Self {
        Self { writer: BufWriter::new(inner), written: 0, dropped: 0 }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl<W: Write> MatchSink for LineSink<W> {
    fn emit(&mut self, event: &MatchEvent) {
        match write!(self.writer, "{}\r\n", event) {
            Ok(()) => self.written += 1,
            Err(e) => {
                self.dropped += 1;
                log::warn!("Dropped match line for {} <-> {}: {}", event.existing_id, event.incoming_id, e);
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("Failed to flush match log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use std::io;

    struct Broken;
    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    fn event() -> MatchEvent {
        MatchEvent::new(&Record::new("a1_1", "Ann", "Lee", "", "1"), &Record::new("b1_1", "Ann", "Lee", "", "1"), 1.0)
    }

    #[test]
    fn writes_crlf_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.txt");
        let mut sink = LineSink::create(&path).unwrap();
        sink.emit(&event());
        sink.emit(&event());
        sink.flush();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("\r\n").count(), 2);
        assert!(text.starts_with("MATCH (Score: 1.00): a1_1 (Lee, Ann) <-> b1_1 (Lee, Ann)"));
        assert_eq!(sink.written(), 2);
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        // A zero-capacity buffer forces every write through to the broken writer.
        let mut sink = LineSink { writer: BufWriter::with_capacity(0, Broken), written: 0, dropped: 0 };
        sink.emit(&event());
        sink.flush();
        assert_eq!(sink.dropped(), 1);
        assert_eq!(sink.written(), 0);
    }
}
