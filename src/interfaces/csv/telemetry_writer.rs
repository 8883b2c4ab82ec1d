use crate::domain::telemetry::TelemetryEvent;
use crate::error::Result;
use std::io::Write;

/// Writes telemetry events as CSV, one row per event with a header row first.
pub struct TelemetryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TelemetryWriter<W> {
    /// Creates a new `TelemetryWriter` over any `Write` sink (e.g., File, Stdout).
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_events<E>(&mut self, events: E) -> Result<()>
    where
        E: IntoIterator<Item = TelemetryEvent>,
    {
        for event in events {
            self.writer.serialize(event)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
