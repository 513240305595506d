use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufWriter, Write};

use super::FrameSink;
use crate::viz::{Frame, VisualizerConfig};

#[derive(Debug, Serialize)]
struct TickRecord<'a> {
    tick: u64,
    time: f64,
    #[serde(flatten)]
    frame: &'a Frame,
}

/// Writes one JSON object per admitted tick. Throttled ticks are skipped but
/// still advance the tick counter.
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
    tick: u64,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            tick: 0,
            written: 0,
        }
    }

    fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush JSON output: {}", e.error()))
    }
}

impl<W: Write> FrameSink for JsonLinesSink<W> {
    fn write_tick(&mut self, time: f64, frame: Option<&Frame>, _config: &VisualizerConfig) -> Result<()> {
        let tick = self.tick;
        self.tick += 1;
        let Some(frame) = frame else {
            return Ok(());
        };
        serde_json::to_writer(&mut self.writer, &TickRecord { tick, time, frame })
            .context("Failed to serialize frame")?;
        self.writer.write_all(b"\n").context("Failed to write JSON output")?;
        self.written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let written = self.written;
        self.into_inner()?;
        log::info!("Wrote {} frame records", written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::{BarDrawState, Growth, Placement};

    #[test]
    fn records_are_one_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let config = VisualizerConfig::default();
        let bar = BarDrawState {
            index: 0,
            height: 12.5,
            tip_height: None,
            placement: Placement::Linear { x: 4.0, y: 100.0, growth: Growth::Up },
            width: 6.0,
            mirrored: false,
            segments: None,
        };
        sink.write_tick(0.0, Some(&Frame::Bars(vec![bar])), &config).unwrap();
        sink.write_tick(0.016, None, &config).unwrap();
        sink.write_tick(0.033, Some(&Frame::Idle), &config).unwrap();

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["tick"], 0);
        assert_eq!(lines[0]["state"], "bars");
        assert_eq!(lines[0]["bars"][0]["height"], 12.5);
        assert_eq!(lines[0]["bars"][0]["placement"]["kind"], "linear");
        assert_eq!(lines[1]["tick"], 2);
        assert_eq!(lines[1]["state"], "idle");
    }
}
