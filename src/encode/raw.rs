use anyhow::{Context, Result};
use std::io::{BufWriter, Write};

use super::FrameSink;
use crate::render::instanced::{build_instances, InstanceTransform};
use crate::viz::{Frame, VisualizerConfig};

/// Binary stream of instance buffers: per admitted tick, a little-endian u32
/// instance count followed by that many `InstanceTransform` records in native
/// byte order.
pub struct InstanceSink<W: Write> {
    writer: BufWriter<W>,
    instances: Vec<InstanceTransform>,
    total: u64,
}

impl<W: Write> InstanceSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            instances: Vec::new(),
            total: 0,
        }
    }

    fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush instance output: {}", e.error()))
    }
}

impl<W: Write> FrameSink for InstanceSink<W> {
    fn write_tick(&mut self, _time: f64, frame: Option<&Frame>, config: &VisualizerConfig) -> Result<()> {
        let Some(frame) = frame else {
            return Ok(());
        };
        build_instances(frame.bars(), config, &mut self.instances);
        let count = u32::try_from(self.instances.len()).context("Too many instances in one frame")?;
        self.writer.write_all(&count.to_le_bytes())?;
        self.writer
            .write_all(bytemuck::cast_slice(&self.instances))
            .context("Failed to write instance buffer")?;
        self.total += self.instances.len() as u64;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let total = self.total;
        self.into_inner()?;
        log::info!("Wrote {} instances", total);
        Ok(())
    }
}
