//! Processing function blocks of the reference module.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::descriptor::{DataDescriptor, SampleType};
use crate::function_block::{FunctionBlock, FunctionBlockType};
use crate::input_port::InputPort;
use crate::packet::{DataPacket, Sample};
use crate::property::{Property, PropertyObject};
use crate::signal::{SampleSource, Signal};

pub const SCALING_TYPE_ID: &str = "RefFBModuleScaling";
pub const STATISTICS_TYPE_ID: &str = "RefFBModuleStatistics";

pub(super) fn types() -> Vec<FunctionBlockType> {
    vec![
        FunctionBlockType::new(SCALING_TYPE_ID, "Scaling", "Applies scale and offset to its input"),
        FunctionBlockType::new(
            STATISTICS_TYPE_ID,
            "Statistics",
            "Block-wise average and RMS of its input",
        ),
    ]
}

fn block_type(id: &str) -> FunctionBlockType {
    types()
        .into_iter()
        .find(|t| t.id == id)
        .unwrap_or_else(|| FunctionBlockType::new(id, id, ""))
}

fn output_signal(parent: &str, name: &str) -> Arc<Signal> {
    Signal::new(parent, name).with_descriptor(
        DataDescriptor::builder()
            .name(name)
            .sample_type(SampleType::Float64)
            .build(),
    )
}

/// Make `output` share the domain signal of whatever `input` is connected to.
fn follow_domain(input: &InputPort, outputs: &[&Arc<Signal>]) {
    let domain = input.signal().and_then(|s| s.domain_signal());
    for output in outputs {
        let same = match (output.domain_signal(), &domain) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a, b),
            (None, None) => true,
            _ => false,
        };
        if !same {
            output.set_domain_signal(domain.clone());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scaling
// ─────────────────────────────────────────────────────────────────────────────

struct ScalingProcessor {
    input: Arc<InputPort>,
    output: Arc<Signal>,
    properties: PropertyObject,
}

impl SampleSource for ScalingProcessor {
    fn pump(&self) {
        let samples = self.input.drain();
        if samples.is_empty() {
            return;
        }
        follow_domain(&self.input, &[&self.output]);
        let scale = self.properties.f64_or("Scale", 1.0);
        let offset = self.properties.f64_or("Offset", 0.0);
        let values = samples.iter().map(|s| s.value * scale + offset).collect();
        let ticks = samples.iter().map(|s| s.tick).collect();
        self.output.send_packet(&DataPacket::new(values, ticks));
    }
}

pub(super) fn scaling(parent_global_id: &str, local_id: &str) -> Arc<FunctionBlock> {
    let fb = FunctionBlock::new(parent_global_id, local_id, block_type(SCALING_TYPE_ID));
    fb.properties().add_property(Property::float("Scale", 1.0).with_description("Multiplier"));
    fb.properties().add_property(Property::float("Offset", 0.0).with_description("Added after scaling"));

    let input = InputPort::new(fb.global_id(), "Input", true);
    fb.add_input_port(input.clone());
    let output = output_signal(fb.global_id(), "Output");
    fb.add_signal(output.clone());

    let processor = Arc::new(ScalingProcessor {
        input,
        output,
        properties: fb.properties().clone(),
    });
    fb.set_processor(processor);
    Arc::new(fb)
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics
// ─────────────────────────────────────────────────────────────────────────────

struct StatisticsProcessor {
    input: Arc<InputPort>,
    avg: Arc<Signal>,
    rms: Arc<Signal>,
    properties: PropertyObject,
    pending: Mutex<Vec<Sample>>,
}

impl SampleSource for StatisticsProcessor {
    fn pump(&self) {
        let block_size = self.properties.i64_or("BlockSize", 10).max(1) as usize;
        let mut pending = self.pending.lock();
        pending.extend(self.input.drain());
        if pending.len() < block_size {
            return;
        }

        let mut avg = Vec::new();
        let mut rms = Vec::new();
        let mut ticks = Vec::new();
        while pending.len() >= block_size {
            let block: Vec<Sample> = pending.drain(..block_size).collect();
            let n = block.len() as f64;
            avg.push(block.iter().map(|s| s.value).sum::<f64>() / n);
            rms.push((block.iter().map(|s| s.value * s.value).sum::<f64>() / n).sqrt());
            ticks.push(block[0].tick);
        }
        drop(pending);
        trace!(blocks = ticks.len(), block_size, "statistics computed");

        follow_domain(&self.input, &[&self.avg, &self.rms]);
        self.avg.send_packet(&DataPacket::new(avg, ticks.clone()));
        self.rms.send_packet(&DataPacket::new(rms, ticks));
    }
}

pub(super) fn statistics(parent_global_id: &str, local_id: &str) -> Arc<FunctionBlock> {
    let fb = FunctionBlock::new(parent_global_id, local_id, block_type(STATISTICS_TYPE_ID));
    fb.properties().add_property(
        Property::int("BlockSize", 10)
            .with_min(1.0)
            .with_max(100_000.0)
            .with_description("Samples per output value"),
    );

    let input = InputPort::new(fb.global_id(), "Input", true);
    fb.add_input_port(input.clone());
    let avg = output_signal(fb.global_id(), "Avg");
    let rms = output_signal(fb.global_id(), "Rms");
    avg.add_related_signal(rms.clone());
    fb.add_signal(avg.clone());
    fb.add_signal(rms.clone());

    let processor = Arc::new(StatisticsProcessor {
        input,
        avg,
        rms,
        properties: fb.properties().clone(),
        pending: Mutex::new(Vec::new()),
    });
    fb.set_processor(processor);
    Arc::new(fb)
}
