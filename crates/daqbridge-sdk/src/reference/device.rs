//! Simulated reference device and its waveform-generating channels.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::ReferenceConfig;
use crate::descriptor::{DataDescriptor, DataRule, SampleType, Unit, format_origin};
use crate::device::{Device, DeviceInfo};
use crate::function_block::{FunctionBlock, FunctionBlockType};
use crate::module::DeviceContext;
use crate::packet::DataPacket;
use crate::property::{Property, PropertyObject};
use crate::signal::{SampleSource, Signal};

pub(super) const WAVEFORMS: [&str; 4] = ["Sine", "Rect", "Counter", "Constant"];
const TICKS_PER_SECOND: f64 = 1_000_000.0;

pub(super) fn build(index: usize, info: DeviceInfo, config: &ReferenceConfig, context: &DeviceContext) -> Arc<Device> {
    let device = Device::new(
        &context.parent_global_id,
        &format!("RefDev{index}"),
        info,
        context.modules.clone(),
    );
    device.properties().add_property(
        Property::float("GlobalSampleRate", config.sample_rate)
            .with_min(1.0)
            .with_max(100_000.0)
            .with_unit("Hz")
            .with_description("Sample rate of every channel"),
    );
    device.properties().add_property(
        Property::int("NumberOfChannels", config.channel_count as i64).read_only(),
    );

    for ch in 0..config.channel_count {
        device.add_channel(build_channel(&device, ch, config.sample_rate));
    }
    debug!(device = %device.global_id(), channels = config.channel_count, "reference device built");
    Arc::new(device)
}

fn build_channel(device: &Device, index: usize, sample_rate: f64) -> Arc<FunctionBlock> {
    let fb_type = FunctionBlockType::new("RefChannel", "Reference channel", "Simulated analog input");
    let channel = FunctionBlock::new_channel(device.global_id(), &format!("RefCh{index}"), fb_type);
    channel.add_tag("analog");
    channel.add_tag("reference");

    let props = channel.properties();
    props.add_property(Property::selection("Waveform", &WAVEFORMS, 0));
    props.add_property(
        Property::float("Frequency", 10.0)
            .with_min(0.1)
            .with_max(10_000.0)
            .with_unit("Hz"),
    );
    props.add_property(Property::float("Amplitude", 5.0).with_min(0.0).with_max(10.0).with_unit("V"));
    props.add_property(Property::float("DC", 0.0).with_min(-10.0).with_max(10.0).with_unit("V"));

    let started = Instant::now();
    let delta = (TICKS_PER_SECOND / sample_rate).round().max(1.0) as i64;
    let domain_name = format!("AI{index}Time");
    let domain = Signal::new(channel.global_id(), &domain_name).with_descriptor(
        DataDescriptor::builder()
            .name(&domain_name)
            .sample_type(SampleType::Int64)
            .unit(Unit::new("s", "seconds", "time"))
            .rule(DataRule::linear(delta, 0))
            .origin(&format_origin(Utc::now()))
            .tick_resolution(1, TICKS_PER_SECOND as i64)
            .build(),
    );
    domain.set_public(false);

    let value_name = format!("AI{index}");
    let value = Signal::new(channel.global_id(), &value_name).with_descriptor(
        DataDescriptor::builder()
            .name(&value_name)
            .sample_type(SampleType::Float64)
            .unit(Unit::new("V", "volts", "voltage"))
            .value_range(-10.0, 10.0)
            .build(),
    );
    value.set_domain_signal(Some(domain.clone()));

    channel.add_signal(value.clone());
    channel.add_signal(domain.clone());

    let generator = Arc::new(ChannelGenerator {
        channel: props.clone(),
        device: device.properties().clone(),
        fallback_rate: sample_rate,
        value,
        domain,
        state: Mutex::new(GeneratorState { started, emitted: 0 }),
    });
    channel.set_processor(generator);
    Arc::new(channel)
}

struct GeneratorState {
    started: Instant,
    emitted: u64,
}

/// Produces the samples that are due according to wall-clock time each
/// time a reader pumps the channel's signals.
struct ChannelGenerator {
    channel: PropertyObject,
    device: PropertyObject,
    fallback_rate: f64,
    value: Arc<Signal>,
    domain: Arc<Signal>,
    state: Mutex<GeneratorState>,
}

impl ChannelGenerator {
    fn sample(&self, waveform: i64, index: u64, t: f64) -> f64 {
        let amplitude = self.channel.f64_or("Amplitude", 5.0);
        let dc = self.channel.f64_or("DC", 0.0);
        let phase = TAU * self.channel.f64_or("Frequency", 10.0) * t;
        match waveform {
            0 => dc + amplitude * phase.sin(),
            1 => dc + amplitude * phase.sin().signum(),
            2 => index as f64,
            _ => dc,
        }
    }
}

impl SampleSource for ChannelGenerator {
    fn pump(&self) {
        let rate = self.device.f64_or("GlobalSampleRate", self.fallback_rate).max(1.0);
        let waveform = self.channel.i64_or("Waveform", 0);

        let (first, due) = {
            let mut state = self.state.lock();
            let due = (state.started.elapsed().as_secs_f64() * rate) as u64;
            if due <= state.emitted {
                return;
            }
            // Never emit more than one second of backlog at once.
            let burst = rate as u64;
            if due - state.emitted > burst {
                state.emitted = due - burst;
            }
            let first = state.emitted;
            state.emitted = due;
            (first, due)
        };

        let mut values = Vec::with_capacity((due - first) as usize);
        let mut ticks = Vec::with_capacity(values.capacity());
        for i in first..due {
            let t = i as f64 / rate;
            ticks.push((t * TICKS_PER_SECOND).round() as i64);
            values.push(self.sample(waveform, i, t));
        }
        trace!(signal = %self.value.global_id(), samples = values.len(), "generated");

        self.domain
            .send_packet(&DataPacket::new(ticks.iter().map(|&t| t as f64).collect(), ticks.clone()));
        self.value.send_packet(&DataPacket::new(values, ticks));
    }
}
