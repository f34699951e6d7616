//! Data descriptors: the metadata that tells a consumer how to interpret the
//! samples of a signal, plus their JSON document form.
//!
//! The JSON document has a single `dataDescriptor` root:
//!
//! ```json
//! { "dataDescriptor": { "name": "AI0", "sampleType": 2, "unit": { "symbol": "V" } } }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use daqbridge_types::{DaqError, DaqResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::value::Ratio;

/// Element type of the samples in a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum SampleType {
    #[default]
    Invalid = 0,
    Float32 = 1,
    Float64 = 2,
    UInt8 = 3,
    Int8 = 4,
    UInt16 = 5,
    Int16 = 6,
    UInt32 = 7,
    Int32 = 8,
    UInt64 = 9,
    Int64 = 10,
    RangeInt64 = 11,
    ComplexFloat32 = 12,
    ComplexFloat64 = 13,
    Binary = 14,
    String = 15,
    Struct = 16,
}

const SAMPLE_TYPES: [SampleType; 17] = [
    SampleType::Invalid,
    SampleType::Float32,
    SampleType::Float64,
    SampleType::UInt8,
    SampleType::Int8,
    SampleType::UInt16,
    SampleType::Int16,
    SampleType::UInt32,
    SampleType::Int32,
    SampleType::UInt64,
    SampleType::Int64,
    SampleType::RangeInt64,
    SampleType::ComplexFloat32,
    SampleType::ComplexFloat64,
    SampleType::Binary,
    SampleType::String,
    SampleType::Struct,
];

impl From<SampleType> for i32 {
    fn from(t: SampleType) -> Self {
        t as i32
    }
}

impl TryFrom<i32> for SampleType {
    type Error = String;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        usize::try_from(v)
            .ok()
            .and_then(|i| SAMPLE_TYPES.get(i).copied())
            .ok_or_else(|| format!("unknown sample type {v}"))
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Kind of a data rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum RuleType {
    Other = 0,
    Linear = 1,
    Constant = 2,
    #[default]
    Explicit = 3,
}

impl From<RuleType> for i32 {
    fn from(t: RuleType) -> Self {
        t as i32
    }
}

impl TryFrom<i32> for RuleType {
    type Error = String;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(RuleType::Other),
            1 => Ok(RuleType::Linear),
            2 => Ok(RuleType::Constant),
            3 => Ok(RuleType::Explicit),
            _ => Err(format!("unknown rule type {v}")),
        }
    }
}

/// Kind of a dimension rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum DimensionRuleType {
    #[default]
    Other = 0,
    Linear = 1,
    Logarithmic = 2,
    List = 3,
}

impl From<DimensionRuleType> for i32 {
    fn from(t: DimensionRuleType) -> Self {
        t as i32
    }
}

impl TryFrom<i32> for DimensionRuleType {
    type Error = String;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(DimensionRuleType::Other),
            1 => Ok(DimensionRuleType::Linear),
            2 => Ok(DimensionRuleType::Logarithmic),
            3 => Ok(DimensionRuleType::List),
            _ => Err(format!("unknown dimension rule type {v}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ScalingType {
    Other = 0,
    #[default]
    Linear = 1,
}

impl From<ScalingType> for i32 {
    fn from(t: ScalingType) -> Self {
        t as i32
    }
}

impl TryFrom<i32> for ScalingType {
    type Error = String;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(ScalingType::Other),
            1 => Ok(ScalingType::Linear),
            _ => Err(format!("unknown scaling type {v}")),
        }
    }
}

/// Physical unit of a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Unit {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub quantity: String,
}

impl Default for Unit {
    fn default() -> Self {
        Self {
            id: -1,
            symbol: String::new(),
            name: String::new(),
            quantity: String::new(),
        }
    }
}

impl Unit {
    pub fn new(symbol: &str, name: &str, quantity: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            quantity: quantity.to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str(&self.symbol)
        } else {
            write!(f, "{} ({})", self.symbol, self.name)
        }
    }
}

/// Expected value range, serialized as `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl From<[f64; 2]> for Range {
    fn from([low, high]: [f64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<Range> for [f64; 2] {
    fn from(r: Range) -> Self {
        [r.low, r.high]
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

/// How sample values are produced: explicitly carried, constant, or a
/// linear function of the sample index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataRule {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(flatten)]
    pub parameters: BTreeMap<String, JsonValue>,
}

impl DataRule {
    pub fn explicit() -> Self {
        Self::default()
    }

    pub fn linear(delta: i64, start: i64) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("delta".to_string(), JsonValue::from(delta));
        parameters.insert("start".to_string(), JsonValue::from(start));
        Self {
            rule_type: RuleType::Linear,
            parameters,
        }
    }

    pub fn constant(value: f64) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("constant".to_string(), JsonValue::from(value));
        Self {
            rule_type: RuleType::Constant,
            parameters,
        }
    }

    /// `(delta, start)` of a linear rule.
    pub fn linear_parameters(&self) -> Option<(i64, i64)> {
        if self.rule_type != RuleType::Linear {
            return None;
        }
        let delta = self.parameters.get("delta")?.as_i64()?;
        let start = self.parameters.get("start").and_then(JsonValue::as_i64).unwrap_or(0);
        Some((delta, start))
    }
}

impl fmt::Display for DataRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.rule_type)?;
        for (k, v) in &self.parameters {
            write!(f, " {k}={v}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionRule {
    #[serde(rename = "type")]
    pub rule_type: DimensionRuleType,
    #[serde(flatten)]
    pub parameters: BTreeMap<String, JsonValue>,
}

impl DimensionRule {
    pub fn linear(delta: f64, start: f64, size: i64) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("delta".to_string(), JsonValue::from(delta));
        parameters.insert("start".to_string(), JsonValue::from(start));
        parameters.insert("size".to_string(), JsonValue::from(size));
        Self {
            rule_type: DimensionRuleType::Linear,
            parameters,
        }
    }
}

/// One dimension of a multi-dimensional sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dimension {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    pub rule: DimensionRule,
}

/// Post-scaling applied to raw samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scaling {
    #[serde(rename = "type")]
    pub scaling_type: ScalingType,
    pub input_sample_type: SampleType,
    pub output_sample_type: SampleType,
    #[serde(flatten)]
    pub parameters: BTreeMap<String, JsonValue>,
}

impl Scaling {
    pub fn linear(input: SampleType, output: SampleType, scale: f64, offset: f64) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("scale".to_string(), JsonValue::from(scale));
        parameters.insert("offset".to_string(), JsonValue::from(offset));
        Self {
            scaling_type: ScalingType::Linear,
            input_sample_type: input,
            output_sample_type: output,
            parameters,
        }
    }
}

/// Metadata describing the samples of a signal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataDescriptor {
    pub name: String,
    pub sample_type: SampleType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_range: Option<Range>,
    pub rule: DataRule,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_resolution: Option<Ratio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_scaling: Option<Scaling>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub struct_fields: Vec<DataDescriptor>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct DescriptorDocument {
    #[serde(rename = "dataDescriptor")]
    data_descriptor: DataDescriptor,
}

impl DataDescriptor {
    pub fn builder() -> DataDescriptorBuilder {
        DataDescriptorBuilder::default()
    }

    /// Serialize into the `dataDescriptor` JSON document.
    ///
    /// # Errors
    ///
    /// [`DaqError::InvalidJson`] if serialization fails (non-finite numbers).
    pub fn to_json(&self) -> DaqResult<String> {
        let doc = DescriptorDocument {
            data_descriptor: self.clone(),
        };
        serde_json::to_string_pretty(&doc).map_err(|e| DaqError::InvalidJson(e.to_string()))
    }

    /// Parse a `dataDescriptor` JSON document.
    ///
    /// # Errors
    ///
    /// [`DaqError::InvalidJson`] when the text is not JSON, has no
    /// `dataDescriptor` root, or the root does not describe a descriptor.
    pub fn from_json(text: &str) -> DaqResult<DataDescriptor> {
        let root: JsonValue = serde_json::from_str(text).map_err(|e| DaqError::InvalidJson(e.to_string()))?;
        if root.get("dataDescriptor").is_none() {
            return Err(DaqError::InvalidJson("missing 'dataDescriptor' root".to_string()));
        }
        let doc: DescriptorDocument =
            serde_json::from_value(root).map_err(|e| DaqError::InvalidJson(e.to_string()))?;
        Ok(doc.data_descriptor)
    }

    /// Convert a domain tick into nanoseconds since the Unix epoch using
    /// this descriptor's origin and tick resolution. An empty origin means
    /// the epoch itself.
    pub fn tick_to_nanos(&self, tick: i64) -> Option<i64> {
        let resolution = self.tick_resolution?;
        if resolution.den == 0 {
            return None;
        }
        let origin_ns = if self.origin.is_empty() {
            0
        } else {
            DateTime::parse_from_rfc3339(&self.origin).ok()?.timestamp_nanos_opt()?
        };
        let offset = i128::from(tick) * i128::from(resolution.num) * 1_000_000_000 / i128::from(resolution.den);
        i64::try_from(i128::from(origin_ns) + offset).ok()
    }
}

/// Render an origin timestamp the way descriptors store it.
pub fn format_origin(origin: DateTime<Utc>) -> String {
    origin.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Default)]
pub struct DataDescriptorBuilder {
    descriptor: DataDescriptor,
}

impl DataDescriptorBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.descriptor.name = name.to_string();
        self
    }

    pub fn sample_type(mut self, sample_type: SampleType) -> Self {
        self.descriptor.sample_type = sample_type;
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.descriptor.unit = Some(unit);
        self
    }

    pub fn value_range(mut self, low: f64, high: f64) -> Self {
        self.descriptor.value_range = Some(Range::new(low, high));
        self
    }

    pub fn rule(mut self, rule: DataRule) -> Self {
        self.descriptor.rule = rule;
        self
    }

    pub fn origin(mut self, origin: &str) -> Self {
        self.descriptor.origin = origin.to_string();
        self
    }

    pub fn tick_resolution(mut self, num: i64, den: i64) -> Self {
        self.descriptor.tick_resolution = Some(Ratio::new(num, den));
        self
    }

    pub fn post_scaling(mut self, scaling: Scaling) -> Self {
        self.descriptor.post_scaling = Some(scaling);
        self
    }

    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.descriptor.dimensions.push(dimension);
        self
    }

    pub fn struct_field(mut self, field: DataDescriptor) -> Self {
        self.descriptor.struct_fields.push(field);
        self
    }

    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.descriptor.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> DataDescriptor {
        self.descriptor
    }
}
