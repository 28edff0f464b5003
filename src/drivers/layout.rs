use std::fs;
use std::path::Path;
use log::{debug, info};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use crate::drivers::error::LayoutError;
use crate::drivers::frame::CHANNEL_COUNT;
#[derive(Debug, Deserialize)]
struct LayoutDocument {
    #[serde(default)]
    subplots: Vec<SubplotEntry>,
    // Kept as a raw map so declaration order survives (serde_json preserve_order).
    #[serde(default)]
    channels: serde_json::Map<String, serde_json::Value>,
}
#[derive(Debug, Default, Deserialize)]
struct SubplotEntry {
    title: Option<String>,
    #[serde(default)]
    y_label: Option<String>,
}
#[derive(Debug, Deserialize)]
struct ChannelEntry {
    name: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default = "default_scale")]
    scale: f64,
    #[serde(default, deserialize_with = "saturating_index")]
    subplot: i64,
}
fn default_scale() -> f64 {
    1.0
}
/// Reads any JSON integer, pinning values beyond the i64 range to its ends.
/// Integers past u64 or below i64 arrive as floats; fractions are rejected.
fn saturating_index<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(v) = number.as_i64() {
        return Ok(v);
    }
    if number.as_u64().is_some() {
        return Ok(i64::MAX);
    }
    match number.as_f64() {
        Some(v) if v.fract() == 0.0 => Ok(v as i64),
        _ => Err(de::Error::custom(format!(
            "subplot index must be an integer, got {number}"
        ))),
    }
}
#[derive(Clone, Debug, PartialEq)]
pub struct Subplot {
    pub title: String,
    pub y_label: String,
}
/// A configured line: which sample slot feeds it and where it is drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelBinding {
    pub key: String,
    pub name: String,
    pub unit: String,
    pub scale: f64,
    /// Already clamped into `0..subplots.len()`.
    pub subplot: usize,
    /// Position of the key in the document, i.e. the sample set index.
    pub sample_index: usize,
}
impl ChannelBinding {
    pub fn legend_label(&self) -> String {
        format!("{} [{}]", self.name, self.unit)
    }
}
/// Parsed layout ready for rendering. Always has at least one subplot.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub subplots: Vec<Subplot>,
    pub channels: Vec<ChannelBinding>,
}
impl Layout {
    pub fn load(document: &str) -> Result<Self, LayoutError> {
        let doc: LayoutDocument = serde_json::from_str(document)?;
        Self::from_document(doc)
    }
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layout = Self::load(&raw)?;
        info!(
            "loaded layout {}: {} subplot(s), {} channel(s)",
            path.display(),
            layout.subplots.len(),
            layout.channels.len()
        );
        Ok(layout)
    }
    fn from_document(doc: LayoutDocument) -> Result<Self, LayoutError> {
        if doc.channels.len() > CHANNEL_COUNT {
            return Err(LayoutError::TooManyChannels {
                declared: doc.channels.len(),
                max: CHANNEL_COUNT,
            });
        }
        let mut entries = doc.subplots;
        if entries.is_empty() {
            entries.push(SubplotEntry::default());
        }
        let subplots: Vec<Subplot> = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| Subplot {
                title: entry.title.unwrap_or_else(|| format!("Plot {}", i + 1)),
                y_label: entry.y_label.unwrap_or_default(),
            })
            .collect();
        let last = subplots.len() as i64 - 1;
        let mut channels = Vec::with_capacity(doc.channels.len());
        for (sample_index, (key, value)) in doc.channels.into_iter().enumerate() {
            let entry: ChannelEntry = serde_json::from_value(value)?;
            let subplot = entry.subplot.clamp(0, last) as usize;
            debug!("channel {key}: sample {sample_index}, subplot {subplot}");
            channels.push(ChannelBinding {
                name: entry.name.unwrap_or_else(|| key.clone()),
                key,
                unit: entry.unit.unwrap_or_default(),
                scale: entry.scale,
                subplot,
                sample_index,
            });
        }
        Ok(Self { subplots, channels })
    }
    /// Bindings drawn in `subplot` with their line index, in declaration order.
    pub fn channels_in(&self, subplot: usize) -> impl Iterator<Item = (usize, &ChannelBinding)> {
        self.channels
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.subplot == subplot)
    }
}
