//! Clock and dynamic drawable handling
//!
//! Packs mark animated icons two ways: `dynamic-clock` tags in the appfilter
//! (clock metadata attached directly to a drawable) and `dynamic_drawable`
//! items in the drawable catalog pointing at a separate metadata document.
//! The metadata document lists layers by key; documents containing clock
//! hands are turned into a layered clock face, anything else is left alone.

use crate::error::{IconPackError, Result};
use crate::graphics::{ClockMetadata, Drawable};
use crate::pack::xml::{TagEvent, TagReader};
use crate::platform::{PackResources, ResourceKind};
use image::RgbaImage;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, warn};

/// Full rotation of the hour hand layer
pub const HOUR_FULL_ROTATION: f32 = 5000.0;
/// Full rotation of the minute hand layer
pub const MINUTE_FULL_ROTATION: f32 = 60000.0;
/// Full rotation of the second hand layer
pub const SECOND_FULL_ROTATION: f32 = 6000.0;

const BACKGROUND: &str = "background";
const HOUR_HAND: &str = "hour_hand";
const MINUTE_HAND: &str = "minute_hand";
const SECOND_HAND: &str = "second_hand";

/// What a dynamic drawable displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicKind {
    /// Day of month
    Calendar,
    /// Current weather
    Weather,
    /// Analog clock
    Clock,
    /// None of the known marker keys
    Untyped,
}

/// One drawable candidate of a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDrawable {
    /// Value this candidate is shown for, if conditional
    pub value: Option<String>,
    /// Drawable resource name
    pub res: String,
}

/// Text layer of a dynamic drawable
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLayer {
    /// Layer key (`day`, `temp`, ...)
    pub key: String,
    /// Horizontal alignment
    pub align: Option<String>,
    /// Horizontal offset
    pub offset_x: f32,
    /// Vertical offset
    pub offset_y: f32,
    /// Text size
    pub size: f32,
    /// Font name
    pub font: Option<String>,
    /// Text color
    pub color: Option<String>,
    /// Shadow as `radius,dx,dy,color`
    pub shadow: Option<String>,
}

/// Parsed metadata document
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicDocument {
    /// Drawable layers by key, in declaration order within each key
    pub layers: BTreeMap<String, Vec<LayerDrawable>>,
    /// Text layers
    pub texts: Vec<TextLayer>,
}

impl DynamicDocument {
    /// Parse a metadata document
    pub fn parse(document: &str) -> Result<Self> {
        let mut layers: BTreeMap<String, Vec<LayerDrawable>> = BTreeMap::new();
        let mut texts = Vec::new();
        let mut current_layer: Option<String> = None;

        let mut reader = TagReader::new(document);
        while let Some(event) = reader.next_event()? {
            match event {
                TagEvent::Start(tag) if tag.name() == "item" => {
                    let Some(key) = tag.attr("key").map(str::to_string) else {
                        continue;
                    };
                    match tag.attr("type") {
                        Some("text") => texts.push(TextLayer {
                            key,
                            align: tag.attr("align").map(str::to_string),
                            offset_x: float_attr(tag.attr("offsetX")),
                            offset_y: float_attr(tag.attr("offsetY")),
                            size: float_attr(tag.attr("size")),
                            font: tag.attr("font").map(str::to_string),
                            color: tag.attr("color").map(str::to_string),
                            shadow: tag.attr("shadow").map(str::to_string),
                        }),
                        _ => {
                            layers.entry(key.clone()).or_default();
                            current_layer = Some(key);
                        }
                    }
                }
                TagEvent::Start(tag) if tag.name() == "drawable" => {
                    if let (Some(layer), Some(res)) = (&current_layer, tag.attr("res")) {
                        layers.entry(layer.clone()).or_default().push(LayerDrawable {
                            value: tag.attr("value").map(str::to_string),
                            res: res.to_string(),
                        });
                    }
                }
                TagEvent::End(name) if name == "item" => current_layer = None,
                _ => {}
            }
        }
        Ok(Self { layers, texts })
    }

    fn has_key(&self, key: &str) -> bool {
        self.layers.contains_key(key) || self.texts.iter().any(|t| t.key == key)
    }

    /// Classify by marker keys: `day`, then `temp`, then `hour_hand`
    pub fn kind(&self) -> DynamicKind {
        if self.has_key("day") {
            DynamicKind::Calendar
        } else if self.has_key("temp") {
            DynamicKind::Weather
        } else if self.has_key(HOUR_HAND) {
            DynamicKind::Clock
        } else {
            DynamicKind::Untyped
        }
    }
}

fn float_attr(value: Option<&str>) -> f32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0.0)
}

/// Reference from a drawable to its metadata document, loaded on first use
pub struct DynamicMetadata {
    xml_path: String,
    package: String,
    document: OnceLock<Option<DynamicDocument>>,
}

impl DynamicMetadata {
    /// Metadata stored at `xml_path` inside `package`
    pub fn new(xml_path: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            xml_path: xml_path.into(),
            package: package.into(),
            document: OnceLock::new(),
        }
    }

    /// Path of the metadata document
    pub fn xml_path(&self) -> &str {
        &self.xml_path
    }

    /// Parse the metadata document once; later calls return the cached result
    pub fn load(&self, resources: &dyn PackResources) -> Option<&DynamicDocument> {
        self.document
            .get_or_init(|| {
                let parsed = read_document(resources, &self.xml_path)
                    .and_then(|text| DynamicDocument::parse(&text));
                match parsed {
                    Ok(document) => Some(document),
                    Err(e) => {
                        warn!(
                            "Failed to load dynamic drawable metadata {} of {}: {}",
                            self.xml_path, self.package, e
                        );
                        None
                    }
                }
            })
            .as_ref()
    }
}

impl fmt::Debug for DynamicMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicMetadata")
            .field("xml_path", &self.xml_path)
            .field("package", &self.package)
            .field("loaded", &self.document.get().is_some())
            .finish()
    }
}

/// Raw asset at `path`, else the XML resource named after the file stem
fn read_document(resources: &dyn PackResources, path: &str) -> Result<String> {
    match resources.asset(path) {
        Ok(text) => Ok(text),
        Err(asset_error) => {
            let file = path.rsplit('/').next().unwrap_or(path);
            let stem = file.strip_suffix(".xml").unwrap_or(file);
            match resources.identifier(stem, ResourceKind::Xml) {
                Some(id) => resources.xml(id),
                None => Err(asset_error),
            }
        }
    }
}

/// Named drawable for a density; failures are logged and yield `None`
pub fn resource_drawable(
    resources: &dyn PackResources,
    package: &str,
    name: &str,
    density: u32,
) -> Option<Drawable> {
    match resources.drawable_named(name, density) {
        Ok(drawable) => Some(drawable),
        Err(e) => {
            debug!("Can't get drawable {name} from {package}: {e}");
            None
        }
    }
}

/// Attach appfilter clock metadata to a drawable
pub fn clock_from_metadata(face: Drawable, metadata: ClockMetadata) -> Drawable {
    Drawable::Clock {
        face: Arc::new(face),
        metadata,
    }
}

/// Build a layered clock from a metadata document
///
/// Layers are stacked background, hour, minute, second; missing layers are
/// omitted. A declared layer with no drawables is an error.
pub fn clock_icon(
    document: &DynamicDocument,
    resources: &dyn PackResources,
    package: &str,
    density: u32,
) -> Result<Drawable> {
    let mut layers = Vec::with_capacity(4);
    for (key, full_rotation) in [
        (BACKGROUND, None),
        (HOUR_HAND, Some(HOUR_FULL_ROTATION)),
        (MINUTE_HAND, Some(MINUTE_FULL_ROTATION)),
        (SECOND_HAND, Some(SECOND_FULL_ROTATION)),
    ] {
        let Some(candidates) = document.layers.get(key) else {
            continue;
        };
        let first = candidates
            .first()
            .ok_or_else(|| IconPackError::EmptyDynamicLayer(key.to_string()))?;
        let Some(drawable) = resource_drawable(resources, package, &first.res, density) else {
            continue;
        };
        layers.push(match full_rotation {
            Some(full_rotation) => Drawable::Rotate {
                inner: Arc::new(drawable),
                full_rotation,
            },
            None => drawable,
        });
    }
    Ok(clock_from_metadata(
        Drawable::Layers(layers),
        ClockMetadata::with_layers(1, 2, 3),
    ))
}

/// Apply dynamic metadata to a resolved drawable
///
/// Only clocks are rendered here; every other kind, and any failure, returns
/// the original drawable.
pub fn dynamic_icon(
    drawable: Drawable,
    metadata: &DynamicMetadata,
    resources: &dyn PackResources,
    package: &str,
    density: u32,
) -> Drawable {
    let Some(document) = metadata.load(resources) else {
        return drawable;
    };
    if document.kind() != DynamicKind::Clock {
        return drawable;
    }
    match clock_icon(document, resources, package, density) {
        Ok(clock) => clock,
        Err(e) => {
            error!("Failed to build clock from {}: {}", metadata.xml_path(), e);
            drawable
        }
    }
}

/// Redresses an already rasterized icon as a clock
pub trait ClockDrawer: Send + Sync {
    /// Combine the raster `icon` with the clock `face`
    fn draw_icon(&self, icon: &RgbaImage, face: &Drawable, metadata: ClockMetadata) -> Drawable;
}

/// Draws the raster icon with the hands of `face` at rest
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticClockDrawer;

impl ClockDrawer for StaticClockDrawer {
    fn draw_icon(&self, icon: &RgbaImage, face: &Drawable, metadata: ClockMetadata) -> Drawable {
        let mut layers = vec![Drawable::bitmap(icon.clone())];
        if let Drawable::Layers(face_layers) = face {
            for index in [metadata.hour_layer, metadata.minute_layer, metadata.second_layer] {
                if let Some(hand) = usize::try_from(index).ok().and_then(|i| face_layers.get(i)) {
                    layers.push(hand.clone());
                }
            }
        }
        clock_from_metadata(Drawable::Layers(layers), metadata)
    }
}

/// `new_icon` counterpart of `dynamic_icon`
pub fn draw_dynamic_icon(
    icon: &RgbaImage,
    metadata: &DynamicMetadata,
    resources: &dyn PackResources,
    package: &str,
    drawer: &dyn ClockDrawer,
    density: u32,
) -> Option<Drawable> {
    let document = metadata.load(resources)?;
    if document.kind() != DynamicKind::Clock {
        return None;
    }
    match clock_icon(document, resources, package, density) {
        Ok(Drawable::Clock { face, metadata }) => Some(drawer.draw_icon(icon, &face, metadata)),
        Ok(_) => None,
        Err(e) => {
            error!("Failed to build clock from {}: {}", metadata.xml_path(), e);
            None
        }
    }
}
