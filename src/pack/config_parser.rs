//! Appfilter parsing
//!
//! Streams a pack's `appfilter` document into lookup tables in a single pass,
//! followed by a pass over the `drawable` catalog document for dynamic
//! drawables. A malformed construct is logged and skipped; only an unreadable
//! or syntactically broken appfilter fails the whole parse.

use crate::error::{IconPackError, Result, StringError};
use crate::graphics::ClockMetadata;
use crate::model::ComponentName;
use crate::pack::dynamic::DynamicMetadata;
use crate::pack::entry::PackEntry;
use crate::pack::mask::{IconMask, MAX_ICON_SCALE, MIN_ICON_SCALE, is_valid_scale};
use crate::pack::xml::{Tag, TagReader};
use crate::platform::{PackResources, ResourceId, ResourceKind, parse_reference};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the main pack document
pub const APPFILTER: &str = "appfilter";

/// Name of the catalog document
pub const DRAWABLE_CATALOG: &str = "drawable";

const COMPONENT_PREFIX: &str = "ComponentInfo{";
const COMPONENT_SUFFIX: &str = "}";

/// Scale factors above this value are dimension resource ids
const DIMEN_ID_THRESHOLD: f64 = 2_131_165_184.0; // 0x7f070000

/// Lookup tables of one pack, immutable once built
#[derive(Debug, Default)]
pub struct PackTables {
    /// Direct component bindings
    pub components: HashMap<ComponentName, Arc<PackEntry>>,
    /// Calendar bindings: drawable prefix completed with the day of month
    pub calendars: HashMap<ComponentName, String>,
    /// Clock metadata by drawable id
    pub clocks: HashMap<ResourceId, ClockMetadata>,
    /// Dynamic drawable metadata by drawable id
    pub dynamic_drawables: HashMap<ResourceId, DynamicMetadata>,
    /// Compositing layers
    pub mask: IconMask,
}

/// Fetch a pack document by name
///
/// Looks for a packaged XML resource first and falls back to
/// `assets/<name>.xml`. Returns `None` when neither exists.
pub fn read_document(resources: &dyn PackResources, name: &str) -> Option<String> {
    let result = match resources.identifier(name, ResourceKind::Xml) {
        Some(id) => resources.xml(id),
        None => resources.asset(&format!("{name}.xml")),
    };
    match result {
        Ok(document) => Some(document),
        Err(e) => {
            debug!("No {name} document: {e}");
            None
        }
    }
}

/// Strip an optional `ComponentInfo{...}` wrapper and parse the component
pub fn parse_component(value: &str) -> Option<ComponentName> {
    let flat = value
        .strip_prefix(COMPONENT_PREFIX)
        .and_then(|rest| rest.strip_suffix(COMPONENT_SUFFIX))
        .unwrap_or(value);
    ComponentName::unflatten(flat)
}

/// Parser bound to one pack's resources
pub struct ConfigParser<'a> {
    package: Arc<str>,
    resources: &'a Arc<dyn PackResources>,
    tables: PackTables,
}

impl<'a> ConfigParser<'a> {
    /// Parser for `package`
    pub fn new(package: &str, resources: &'a Arc<dyn PackResources>) -> Self {
        Self {
            package: Arc::from(package),
            resources,
            tables: PackTables::default(),
        }
    }

    fn entry(&self, drawable_name: &str) -> Arc<PackEntry> {
        Arc::new(PackEntry::new(
            Arc::clone(&self.package),
            Arc::clone(self.resources),
            drawable_name,
        ))
    }

    /// Parse both documents into tables
    pub fn parse(mut self) -> Result<PackTables> {
        let appfilter = read_document(self.resources.as_ref(), APPFILTER).ok_or_else(|| {
            IconPackError::PackLoadFailed {
                package: self.package.to_string(),
                source: StringError::new("appfilter document not found"),
            }
        })?;
        self.parse_appfilter(&appfilter)?;

        if let Some(catalog) = read_document(self.resources.as_ref(), DRAWABLE_CATALOG) {
            // The catalog is optional; a broken one only costs dynamic drawables
            if let Err(e) = self.parse_catalog(&catalog) {
                warn!("Failed to parse drawable catalog of {}: {}", self.package, e);
            }
        }
        Ok(self.tables)
    }

    /// Appfilter pass
    pub fn parse_appfilter(&mut self, document: &str) -> Result<()> {
        let mut reader = TagReader::new(document);
        while let Some(tag) = reader.next_start()? {
            match tag.name() {
                "item" | "calendar" => self.parse_binding(&tag),
                "dynamic-clock" => self.parse_clock(&tag),
                "scale" => match self.parse_scale(&tag) {
                    Ok(scale) => self.tables.mask.icon_scale = scale,
                    Err(e) => warn!("Ignoring scale of {}: {}", self.package, e),
                },
                "iconback" => {
                    let entries = self.layer_entries(&tag);
                    self.tables.mask.back_entries.extend(entries);
                }
                "iconmask" => {
                    let entries = self.layer_entries(&tag);
                    self.tables.mask.mask_entries.extend(entries);
                }
                "iconupon" => {
                    let entries = self.layer_entries(&tag);
                    self.tables.mask.upon_entries.extend(entries);
                }
                "config" => {
                    if let Some(value) = tag.attr("onlyMaskLegacy").filter(|v| !v.is_empty()) {
                        self.tables.mask.only_mask_legacy = value.eq_ignore_ascii_case("true");
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_binding(&mut self, tag: &Tag) {
        let is_calendar = tag.name() == "calendar";
        let target = tag.attr(if is_calendar { "prefix" } else { "drawable" });
        let (Some(component), Some(target)) = (tag.attr("component"), target) else {
            return;
        };
        let Some(component) = parse_component(component) else {
            return;
        };
        if is_calendar {
            self.tables.calendars.insert(component, target.to_string());
        } else {
            let entry = self.entry(target);
            self.tables.components.insert(component, entry);
        }
    }

    fn parse_clock(&mut self, tag: &Tag) {
        let Some(name) = tag.attr("drawable") else {
            return;
        };
        let Some(id) = self.resources.identifier(name, ResourceKind::Drawable) else {
            debug!("Dropping clock {name} of {}: no such drawable", self.package);
            return;
        };
        self.tables.clocks.insert(
            id,
            ClockMetadata {
                hour_layer: tag.int_attr("hourLayerIndex", -1),
                minute_layer: tag.int_attr("minuteLayerIndex", -1),
                second_layer: tag.int_attr("secondLayerIndex", -1),
                default_hour: tag.int_attr("defaultHour", 0),
                default_minute: tag.int_attr("defaultMinute", 0),
                default_second: tag.int_attr("defaultSecond", 0),
            },
        );
    }

    /// Scale factor of a `scale` tag, rejected when outside the supported range
    fn parse_scale(&self, tag: &Tag) -> Result<f32> {
        let scale = self.parse_scale_factor(tag)?;
        if is_valid_scale(scale) {
            Ok(scale)
        } else {
            Err(IconPackError::ConfigError(StringError::new(format!(
                "scale factor {scale} outside {MIN_ICON_SCALE}..={MAX_ICON_SCALE}"
            ))))
        }
    }

    /// Literal factor, `@dimen/name`, or a numeric dimension id
    fn parse_scale_factor(&self, tag: &Tag) -> Result<f32> {
        let factor = tag
            .attr("factor")
            .ok_or_else(|| IconPackError::ConfigError(StringError::new("scale without factor")))?
            .trim();

        if let Some((kind, name)) = parse_reference(factor) {
            let id = self
                .resources
                .identifier(name, kind)
                .ok_or_else(|| IconPackError::not_found(kind, name))?;
            return self.resources.dimension(id);
        }

        let value: f64 = factor.parse().map_err(|_| {
            IconPackError::ConfigError(StringError::new(format!("invalid scale factor {factor}")))
        })?;
        if value > DIMEN_ID_THRESHOLD {
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "value is a positive resource id within u32 range"
            )]
            let id = value as ResourceId;
            return self.resources.dimension(id);
        }
        #[expect(clippy::cast_possible_truncation, reason = "scale factors are small")]
        let scale = value as f32;
        Ok(scale)
    }

    fn layer_entries(&self, tag: &Tag) -> Vec<Arc<PackEntry>> {
        tag.attributes()
            .filter(|(key, value)| key.starts_with("img") && !value.is_empty())
            .map(|(_, value)| self.entry(value))
            .collect()
    }

    /// Catalog pass collecting `dynamic_drawable` items
    pub fn parse_catalog(&mut self, document: &str) -> Result<()> {
        let mut reader = TagReader::new(document);
        while let Some(tag) = reader.next_start()? {
            if tag.name() != "item" {
                continue;
            }
            let Some(name) = tag.attr("dynamic_drawable") else {
                continue;
            };
            let Some(id) = self.resources.identifier(name, ResourceKind::Drawable) else {
                continue;
            };
            match tag.attr("xml") {
                Some(path) => {
                    self.tables
                        .dynamic_drawables
                        .insert(id, DynamicMetadata::new(path, self.package.as_ref()));
                }
                None => warn!("Dynamic drawable {name} of {} has no metadata path", self.package),
            }
        }
        Ok(())
    }
}

/// Parse the documents of `package`
pub fn parse_pack(package: &str, resources: &Arc<dyn PackResources>) -> Result<PackTables> {
    ConfigParser::new(package, resources).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::Drawable;
    use crate::platform::MemoryResources;
    use image::Rgba;

    fn color() -> Drawable {
        Drawable::Color(Rgba([0, 0, 0, 255]))
    }

    fn pack(appfilter: &str) -> Arc<dyn PackResources> {
        Arc::new(
            MemoryResources::new()
                .with_xml(APPFILTER, appfilter)
                .with_drawable("app_icon", color())
                .with_drawable("clock", color())
                .with_drawable("back1", color())
                .with_drawable("mask1", color())
                .with_dimen("icon_scale", 0.8),
        )
    }

    #[test]
    fn parses_bindings() {
        let resources = pack(
            r#"<resources>
                <item component="ComponentInfo{com.app/com.app.Main}" drawable="app_icon"/>
                <item component="com.other/.Launcher" drawable="other"/>
                <item component="broken" drawable="x"/>
                <item drawable="no_component"/>
                <calendar component="ComponentInfo{com.cal/com.cal.Main}" prefix="cal_"/>
            </resources>"#,
        );
        let tables = parse_pack("com.pack", &resources).unwrap();
        assert_eq!(tables.components.len(), 2);
        let entry = &tables.components[&ComponentName::new("com.app", "com.app.Main")];
        assert_eq!(entry.drawable_name(), "app_icon");
        assert!(tables
            .components
            .contains_key(&ComponentName::new("com.other", "com.other.Launcher")));
        assert_eq!(
            tables.calendars[&ComponentName::new("com.cal", "com.cal.Main")],
            "cal_"
        );
        assert!(!tables.mask.has_mask());
    }

    #[test]
    fn parses_mask_layers_scale_and_config() {
        let resources = pack(
            r#"<resources>
                <iconback img1="back1" img2="" other="ignored"/>
                <iconmask img1="mask1"/>
                <iconupon img="upon_missing"/>
                <scale factor="0.75"/>
                <config onlyMaskLegacy="TRUE"/>
            </resources>"#,
        );
        let tables = parse_pack("com.pack", &resources).unwrap();
        let mask = &tables.mask;
        assert_eq!(mask.back_entries.len(), 1);
        assert_eq!(mask.mask_entries.len(), 1);
        assert_eq!(mask.upon_entries.len(), 1);
        assert!((mask.icon_scale - 0.75).abs() < f32::EPSILON);
        assert!(mask.only_mask_legacy);
        assert!(mask.has_mask());
    }

    #[test]
    fn scale_resolves_dimension_references() {
        let resources = pack(r#"<resources><scale factor="@dimen/icon_scale"/></resources>"#);
        let tables = parse_pack("com.pack", &resources).unwrap();
        assert!((tables.mask.icon_scale - 0.8).abs() < f32::EPSILON);

        let id = resources.identifier("icon_scale", ResourceKind::Dimen).unwrap();
        let resources = pack(&format!(r#"<resources><scale factor="{id}"/></resources>"#));
        let tables = parse_pack("com.pack", &resources).unwrap();
        assert!((tables.mask.icon_scale - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn bad_scale_keeps_default_and_parsing_continues() {
        let resources = pack(
            r#"<resources>
                <scale factor="huge"/>
                <scale/>
                <item component="com.app/com.app.Main" drawable="app_icon"/>
            </resources>"#,
        );
        let tables = parse_pack("com.pack", &resources).unwrap();
        assert!((tables.mask.icon_scale - 1.0).abs() < f32::EPSILON);
        assert_eq!(tables.components.len(), 1);
    }

    #[test]
    fn out_of_range_scale_is_rejected() {
        for factor in ["-100000000", "0", "NaN", "inf", "3.5", "@dimen/too_big"] {
            let resources: Arc<dyn PackResources> = Arc::new(
                MemoryResources::new()
                    .with_xml(
                        APPFILTER,
                        &format!(r#"<resources><scale factor="{factor}"/><iconback img1="back1"/></resources>"#),
                    )
                    .with_drawable("back1", color())
                    .with_dimen("too_big", 1e9),
            );
            let tables = parse_pack("com.pack", &resources).unwrap();
            assert!((tables.mask.icon_scale - 1.0).abs() < f32::EPSILON, "factor {factor}");
            assert_eq!(tables.mask.back_entries.len(), 1);
        }
    }

    #[test]
    fn clocks_need_resolvable_drawables() {
        let resources = pack(
            r#"<resources>
                <dynamic-clock drawable="clock" hourLayerIndex="1" minuteLayerIndex="2" defaultHour="10"/>
                <dynamic-clock drawable="missing_clock" hourLayerIndex="1"/>
            </resources>"#,
        );
        let tables = parse_pack("com.pack", &resources).unwrap();
        assert_eq!(tables.clocks.len(), 1);
        let id = resources.identifier("clock", ResourceKind::Drawable).unwrap();
        let metadata = tables.clocks[&id];
        assert_eq!(metadata.hour_layer, 1);
        assert_eq!(metadata.minute_layer, 2);
        assert_eq!(metadata.second_layer, -1);
        assert_eq!(metadata.default_hour, 10);
    }

    #[test]
    fn catalog_pass_collects_dynamic_drawables() {
        let resources: Arc<dyn PackResources> = Arc::new(
            MemoryResources::new()
                .with_xml(APPFILTER, "<resources/>")
                .with_xml(
                    DRAWABLE_CATALOG,
                    r#"<resources>
                        <item drawable="plain"/>
                        <item dynamic_drawable="clock" xml="dynamic/clock.xml"/>
                        <item dynamic_drawable="unknown" xml="dynamic/x.xml"/>
                    </resources>"#,
                )
                .with_drawable("clock", color()),
        );
        let tables = parse_pack("com.pack", &resources).unwrap();
        assert_eq!(tables.dynamic_drawables.len(), 1);
        let id = resources.identifier("clock", ResourceKind::Drawable).unwrap();
        assert_eq!(tables.dynamic_drawables[&id].xml_path(), "dynamic/clock.xml");
    }

    #[test]
    fn appfilter_falls_back_to_assets() {
        let resources: Arc<dyn PackResources> = Arc::new(MemoryResources::new().with_asset(
            "appfilter.xml",
            r#"<resources><item component="com.app/com.app.Main" drawable="a"/></resources>"#,
        ));
        let tables = parse_pack("com.pack", &resources).unwrap();
        assert_eq!(tables.components.len(), 1);
    }

    #[test]
    fn missing_or_broken_appfilter_fails() {
        let empty: Arc<dyn PackResources> = Arc::new(MemoryResources::new());
        assert!(matches!(
            parse_pack("com.pack", &empty),
            Err(IconPackError::PackLoadFailed { .. })
        ));

        let broken = pack("<resources><item></resources>");
        assert!(matches!(parse_pack("com.pack", &broken), Err(IconPackError::XmlError(_))));
    }
}
