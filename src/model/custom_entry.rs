//! Portable reference to a user-chosen icon
//!
//! A `CustomIconEntry` names a pack, an optional icon inside it and an optional
//! argument. It is persisted as `pack|icon|arg`. Older settings used
//! `pack/icon`, and the URI pack used `lawnchairUriPack/<uri>|<arg>`; both are
//! still accepted on read, only the canonical form is ever written.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Identifier of the pack that resolves arbitrary external images
pub const URI_PACK_NAME: &str = "lawnchairUriPack";

/// Argument marking an override that should be composited through a pack's mask
pub const MASK_ARG: &str = "mask";

/// User override pointing at a specific icon
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomIconEntry {
    /// Pack identifier (package name, `""` for the default pack)
    pub pack: String,
    /// Icon name inside the pack, or an opaque URI for the URI pack
    pub icon: Option<String>,
    /// Free-form argument
    pub arg: Option<String>,
}

impl CustomIconEntry {
    /// Create an entry; empty strings are stored as absent
    pub fn new(pack: impl Into<String>, icon: Option<String>, arg: Option<String>) -> Self {
        Self {
            pack: pack.into(),
            icon: icon.filter(|s| !s.is_empty()),
            arg: arg.filter(|s| !s.is_empty()),
        }
    }

    /// Entry selecting a pack without a specific icon
    pub fn for_pack(pack: impl Into<String>) -> Self {
        Self::new(pack, None, None)
    }

    /// Parse any of the accepted formats
    pub fn parse(value: &str) -> Self {
        if value.contains('|') {
            let mut parts = value.splitn(3, '|');
            let pack = parts.next().unwrap_or_default();
            if pack.contains('/') {
                return Self::parse_legacy(value);
            }
            let icon = parts.next().map(str::to_string);
            let arg = parts.next().map(str::to_string);
            return Self::new(pack, icon, arg);
        }
        Self::parse_legacy(value)
    }

    fn parse_legacy(value: &str) -> Self {
        let (pack, icon) = value.split_once('/').unwrap_or((value, ""));
        if pack == URI_PACK_NAME && !icon.trim().is_empty() {
            let (uri, arg) = match icon.split_once('|') {
                Some((uri, arg)) => (uri, Some(arg.to_string())),
                None => (icon, None),
            };
            return Self::new(pack, Some(uri.to_string()), arg);
        }
        Self::new(pack, Some(icon.to_string()), None)
    }

    /// Whether this override asks for compositing through the pack's mask
    pub fn is_mask(&self) -> bool {
        self.arg.as_deref() == Some(MASK_ARG)
    }
}

impl fmt::Display for CustomIconEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.pack,
            self.icon.as_deref().unwrap_or_default(),
            self.arg.as_deref().unwrap_or_default()
        )
    }
}

impl FromStr for CustomIconEntry {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_format() {
        let entry = CustomIconEntry::new("com.pack", Some("icon".into()), Some("x".into()));
        assert_eq!(entry.to_string(), "com.pack|icon|x");
        assert_eq!(CustomIconEntry::for_pack("com.pack").to_string(), "com.pack||");
    }

    #[test]
    fn parses_legacy_pair() {
        assert_eq!(
            CustomIconEntry::parse("com.pack/icon_name"),
            CustomIconEntry::new("com.pack", Some("icon_name".into()), None)
        );
    }

    #[test]
    fn parses_legacy_uri_pack() {
        assert_eq!(
            CustomIconEntry::parse("lawnchairUriPack/content://x|flag"),
            CustomIconEntry::new(URI_PACK_NAME, Some("content://x".into()), Some("flag".into()))
        );
        assert_eq!(
            CustomIconEntry::parse("lawnchairUriPack/content://media/1"),
            CustomIconEntry::new(URI_PACK_NAME, Some("content://media/1".into()), None)
        );
    }

    #[test]
    fn canonical_with_empty_segments() {
        assert_eq!(
            CustomIconEntry::parse("com.pack||"),
            CustomIconEntry::for_pack("com.pack")
        );
        assert_eq!(CustomIconEntry::parse("||"), CustomIconEntry::for_pack(""));
    }

    #[test]
    fn arg_keeps_extra_separators() {
        let entry = CustomIconEntry::parse("com.pack|icon|a|b");
        assert_eq!(entry.arg.as_deref(), Some("a|b"));
    }

    #[test]
    fn mask_argument() {
        assert!(CustomIconEntry::parse("com.pack|com.app/com.app.Main#0|mask").is_mask());
        assert!(!CustomIconEntry::parse("com.pack|icon|").is_mask());
    }

    #[cfg(test)]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: canonical serialization always parses back to the same entry
            #[test]
            fn canonical_round_trip(
                pack in "[a-zA-Z0-9._]{0,24}",
                icon in proptest::option::of("[a-zA-Z0-9_:/.]{1,24}"),
                arg in proptest::option::of("[a-zA-Z0-9_|]{1,12}"),
            ) {
                let entry = CustomIconEntry::new(pack, icon, arg);
                prop_assert_eq!(CustomIconEntry::parse(&entry.to_string()), entry);
            }

            /// Property: legacy pairs keep everything after the first slash as the icon
            #[test]
            fn legacy_pair_keeps_icon(
                pack in "[a-z][a-z0-9.]{0,16}",
                icon in "[a-z0-9_/]{1,16}",
            ) {
                prop_assume!(pack != URI_PACK_NAME);
                let entry = CustomIconEntry::parse(&format!("{pack}/{icon}"));
                prop_assert_eq!(entry.pack, pack);
                prop_assert_eq!(entry.icon, Some(icon));
                prop_assert_eq!(entry.arg, None);
            }
        }
    }
}
