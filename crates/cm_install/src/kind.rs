use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of installable content. Ids are unique within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Car,
    CarSkin,
    Track,
    TrackSkin,
    Showroom,
    Font,
    Weather,
    PythonApp,
    GenericMod,
    Theme,
    ConfigFile,
}

impl ContentKind {
    pub const ALL: [ContentKind; 11] = [
        ContentKind::Car,
        ContentKind::CarSkin,
        ContentKind::Track,
        ContentKind::TrackSkin,
        ContentKind::Showroom,
        ContentKind::Font,
        ContentKind::Weather,
        ContentKind::PythonApp,
        ContentKind::GenericMod,
        ContentKind::Theme,
        ContentKind::ConfigFile,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ContentKind::Car => "Car",
            ContentKind::CarSkin => "Car skin",
            ContentKind::Track => "Track",
            ContentKind::TrackSkin => "Track skin",
            ContentKind::Showroom => "Showroom",
            ContentKind::Font => "Font",
            ContentKind::Weather => "Weather",
            ContentKind::PythonApp => "Python app",
            ContentKind::GenericMod => "Generic mod",
            ContentKind::Theme => "Theme",
            ContentKind::ConfigFile => "Config file",
        }
    }

    /// Lower installs first. Skins need their car or track in place, and
    /// generic mods overlay whatever the rest of the batch put down.
    pub fn install_priority(self) -> u8 {
        match self {
            ContentKind::Car | ContentKind::Track | ContentKind::Showroom => 0,
            ContentKind::Font
            | ContentKind::Weather
            | ContentKind::PythonApp
            | ContentKind::Theme
            | ContentKind::ConfigFile => 1,
            ContentKind::CarSkin | ContentKind::TrackSkin => 2,
            ContentKind::GenericMod => 3,
        }
    }

    /// Whether ids of this kind are `<parent>/<child>` pairs.
    pub fn has_parent(self) -> bool {
        matches!(self, ContentKind::CarSkin | ContentKind::TrackSkin)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Library id of a skin: `<parent>/<skin>`.
pub fn skin_object_id(parent_id: &str, skin_id: &str) -> String {
    format!("{parent_id}/{skin_id}")
}
