//! Semantic sound names accepted from collaborators.
//!
//! Callers speak in strings (`"nature"`, `"hover"`); anything outside the
//! fixed enumeration parses to `None` and the request becomes a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ambient bed categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbientCategory {
    Nature,
    City,
    Ancient,
    Default,
}

impl AmbientCategory {
    pub const ALL: [AmbientCategory; 4] = [
        AmbientCategory::Nature,
        AmbientCategory::City,
        AmbientCategory::Ancient,
        AmbientCategory::Default,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nature" => Some(AmbientCategory::Nature),
            "city" => Some(AmbientCategory::City),
            "ancient" => Some(AmbientCategory::Ancient),
            "default" => Some(AmbientCategory::Default),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AmbientCategory::Nature => "nature",
            AmbientCategory::City => "city",
            AmbientCategory::Ancient => "ancient",
            AmbientCategory::Default => "default",
        }
    }
}

impl fmt::Display for AmbientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI cue names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueKind {
    Hover,
    Click,
    Success,
}

impl CueKind {
    pub const ALL: [CueKind; 3] = [CueKind::Hover, CueKind::Click, CueKind::Success];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hover" => Some(CueKind::Hover),
            "click" => Some(CueKind::Click),
            "success" => Some(CueKind::Success),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CueKind::Hover => "hover",
            CueKind::Click => "click",
            CueKind::Success => "success",
        }
    }
}

impl fmt::Display for CueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the asset cache can resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundKind {
    Ambient(AmbientCategory),
    Cue(CueKind),
}

impl SoundKind {
    /// Parse a name from either enumeration. Cue names win on a clash (there is none today).
    pub fn from_name(name: &str) -> Option<Self> {
        CueKind::from_name(name)
            .map(SoundKind::Cue)
            .or_else(|| AmbientCategory::from_name(name).map(SoundKind::Ambient))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SoundKind::Ambient(category) => category.as_str(),
            SoundKind::Cue(cue) => cue.as_str(),
        }
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self, SoundKind::Ambient(_))
    }
}

impl fmt::Display for SoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
