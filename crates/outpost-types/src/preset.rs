//! Declarative village presets.

use serde::{Deserialize, Serialize};

/// A kind of structure, named as the game labels it in page headings
/// (e.g. `"Main Building"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureType(pub String);

impl StructureType {
    /// Create a structure type from its display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for StructureType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One line of a preset: build `count` structures of a type, each to
/// `target_level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureRequirement {
    /// Structure to have.
    pub structure: StructureType,
    /// Level each instance should reach (at least 1).
    #[serde(default = "default_one")]
    pub level: u32,
    /// Number of instances wanted (at least 1).
    #[serde(default = "default_one")]
    pub count: u32,
}

const fn default_one() -> u32 {
    1
}

impl StructureRequirement {
    /// A single-instance requirement.
    pub fn new(structure: impl Into<String>, level: u32) -> Self {
        Self {
            structure: StructureType::new(structure),
            level,
            count: 1,
        }
    }

    /// Same requirement repeated `count` times.
    #[must_use]
    pub const fn times(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// A named target configuration for a village.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Display name.
    pub name: String,
    /// What the preset is for.
    #[serde(default)]
    pub description: String,
    /// Uniform level for every resource field, or `None` to leave fields
    /// alone.
    #[serde(default)]
    pub resource_target: Option<u32>,
    /// Ordered structure requirements.
    #[serde(default)]
    pub structures: Vec<StructureRequirement>,
}

impl Preset {
    /// Total number of structure instances the preset asks for.
    pub fn total_count(&self) -> u64 {
        self.structures
            .iter()
            .map(|req| u64::from(req.count))
            .fold(0, u64::saturating_add)
    }
}
