//! Configuration loading and typed config structures for Outpost.
//!
//! Everything that differs between game servers lives here: the base URL
//! and page paths, request pacing, map dimensions, slot ranges, the
//! building-type id table, the culture point curve, settling parameters and
//! the named presets. Components receive the sections they need at
//! construction; nothing reads global state.
//!
//! The building-id table in particular is server specific. The defaults
//! are a starting point and must be checked against the target server.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use outpost_types::{Coordinate, MapGeometry, Preset, StructureRequirement};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an impossible setup.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `outpost.yaml`. Every section has defaults
/// matching the observed speed servers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutpostConfig {
    /// Server address, page paths and request pacing.
    #[serde(default)]
    pub server: ServerConfig,

    /// World map dimensions.
    #[serde(default)]
    pub map: MapGeometry,

    /// Slot ranges inside a village.
    #[serde(default)]
    pub village: VillageConfig,

    /// Structure name to building-type id.
    #[serde(default = "default_buildings")]
    pub buildings: BTreeMap<String, u32>,

    /// Culture point requirement curve.
    #[serde(default)]
    pub culture: CultureConfig,

    /// Settlement workflow parameters.
    #[serde(default)]
    pub settling: SettlingConfig,

    /// Construction executor limits.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Named presets, keyed by the short name used on the command line.
    #[serde(default = "default_presets")]
    pub presets: BTreeMap<String, Preset>,
}

impl Default for OutpostConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            map: MapGeometry::default(),
            village: VillageConfig::default(),
            buildings: default_buildings(),
            culture: CultureConfig::default(),
            settling: SettlingConfig::default(),
            executor: ExecutorConfig::default(),
            presets: default_presets(),
        }
    }
}

impl OutpostConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for deployment settings:
    /// - `OUTPOST_BASE_URL` overrides `server.base_url`
    /// - `OUTPOST_REQUEST_DELAY_MS` overrides `server.request_delay_ms`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.server.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map.width == 0 {
            return Err(ConfigError::Invalid(String::from("map.width must be positive")));
        }
        if self.village.resource_fields().is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "village resource field range is empty",
            )));
        }
        if self.village.building_slots().is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "village building slot range is empty",
            )));
        }
        if self.culture.growth_rate < 1.0 || !self.culture.growth_rate.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "culture.growth_rate must be a finite value >= 1, got {}",
                self.culture.growth_rate
            )));
        }
        if self
            .culture
            .requirements
            .windows(2)
            .any(|pair| matches!(pair, [a, b] if b < a))
        {
            return Err(ConfigError::Invalid(String::from(
                "culture.requirements must be non-decreasing",
            )));
        }
        if self.executor.max_upgrade_steps == 0 {
            return Err(ConfigError::Invalid(String::from(
                "executor.max_upgrade_steps must be positive",
            )));
        }
        for (key, preset) in &self.presets {
            if let Some(req) = preset
                .structures
                .iter()
                .find(|req| req.level == 0 || req.count == 0)
            {
                return Err(ConfigError::Invalid(format!(
                    "preset {key}: {} needs level >= 1 and count >= 1",
                    req.structure
                )));
            }
        }
        Ok(())
    }

    /// Look up the building-type id for a structure name, ignoring case.
    pub fn building_id(&self, structure: &str) -> Option<u32> {
        self.buildings
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(structure))
            .map(|(_, id)| *id)
    }
}

/// Server address, page paths and request pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Game server root, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Pause before every request.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Pause before the single retry after an explicit rate-limit response.
    #[serde(default = "default_rate_limit_wait_ms")]
    pub rate_limit_wait_ms: u64,

    /// Extra attempts after a transport error.
    #[serde(default = "default_transport_retries")]
    pub transport_retries: u32,

    /// First backoff interval after a transport error; doubles per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Page paths relative to `base_url`.
    #[serde(default)]
    pub pages: PageConfig,

    /// Substrings of a redirect target that mean the game sent the session
    /// back to its login page. Matched case-insensitively.
    #[serde(default = "default_login_markers")]
    pub login_markers: Vec<String>,
}

impl ServerConfig {
    /// Override deployment values with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric override does not
    /// parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("OUTPOST_BASE_URL") {
            self.base_url = val.trim_end_matches('/').to_owned();
        }
        if let Ok(val) = std::env::var("OUTPOST_REQUEST_DELAY_MS") {
            self.request_delay_ms = val.parse().map_err(|e| {
                ConfigError::Invalid(format!("invalid OUTPOST_REQUEST_DELAY_MS: {e}"))
            })?;
        }
        Ok(())
    }

    /// Whether a redirect to `location` means the session was sent back to
    /// the login page.
    ///
    /// True when the target mentions one of `login_markers`, or when it is
    /// an absolute URL on another host than `base_url`.
    pub fn is_login_redirect(&self, location: &str) -> bool {
        let target = location.to_ascii_lowercase();
        if self
            .login_markers
            .iter()
            .any(|marker| target.contains(&marker.to_ascii_lowercase()))
        {
            return true;
        }
        let absolute = target.starts_with("http://") || target.starts_with("https://");
        absolute && !target.starts_with(&self.base_url.to_ascii_lowercase())
    }

    /// Pause applied before every request.
    pub const fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Pause before retrying a rate-limited request.
    pub const fn rate_limit_wait(&self) -> Duration {
        Duration::from_millis(self.rate_limit_wait_ms)
    }

    /// Request timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_delay_ms: default_request_delay_ms(),
            rate_limit_wait_ms: default_rate_limit_wait_ms(),
            transport_retries: default_transport_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            pages: PageConfig::default(),
            login_markers: default_login_markers(),
        }
    }
}

/// Page paths. `{id}` is replaced with the slot position or tile id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageConfig {
    /// Slot detail page.
    #[serde(default = "default_slot_page")]
    pub slot: String,
    /// Map tile detail page.
    #[serde(default = "default_map_tile_page")]
    pub map_tile: String,
    /// Account profile with the village table.
    #[serde(default = "default_profile_page")]
    pub profile: String,
    /// Page that shows accumulated culture points.
    #[serde(default = "default_culture_page")]
    pub culture: String,
    /// Link that makes another village the active one. `{id}` is replaced
    /// with the village id.
    #[serde(default = "default_switch_village_page")]
    pub switch_village: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            slot: default_slot_page(),
            map_tile: default_map_tile_page(),
            profile: default_profile_page(),
            culture: default_culture_page(),
            switch_village: default_switch_village_page(),
        }
    }
}

/// Slot ranges inside a village.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VillageConfig {
    /// First resource field position.
    #[serde(default = "default_resource_first")]
    pub resource_first: u32,
    /// Last resource field position.
    #[serde(default = "default_resource_last")]
    pub resource_last: u32,
    /// First building slot position.
    #[serde(default = "default_building_first")]
    pub building_first: u32,
    /// Last building slot position.
    #[serde(default = "default_building_last")]
    pub building_last: u32,
}

impl VillageConfig {
    /// Resource field positions.
    pub const fn resource_fields(&self) -> RangeInclusive<u32> {
        self.resource_first..=self.resource_last
    }

    /// General building positions.
    pub const fn building_slots(&self) -> RangeInclusive<u32> {
        self.building_first..=self.building_last
    }
}

impl Default for VillageConfig {
    fn default() -> Self {
        Self {
            resource_first: default_resource_first(),
            resource_last: default_resource_last(),
            building_first: default_building_first(),
            building_last: default_building_last(),
        }
    }
}

/// Culture point requirement curve.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CultureConfig {
    /// Points required to found village number `i + 1`.
    #[serde(default = "default_culture_requirements")]
    pub requirements: Vec<u64>,
    /// Per-village growth factor applied beyond the table.
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f64,
}

impl Default for CultureConfig {
    fn default() -> Self {
        Self {
            requirements: default_culture_requirements(),
            growth_rate: default_growth_rate(),
        }
    }
}

/// Settlement workflow parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SettlingConfig {
    /// Settlers needed to found a village.
    #[serde(default = "default_settlers_required")]
    pub settlers_required: u32,
    /// Largest ring searched for an empty plot.
    #[serde(default = "default_search_radius")]
    pub search_radius: u32,
    /// Upper bound on probed tiles per search.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Structure names that can train settlers.
    #[serde(default = "default_residence_names")]
    pub residence_names: Vec<String>,
    /// Structure that hosts celebrations.
    #[serde(default = "default_town_hall_name")]
    pub town_hall_name: String,
    /// Training form field used when the page does not label the settler
    /// row.
    #[serde(default = "default_settler_field")]
    pub settler_field: String,
    /// Search center; defaults to the first village on the profile.
    #[serde(default)]
    pub home: Option<Coordinate>,
}

impl Default for SettlingConfig {
    fn default() -> Self {
        Self {
            settlers_required: default_settlers_required(),
            search_radius: default_search_radius(),
            max_candidates: default_max_candidates(),
            residence_names: default_residence_names(),
            town_hall_name: default_town_hall_name(),
            settler_field: default_settler_field(),
            home: None,
        }
    }
}

/// Construction executor limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExecutorConfig {
    /// Upper bound on upgrade steps for one action.
    #[serde(default = "default_max_upgrade_steps")]
    pub max_upgrade_steps: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_upgrade_steps: default_max_upgrade_steps(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_base_url() -> String {
    String::from("https://fun.gotravspeed.com")
}

const fn default_request_delay_ms() -> u64 {
    500
}

const fn default_rate_limit_wait_ms() -> u64 {
    5_000
}

const fn default_transport_retries() -> u32 {
    2
}

const fn default_backoff_base_ms() -> u64 {
    1_000
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_slot_page() -> String {
    String::from("build.php?id={id}")
}

fn default_map_tile_page() -> String {
    String::from("village3.php?id={id}")
}

fn default_profile_page() -> String {
    String::from("profile.php")
}

fn default_culture_page() -> String {
    String::from("spieler.php")
}

fn default_switch_village_page() -> String {
    String::from("village1.php?newdid={id}")
}

fn default_login_markers() -> Vec<String> {
    vec![String::from("login"), String::from("logout")]
}

const fn default_resource_first() -> u32 {
    1
}

const fn default_resource_last() -> u32 {
    18
}

const fn default_building_first() -> u32 {
    19
}

const fn default_building_last() -> u32 {
    40
}

fn default_buildings() -> BTreeMap<String, u32> {
    [
        ("Woodcutter", 1),
        ("Clay Pit", 2),
        ("Iron Mine", 3),
        ("Cropland", 4),
        ("Sawmill", 5),
        ("Brickyard", 6),
        ("Iron Foundry", 7),
        ("Grain Mill", 8),
        ("Bakery", 9),
        ("Warehouse", 10),
        ("Granary", 11),
        ("Smithy", 12),
        ("Armory", 13),
        ("Tournament Square", 14),
        ("Main Building", 15),
        ("Rally Point", 16),
        ("Marketplace", 17),
        ("Embassy", 18),
        ("Barracks", 19),
        ("Stable", 20),
        ("Siege Workshop", 21),
        ("Academy", 22),
        ("Town Hall", 24),
        ("Residence", 25),
        ("Palace", 26),
        ("Wall", 33),
        ("Hero's Mansion", 37),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_owned(), id))
    .collect()
}

fn default_culture_requirements() -> Vec<u64> {
    vec![
        0, 500, 2_600, 6_700, 12_900, 21_600, 32_900, 46_900, 63_700, 83_500, 106_400, 132_500,
        161_900, 194_500, 230_700, 270_400, 313_700, 360_900, 411_300, 465_700, 524_100,
        586_300, 652_500, 722_700, 797_100, 875_500, 958_100, 1_045_100, 1_136_200, 1_231_700,
        1_331_600, 1_435_900, 1_544_700, 1_658_000, 1_775_800, 1_898_300, 2_025_300,
        2_157_100, 2_293_500, 2_434_700,
    ]
}

const fn default_growth_rate() -> f64 {
    1.03
}

const fn default_settlers_required() -> u32 {
    3
}

const fn default_search_radius() -> u32 {
    25
}

const fn default_max_candidates() -> usize {
    500
}

fn default_residence_names() -> Vec<String> {
    vec![String::from("Residence"), String::from("Palace")]
}

fn default_town_hall_name() -> String {
    String::from("Town Hall")
}

fn default_settler_field() -> String {
    String::from("t[10]")
}

const fn default_max_upgrade_steps() -> u32 {
    100
}

fn preset(
    name: &str,
    description: &str,
    resource_target: Option<u32>,
    structures: &[(&str, u32, u32)],
) -> Preset {
    Preset {
        name: name.to_owned(),
        description: description.to_owned(),
        resource_target,
        structures: structures
            .iter()
            .map(|&(structure, level, count)| {
                StructureRequirement::new(structure, level).times(count)
            })
            .collect(),
    }
}

fn default_presets() -> BTreeMap<String, Preset> {
    let army = preset(
        "Army Village (Capital)",
        "Full military plus Town Hall for celebrations.",
        Some(20),
        &[
            ("Main Building", 20, 1),
            ("Rally Point", 20, 1),
            ("Wall", 20, 1),
            ("Barracks", 20, 1),
            ("Stable", 20, 1),
            ("Siege Workshop", 20, 1),
            ("Academy", 20, 1),
            ("Smithy", 20, 1),
            ("Tournament Square", 20, 1),
            ("Hero's Mansion", 20, 1),
            ("Residence", 20, 1),
            ("Town Hall", 20, 1),
            ("Warehouse", 20, 1),
            ("Granary", 20, 1),
        ],
    );
    let farm = preset(
        "Farm Village",
        "Maximum resource production and storage for raid collection.",
        Some(30),
        &[
            ("Sawmill", 5, 1),
            ("Brickyard", 5, 1),
            ("Iron Foundry", 5, 1),
            ("Grain Mill", 5, 1),
            ("Bakery", 5, 1),
            ("Rally Point", 1, 1),
            ("Barracks", 1, 1),
            ("Warehouse", 20, 8),
            ("Granary", 20, 7),
        ],
    );
    let quick_settle = preset(
        "Quick Settle",
        "Skip resource fields and get a Residence up as fast as possible.",
        None,
        &[
            ("Main Building", 20, 1),
            ("Residence", 20, 1),
            ("Warehouse", 10, 1),
            ("Granary", 10, 1),
            ("Rally Point", 1, 1),
        ],
    );
    let full = preset(
        "Full Mode (Balanced)",
        "Standard balanced village with everything to level 20.",
        Some(20),
        &[
            ("Main Building", 20, 1),
            ("Rally Point", 20, 1),
            ("Wall", 20, 1),
            ("Barracks", 20, 1),
            ("Stable", 20, 1),
            ("Siege Workshop", 20, 1),
            ("Academy", 20, 1),
            ("Smithy", 20, 1),
            ("Residence", 20, 1),
            ("Warehouse", 20, 2),
            ("Granary", 20, 2),
            ("Marketplace", 20, 1),
            ("Sawmill", 5, 1),
            ("Brickyard", 5, 1),
            ("Iron Foundry", 5, 1),
            ("Grain Mill", 5, 1),
            ("Bakery", 5, 1),
        ],
    );

    [
        ("army", army),
        ("farm", farm),
        ("quick-settle", quick_settle),
        ("full", full),
    ]
    .into_iter()
    .map(|(key, preset)| (key.to_owned(), preset))
    .collect()
}
