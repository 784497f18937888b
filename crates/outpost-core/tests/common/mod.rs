//! In-memory game server for integration tests.
//!
//! [`FakeGame`] implements [`PageFetcher`] by rendering minimal HTML from a
//! mutable model of one village, its account and a sparse world map.
//! Submissions mutate the model the way the game would (constructing,
//! upgrading, training, celebrating, settling) and every request is
//! logged so tests can assert on exactly what was sent.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use outpost_core::config::{OutpostConfig, PageConfig, ServerConfig};
use outpost_core::fetch::{
    Document, FetchError, PageFetcher, PageRequest, SessionStatus, Submission,
};
use outpost_core::document::query_param;
use outpost_types::{Coordinate, MapGeometry, PositionId};

/// One slot of the fake village.
#[derive(Debug, Clone, Default)]
pub struct FakeSlot {
    /// Structure name, `None` when empty.
    pub name: Option<String>,
    /// Current level.
    pub level: u32,
    /// Highest level the game will offer an upgrade to.
    pub max_level: u32,
    /// Settlers available (residences only).
    pub settlers: u32,
    /// Whether the town hall offers a celebration.
    pub celebration: bool,
}

/// Mutable game model.
#[derive(Debug, Default)]
pub struct World {
    /// Slots by position.
    pub slots: BTreeMap<u32, FakeSlot>,
    /// Empty map tiles.
    pub empty_tiles: BTreeSet<u32>,
    /// `(name, vid, x, y)` rows of the profile table.
    pub villages: Vec<(String, u32, i32, i32)>,
    /// Culture points shown on the statistics page.
    pub culture_points: u64,
    /// Whether the session is still valid.
    pub expired: bool,
    /// Errors returned by the next requests for a path, in order.
    pub failures: BTreeMap<String, VecDeque<FetchError>>,
    /// Village whose slots are in `slots`.
    pub active_village: u32,
    /// Slots of the other villages, by village id. A village with no entry
    /// starts with the fresh layout.
    pub parked: BTreeMap<u32, BTreeMap<u32, FakeSlot>>,
}

/// Resource fields (1..=18) at level 1 and empty building slots (19..=40).
pub fn fresh_village() -> BTreeMap<u32, FakeSlot> {
    let fields = ["Woodcutter", "Clay Pit", "Iron Mine", "Cropland"];
    let mut slots = BTreeMap::new();
    for position in 1..=18_u32 {
        let name = fields[usize::try_from(position % 4).unwrap()];
        slots.insert(position, FakeSlot::occupied(name, 1));
    }
    for position in 19..=40_u32 {
        slots.insert(position, FakeSlot::default());
    }
    slots
}

/// Scripted game server.
pub struct FakeGame {
    pages: PageConfig,
    names_by_id: BTreeMap<u32, String>,
    /// Game model.
    pub world: Mutex<World>,
    /// Every request, as `"GET path"`, `"FOLLOW href"` or `"POST action"`.
    pub log: Mutex<Vec<String>>,
    /// Fields of every posted form.
    pub posted: Mutex<Vec<Vec<(String, String)>>>,
}

impl FakeGame {
    /// A village whose resource fields (1..=18) are at level 1 and whose
    /// building slots (19..=40) are all empty.
    pub fn new() -> Self {
        let config = OutpostConfig::default();
        let names_by_id = config
            .buildings
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect();

        let mut world = World {
            slots: fresh_village(),
            active_village: 1001,
            ..World::default()
        };
        world.villages.push((String::from("Home"), 1001, 0, 0));

        Self {
            pages: PageConfig::default(),
            names_by_id,
            world: Mutex::new(world),
            log: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
        }
    }

    /// Change the model.
    pub fn with(self, edit: impl FnOnce(&mut World)) -> Self {
        edit(&mut self.world.lock().unwrap());
        self
    }

    /// Copy of the request log.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Requests starting with `prefix`.
    pub fn requests_matching(&self, prefix: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.starts_with(prefix))
            .collect()
    }

    /// Current state of one slot.
    pub fn slot(&self, position: u32) -> FakeSlot {
        self.world.lock().unwrap().slots.get(&position).cloned().unwrap_or_default()
    }

    fn take_failure(&self, path: &str) -> Option<FetchError> {
        let mut world = self.world.lock().unwrap();
        if world.expired {
            return Some(FetchError::SessionExpired);
        }
        world.failures.get_mut(path).and_then(VecDeque::pop_front)
    }

    fn render(&self, request: &PageRequest) -> String {
        let world = self.world.lock().unwrap();
        match request {
            PageRequest::Slot(position) => {
                render_slot(position.get(), world.slots.get(&position.get()))
            }
            PageRequest::MapTile(id) => {
                if world.empty_tiles.contains(&id.get()) {
                    format!(
                        "<h1>Abandoned valley</h1>\
                         <a href=\"a2b.php?id={id}&s=1\">&raquo; building a new village</a>"
                    )
                } else {
                    format!("<h1>Village {id}</h1><a href=\"a2b.php?z={id}\">Send troops</a>")
                }
            }
            PageRequest::Profile => {
                let rows: String = world
                    .villages
                    .iter()
                    .map(|(name, vid, x, y)| {
                        format!(
                            "<tr><td><a href=\"village1.php?vid={vid}\">{name}</a></td>\
                             <td>1</td><td>100</td><td>-</td><td>({x}|{y})</td></tr>"
                        )
                    })
                    .collect();
                format!(
                    "<table id=\"villages\"><thead><tr><th>Name</th></tr></thead>\
                     <tbody>{rows}</tbody></table>"
                )
            }
            PageRequest::Culture => {
                let switcher: String = if world.villages.len() > 1 {
                    world
                        .villages
                        .iter()
                        .map(|(name, vid, _, _)| format!("<li><a href=\"?newdid={vid}\">{name}</a></li>"))
                        .collect()
                } else {
                    String::new()
                };
                format!(
                    "<ul>{switcher}</ul><table><tr><th>Culture points</th><td>{}</td></tr></table>",
                    world.culture_points
                )
            }
        }
    }

    fn apply(&self, submission: &Submission) {
        let mut world = self.world.lock().unwrap();
        match submission {
            Submission::FollowLink { href } => {
                if let Some(vid) = query_param(href, "newdid").and_then(|v| v.parse::<u32>().ok()) {
                    world.switch_to(vid);
                    return;
                }
                if href.starts_with("a2b.php") {
                    if let Some(id) = query_param(href, "id").and_then(|v| v.parse::<u32>().ok()) {
                        world.empty_tiles.remove(&id);
                    }
                    return;
                }
                let Some(position) = query_param(href, "id").and_then(|v| v.parse::<u32>().ok())
                else {
                    return;
                };
                let building = query_param(href, "b").and_then(|v| v.parse::<u32>().ok());
                let celebrate = query_param(href, "a").is_some();
                let Some(slot) = world.slots.get_mut(&position) else {
                    return;
                };
                if celebrate {
                    slot.celebration = false;
                } else if let Some(id) = building {
                    if slot.name.is_none() {
                        slot.name = self.names_by_id.get(&id).cloned();
                        slot.level = 1;
                        slot.max_level = 20;
                    }
                } else if slot.name.is_some() && slot.level < slot.max_level {
                    slot.level += 1;
                }
            }
            Submission::PostForm { fields, .. } => {
                self.posted.lock().unwrap().push(fields.clone());
            }
        }
    }
}

impl World {
    /// Make `vid` the active village, parking the current one.
    pub fn switch_to(&mut self, vid: u32) {
        if vid == self.active_village {
            return;
        }
        let next = self.parked.remove(&vid).unwrap_or_else(fresh_village);
        let previous = std::mem::replace(&mut self.slots, next);
        self.parked.insert(self.active_village, previous);
        self.active_village = vid;
    }
}

impl FakeSlot {
    /// An occupied slot that can be upgraded to 20.
    pub fn occupied(name: &str, level: u32) -> Self {
        Self {
            name: Some(name.to_owned()),
            level,
            max_level: 20,
            ..Self::default()
        }
    }

    /// A residence with `settlers` trained.
    pub fn residence(level: u32, settlers: u32) -> Self {
        Self {
            settlers,
            ..Self::occupied("Residence", level)
        }
    }

    /// A town hall, optionally offering a celebration.
    pub fn town_hall(celebration: bool) -> Self {
        Self {
            celebration,
            ..Self::occupied("Town Hall", 5)
        }
    }
}

/// Residence level from which the training form is shown.
pub const TRAINING_LEVEL: u32 = 10;

fn render_slot(position: u32, slot: Option<&FakeSlot>) -> String {
    let Some(slot) = slot else {
        return String::from("<p>no such slot</p>");
    };
    let Some(name) = &slot.name else {
        let links: String = (1..=40)
            .map(|id| {
                format!("<a class=\"build\" href=\"build.php?id={position}&b={id}&k=c{position}\">x</a>")
            })
            .collect();
        return format!("<h1>Construction of a new building</h1>{links}");
    };

    let mut body = format!("<h1>{name} level {}</h1>", slot.level);
    if slot.level < slot.max_level {
        body.push_str(&format!(
            "<a class=\"build\" href=\"build.php?id={position}&k=u{position}l{}\">Upgrade to level {}</a>",
            slot.level,
            slot.level + 1
        ));
    }
    if (name == "Residence" || name == "Palace") && slot.level < TRAINING_LEVEL {
        body.push_str(&format!(
            "<div class=\"units\">Settlers available: {}</div>\
             <p>Training requires a higher level.</p>",
            slot.settlers
        ));
    } else if name == "Residence" || name == "Palace" {
        body.push_str(&format!(
            "<div class=\"units\">Settlers available: {}</div>\
             <form action=\"build.php?id={position}\" method=\"post\">\
             <input type=\"hidden\" name=\"z\" value=\"tok{position}\">\
             <table><tr><td>Settler</td><td><input name=\"t[10]\" value=\"0\"></td></tr></table>\
             </form>",
            slot.settlers
        ));
    }
    if name == "Town Hall" && slot.celebration {
        body.push_str(&format!(
            "<a href=\"build.php?id={position}&a=1&k=cel\">Hold small celebration</a>"
        ));
    }
    body
}

impl PageFetcher for FakeGame {
    async fn fetch(&self, request: &PageRequest) -> Result<Document, FetchError> {
        let path = self.pages.path_for(request);
        self.log.lock().unwrap().push(format!("GET {path}"));
        if let Some(err) = self.take_failure(&path) {
            return Err(err);
        }
        Ok(Document::new(self.render(request)))
    }

    async fn submit(&self, submission: &Submission) -> Result<Document, FetchError> {
        let entry = match submission {
            Submission::FollowLink { href } => format!("FOLLOW {href}"),
            Submission::PostForm { action, .. } => format!("POST {action}"),
        };
        self.log.lock().unwrap().push(entry);
        if let Some(err) = self.take_failure(submission.target()) {
            return Err(err);
        }
        self.apply(submission);
        Ok(Document::new("<p>ok</p>"))
    }

    fn session(&self) -> SessionStatus {
        if self.world.lock().unwrap().expired {
            SessionStatus::Expired
        } else {
            SessionStatus::Active
        }
    }
}

/// Server settings with pacing tuned down for tests.
pub fn fast_server() -> ServerConfig {
    ServerConfig {
        request_delay_ms: 1,
        rate_limit_wait_ms: 10,
        backoff_base_ms: 1,
        ..ServerConfig::default()
    }
}

/// Default configuration with fast pacing.
pub fn config() -> OutpostConfig {
    OutpostConfig {
        server: fast_server(),
        ..OutpostConfig::default()
    }
}

/// Tile id of a coordinate on the default map.
pub fn tile(x: i32, y: i32) -> u32 {
    MapGeometry::default().from_coordinate(Coordinate::new(x, y)).get()
}

/// Shorthand for a tile id.
pub fn tile_id(x: i32, y: i32) -> PositionId {
    PositionId(tile(x, y))
}
