// Test-only scenario harness for the Fungi Fortress simulation.
//
// Builds a real `SimState` from a small ASCII map so integration tests can
// describe a situation at a glance and then drive the same tick loop the
// game uses. `RecordingHooks` stands in for the level generator, the
// mycelial network and the dialogue subsystem and records every call so
// tests can assert on them.
//
// Map legend (one character per tile):
//
//   .  grass            ,  stone floor       m  mycelium floor
//   #  stone wall       T  tree              ~  water
//   =  bridge           f  fungi             F  magic fungi
//   G  Shadowed Grotto  N  Mycelial Nexus
//   D  dwarf on grass   a  animal on grass   c  character on grass
//
// See also: `tests/scenarios.rs` for the scenarios themselves.

use fungi_fortress_sim::agent::Character;
use fungi_fortress_sim::config::GameConfig;
use fungi_fortress_sim::event::SimEvent;
use fungi_fortress_sim::grid::TileMap;
use fungi_fortress_sim::hooks::WorldHooks;
use fungi_fortress_sim::sim::SimState;
use fungi_fortress_sim::types::{AgentId, TileCoord};
use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once per process. Set
/// `RUST_LOG=debug` to see the simulation's diagnostics in test output.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .compact()
        .try_init();
}

/// Entity key for a map character, or `None` for unknown characters.
fn entity_key(symbol: char) -> Option<&'static str> {
    Some(match symbol {
        '.' | 'D' | 'a' | 'c' => "grass",
        ',' => "stone_floor",
        'm' => "mycelium_floor",
        '#' => "stone_wall",
        'T' => "tree",
        '~' => "water",
        '=' => "bridge",
        'f' => "fungi",
        'F' => "magic_fungi",
        'G' => "Shadowed Grotto",
        'N' => "Mycelial Nexus",
        _ => return None,
    })
}

/// Every call made through `WorldHooks`, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordingHooks {
    pub sublevels_entered: Vec<(AgentId, String, TileCoord)>,
    pub illuminations: Vec<TileCoord>,
    pub conversations: Vec<(AgentId, String)>,
    /// Whether `talk()` reports the conversation as handled.
    pub accept_talk: bool,
}

impl WorldHooks for RecordingHooks {
    fn enter_sublevel(&mut self, agent: AgentId, entrance: &str, at: TileCoord) {
        self.sublevels_entered.push((agent, entrance.to_string(), at));
    }

    fn illuminate_network(&mut self, from: TileCoord) {
        self.illuminations.push(from);
    }

    fn talk(&mut self, agent: AgentId, character: &Character) -> bool {
        self.conversations.push((agent, character.name.clone()));
        self.accept_talk
    }
}

pub struct ScenarioBuilder {
    rows: Vec<String>,
    config: GameConfig,
    seed: u64,
}

impl ScenarioBuilder {
    pub fn new(rows: &[&str]) -> Self {
        Self {
            rows: rows.iter().map(|r| r.to_string()).collect(),
            config: GameConfig::default(),
            seed: 42,
        }
    }

    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Tweak the default config in place.
    pub fn with_config(mut self, edit: impl FnOnce(&mut GameConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Parse the map and spawn actors. Panics on ragged rows or unknown
    /// characters, since those are mistakes in the test itself.
    pub fn build(self) -> Scenario {
        let height = self.rows.len();
        let width = self.rows.first().map_or(0, |r| r.chars().count());
        let mut tiles = Vec::with_capacity(width * height);
        let mut actors = Vec::new();

        for (y, row) in self.rows.iter().enumerate() {
            assert_eq!(row.chars().count(), width, "row {y} has the wrong width");
            for (x, symbol) in row.chars().enumerate() {
                let key = entity_key(symbol)
                    .unwrap_or_else(|| panic!("unknown map symbol '{symbol}' at ({x}, {y})"));
                let tile = self
                    .config
                    .entities
                    .tile(key)
                    .unwrap_or_else(|| panic!("entity '{key}' missing from registry"));
                tiles.push(tile);
                if matches!(symbol, 'D' | 'a' | 'c') {
                    actors.push((symbol, TileCoord::new(x as i32, y as i32)));
                }
            }
        }

        let map = TileMap::from_tiles(width as u32, height as u32, tiles)
            .expect("tile count matches dimensions");
        let mut sim = SimState::with_config(self.seed, self.config, map);
        let mut characters = 0;
        for (symbol, at) in actors {
            match symbol {
                'D' => {
                    sim.spawn_dwarf(at)
                        .unwrap_or_else(|| panic!("could not spawn dwarf at {at}"));
                }
                'a' => {
                    sim.spawn_animal(at);
                }
                _ => {
                    sim.spawn_character(format!("Stranger {characters}"), at);
                    characters += 1;
                }
            }
        }

        Scenario {
            sim,
            hooks: RecordingHooks::default(),
        }
    }
}

/// A simulation plus the hooks it reports to.
pub struct Scenario {
    pub sim: SimState,
    pub hooks: RecordingHooks,
}

impl Scenario {
    pub fn tick(&mut self) -> Vec<SimEvent> {
        self.sim.tick(&mut self.hooks).events
    }

    pub fn run(&mut self, ticks: u64) -> Vec<SimEvent> {
        self.sim.advance(ticks, &mut self.hooks)
    }

    /// Tick until `done` holds or `limit` ticks pass. Returns all events.
    pub fn run_until(&mut self, limit: u64, mut done: impl FnMut(&SimState) -> bool) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for _ in 0..limit {
            if done(&self.sim) {
                break;
            }
            events.extend(self.tick());
        }
        events
    }

    /// Registry key of the entity at `(x, y)`.
    pub fn key_at(&self, x: i32, y: i32) -> &str {
        self.sim
            .map
            .entity_at(TileCoord::new(x, y))
            .and_then(|id| self.sim.config.entities.get(id))
            .map_or("", |def| def.key.as_str())
    }

    /// Render the map back to ASCII (terrain only, no actors).
    pub fn render(&self) -> Vec<String> {
        let map = &self.sim.map;
        (0..map.height as i32)
            .map(|y| {
                (0..map.width as i32)
                    .map(|x| symbol_for(self.key_at(x, y)))
                    .collect()
            })
            .collect()
    }
}

fn symbol_for(key: &str) -> char {
    match key {
        "grass" => '.',
        "stone_floor" => ',',
        "mycelium_floor" => 'm',
        "stone_wall" => '#',
        "tree" => 'T',
        "water" => '~',
        "bridge" => '=',
        "fungi" => 'f',
        "magic_fungi" => 'F',
        "Shadowed Grotto" => 'G',
        "Mycelial Nexus" => 'N',
        "Dwarven Sporeforge" => 'S',
        _ => '?',
    }
}

/// Parse a game config from JSON, as a balance override file would be.
pub fn config_from_json(json: &str) -> GameConfig {
    GameConfig::from_json_str(json).expect("valid test config")
}
