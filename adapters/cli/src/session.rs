//! Interactive session loop tying the world and the systems together.

use geotoken_core::{
    Command, Direction, Event, GeoPoint, SavedSession, SessionRules, TileCoord, TileGrid,
};
use geotoken_rendering::{PlayerPresentation, Scene, TokenMarkerPresentation};
use geotoken_system_movement::{GeoError, Movement, MovementInput};
use geotoken_system_persistence::{self as persistence, Storage};
use geotoken_system_spawning::{Config as SpawnConfig, Spawning};
use geotoken_system_viewport::{RenderedToken, Viewport};
use geotoken_world::{self as world, query, World};
use rand::Rng as _;
use rand_chacha::ChaCha8Rng;

/// Largest tile index the random spawn may pick, keeping positions clear of
/// the latitude poles.
const SPAWN_TILE_BOUND: i32 = 899_990;

const MIN_VIEW_RADIUS: u32 = 2;
const MAX_VIEW_RADIUS: u32 = 16;

/// Input accepted by the session for a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionInput {
    /// Directional movement button press.
    Step(Direction),
    /// Toggle between geolocation and manual movement.
    ToggleMode,
    /// Position sample delivered by the geolocation watch.
    GeoSample(GeoPoint),
    /// Error reported by the geolocation watch.
    GeoError(GeoError),
    /// Click on the marker occupying a tile.
    Click(TileCoord),
    /// Pan the viewport by whole tiles without moving the player.
    Pan {
        /// Latitude tiles to pan by.
        di: i32,
        /// Longitude tiles to pan by.
        dj: i32,
    },
    /// Change the viewport radius.
    Zoom(ZoomChange),
    /// Restart from a fresh random position, discarding all progress.
    NewGame,
}

/// Direction of a viewport zoom step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZoomChange {
    /// Shrink the visible window.
    In,
    /// Grow the visible window.
    Out,
}

/// Owns the world and the systems for one interactive session.
#[derive(Debug)]
pub struct Session {
    world: World,
    movement: Movement,
    viewport: Viewport,
    spawning: Spawning,
    view_radius: u32,
    pan_offset: (i32, i32),
    rng: ChaCha8Rng,
}

impl Session {
    /// Creates a session from restored state. When no player position was
    /// saved, the player spawns on a uniformly random tile.
    #[must_use]
    pub fn new(
        grid: TileGrid,
        rules: SessionRules,
        view_radius: u32,
        saved: SavedSession,
        mut rng: ChaCha8Rng,
    ) -> Self {
        let fallback = grid.center_of(random_tile(&mut rng));
        let world = World::restore(grid, rules, saved, fallback);
        let movement = Movement::new(query::player(&world).mode);
        let spawning = Spawning::new(SpawnConfig::new(
            rules.spawn_threshold(),
            rules.default_token_value(),
        ));
        Self {
            world,
            movement,
            viewport: Viewport::new(),
            spawning,
            view_radius: view_radius.clamp(MIN_VIEW_RADIUS, MAX_VIEW_RADIUS),
            pan_offset: (0, 0),
            rng,
        }
    }

    /// Runs the first view pass so the world around the player materialises,
    /// then persists the result.
    pub fn bootstrap(&mut self, storage: &mut dyn Storage) -> Vec<Event> {
        let mut events = Vec::new();
        self.run_view_pass(&mut events);
        persistence::save(&query::saved_session(&self.world), storage);
        events
    }

    /// Processes one frame of input, returning every event it produced.
    pub fn handle(&mut self, input: SessionInput, storage: &mut dyn Storage) -> Vec<Event> {
        let mut commands = Vec::new();
        let mut view_changed = false;

        match input {
            SessionInput::Step(direction) => self.movement.handle(
                &[],
                &MovementInput {
                    step: Some(direction),
                    ..MovementInput::default()
                },
                &mut commands,
            ),
            SessionInput::ToggleMode => self.movement.handle(
                &[],
                &MovementInput {
                    toggle_mode: true,
                    ..MovementInput::default()
                },
                &mut commands,
            ),
            SessionInput::GeoSample(position) => self.movement.handle(
                &[],
                &MovementInput {
                    geo_sample: Some(position),
                    ..MovementInput::default()
                },
                &mut commands,
            ),
            SessionInput::GeoError(error) => self.movement.handle(
                &[],
                &MovementInput {
                    geo_error: Some(error),
                    ..MovementInput::default()
                },
                &mut commands,
            ),
            SessionInput::Click(tile) => commands.push(Command::InteractWithToken { tile }),
            SessionInput::Pan { di, dj } => {
                self.pan_offset.0 = self.pan_offset.0.saturating_add(di);
                self.pan_offset.1 = self.pan_offset.1.saturating_add(dj);
                view_changed = true;
            }
            SessionInput::Zoom(change) => {
                self.view_radius = match change {
                    ZoomChange::In => self.view_radius.saturating_sub(1).max(MIN_VIEW_RADIUS),
                    ZoomChange::Out => (self.view_radius + 1).min(MAX_VIEW_RADIUS),
                };
                view_changed = true;
            }
            SessionInput::NewGame => {
                let start = self.random_start();
                persistence::clear(storage);
                self.pan_offset = (0, 0);
                commands.push(Command::ResetSession { position: start });
            }
        }

        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        let mut follow_up = Vec::new();
        self.movement.handle(&events, &MovementInput::default(), &mut follow_up);

        if query::rules(&self.world).reset_on_win()
            && events
                .iter()
                .any(|event| matches!(event, Event::GameWon { .. }))
        {
            let start = self.random_start();
            persistence::clear(storage);
            self.pan_offset = (0, 0);
            world::apply(
                &mut self.world,
                Command::ResetSession { position: start },
                &mut events,
            );
        }

        let player_relocated = events.iter().any(|event| {
            matches!(
                event,
                Event::PlayerMoved { .. } | Event::SessionReset { .. }
            )
        });
        if player_relocated {
            // The map follows the player; an explicit pan is forgotten.
            self.pan_offset = (0, 0);
        }
        if view_changed || player_relocated {
            self.run_view_pass(&mut events);
        }

        if !events.is_empty() {
            persistence::save(&query::saved_session(&self.world), storage);
        }
        events
    }

    /// Replaces the session with imported state and persists it.
    pub fn import(&mut self, saved: SavedSession, storage: &mut dyn Storage) -> Vec<Event> {
        let grid = *query::grid(&self.world);
        let rules = *query::rules(&self.world);
        let fallback = query::player(&self.world).position;
        self.world = World::restore(grid, rules, saved, fallback);
        self.movement = Movement::new(query::player(&self.world).mode);
        self.pan_offset = (0, 0);
        let mut events = Vec::new();
        self.run_view_pass(&mut events);
        persistence::save(&query::saved_session(&self.world), storage);
        events
    }

    /// Captures the complete persistable session state.
    #[must_use]
    pub fn export(&self) -> SavedSession {
        query::saved_session(&self.world)
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Composes the presentation of the current view.
    #[must_use]
    pub fn scene(&self) -> Scene {
        let grid = *query::grid(&self.world);
        let player = query::player(&self.world);
        let bounds = grid.window_bounds(self.view_center(), self.view_radius);
        let markers = query::token_view(&self.world)
            .iter()
            .filter_map(|token| {
                token.marker.map(|marker| {
                    TokenMarkerPresentation::new(token.tile, token.value, marker.interactive)
                })
            })
            .collect();
        Scene::compose(
            &grid,
            bounds,
            PlayerPresentation::new(player.position, player.tile),
            player.held,
            player.mode,
            query::rules(&self.world).pickup_radius(),
            markers,
        )
    }

    fn view_center(&self) -> TileCoord {
        query::player_tile(&self.world).offset(self.pan_offset.0, self.pan_offset.1)
    }

    fn random_start(&mut self) -> GeoPoint {
        let tile = random_tile(&mut self.rng);
        query::grid(&self.world).center_of(tile)
    }

    fn run_view_pass(&mut self, events: &mut Vec<Event>) {
        let grid = *query::grid(&self.world);
        let player_tile = query::player_tile(&self.world);
        let pickup_radius = query::rules(&self.world).pickup_radius();
        let bounds = grid.window_bounds(self.view_center(), self.view_radius);
        let rendered: Vec<RenderedToken> = query::token_view(&self.world)
            .iter()
            .filter_map(|token| {
                token
                    .marker
                    .map(|marker| RenderedToken::new(token.tile, marker.interactive))
            })
            .collect();

        let mut commands = Vec::new();
        self.viewport.handle(
            &[],
            true,
            bounds,
            &grid,
            player_tile,
            pickup_radius,
            &rendered,
            &mut commands,
        );
        self.spawning.handle(
            &[],
            true,
            bounds,
            &grid,
            player_tile,
            pickup_radius,
            &mut commands,
        );
        for command in commands {
            world::apply(&mut self.world, command, events);
        }
    }
}

fn random_tile(rng: &mut ChaCha8Rng) -> TileCoord {
    TileCoord::new(
        rng.gen_range(-SPAWN_TILE_BOUND..=SPAWN_TILE_BOUND),
        rng.gen_range(-SPAWN_TILE_BOUND..=SPAWN_TILE_BOUND),
    )
}
