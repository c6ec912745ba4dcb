#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state management for GeoToken.
//!
//! The [`World`] owns the token store, the player state, and render-handle
//! allocation. All mutations flow through [`apply`], which executes a single
//! [`Command`] and appends the resulting [`Event`]s. The store never drops a
//! logical token record; collected tokens persist as tombstones that keep the
//! deterministic spawn roll from repopulating their cells.

use std::collections::BTreeMap;

use geotoken_core::{
    Command, Event, GeoPoint, InteractionError, MarkerId, MovementMode, SavedSession,
    SessionRules, TileCoord, TileGrid, TokenValue, WELCOME_BANNER,
};

/// Represents the authoritative GeoToken session state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    grid: TileGrid,
    rules: SessionRules,
    tokens: BTreeMap<TileCoord, Token>,
    player: Player,
    next_marker: u64,
}

impl World {
    /// Creates a fresh session with an empty token store.
    ///
    /// The session starts in geolocation mode; adapters toggle to manual
    /// movement explicitly.
    #[must_use]
    pub fn new(grid: TileGrid, rules: SessionRules, start: GeoPoint) -> Self {
        Self {
            banner: WELCOME_BANNER,
            grid,
            rules,
            tokens: BTreeMap::new(),
            player: Player {
                position: start,
                held: None,
                mode: MovementMode::Geolocation,
            },
            next_marker: 0,
        }
    }

    /// Recreates a session from persisted state.
    ///
    /// Restored tokens carry no render handle until the next viewport pass
    /// re-renders them. `fallback_start` is used when no player position was
    /// saved.
    #[must_use]
    pub fn restore(
        grid: TileGrid,
        rules: SessionRules,
        saved: SavedSession,
        fallback_start: GeoPoint,
    ) -> Self {
        let mut world = Self::new(grid, rules, saved.player.unwrap_or(fallback_start));
        for record in saved.tokens {
            let _ = world.tokens.insert(
                record.tile,
                Token {
                    value: record.value,
                    collected: record.collected,
                    marker: None,
                },
            );
        }
        world.player.held = saved.held;
        world
    }

    fn allocate_marker(&mut self, interactive: bool) -> Marker {
        let id = MarkerId::new(self.next_marker);
        self.next_marker = self.next_marker.saturating_add(1);
        Marker { id, interactive }
    }

    fn spawn_token(
        &mut self,
        tile: TileCoord,
        interactive: bool,
        value: TokenValue,
        out_events: &mut Vec<Event>,
    ) {
        if let Some(token) = self.tokens.get(&tile) {
            if token.collected || token.marker.is_some() {
                return;
            }
        }

        let marker = self.allocate_marker(interactive);
        match self.tokens.get_mut(&tile) {
            Some(token) => {
                // Persisted-but-unrendered record: re-render at the stored
                // value rather than overwriting it.
                token.marker = Some(marker);
                out_events.push(Event::TokenSpawned {
                    tile,
                    value: token.value,
                    marker: marker.id,
                    interactive,
                });
            }
            None => {
                let _ = self.tokens.insert(
                    tile,
                    Token {
                        value,
                        collected: false,
                        marker: Some(marker),
                    },
                );
                out_events.push(Event::TokenSpawned {
                    tile,
                    value,
                    marker: marker.id,
                    interactive,
                });
            }
        }
    }

    fn pick_up(&mut self, tile: TileCoord, out_events: &mut Vec<Event>) {
        let Some(token) = self.tokens.get_mut(&tile) else {
            out_events.push(Event::InteractionRejected {
                tile,
                reason: InteractionError::TokenAbsent,
            });
            return;
        };
        if token.collected {
            out_events.push(Event::InteractionRejected {
                tile,
                reason: InteractionError::TokenAbsent,
            });
            return;
        }

        token.collected = true;
        let marker = token.marker.take().map(|marker| marker.id);
        let value = token.value;
        self.player.held = Some(value);
        out_events.push(Event::TokenCollected {
            tile,
            value,
            marker,
        });
        out_events.push(Event::HeldTokenChanged { value: Some(value) });
        if value >= self.rules.win_threshold() {
            out_events.push(Event::GameWon { value });
        }
    }

    fn craft(&mut self, tile: TileCoord, held: TokenValue, out_events: &mut Vec<Event>) {
        let live = self
            .tokens
            .get(&tile)
            .map_or(false, |token| !token.collected);

        if live {
            let Some(token) = self.tokens.get_mut(&tile) else {
                return;
            };
            if token.value == held {
                token.value = held.doubled();
                out_events.push(Event::TokenValueChanged {
                    tile,
                    value: token.value,
                    marker: token.marker.map(|marker| marker.id),
                });
                self.player.held = None;
                out_events.push(Event::HeldTokenChanged { value: None });
            } else {
                out_events.push(Event::InteractionRejected {
                    tile,
                    reason: InteractionError::ValueMismatch {
                        held,
                        found: token.value,
                    },
                });
            }
            return;
        }

        // Empty cell, or a collected tombstone: placing the held token
        // materialises a live interactive token carrying the held value.
        let marker = self.allocate_marker(true);
        let _ = self.tokens.insert(
            tile,
            Token {
                value: held,
                collected: false,
                marker: Some(marker),
            },
        );
        out_events.push(Event::TokenSpawned {
            tile,
            value: held,
            marker: marker.id,
            interactive: true,
        });
        self.player.held = None;
        out_events.push(Event::HeldTokenChanged { value: None });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MovePlayer { direction } => {
            if world.player.mode != MovementMode::Manual {
                return;
            }
            let position = world.grid.step_from(world.player.position, direction);
            world.player.position = position;
            out_events.push(Event::PlayerMoved {
                position,
                tile: world.grid.tile_at(position),
            });
        }
        Command::SyncPosition { position } => {
            if world.player.mode != MovementMode::Geolocation {
                return;
            }
            let tile = world.grid.tile_at(position);
            let snapped = world.grid.center_of(tile);
            world.player.position = snapped;
            out_events.push(Event::PlayerMoved {
                position: snapped,
                tile,
            });
        }
        Command::SetMovementMode { mode } => {
            if world.player.mode == mode {
                return;
            }
            world.player.mode = mode;
            out_events.push(Event::MovementModeChanged { mode });
        }
        Command::InteractWithToken { tile } => {
            let player_tile = world.grid.tile_at(world.player.position);
            let distance = tile.chebyshev_distance(player_tile);
            if distance > world.rules.pickup_radius() {
                out_events.push(Event::InteractionRejected {
                    tile,
                    reason: InteractionError::OutOfRange { distance },
                });
                return;
            }
            match world.player.held {
                None => world.pick_up(tile, out_events),
                Some(held) => world.craft(tile, held, out_events),
            }
        }
        Command::SpawnToken {
            tile,
            interactive,
            value,
        } => {
            world.spawn_token(tile, interactive, value, out_events);
        }
        Command::SetTokenInteractivity { tile, interactive } => {
            let Some(token) = world.tokens.get(&tile) else {
                return;
            };
            let Some(marker) = token.marker else {
                return;
            };
            if marker.interactive == interactive {
                return;
            }
            let fresh = world.allocate_marker(interactive);
            if let Some(token) = world.tokens.get_mut(&tile) {
                token.marker = Some(fresh);
            }
            out_events.push(Event::TokenInteractivityChanged {
                tile,
                marker: fresh.id,
                previous: marker.id,
                interactive,
            });
        }
        Command::EvictOffscreenMarkers { bounds } => {
            let grid = world.grid;
            for (tile, token) in world.tokens.iter_mut() {
                let Some(marker) = token.marker else {
                    continue;
                };
                if bounds.contains(grid.center_of(*tile)) {
                    continue;
                }
                token.marker = None;
                out_events.push(Event::MarkerEvicted {
                    tile: *tile,
                    marker: marker.id,
                });
            }
        }
        Command::ResetSession { position } => {
            world.tokens.clear();
            world.player.held = None;
            world.player.position = position;
            out_events.push(Event::SessionReset {
                position,
                tile: world.grid.tile_at(position),
            });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use geotoken_core::{
        GeoPoint, MarkerId, MovementMode, SavedSession, SavedToken, SessionRules, TileCoord,
        TileGrid, TokenValue,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the world's tile grid mapper.
    #[must_use]
    pub fn grid(world: &World) -> &TileGrid {
        &world.grid
    }

    /// Provides read-only access to the session rules.
    #[must_use]
    pub fn rules(world: &World) -> &SessionRules {
        &world.rules
    }

    /// Captures a read-only snapshot of the player state.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            position: world.player.position,
            tile: world.grid.tile_at(world.player.position),
            held: world.player.held,
            mode: world.player.mode,
        }
    }

    /// Tile currently containing the player, derived from the continuous
    /// position on every call so the two can never drift apart.
    #[must_use]
    pub fn player_tile(world: &World) -> TileCoord {
        world.grid.tile_at(world.player.position)
    }

    /// Reports whether a tile lies within the player's pickup radius.
    #[must_use]
    pub fn is_within_reach(world: &World, tile: TileCoord) -> bool {
        tile.chebyshev_distance(player_tile(world)) <= world.rules.pickup_radius()
    }

    /// Captures a read-only snapshot of a single tile's token, if present.
    #[must_use]
    pub fn token_at(world: &World, tile: TileCoord) -> Option<TokenSnapshot> {
        world.tokens.get(&tile).map(|token| TokenSnapshot {
            tile,
            value: token.value,
            collected: token.collected,
            marker: token.marker.map(|marker| MarkerSnapshot {
                id: marker.id,
                interactive: marker.interactive,
            }),
        })
    }

    /// Captures a read-only view of every token record in the store.
    #[must_use]
    pub fn token_view(world: &World) -> TokenView {
        let snapshots = world
            .tokens
            .iter()
            .map(|(tile, token)| TokenSnapshot {
                tile: *tile,
                value: token.value,
                collected: token.collected,
                marker: token.marker.map(|marker| MarkerSnapshot {
                    id: marker.id,
                    interactive: marker.interactive,
                }),
            })
            .collect();
        TokenView { snapshots }
    }

    /// Captures the complete persistable session state.
    #[must_use]
    pub fn saved_session(world: &World) -> SavedSession {
        SavedSession {
            tokens: world
                .tokens
                .iter()
                .map(|(tile, token)| SavedToken {
                    tile: *tile,
                    value: token.value,
                    collected: token.collected,
                })
                .collect(),
            held: world.player.held,
            player: Some(world.player.position),
        }
    }

    /// Immutable representation of the player used for queries.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct PlayerSnapshot {
        /// Continuous position of the player entity.
        pub position: GeoPoint,
        /// Tile containing the position.
        pub tile: TileCoord,
        /// Token currently held by the player, if any.
        pub held: Option<TokenValue>,
        /// Active movement mode.
        pub mode: MovementMode,
    }

    /// Immutable representation of a single token record used for queries.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct TokenSnapshot {
        /// Tile the token is bound to.
        pub tile: TileCoord,
        /// Value carried by the token.
        pub value: TokenValue,
        /// Whether the token has been collected.
        pub collected: bool,
        /// Render handle state, when the token is on the map.
        pub marker: Option<MarkerSnapshot>,
    }

    /// Immutable representation of a token's render handle.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MarkerSnapshot {
        /// Identity of the render handle.
        pub id: MarkerId,
        /// Whether the marker accepts click input.
        pub interactive: bool,
    }

    /// Read-only view over every token record, ordered by tile coordinate.
    #[derive(Clone, Debug, Default)]
    pub struct TokenView {
        snapshots: Vec<TokenSnapshot>,
    }

    impl TokenView {
        /// Iterator over the captured snapshots in deterministic order.
        pub fn iter(&self) -> impl Iterator<Item = &TokenSnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<TokenSnapshot> {
            self.snapshots
        }
    }
}

#[derive(Debug)]
struct Player {
    position: GeoPoint,
    held: Option<TokenValue>,
    mode: MovementMode,
}

#[derive(Clone, Debug)]
struct Token {
    value: TokenValue,
    collected: bool,
    marker: Option<Marker>,
}

#[derive(Clone, Copy, Debug)]
struct Marker {
    id: MarkerId,
    interactive: bool,
}
