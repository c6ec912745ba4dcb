#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system that rolls token spawns for visible tiles.
//!
//! Spawn decisions depend only on tile identity: the [`luck`] hash maps each
//! canonical tile key into the unit interval, and tiles scoring below the
//! configured threshold receive a spawn command. Because the function carries
//! no state, the same world layout regenerates after a reload without
//! persisting a record for every tile that was ever visible.

use geotoken_core::{Command, Event, GeoBounds, TileCoord, TileGrid, TokenValue};

const LUCK_SEED: u64 = 0x853c_49e6_748f_ea9b;
const LUCK_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const LUCK_INCREMENT: u64 = 1_442_695_040_888_963_407;
const LUCK_FINALIZER: u64 = 0xff51_afd7_ed55_8ccd;

/// Deterministically hashes a tile key into the half-open unit interval.
///
/// Stable across calls and across sessions; approximately uniform, so a fixed
/// threshold of 0.2 yields roughly a one-in-five spawn rate.
#[must_use]
pub fn luck(key: &str) -> f64 {
    let mut state = LUCK_SEED;
    for byte in key.as_bytes() {
        state ^= u64::from(*byte);
        state = state.wrapping_mul(LUCK_MULTIPLIER).wrapping_add(LUCK_INCREMENT);
    }
    state ^= state >> 33;
    state = state.wrapping_mul(LUCK_FINALIZER);
    state ^= state >> 33;
    (state >> 11) as f64 / (1u64 << 53) as f64
}

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    spawn_threshold: f64,
    default_value: TokenValue,
}

impl Config {
    /// Creates a new configuration using the provided threshold and value.
    #[must_use]
    pub const fn new(spawn_threshold: f64, default_value: TokenValue) -> Self {
        Self {
            spawn_threshold,
            default_value,
        }
    }
}

/// Pure system that deterministically emits spawn commands for visible tiles.
#[derive(Debug)]
pub struct Spawning {
    spawn_threshold: f64,
    default_value: TokenValue,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            spawn_threshold: config.spawn_threshold,
            default_value: config.default_value,
        }
    }

    /// Consumes events and the visible region to emit spawn commands.
    ///
    /// Runs only when the view changed this frame or the world reported a
    /// player relocation; the world's store rules make repeated rolls for the
    /// same tile harmless.
    #[allow(clippy::too_many_arguments)] // The roll pass enumerates every viewport channel explicitly.
    pub fn handle(
        &self,
        events: &[Event],
        view_changed: bool,
        bounds: GeoBounds,
        grid: &TileGrid,
        player_tile: TileCoord,
        pickup_radius: u32,
        out: &mut Vec<Command>,
    ) {
        if !view_changed && !view_relevant(events) {
            return;
        }

        for tile in grid.visible_range(&bounds).tiles() {
            if luck(&tile.key()) < self.spawn_threshold {
                let interactive = tile.chebyshev_distance(player_tile) <= pickup_radius;
                out.push(Command::SpawnToken {
                    tile,
                    interactive,
                    value: self.default_value,
                });
            }
        }
    }
}

fn view_relevant(events: &[Event]) -> bool {
    events.iter().any(|event| {
        matches!(
            event,
            Event::PlayerMoved { .. } | Event::SessionReset { .. }
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{luck, Config, Spawning};
    use geotoken_core::{Command, GeoPoint, TileCoord, TileGrid, TokenValue};

    #[test]
    fn luck_is_deterministic_for_identical_keys() {
        let key = TileCoord::new(-12, 47).key();
        assert_eq!(luck(&key), luck(&key));
        assert_eq!(luck("0,0"), luck("0,0"));
    }

    #[test]
    fn luck_stays_inside_the_unit_interval() {
        for i in -50..50 {
            for j in -50..50 {
                let value = luck(&TileCoord::new(i, j).key());
                assert!((0.0..1.0).contains(&value), "luck({i},{j}) = {value}");
            }
        }
    }

    #[test]
    fn luck_distinguishes_neighbouring_tiles() {
        assert_ne!(luck("0,0"), luck("0,1"));
        assert_ne!(luck("0,1"), luck("1,0"));
    }

    #[test]
    fn spawn_rate_lands_near_the_threshold() {
        let mut hits = 0_u32;
        let mut total = 0_u32;
        for i in -50..50 {
            for j in -50..50 {
                total += 1;
                if luck(&TileCoord::new(i, j).key()) < 0.2 {
                    hits += 1;
                }
            }
        }
        let rate = f64::from(hits) / f64::from(total);
        assert!(
            (0.15..=0.25).contains(&rate),
            "spawn rate {rate} strays too far from 0.2"
        );
    }

    #[test]
    fn rolls_mark_tiles_inside_the_pickup_radius_interactive() {
        let grid = TileGrid::new(GeoPoint::new(0.0, 0.0), 1e-4);
        let player_tile = TileCoord::new(0, 0);
        let bounds = grid.window_bounds(player_tile, 5);
        let spawning = Spawning::new(Config::new(1.0, TokenValue::new(1)));
        let mut commands = Vec::new();

        spawning.handle(&[], true, bounds, &grid, player_tile, 3, &mut commands);

        assert_eq!(commands.len(), 121);
        for command in &commands {
            let Command::SpawnToken {
                tile, interactive, ..
            } = command
            else {
                panic!("unexpected command: {command:?}");
            };
            assert_eq!(
                *interactive,
                tile.chebyshev_distance(player_tile) <= 3,
                "interactivity mismatch at {tile:?}"
            );
        }
    }

    #[test]
    fn no_rolls_without_a_view_change() {
        let grid = TileGrid::new(GeoPoint::new(0.0, 0.0), 1e-4);
        let bounds = grid.window_bounds(TileCoord::new(0, 0), 3);
        let spawning = Spawning::new(Config::new(1.0, TokenValue::new(1)));
        let mut commands = Vec::new();

        spawning.handle(&[], false, bounds, &grid, TileCoord::new(0, 0), 3, &mut commands);

        assert!(commands.is_empty());
    }
}
