#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Viewport system that keeps render handles consistent with the visible
//! region.
//!
//! On every view change it emits an eviction command for off-screen markers
//! followed by interactivity corrections for rendered tokens whose click flag
//! disagrees with their in-range status. Eviction always precedes the spawn
//! roll pass, so freshly visible tiles are never evicted in the frame that
//! revealed them.

use geotoken_core::{Command, Event, GeoBounds, TileCoord, TileGrid};

/// Rendered-token descriptor consumed by the viewport pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderedToken {
    /// Tile occupied by the token.
    pub tile: TileCoord,
    /// Interactivity flag currently carried by the token's marker.
    pub interactive: bool,
}

impl RenderedToken {
    /// Creates a new rendered-token descriptor.
    #[must_use]
    pub const fn new(tile: TileCoord, interactive: bool) -> Self {
        Self { tile, interactive }
    }
}

/// Pure system that maintains the visible tile window.
#[derive(Debug, Default)]
pub struct Viewport;

impl Viewport {
    /// Creates a new viewport system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Consumes events and the rendered-token set to emit maintenance
    /// commands for the current view.
    #[allow(clippy::too_many_arguments)] // The maintenance pass enumerates every viewport channel explicitly.
    pub fn handle(
        &self,
        events: &[Event],
        view_changed: bool,
        bounds: GeoBounds,
        grid: &TileGrid,
        player_tile: TileCoord,
        pickup_radius: u32,
        rendered: &[RenderedToken],
        out: &mut Vec<Command>,
    ) {
        if !view_changed && !view_relevant(events) {
            return;
        }

        out.push(Command::EvictOffscreenMarkers { bounds });

        let range = grid.visible_range(&bounds);
        for token in rendered {
            if !range.contains(token.tile) {
                continue;
            }
            let in_range = token.tile.chebyshev_distance(player_tile) <= pickup_radius;
            if in_range != token.interactive {
                out.push(Command::SetTokenInteractivity {
                    tile: token.tile,
                    interactive: in_range,
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
    use super::{RenderedToken, Viewport};
    use geotoken_core::{Command, GeoPoint, TileCoord, TileGrid};

    fn test_grid() -> TileGrid {
        TileGrid::new(GeoPoint::new(0.0, 0.0), 1e-4)
    }

    #[test]
    fn quiet_frames_emit_nothing() {
        let grid = test_grid();
        let bounds = grid.window_bounds(TileCoord::new(0, 0), 4);
        let mut commands = Vec::new();

        Viewport::new().handle(
            &[],
            false,
            bounds,
            &grid,
            TileCoord::new(0, 0),
            3,
            &[],
            &mut commands,
        );

        assert!(commands.is_empty());
    }

    #[test]
    fn eviction_always_precedes_corrections() {
        let grid = test_grid();
        let player_tile = TileCoord::new(0, 0);
        let bounds = grid.window_bounds(player_tile, 4);
        let rendered = [
            // In range but flagged decorative: needs a correction.
            RenderedToken::new(TileCoord::new(1, 1), false),
            // Out of range but flagged interactive: needs a correction.
            RenderedToken::new(TileCoord::new(4, 4), true),
            // Consistent: no correction.
            RenderedToken::new(TileCoord::new(2, 0), true),
        ];
        let mut commands = Vec::new();

        Viewport::new().handle(
            &[],
            true,
            bounds,
            &grid,
            player_tile,
            3,
            &rendered,
            &mut commands,
        );

        assert!(matches!(
            commands.first(),
            Some(Command::EvictOffscreenMarkers { .. })
        ));
        let corrections: Vec<_> = commands
            .iter()
            .filter_map(|command| match command {
                Command::SetTokenInteractivity { tile, interactive } => Some((*tile, *interactive)),
                _ => None,
            })
            .collect();
        assert_eq!(
            corrections,
            vec![
                (TileCoord::new(1, 1), true),
                (TileCoord::new(4, 4), false),
            ]
        );
    }

    #[test]
    fn tokens_outside_the_window_are_left_to_eviction() {
        let grid = test_grid();
        let player_tile = TileCoord::new(0, 0);
        let bounds = grid.window_bounds(player_tile, 2);
        // Far outside the window; the marker will be evicted rather than
        // corrected, so no interactivity command may be emitted for it.
        let rendered = [RenderedToken::new(TileCoord::new(10, 10), true)];
        let mut commands = Vec::new();

        Viewport::new().handle(
            &[],
            true,
            bounds,
            &grid,
            player_tile,
            3,
            &rendered,
            &mut commands,
        );

        assert_eq!(commands.len(), 1);
        assert!(matches!(
            commands[0],
            Command::EvictOffscreenMarkers { .. }
        ));
    }
}
