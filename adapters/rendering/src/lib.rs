#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for GeoToken adapters.
//!
//! The world never draws anything itself; adapters compose a [`Scene`] from
//! read-only queries and hand it to a [`RenderingBackend`]. Scene composition
//! is pure, so backends stay thin and the presentation rules remain testable
//! without a display.

use anyhow::Result as AnyResult;
use geotoken_core::{
    GeoBounds, GeoPoint, MovementMode, TileCoord, TileGrid, TileRange, TokenValue,
};
use glam::DVec2;

/// Visual treatment applied to a background grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellStyle {
    /// The cell lies within the player's pickup radius.
    InRange,
    /// The cell is visible but beyond interaction range.
    OutOfRange,
}

/// Single background cell of the visible grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCellPresentation {
    /// Tile the cell outlines.
    pub tile: TileCoord,
    /// Styling derived from the player's position.
    pub style: CellStyle,
}

/// Token marker visible within the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenMarkerPresentation {
    /// Tile the marker sits on.
    pub tile: TileCoord,
    /// Value displayed on the marker label.
    pub value: TokenValue,
    /// Whether the marker accepts click input.
    pub interactive: bool,
}

impl TokenMarkerPresentation {
    /// Creates a new token marker descriptor.
    #[must_use]
    pub const fn new(tile: TileCoord, value: TokenValue, interactive: bool) -> Self {
        Self {
            tile,
            value,
            interactive,
        }
    }
}

/// Player marker positioned by its continuous coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerPresentation {
    /// Continuous position of the player entity.
    pub position: GeoPoint,
    /// Tile containing the position.
    pub tile: TileCoord,
}

impl PlayerPresentation {
    /// Creates a new player marker descriptor.
    #[must_use]
    pub const fn new(position: GeoPoint, tile: TileCoord) -> Self {
        Self { position, tile }
    }
}

/// Scene description combining the background grid, markers and status.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Grid mapper the scene was composed against.
    pub grid: TileGrid,
    /// Visible tile window.
    pub window: TileRange,
    /// Background cells in row-major order.
    pub cells: Vec<GridCellPresentation>,
    /// Token markers visible within the window.
    pub markers: Vec<TokenMarkerPresentation>,
    /// Player marker.
    pub player: PlayerPresentation,
    /// Token currently held by the player, if any.
    pub held: Option<TokenValue>,
    /// Active movement mode.
    pub mode: MovementMode,
}

impl Scene {
    /// Composes a scene for the given view.
    ///
    /// Every tile of the visible range receives a background cell, styled as
    /// in-range when it lies within `pickup_radius` of the player's tile (the
    /// player's own tile included). Markers outside the window are dropped.
    #[must_use]
    pub fn compose(
        grid: &TileGrid,
        bounds: GeoBounds,
        player: PlayerPresentation,
        held: Option<TokenValue>,
        mode: MovementMode,
        pickup_radius: u32,
        markers: Vec<TokenMarkerPresentation>,
    ) -> Self {
        let window = grid.visible_range(&bounds);
        let cells = window
            .tiles()
            .map(|tile| GridCellPresentation {
                tile,
                style: if tile.chebyshev_distance(player.tile) <= pickup_radius {
                    CellStyle::InRange
                } else {
                    CellStyle::OutOfRange
                },
            })
            .collect();
        let markers = markers
            .into_iter()
            .filter(|marker| window.contains(marker.tile))
            .collect();
        Self {
            grid: *grid,
            window,
            cells,
            markers,
            player,
            held,
            mode,
        }
    }
}

/// Fractional position of a continuous point within a tile window, measured
/// in cells from the window's south-west cell corner.
#[must_use]
pub fn window_position(grid: &TileGrid, window: TileRange, point: GeoPoint) -> DVec2 {
    let size = grid.tile_size();
    let south = grid.origin().lat() + f64::from(window.min().i()) * size;
    let west = grid.origin().lng() + f64::from(window.min().j()) * size;
    DVec2::new(
        (point.lat() - south) / size,
        (point.lng() - west) / size,
    )
}

/// Rendering backend capable of presenting GeoToken scenes.
pub trait RenderingBackend {
    /// Presents a single frame of the scene.
    fn present(&mut self, scene: &Scene) -> AnyResult<()>;
}
