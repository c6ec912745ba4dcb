//! ASCII rendering backend for the terminal.

use std::io::{self, Write};

use anyhow::Result as AnyResult;
use geotoken_core::{MovementMode, TileCoord};
use geotoken_rendering::{window_position, CellStyle, RenderingBackend, Scene};

const CELL_WIDTH: usize = 5;

/// Backend that renders scenes as fixed-width character grids.
#[derive(Debug)]
pub struct AsciiBackend<W: Write> {
    out: W,
}

impl AsciiBackend<io::Stdout> {
    /// Creates a backend writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> AsciiBackend<W> {
    /// Creates a backend writing to the given sink.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> RenderingBackend for AsciiBackend<W> {
    fn present(&mut self, scene: &Scene) -> AnyResult<()> {
        self.out.write_all(render_scene(scene).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Renders a scene into its character-grid representation.
///
/// Rows run north to south. Each cell shows the player (`@`), a token value
/// (parenthesised when the marker is decorative), or the background: `+` for
/// cells within pickup range, `.` beyond it.
#[must_use]
pub fn render_scene(scene: &Scene) -> String {
    let window = scene.window;
    let mut output = String::new();

    // The player glyph follows the continuous position, so a panned-away
    // window simply loses it instead of pinning it to an edge.
    let offsets = window_position(&scene.grid, window, scene.player.position);
    let player_cell = window
        .min()
        .offset(offsets.x.floor() as i32, offsets.y.floor() as i32);

    for i in (window.min().i()..=window.max().i()).rev() {
        for j in window.min().j()..=window.max().j() {
            let tile = TileCoord::new(i, j);
            output.push_str(&glyph_for(scene, tile, player_cell));
        }
        output.push('\n');
    }

    let held = scene
        .held
        .map_or_else(|| "-".to_owned(), |value| value.get().to_string());
    let mode = match scene.mode {
        MovementMode::Manual => "manual",
        MovementMode::Geolocation => "geolocation",
    };
    output.push_str(&format!(
        "Held: {held} | Mode: {mode} | Tile: {}\n",
        scene.player.tile.key()
    ));
    output
}

fn glyph_for(scene: &Scene, tile: TileCoord, player_cell: TileCoord) -> String {
    if tile == player_cell {
        return center("@");
    }
    if let Some(marker) = scene.markers.iter().find(|marker| marker.tile == tile) {
        let label = if marker.interactive {
            marker.value.get().to_string()
        } else {
            format!("({})", marker.value.get())
        };
        return center(&label);
    }
    let style = scene
        .cells
        .iter()
        .find(|cell| cell.tile == tile)
        .map(|cell| cell.style);
    match style {
        Some(CellStyle::InRange) => center("+"),
        _ => center("."),
    }
}

fn center(label: &str) -> String {
    format!("{:^1$}", label, CELL_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::render_scene;
    use geotoken_core::{GeoPoint, MovementMode, TileCoord, TileGrid, TokenValue};
    use geotoken_rendering::{PlayerPresentation, Scene, TokenMarkerPresentation};

    #[test]
    fn the_player_and_markers_are_visible_in_the_grid() {
        let grid = TileGrid::new(GeoPoint::new(0.0, 0.0), 1e-4);
        let player_tile = TileCoord::new(0, 0);
        let scene = Scene::compose(
            &grid,
            grid.window_bounds(player_tile, 2),
            PlayerPresentation::new(grid.center_of(player_tile), player_tile),
            Some(TokenValue::new(2)),
            MovementMode::Manual,
            3,
            vec![
                TokenMarkerPresentation::new(TileCoord::new(1, 1), TokenValue::new(4), true),
                TokenMarkerPresentation::new(TileCoord::new(-1, 0), TokenValue::new(8), false),
            ],
        );

        let rendered = render_scene(&scene);
        let lines: Vec<&str> = rendered.lines().collect();

        // Five grid rows plus the status line.
        assert_eq!(lines.len(), 6);
        assert!(lines[2].contains('@'));
        assert!(lines[1].contains('4'));
        assert!(lines[3].contains("(8)"));
        assert!(lines[5].starts_with("Held: 2 | Mode: manual"));
    }
}
