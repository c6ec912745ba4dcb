#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the GeoToken engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to GeoToken.";

/// Describes how the player entity is being relocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MovementMode {
    /// Discrete one-tile steps issued through directional input.
    Manual,
    /// Continuous position samples delivered by a geolocation watch.
    Geolocation,
}

impl MovementMode {
    /// Returns the opposite movement mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Manual => Self::Geolocation,
            Self::Geolocation => Self::Manual,
        }
    }
}

/// Cardinal directions available to manual movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward increasing latitude.
    North,
    /// Movement toward increasing longitude.
    East,
    /// Movement toward decreasing latitude.
    South,
    /// Movement toward decreasing longitude.
    West,
}

impl Direction {
    /// Tile-index displacement `(di, dj)` produced by one step.
    #[must_use]
    pub const fn offsets(self) -> (i32, i32) {
        match self {
            Self::North => (1, 0),
            Self::East => (0, 1),
            Self::South => (-1, 0),
            Self::West => (0, -1),
        }
    }
}

/// Identity of a single grid cell expressed as signed lattice indices.
///
/// `i` indexes latitude, `j` longitude. Two continuous positions share a
/// `TileCoord` exactly when they fall inside the same half-open square cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    i: i32,
    j: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Latitude index of the cell.
    #[must_use]
    pub const fn i(&self) -> i32 {
        self.i
    }

    /// Longitude index of the cell.
    #[must_use]
    pub const fn j(&self) -> i32 {
        self.j
    }

    /// Returns the coordinate displaced by whole tiles along each axis.
    #[must_use]
    pub const fn offset(self, di: i32, dj: i32) -> Self {
        Self {
            i: self.i.saturating_add(di),
            j: self.j.saturating_add(dj),
        }
    }

    /// Computes the Chebyshev (chessboard) distance between two coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.i.abs_diff(other.i).max(self.j.abs_diff(other.j))
    }

    /// Canonical `"i,j"` form used as the persisted record key.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{},{}", self.i, self.j)
    }

    /// Parses a coordinate back from its canonical `"i,j"` form.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let (i, j) = key.split_once(',')?;
        Some(Self {
            i: i.trim().parse().ok()?,
            j: j.trim().parse().ok()?,
        })
    }
}

/// Continuous position expressed in geographic degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Creates a new continuous position.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude component in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude component in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }
}

/// Inclusive axis-aligned region of continuous space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

impl GeoBounds {
    /// Creates a new bounding region from its edges.
    #[must_use]
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Southern edge latitude.
    #[must_use]
    pub const fn south(&self) -> f64 {
        self.south
    }

    /// Western edge longitude.
    #[must_use]
    pub const fn west(&self) -> f64 {
        self.west
    }

    /// Northern edge latitude.
    #[must_use]
    pub const fn north(&self) -> f64 {
        self.north
    }

    /// Eastern edge longitude.
    #[must_use]
    pub const fn east(&self) -> f64 {
        self.east
    }

    /// Reports whether the point lies inside the region, edges included.
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat() >= self.south
            && point.lat() <= self.north
            && point.lng() >= self.west
            && point.lng() <= self.east
    }
}

/// Pure mapper between continuous positions and discrete tile coordinates.
///
/// Parameterised by a fixed origin point and a positive tile size; carries no
/// other state, so every conversion is reproducible arithmetic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileGrid {
    origin: GeoPoint,
    tile_size: f64,
}

impl TileGrid {
    /// Creates a new grid anchored at `origin`. `tile_size` must be positive.
    #[must_use]
    pub const fn new(origin: GeoPoint, tile_size: f64) -> Self {
        Self { origin, tile_size }
    }

    /// Origin point the lattice is anchored to.
    #[must_use]
    pub const fn origin(&self) -> GeoPoint {
        self.origin
    }

    /// Side length of a single square cell in degrees.
    #[must_use]
    pub const fn tile_size(&self) -> f64 {
        self.tile_size
    }

    /// Maps a continuous position to the tile containing it.
    #[must_use]
    pub fn tile_at(&self, point: GeoPoint) -> TileCoord {
        TileCoord::new(
            ((point.lat() - self.origin.lat()) / self.tile_size).floor() as i32,
            ((point.lng() - self.origin.lng()) / self.tile_size).floor() as i32,
        )
    }

    /// Canonical centre point of a tile.
    ///
    /// Round trips with [`TileGrid::tile_at`]: `tile_at(center_of(t)) == t`
    /// for every integer coordinate.
    #[must_use]
    pub fn center_of(&self, tile: TileCoord) -> GeoPoint {
        GeoPoint::new(
            self.origin.lat() + (f64::from(tile.i()) + 0.5) * self.tile_size,
            self.origin.lng() + (f64::from(tile.j()) + 0.5) * self.tile_size,
        )
    }

    /// The square cell occupied by a tile.
    #[must_use]
    pub fn tile_bounds(&self, tile: TileCoord) -> GeoBounds {
        let south = self.origin.lat() + f64::from(tile.i()) * self.tile_size;
        let west = self.origin.lng() + f64::from(tile.j()) * self.tile_size;
        GeoBounds::new(south, west, south + self.tile_size, west + self.tile_size)
    }

    /// Region whose corners sit on the centres of the outermost tiles of a
    /// square window `radius_tiles` around `center`.
    #[must_use]
    pub fn window_bounds(&self, center: TileCoord, radius_tiles: u32) -> GeoBounds {
        let radius = radius_tiles as i32;
        let south_west = self.center_of(center.offset(-radius, -radius));
        let north_east = self.center_of(center.offset(radius, radius));
        GeoBounds::new(
            south_west.lat(),
            south_west.lng(),
            north_east.lat(),
            north_east.lng(),
        )
    }

    /// Inclusive range of tiles visible inside the given bounds.
    #[must_use]
    pub fn visible_range(&self, bounds: &GeoBounds) -> TileRange {
        TileRange::new(
            self.tile_at(GeoPoint::new(bounds.south(), bounds.west())),
            self.tile_at(GeoPoint::new(bounds.north(), bounds.east())),
        )
    }

    /// Displaces a continuous position by exactly one tile size.
    #[must_use]
    pub fn step_from(&self, position: GeoPoint, direction: Direction) -> GeoPoint {
        let (di, dj) = direction.offsets();
        GeoPoint::new(
            position.lat() + f64::from(di) * self.tile_size,
            position.lng() + f64::from(dj) * self.tile_size,
        )
    }
}

/// Inclusive rectangular range of tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileRange {
    min: TileCoord,
    max: TileCoord,
}

impl TileRange {
    /// Creates a new range spanning `min..=max` on both axes.
    #[must_use]
    pub const fn new(min: TileCoord, max: TileCoord) -> Self {
        Self { min, max }
    }

    /// South-western corner of the range.
    #[must_use]
    pub const fn min(&self) -> TileCoord {
        self.min
    }

    /// North-eastern corner of the range.
    #[must_use]
    pub const fn max(&self) -> TileCoord {
        self.max
    }

    /// Reports whether the coordinate lies inside the range.
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        tile.i() >= self.min.i()
            && tile.i() <= self.max.i()
            && tile.j() >= self.min.j()
            && tile.j() <= self.max.j()
    }

    /// Iterates every tile in the range in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        let (min, max) = (self.min, self.max);
        (min.i()..=max.i()).flat_map(move |i| (min.j()..=max.j()).map(move |j| TileCoord::new(i, j)))
    }
}

/// Value carried by a collectible token. Always a positive integer; crafted
/// values are powers of two reachable from the default by repeated doubling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenValue(u64);

impl TokenValue {
    /// Creates a new token value. `value` must be at least one.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Value produced when two equal tokens are crafted together.
    #[must_use]
    pub const fn doubled(self) -> Self {
        Self(self.0.saturating_mul(2))
    }
}

/// Opaque render-handle identity allocated by the world.
///
/// Marker identities are meaningful only within a session and are never
/// persisted; restored tokens carry no marker until re-rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

impl MarkerId {
    /// Creates a new marker identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Tunable session parameters. Thresholds vary between deployments, so they
/// are configuration rather than constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionRules {
    pickup_radius: u32,
    spawn_threshold: f64,
    default_token_value: TokenValue,
    win_threshold: TokenValue,
    reset_on_win: bool,
}

impl SessionRules {
    /// Creates a new rule set from explicit parameters.
    #[must_use]
    pub const fn new(
        pickup_radius: u32,
        spawn_threshold: f64,
        default_token_value: TokenValue,
        win_threshold: TokenValue,
        reset_on_win: bool,
    ) -> Self {
        Self {
            pickup_radius,
            spawn_threshold,
            default_token_value,
            win_threshold,
            reset_on_win,
        }
    }

    /// Chebyshev distance within which tokens accept interaction.
    #[must_use]
    pub const fn pickup_radius(&self) -> u32 {
        self.pickup_radius
    }

    /// Luck threshold below which a visible tile spawns a token.
    #[must_use]
    pub const fn spawn_threshold(&self) -> f64 {
        self.spawn_threshold
    }

    /// Value assigned to naturally spawned tokens.
    #[must_use]
    pub const fn default_token_value(&self) -> TokenValue {
        self.default_token_value
    }

    /// Held value at which the win notification fires.
    #[must_use]
    pub const fn win_threshold(&self) -> TokenValue {
        self.win_threshold
    }

    /// Whether the adapter should restart the session after a win.
    #[must_use]
    pub const fn reset_on_win(&self) -> bool {
        self.reset_on_win
    }
}

impl Default for SessionRules {
    fn default() -> Self {
        Self::new(3, 0.2, TokenValue::new(1), TokenValue::new(256), false)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Steps the player one tile size in the given direction. Ignored unless
    /// manual movement is active.
    MovePlayer {
        /// Direction of the requested step.
        direction: Direction,
    },
    /// Delivers a geolocation sample; the player snaps to the centre of the
    /// containing tile. Ignored unless geolocation movement is active.
    SyncPosition {
        /// Sampled continuous position.
        position: GeoPoint,
    },
    /// Switches between manual and geolocation movement.
    SetMovementMode {
        /// Mode the world should activate.
        mode: MovementMode,
    },
    /// Requests a pickup, craft, or placement on the given tile. Ignored
    /// entirely when the tile lies outside the pickup radius.
    InteractWithToken {
        /// Tile the player interacted with.
        tile: TileCoord,
    },
    /// Materialises a token on a tile if the store's spawn rules allow it.
    SpawnToken {
        /// Tile receiving the token.
        tile: TileCoord,
        /// Whether the rendered marker accepts click input.
        interactive: bool,
        /// Value for a freshly created token. A persisted uncollected record
        /// keeps its stored value instead.
        value: TokenValue,
    },
    /// Aligns a rendered token's interactivity flag with its in-range status.
    SetTokenInteractivity {
        /// Tile whose marker should be corrected.
        tile: TileCoord,
        /// Whether the marker should accept click input.
        interactive: bool,
    },
    /// Destroys render handles for tokens whose tile centre lies outside the
    /// visible bounds. Logical records are retained.
    EvictOffscreenMarkers {
        /// Currently visible region.
        bounds: GeoBounds,
    },
    /// Restarts the session: clears the token store and the held token and
    /// relocates the player.
    ResetSession {
        /// Starting position for the fresh session.
        position: GeoPoint,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the player entity relocated.
    PlayerMoved {
        /// New continuous position.
        position: GeoPoint,
        /// Tile containing the new position.
        tile: TileCoord,
    },
    /// Announces that a new movement mode became active.
    MovementModeChanged {
        /// Mode that became active after processing commands.
        mode: MovementMode,
    },
    /// Confirms that a token materialised with a fresh render handle.
    TokenSpawned {
        /// Tile occupied by the token.
        tile: TileCoord,
        /// Value displayed on the marker.
        value: TokenValue,
        /// Render handle allocated for the marker.
        marker: MarkerId,
        /// Whether the marker accepts click input.
        interactive: bool,
    },
    /// Confirms that a crafted token's value doubled in place.
    TokenValueChanged {
        /// Tile occupied by the token.
        tile: TileCoord,
        /// New value displayed on the marker.
        value: TokenValue,
        /// Render handle whose label must be refreshed, when rendered.
        marker: Option<MarkerId>,
    },
    /// Confirms that a token was collected into the player's hand.
    TokenCollected {
        /// Tile the token occupied.
        tile: TileCoord,
        /// Value transferred to the hand.
        value: TokenValue,
        /// Render handle destroyed by the pickup, when one existed.
        marker: Option<MarkerId>,
    },
    /// Reports the new content of the player's hand.
    HeldTokenChanged {
        /// Held value, or `None` when the hand emptied.
        value: Option<TokenValue>,
    },
    /// Confirms that a marker was recreated with a different interactivity
    /// flag. Render handles cannot be retoggled in place.
    TokenInteractivityChanged {
        /// Tile occupied by the token.
        tile: TileCoord,
        /// Freshly allocated render handle.
        marker: MarkerId,
        /// Handle that was destroyed by the correction.
        previous: MarkerId,
        /// Whether the new marker accepts click input.
        interactive: bool,
    },
    /// Confirms that an off-screen token's render handle was destroyed.
    MarkerEvicted {
        /// Tile occupied by the token.
        tile: TileCoord,
        /// Handle that was destroyed.
        marker: MarkerId,
    },
    /// Reports that an interaction attempt was rejected.
    InteractionRejected {
        /// Tile named in the interaction request.
        tile: TileCoord,
        /// Specific reason the interaction was ignored.
        reason: InteractionError,
    },
    /// Announces that a pickup lifted the held value to the win threshold.
    /// Fires once per qualifying pickup and never on craft release.
    GameWon {
        /// Held value that reached the threshold.
        value: TokenValue,
    },
    /// Confirms that the session restarted from a clean slate.
    SessionReset {
        /// Starting position of the fresh session.
        position: GeoPoint,
        /// Tile containing the starting position.
        tile: TileCoord,
    },
}

/// Reasons an interaction attempt may be ignored by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionError {
    /// The tile lies beyond the pickup radius of the player's tile.
    OutOfRange {
        /// Chebyshev distance between the tile and the player's tile.
        distance: u32,
    },
    /// No live token occupies the tile and the player's hand is empty.
    TokenAbsent,
    /// The tile's token value does not match the held value.
    ValueMismatch {
        /// Value currently held by the player.
        held: TokenValue,
        /// Value found on the tile.
        found: TokenValue,
    },
}

/// Token record restored from durable storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavedToken {
    /// Tile the token is bound to.
    pub tile: TileCoord,
    /// Stored token value.
    pub value: TokenValue,
    /// Whether the token had already been collected.
    pub collected: bool,
}

/// Session state restored from durable storage. Every part is independently
/// optional; missing parts fall back to fresh defaults.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SavedSession {
    /// Restored token records.
    pub tokens: Vec<SavedToken>,
    /// Restored held token, if the hand was occupied.
    pub held: Option<TokenValue>,
    /// Restored player position, if one was saved.
    pub player: Option<GeoPoint>,
}

#[cfg(test)]
mod tests {
    use super::{Direction, GeoPoint, MovementMode, TileCoord, TileGrid, TileRange, TokenValue};
    use serde::{de::DeserializeOwned, Serialize};

    const GRID: TileGrid = TileGrid::new(GeoPoint::new(0.0, 0.0), 1e-4);

    #[test]
    fn tile_round_trips_through_center() {
        for i in [-899_990, -47, -1, 0, 1, 63, 899_990] {
            for j in [-899_990, -12, 0, 5, 899_990] {
                let tile = TileCoord::new(i, j);
                assert_eq!(GRID.tile_at(GRID.center_of(tile)), tile);
            }
        }
    }

    #[test]
    fn positions_in_same_cell_share_a_tile() {
        let inside = GeoPoint::new(3.2e-4, -1.9e-4);
        let also_inside = GeoPoint::new(3.9e-4, -1.1e-4);
        assert_eq!(GRID.tile_at(inside), GRID.tile_at(also_inside));
        assert_eq!(GRID.tile_at(inside), TileCoord::new(3, -2));
    }

    #[test]
    fn cell_edges_belong_to_the_next_tile() {
        let on_edge = GeoPoint::new(2.0 * 1e-4, 0.0);
        assert_eq!(GRID.tile_at(on_edge), TileCoord::new(2, 0));
    }

    #[test]
    fn chebyshev_distance_takes_the_larger_axis() {
        let origin = TileCoord::new(0, 0);
        assert_eq!(origin.chebyshev_distance(TileCoord::new(3, -1)), 3);
        assert_eq!(origin.chebyshev_distance(TileCoord::new(-2, 4)), 4);
        assert_eq!(origin.chebyshev_distance(origin), 0);
    }

    #[test]
    fn key_round_trips_for_negative_coordinates() {
        let tile = TileCoord::new(-47, 1203);
        assert_eq!(tile.key(), "-47,1203");
        assert_eq!(TileCoord::from_key(&tile.key()), Some(tile));
    }

    #[test]
    fn malformed_keys_parse_to_none() {
        assert_eq!(TileCoord::from_key(""), None);
        assert_eq!(TileCoord::from_key("12"), None);
        assert_eq!(TileCoord::from_key("a,b"), None);
    }

    #[test]
    fn window_bounds_cover_the_expected_tile_range() {
        let bounds = GRID.window_bounds(TileCoord::new(4, -2), 3);
        let range = GRID.visible_range(&bounds);
        assert_eq!(range.min(), TileCoord::new(1, -5));
        assert_eq!(range.max(), TileCoord::new(7, 1));
        assert_eq!(range.tiles().count(), 49);
    }

    #[test]
    fn range_iteration_is_row_major_and_inclusive() {
        let range = TileRange::new(TileCoord::new(0, 0), TileCoord::new(1, 1));
        let tiles: Vec<TileCoord> = range.tiles().collect();
        assert_eq!(
            tiles,
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(0, 1),
                TileCoord::new(1, 0),
                TileCoord::new(1, 1),
            ]
        );
        assert!(range.contains(TileCoord::new(1, 0)));
        assert!(!range.contains(TileCoord::new(2, 0)));
    }

    #[test]
    fn step_moves_exactly_one_tile_size() {
        let start = GRID.center_of(TileCoord::new(0, 0));
        let stepped = GRID.step_from(start, Direction::North);
        assert_eq!(GRID.tile_at(stepped), TileCoord::new(1, 0));
        let back = GRID.step_from(stepped, Direction::South);
        assert_eq!(GRID.tile_at(back), TileCoord::new(0, 0));
    }

    #[test]
    fn doubling_a_token_value_doubles_it() {
        assert_eq!(TokenValue::new(1).doubled(), TokenValue::new(2));
        assert_eq!(TokenValue::new(128).doubled(), TokenValue::new(256));
    }

    #[test]
    fn toggling_movement_mode_alternates() {
        assert_eq!(MovementMode::Manual.toggled(), MovementMode::Geolocation);
        assert_eq!(MovementMode::Geolocation.toggled(), MovementMode::Manual);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn tile_coord_round_trips_through_bincode() {
        assert_round_trip(&TileCoord::new(-3, 12));
    }

    #[test]
    fn token_value_round_trips_through_bincode() {
        assert_round_trip(&TokenValue::new(64));
    }

    #[test]
    fn geo_point_round_trips_through_bincode() {
        assert_round_trip(&GeoPoint::new(36.9895, -122.0627));
    }
}
