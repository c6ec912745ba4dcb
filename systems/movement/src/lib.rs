#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement system that turns raw input into player relocation commands.
//!
//! Directional steps are forwarded only while manual movement is active, and
//! geolocation samples only while the watch is running. Geolocation errors
//! cancel the watch and fall the session back to manual movement; the watch
//! handle is idempotent, so cancelling twice or cancelling a watch that never
//! started is a no-op.

use geotoken_core::{Command, Direction, Event, GeoPoint, MovementMode};

/// Input gathered by the adapter for a single frame of the session loop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementInput {
    /// Directional step requested through the movement buttons.
    pub step: Option<Direction>,
    /// Whether the mode-toggle control was pressed this frame.
    pub toggle_mode: bool,
    /// Position sample delivered by the geolocation watch.
    pub geo_sample: Option<GeoPoint>,
    /// Error reported by the geolocation watch.
    pub geo_error: Option<GeoError>,
}

/// Failures a geolocation watch can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeoError {
    /// The user denied the position permission prompt.
    PermissionDenied,
    /// The platform could not produce a position fix.
    PositionUnavailable,
    /// The watch timed out waiting for a fix.
    Timeout,
}

/// Handle for an active geolocation watch registration.
///
/// Mirrors the platform watch-id contract: activation allocates a fresh
/// identifier and cancellation is idempotent.
#[derive(Debug, Default)]
pub struct GeoWatch {
    next_id: u32,
    active: Option<u32>,
}

impl GeoWatch {
    /// Creates a new handle with no active watch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a watch. Returns `false` when one is already running.
    pub fn activate(&mut self) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        true
    }

    /// Cancels the watch. Returns `false` when none was running.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }

    /// Reports whether a watch is currently registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

/// Pure system that reacts to frame input and world events with movement
/// commands.
#[derive(Debug)]
pub struct Movement {
    watch: GeoWatch,
    mode: MovementMode,
}

impl Movement {
    /// Creates a movement system tracking the world's initial mode.
    #[must_use]
    pub fn new(mode: MovementMode) -> Self {
        let mut watch = GeoWatch::new();
        if mode == MovementMode::Geolocation {
            let _ = watch.activate();
        }
        Self { watch, mode }
    }

    /// Reports whether the geolocation watch is currently registered.
    #[must_use]
    pub fn watching(&self) -> bool {
        self.watch.is_active()
    }

    /// Consumes world events and frame input to emit movement commands.
    pub fn handle(&mut self, events: &[Event], input: &MovementInput, out: &mut Vec<Command>) {
        for event in events {
            if let Event::MovementModeChanged { mode } = event {
                self.mode = *mode;
                match mode {
                    MovementMode::Geolocation => {
                        let _ = self.watch.activate();
                    }
                    MovementMode::Manual => {
                        let _ = self.watch.cancel();
                    }
                }
            }
        }

        if input.toggle_mode {
            out.push(Command::SetMovementMode {
                mode: self.mode.toggled(),
            });
        }

        if let Some(direction) = input.step {
            if self.mode == MovementMode::Manual {
                out.push(Command::MovePlayer { direction });
            }
        }

        if let Some(position) = input.geo_sample {
            if self.mode == MovementMode::Geolocation && self.watch.is_active() {
                out.push(Command::SyncPosition { position });
            }
        }

        if input.geo_error.is_some() {
            let _ = self.watch.cancel();
            if self.mode == MovementMode::Geolocation {
                out.push(Command::SetMovementMode {
                    mode: MovementMode::Manual,
                });
            }
        }
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(MovementMode::Geolocation)
    }
}
