pub mod cursor;
pub mod effects;
pub mod filter;
pub mod judge;
pub mod note;
pub mod schedule;
pub mod score;
pub mod session;

pub const NUM_LANES: usize = 2;

/// Lane center x positions in track-local units.
pub const LANE_X: [f32; NUM_LANES] = [-2.1, 2.1];

// Track geometry, all in track-local units. Notes travel from SPAWN_Z
// toward the hit line at HIT_Z and die when judged there.
pub const HIT_Z: f32 = 5.2;
pub const SPAWN_Z: f32 = -23.0;
pub const NOTE_SPEED: f32 = 13.0;
pub const CURSOR_Z: f32 = HIT_Z + 0.25;

// Vertical band the hit line occupies.
pub const HIT_TOP_Y: f32 = 0.95;
pub const HIT_BOT_Y: f32 = 0.45;

/// Seconds for a note to travel from spawn depth to the hit line.
pub const TRAVEL_TIME: f32 = (HIT_Z - SPAWN_Z) / NOTE_SPEED;

// Interaction plane: where normalized [0,1] hand coordinates land in
// track-local space. y is inverted (normalized 0 = top of frame).
pub const PLANE_X_MIN: f32 = -3.6;
pub const PLANE_X_MAX: f32 = 3.6;
pub const PLANE_Y_MIN: f32 = 0.0;
pub const PLANE_Y_MAX: f32 = 2.9;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Lane {
    #[default]
    Left,
    Right,
}

impl Lane {
    pub const BOTH: [Lane; NUM_LANES] = [Lane::Left, Lane::Right];

    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Right => 1,
        }
    }

    #[inline(always)]
    pub const fn other(self) -> Lane {
        match self {
            Lane::Left => Lane::Right,
            Lane::Right => Lane::Left,
        }
    }

    #[inline(always)]
    pub const fn center_x(self) -> f32 {
        LANE_X[self.index()]
    }
}

/// Map a normalized pose coordinate pair onto the interaction plane,
/// clamped to the plane bounds so downstream math never sees an
/// out-of-range or non-finite cursor target.
#[inline(always)]
pub fn plane_from_normalized(nx: f32, ny: f32) -> (f32, f32) {
    let nx = if nx.is_finite() { nx.clamp(0.0, 1.0) } else { 0.5 };
    let ny = if ny.is_finite() { ny.clamp(0.0, 1.0) } else { 0.5 };
    let x = PLANE_X_MIN + (PLANE_X_MAX - PLANE_X_MIN) * nx;
    let y = PLANE_Y_MAX - (PLANE_Y_MAX - PLANE_Y_MIN) * ny;
    (x, y)
}
