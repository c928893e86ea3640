//! Fixed-capacity note pool.
//!
//! Notes live in a flat array with a wrapping write cursor. Spawning never
//! allocates and never fails: if the cursor lands on a slot that is still
//! live the old note is overwritten. The pool is sized so that at sane BPMs
//! a note always leaves the track long before its slot comes around again.
//!
//! Judgement is terminal: a note dies the moment it is cut or drifts past
//! the back edge of the hit window, freeing its slot immediately.

use crate::game::{HIT_Z, Lane, NOTE_SPEED, SPAWN_Z, TRAVEL_TIME};

pub const NOTE_POOL_SIZE: usize = 26;

const NOTE_BASE_SIZE: f32 = 0.78;
const NOTE_SIZE_FAR: f32 = 0.55;
const NOTE_SIZE_NEAR: f32 = 1.25;
const NOTE_Y_FAR: f32 = 2.9;
const NOTE_Y_NEAR: f32 = 0.95;

#[inline(always)]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Note {
    pub alive: bool,
    pub lane: Lane,
    pub z: f32,
}

/// World-space placement of a note, derived from its travel progress. Notes
/// descend and grow as they approach the hit line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotePose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub size: f32,
}

impl Note {
    pub fn pose(&self) -> NotePose {
        let progress = ((self.z - SPAWN_Z) / (HIT_Z - SPAWN_Z)).clamp(0.0, 1.0);
        NotePose {
            x: self.lane.center_x(),
            y: lerp(NOTE_Y_FAR, NOTE_Y_NEAR, progress),
            z: self.z,
            size: NOTE_BASE_SIZE * lerp(NOTE_SIZE_FAR, NOTE_SIZE_NEAR, progress),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotePool {
    slots: [Note; NOTE_POOL_SIZE],
    write_idx: usize,
}

impl Default for NotePool {
    fn default() -> Self {
        Self {
            slots: [Note::default(); NOTE_POOL_SIZE],
            write_idx: 0,
        }
    }
}

impl NotePool {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Spawn a note, compensated for a late spawn deadline: a note that
    /// should have spawned `late_s` ago starts partway down the track so it
    /// still crosses the hit line on its beat.
    pub fn spawn(&mut self, lane: Lane, late_s: f32) {
        let head_start = late_s.clamp(0.0, TRAVEL_TIME);
        let slot = &mut self.slots[self.write_idx];
        if slot.alive {
            log::debug!("note pool saturated, recycling slot {}", self.write_idx);
        }
        *slot = Note {
            alive: true,
            lane,
            z: SPAWN_Z + NOTE_SPEED * head_start,
        };
        self.write_idx = (self.write_idx + 1) % NOTE_POOL_SIZE;
    }

    /// Move every live note down the track. Notes that drift past the back
    /// edge of the hit window die on the spot as automatic misses; the
    /// return value is how many did so this frame.
    pub fn advance(&mut self, dt_s: f32, hit_z_window: f32) -> u32 {
        let mut auto_misses = 0;
        for note in self.slots.iter_mut().filter(|n| n.alive) {
            note.z += NOTE_SPEED * dt_s;
            if note.z > HIT_Z + hit_z_window {
                note.alive = false;
                auto_misses += 1;
            }
        }
        auto_misses
    }

    /// Mark the note in `slot` as judged, freeing it immediately.
    pub fn kill(&mut self, slot: usize) {
        self.slots[slot].alive = false;
    }

    pub fn live(&self) -> impl Iterator<Item = &Note> {
        self.slots.iter().filter(|n| n.alive)
    }

    /// Live notes with their slot index, for callers that need to judge a
    /// specific note after scanning.
    pub fn live_indexed(&self) -> impl Iterator<Item = (usize, &Note)> {
        self.slots.iter().enumerate().filter(|(_, n)| n.alive)
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|n| n.alive).count()
    }
}
