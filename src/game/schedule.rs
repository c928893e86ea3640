//! Beat-synchronized note spawning.
//!
//! No chart file: the pattern is derived entirely from (BPM, beat offset,
//! seed) at half-beat granularity. Spawn decisions come from an explicit
//! 32-bit integer hash so the same song settings always reproduce the same
//! pattern, bit for bit, in any implementation. Replay tooling depends on
//! this; do not swap in a stock PRNG.

use crate::game::{Lane, TRAVEL_TIME};

/// Backward jumps in song time larger than this are treated as a seek and
/// reset the step cursor.
pub const SEEK_TOLERANCE_S: f32 = 0.05;

const OFFBEAT_SPAWN_CHANCE: f32 = 0.35;
const ONBEAT_REPEAT_CHANCE: f32 = 0.20;
const OFFBEAT_REPEAT_CHANCE: f32 = 0.12;
/// Every Nth beat may also spawn a note in the opposite lane ("double").
const DOUBLE_BEAT_PERIOD: u32 = 16;
const DOUBLE_CHANCE: f32 = 0.55;

const STEP_DRAW_SALT: u32 = 1_000_000;
const DOUBLE_DRAW_SALT: u32 = 777_777;

/// xorshift-multiply integer hash (lowbias-style avalanche).
#[inline(always)]
fn mix32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Deterministic draw in [0,1) for (seed, index) under the given salt.
#[inline(always)]
pub fn hash01(seed: u32, salt: u32, index: u32) -> f32 {
    let key = seed.wrapping_mul(salt).wrapping_add(index);
    (mix32(key) as f64 / 4_294_967_296.0) as f32
}

/// One note the scheduler wants spawned this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnCommand {
    pub step_index: u32,
    pub lane: Lane,
    /// Seconds by which the spawn deadline was already missed when the
    /// frame loop got here; used to start the note closer to the hit line
    /// so it still arrives on the beat.
    pub late_s: f32,
}

#[derive(Debug, Clone)]
pub struct BeatScheduler {
    bpm: f32,
    beat_offset_s: f32,
    seed: u32,
    next_step: u32,
    last_lane: Lane,
    last_song_time: f32,
}

impl BeatScheduler {
    pub fn new(bpm: f32, beat_offset_s: f32, seed: u32) -> Self {
        Self {
            bpm,
            beat_offset_s,
            seed,
            next_step: 0,
            last_lane: Lane::Left,
            last_song_time: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.next_step = 0;
        self.last_lane = Lane::Left;
        self.last_song_time = 0.0;
    }

    pub fn next_step_index(&self) -> u32 {
        self.next_step
    }

    /// Advance to `song_time_s`, pushing a spawn command for every
    /// half-beat step whose spawn deadline has been reached.
    pub fn advance(&mut self, song_time_s: f32, playing: bool, out: &mut Vec<SpawnCommand>) {
        // A seek backward restarts the pattern from step zero; without this
        // the loop below would re-emit (or never emit) steps out of order.
        if song_time_s < self.last_song_time - SEEK_TOLERANCE_S {
            log::debug!(
                "song time regressed {:.3} -> {:.3}, resetting step cursor",
                self.last_song_time,
                song_time_s
            );
            self.next_step = 0;
            self.last_lane = Lane::Left;
        }
        self.last_song_time = song_time_s;

        if !playing || !(self.bpm > 0.0) || !self.bpm.is_finite() {
            return;
        }

        let step_s = (60.0 / self.bpm) * 0.5;

        loop {
            let step = self.next_step;
            let step_time = self.beat_offset_s + step as f32 * step_s;
            let spawn_time = step_time - TRAVEL_TIME;

            if song_time_s < spawn_time {
                break;
            }

            let late_s = song_time_s - spawn_time;
            let on_beat = step % 2 == 0;
            let r = hash01(self.seed, STEP_DRAW_SALT, step);

            let spawn_this_step = on_beat || r < OFFBEAT_SPAWN_CHANCE;
            if spawn_this_step {
                // Alternate lanes by default; occasionally repeat to keep
                // the pattern from being a strict zigzag.
                let repeat_chance = if on_beat {
                    ONBEAT_REPEAT_CHANCE
                } else {
                    OFFBEAT_REPEAT_CHANCE
                };
                let lane = if r < repeat_chance {
                    self.last_lane
                } else {
                    self.last_lane.other()
                };

                out.push(SpawnCommand {
                    step_index: step,
                    lane,
                    late_s,
                });
                self.last_lane = lane;

                // Accented beats get a chance at a both-hands double, from
                // an independent draw so tweaking one rule can't reshuffle
                // the other.
                if on_beat {
                    let beat = step / 2;
                    let r2 = hash01(self.seed, DOUBLE_DRAW_SALT, beat);
                    if beat % DOUBLE_BEAT_PERIOD == 0 && r2 < DOUBLE_CHANCE {
                        out.push(SpawnCommand {
                            step_index: step,
                            lane: lane.other(),
                            late_s,
                        });
                    }
                }
            }

            self.next_step += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_pattern(seed: u32, bpm: f32, offset: f32, times: &[f32]) -> Vec<(u32, Lane)> {
        let mut sched = BeatScheduler::new(bpm, offset, seed);
        let mut out = Vec::new();
        for &t in times {
            sched.advance(t, true, &mut out);
        }
        out.iter().map(|c| (c.step_index, c.lane)).collect()
    }

    #[test]
    fn hash_is_stable_across_calls() {
        let a = hash01(33, STEP_DRAW_SALT, 17);
        let b = hash01(33, STEP_DRAW_SALT, 17);
        assert_eq!(a.to_bits(), b.to_bits());
        assert!((0.0..1.0).contains(&a));
        assert_ne!(
            hash01(33, STEP_DRAW_SALT, 17).to_bits(),
            hash01(34, STEP_DRAW_SALT, 17).to_bits()
        );
    }

    #[test]
    fn identical_inputs_replay_identically() {
        let times: Vec<f32> = (0..600).map(|i| i as f32 / 60.0).collect();
        let a = run_pattern(11, 120.0, 0.65, &times);
        let b = run_pattern(11, 120.0, 0.65, &times);
        assert_eq!(a, b);
        assert!(!a.is_empty(), "ten seconds at 120 BPM must spawn notes");
    }

    #[test]
    fn different_seeds_diverge() {
        let times: Vec<f32> = (0..600).map(|i| i as f32 / 60.0).collect();
        let a = run_pattern(11, 120.0, 0.65, &times);
        let b = run_pattern(12, 120.0, 0.65, &times);
        assert_ne!(a, b);
    }

    #[test]
    fn on_beat_steps_always_spawn() {
        let times: Vec<f32> = (0..1200).map(|i| i as f32 / 60.0).collect();
        let pattern = run_pattern(7, 120.0, 0.0, &times);
        // At 120 BPM a half-beat step is 0.25s; even step indices are the
        // on-beat ones and every one of them must be present.
        let spawned: std::collections::HashSet<u32> =
            pattern.iter().map(|(s, _)| *s).collect();
        let last_step = *spawned.iter().max().unwrap();
        for step in (0..=last_step).step_by(2) {
            assert!(spawned.contains(&step), "on-beat step {step} did not spawn");
        }
    }

    #[test]
    fn backward_seek_resets_step_cursor() {
        let mut sched = BeatScheduler::new(120.0, 0.65, 5);
        let mut out = Vec::new();
        sched.advance(8.0, true, &mut out);
        assert!(sched.next_step_index() > 0);

        out.clear();
        sched.advance(0.0, true, &mut out);
        // Step cursor restarted; the emitted steps begin at zero again.
        assert!(out.iter().any(|c| c.step_index == 0));
    }

    #[test]
    fn tiny_jitter_backward_is_not_a_seek() {
        let mut sched = BeatScheduler::new(120.0, 0.65, 5);
        let mut out = Vec::new();
        sched.advance(8.0, true, &mut out);
        let cursor = sched.next_step_index();

        out.clear();
        sched.advance(8.0 - 0.01, true, &mut out);
        assert_eq!(sched.next_step_index(), cursor);
        assert!(out.is_empty());
    }

    #[test]
    fn paused_or_degenerate_bpm_spawns_nothing() {
        let mut out = Vec::new();
        BeatScheduler::new(120.0, 0.0, 1).advance(10.0, false, &mut out);
        BeatScheduler::new(0.0, 0.0, 1).advance(10.0, true, &mut out);
        BeatScheduler::new(f32::NAN, 0.0, 1).advance(10.0, true, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn late_spawn_carries_the_deficit() {
        let mut sched = BeatScheduler::new(120.0, 0.65, 5);
        let mut out = Vec::new();
        // Jump straight to 5s: everything due before then spawns late.
        sched.advance(5.0, true, &mut out);
        assert!(!out.is_empty());
        assert!(out[0].late_s > 0.0);
        // Later steps are less late than earlier ones.
        let first = out.first().unwrap().late_s;
        let last = out.last().unwrap().late_s;
        assert!(last <= first);
    }
}
