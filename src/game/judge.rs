//! Swipe hit detection and judgement.
//!
//! A swipe is judged against the notes of its lane by clipping the cursor's
//! frame-to-frame segment against each note's padded face rectangle in the
//! hit plane (Liang-Barsky). Timing accuracy is the note's distance from
//! the hit line along z at the moment of the slash.

use glam::Vec2;

use crate::game::cursor::SwipeSegment;
use crate::game::note::{NotePool, NotePose};
use crate::game::{HIT_BOT_Y, HIT_TOP_Y, HIT_Z, Lane};

/// |z - HIT_Z| bounds for the two scoring tiers.
pub const PERFECT_Z_ERROR: f32 = 0.7;
pub const GOOD_Z_ERROR: f32 = 1.6;

/// Notes this close to the hit line are candidates for a slash.
const ATTEMPT_Z_WINDOW: f32 = 2.2;
/// Lane band around the lane center; the swipe has to reach into it.
const ATTEMPT_X_TOLERANCE: f32 = 1.25;
const ATTEMPT_Y_PAD: f32 = 0.35;

/// Note face extents relative to its rendered size. The pad forgives
/// near-grazes that read as hits on screen.
const RECT_HALF_FACTOR: f32 = 0.55;
const RECT_PAD_FACTOR: f32 = 0.18;

const CUT_RATIO_MIN: f32 = 0.05;
const CUT_RATIO_MAX: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Perfect,
    Good,
    Miss,
}

/// Whether the note is split along its vertical or horizontal axis,
/// perpendicular to the dominant swipe direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAxis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    pub lane: Lane,
    pub tier: Tier,
    /// Signed z distance from the hit line; negative means early.
    pub z_error: f32,
    pub pose: NotePose,
    pub split_axis: SplitAxis,
    /// Where the cut crosses the note face, as a fraction of its extent
    /// along the split axis.
    pub cut_ratio: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwipeOutcome {
    Hit(HitInfo),
    /// The swipe was too slow, outside the lane band, or found nothing to
    /// cut. Scoring is untouched in every one of those cases.
    NoAttempt,
}

/// Clip segment p0->p1 against an axis-aligned rect, returning the
/// parametric [t_enter, t_exit] of the overlap if any.
fn clip_segment(p0: Vec2, p1: Vec2, center: Vec2, half: f32) -> Option<(f32, f32)> {
    let d = p1 - p0;
    let mut t_enter = 0.0_f32;
    let mut t_exit = 1.0_f32;

    for axis in 0..2 {
        let (origin, delta, c) = if axis == 0 {
            (p0.x, d.x, center.x)
        } else {
            (p0.y, d.y, center.y)
        };
        let min = c - half;
        let max = c + half;
        if delta.abs() < 1e-9 {
            if origin < min || origin > max {
                return None;
            }
            continue;
        }
        let mut t0 = (min - origin) / delta;
        let mut t1 = (max - origin) / delta;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_enter = t_enter.max(t0);
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }

    Some((t_enter, t_exit))
}

/// True when the segment's bounding box overlaps the lane's hit band. A
/// wide slash that sweeps through the lane qualifies even when its
/// midpoint lies outside it.
fn segment_in_lane_band(seg: &SwipeSegment, lane: Lane) -> bool {
    let min_x = seg.start.x.min(seg.end.x);
    let max_x = seg.start.x.max(seg.end.x);
    let min_y = seg.start.y.min(seg.end.y);
    let max_y = seg.start.y.max(seg.end.y);

    let cx = lane.center_x();
    max_x >= cx - ATTEMPT_X_TOLERANCE
        && min_x <= cx + ATTEMPT_X_TOLERANCE
        && max_y >= HIT_BOT_Y - ATTEMPT_Y_PAD
        && min_y <= HIT_TOP_Y + ATTEMPT_Y_PAD
}

/// Judge one lane's swipe segment against the note pool.
///
/// The best candidate is the intersected note closest to the hit line; it
/// dies the moment it is judged. When nothing in the timing window
/// intersects, the swipe registers nothing at all.
pub fn judge_swipe(
    pool: &mut NotePool,
    lane: Lane,
    seg: &SwipeSegment,
    swipe_speed: f32,
    hit_z_window: f32,
) -> SwipeOutcome {
    if seg.speed < swipe_speed || !segment_in_lane_band(seg, lane) {
        return SwipeOutcome::NoAttempt;
    }

    let mut best: Option<(f32, usize, HitInfo)> = None;

    for (slot, note) in pool.live_indexed().filter(|(_, n)| n.lane == lane) {
        let z_error = note.z - HIT_Z;
        let abs_err = z_error.abs();
        if abs_err > ATTEMPT_Z_WINDOW || abs_err > hit_z_window {
            continue;
        }
        let pose = note.pose();

        let half = pose.size * (RECT_HALF_FACTOR + RECT_PAD_FACTOR);
        let center = Vec2::new(pose.x, pose.y);
        let Some((t_enter, t_exit)) = clip_segment(seg.start, seg.end, center, half) else {
            continue;
        };

        if best.as_ref().is_some_and(|(b, _, _)| abs_err >= *b) {
            continue;
        }

        let cut = seg.start + (seg.end - seg.start) * ((t_enter + t_exit) * 0.5);
        let dir = seg.end - seg.start;
        // A mostly horizontal swipe cuts the note into top and bottom
        // halves; a vertical one into left and right.
        let (split_axis, cut_ratio) = if dir.x.abs() >= dir.y.abs() {
            (
                SplitAxis::Horizontal,
                (cut.y - (center.y - half)) / (2.0 * half),
            )
        } else {
            (
                SplitAxis::Vertical,
                (cut.x - (center.x - half)) / (2.0 * half),
            )
        };

        let tier = if abs_err <= PERFECT_Z_ERROR {
            Tier::Perfect
        } else if abs_err <= GOOD_Z_ERROR {
            Tier::Good
        } else {
            Tier::Miss
        };

        best = Some((
            abs_err,
            slot,
            HitInfo {
                lane,
                tier,
                z_error,
                pose,
                split_axis,
                cut_ratio: cut_ratio.clamp(CUT_RATIO_MIN, CUT_RATIO_MAX),
            },
        ));
    }

    match best {
        Some((_, slot, info)) => {
            pool.kill(slot);
            SwipeOutcome::Hit(info)
        }
        None => SwipeOutcome::NoAttempt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{SPAWN_Z, TRAVEL_TIME};

    fn pool_with_note_at(lane: Lane, z: f32) -> NotePool {
        let mut pool = NotePool::default();
        let late = (z - SPAWN_Z) / crate::game::NOTE_SPEED;
        assert!(late <= TRAVEL_TIME + 1e-3);
        pool.spawn(lane, late);
        pool
    }

    fn crossing_swipe(pose: &NotePose, speed: f32) -> SwipeSegment {
        SwipeSegment {
            start: Vec2::new(pose.x - 2.0 * pose.size, pose.y),
            end: Vec2::new(pose.x + 2.0 * pose.size, pose.y),
            speed,
        }
    }

    #[test]
    fn clip_reports_crossing_and_misses() {
        let c = Vec2::new(0.0, 0.0);
        assert!(clip_segment(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0), c, 1.0).is_some());
        assert!(clip_segment(Vec2::new(-2.0, 3.0), Vec2::new(2.0, 3.0), c, 1.0).is_none());
        // Fully inside counts as overlap over the whole parameter range.
        let (t0, t1) =
            clip_segment(Vec2::new(-0.5, 0.0), Vec2::new(0.5, 0.0), c, 1.0).unwrap();
        assert_eq!((t0, t1), (0.0, 1.0));
    }

    #[test]
    fn note_on_the_hit_line_is_perfect() {
        let mut pool = pool_with_note_at(Lane::Left, HIT_Z);
        let pose = pool.live().next().unwrap().pose();
        let out = judge_swipe(&mut pool, Lane::Left, &crossing_swipe(&pose, 5.0), 2.2, 1.6);
        match out {
            SwipeOutcome::Hit(info) => {
                assert_eq!(info.tier, Tier::Perfect);
                assert!(info.z_error.abs() < 1e-4);
            }
            other => panic!("expected hit, got {other:?}"),
        }
        // The note died on judgement; a second identical swipe finds nothing.
        assert_eq!(pool.live_count(), 0);
        let out = judge_swipe(&mut pool, Lane::Left, &crossing_swipe(&pose, 5.0), 2.2, 1.6);
        assert_eq!(out, SwipeOutcome::NoAttempt);
    }

    #[test]
    fn full_track_width_swipe_still_hits_a_lane_note() {
        let mut pool = pool_with_note_at(Lane::Left, HIT_Z);
        let pose = pool.live().next().unwrap().pose();
        // Sweep across the entire track; the segment's extent crosses the
        // lane even though its midpoint (x = 0) does not.
        let seg = SwipeSegment {
            start: Vec2::new(-3.6, pose.y),
            end: Vec2::new(3.6, pose.y),
            speed: 8.0,
        };
        let out = judge_swipe(&mut pool, Lane::Left, &seg, 2.2, 1.6);
        assert!(matches!(out, SwipeOutcome::Hit(info) if info.tier == Tier::Perfect));
    }

    #[test]
    fn timing_error_downgrades_to_good() {
        let mut pool = pool_with_note_at(Lane::Left, HIT_Z - 1.2);
        let pose = pool.live().next().unwrap().pose();
        let out = judge_swipe(&mut pool, Lane::Left, &crossing_swipe(&pose, 5.0), 2.2, 1.6);
        assert!(matches!(out, SwipeOutcome::Hit(info) if info.tier == Tier::Good));
    }

    #[test]
    fn slow_movement_is_not_an_attempt() {
        let mut pool = pool_with_note_at(Lane::Left, HIT_Z);
        let pose = pool.live().next().unwrap().pose();
        let out = judge_swipe(&mut pool, Lane::Left, &crossing_swipe(&pose, 1.0), 2.2, 1.6);
        assert_eq!(out, SwipeOutcome::NoAttempt);
        assert_eq!(pool.live_count(), 1);
    }

    #[test]
    fn early_swipe_past_the_window_registers_nothing() {
        // The note is approaching but still outside the hit window; a
        // qualifying swipe through its lane must leave score and note
        // untouched rather than count as any kind of miss.
        let mut pool = pool_with_note_at(Lane::Left, HIT_Z - 2.0);
        let pose = pool.live().next().unwrap().pose();
        let out = judge_swipe(&mut pool, Lane::Left, &crossing_swipe(&pose, 5.0), 2.2, 1.6);
        assert_eq!(out, SwipeOutcome::NoAttempt);
        assert_eq!(pool.live_count(), 1);
    }

    #[test]
    fn wrong_lane_swipe_touches_nothing() {
        let mut pool = pool_with_note_at(Lane::Left, HIT_Z);
        let pose = pool.live().next().unwrap().pose();
        let out = judge_swipe(&mut pool, Lane::Right, &crossing_swipe(&pose, 5.0), 2.2, 1.6);
        assert_eq!(out, SwipeOutcome::NoAttempt);
    }

    #[test]
    fn closest_note_to_the_hit_line_wins() {
        let mut pool = NotePool::default();
        let late_near = (HIT_Z - 0.2 - SPAWN_Z) / crate::game::NOTE_SPEED;
        let late_far = (HIT_Z - 1.4 - SPAWN_Z) / crate::game::NOTE_SPEED;
        pool.spawn(Lane::Left, late_far);
        pool.spawn(Lane::Left, late_near);
        let pose = pool
            .live()
            .max_by(|a, b| a.z.total_cmp(&b.z))
            .unwrap()
            .pose();
        let out = judge_swipe(&mut pool, Lane::Left, &crossing_swipe(&pose, 5.0), 2.2, 1.6);
        match out {
            SwipeOutcome::Hit(info) => assert!((info.z_error + 0.2).abs() < 1e-3),
            other => panic!("expected hit, got {other:?}"),
        }
        // Only the winner died; the farther note is still in flight.
        assert_eq!(pool.live_count(), 1);
    }

    #[test]
    fn horizontal_swipe_splits_top_and_bottom() {
        let mut pool = pool_with_note_at(Lane::Left, HIT_Z);
        let pose = pool.live().next().unwrap().pose();
        let out = judge_swipe(&mut pool, Lane::Left, &crossing_swipe(&pose, 5.0), 2.2, 1.6);
        match out {
            SwipeOutcome::Hit(info) => {
                assert_eq!(info.split_axis, SplitAxis::Horizontal);
                // Swipe crossed through the center, so the cut is near the
                // middle of the face.
                assert!((info.cut_ratio - 0.5).abs() < 0.1);
            }
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn vertical_swipe_splits_left_and_right() {
        let mut pool = pool_with_note_at(Lane::Left, HIT_Z);
        let pose = pool.live().next().unwrap().pose();
        let seg = SwipeSegment {
            start: Vec2::new(pose.x, pose.y + 2.0 * pose.size),
            end: Vec2::new(pose.x, pose.y - 2.0 * pose.size),
            speed: 5.0,
        };
        let out = judge_swipe(&mut pool, Lane::Left, &seg, 2.2, 1.6);
        assert!(matches!(
            out,
            SwipeOutcome::Hit(info) if info.split_axis == SplitAxis::Vertical
        ));
    }

    #[test]
    fn cut_ratio_is_clamped_away_from_the_edges() {
        let mut pool = pool_with_note_at(Lane::Left, HIT_Z);
        let pose = pool.live().next().unwrap().pose();
        // Vertical graze just inside the left edge of the padded face.
        let half = pose.size * (RECT_HALF_FACTOR + RECT_PAD_FACTOR);
        let seg = SwipeSegment {
            start: Vec2::new(pose.x - half * 0.999, pose.y + 2.0 * pose.size),
            end: Vec2::new(pose.x - half * 0.999, pose.y - 2.0 * pose.size),
            speed: 5.0,
        };
        let out = judge_swipe(&mut pool, Lane::Left, &seg, 2.2, 1.6);
        match out {
            SwipeOutcome::Hit(info) => {
                assert_eq!(info.split_axis, SplitAxis::Vertical);
                assert!((info.cut_ratio - CUT_RATIO_MIN).abs() < 1e-6);
            }
            other => panic!("expected hit, got {other:?}"),
        }
    }
}
