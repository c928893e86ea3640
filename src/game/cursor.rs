//! Per-lane cursor state: jitter filtering, latency-compensated motion
//! prediction, and the hand-to-lane assignment decision table.

use glam::Vec2;

use crate::config::Config;
use crate::game::filter::{FilterParams, JitterFilter2d};
use crate::game::{Lane, plane_from_normalized};
use crate::telemetry::normalize::{HandPose, NormalizedHands};

/// Exponential decay rate applied to the velocity estimate while tracking
/// is lost, preserving visual momentum through brief dropouts.
const DROPOUT_VELOCITY_DECAY: f32 = 14.0;

/// Old/new blend for the per-axis velocity estimate (units per ms).
const VELOCITY_BLEND_OLD: f32 = 0.75;

/// Follow gains for the latency-compensated cursor. The track cursor and
/// the page-level HUD pointer want different tightness and operate in
/// different coordinate scales, so the gains are a profile, not constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorProfile {
    pub lookahead_ms: f32,
    pub gain_base: f32,
    pub gain_error: f32,
    pub gain_min: f32,
    pub gain_max: f32,
    /// Positional error beyond which the cursor jumps straight to the
    /// predicted target (re-acquisition after a dropout).
    pub snap_distance: f32,
}

impl PredictorProfile {
    /// Track-space cursor profile from config.
    pub fn track(cfg: &Config) -> Self {
        Self {
            lookahead_ms: cfg.cursor_lookahead_ms,
            gain_base: cfg.cursor_gain_base,
            gain_error: cfg.cursor_gain_error,
            gain_min: cfg.cursor_gain_min,
            gain_max: cfg.cursor_gain_max,
            snap_distance: cfg.cursor_snap_distance,
        }
    }

    /// Pixel-space HUD pointer profile: looser follow, wide snap radius.
    pub fn hud() -> Self {
        Self {
            lookahead_ms: 65.0,
            gain_base: 28.0,
            gain_error: 0.08,
            gain_min: 18.0,
            gain_max: 120.0,
            snap_distance: 260.0,
        }
    }
}

/// Critically-damped follow toward a velocity-extrapolated target.
#[derive(Debug, Clone, Copy)]
pub struct MotionPredictor {
    profile: PredictorProfile,
    target: Vec2,
    velocity: Vec2, // units per millisecond
    rendered: Vec2,
    primed: bool,
}

impl MotionPredictor {
    pub fn new(profile: PredictorProfile) -> Self {
        Self {
            profile,
            target: Vec2::ZERO,
            velocity: Vec2::ZERO,
            rendered: Vec2::ZERO,
            primed: false,
        }
    }

    /// Accept a new filtered target and refresh the velocity estimate.
    pub fn set_target(&mut self, target: Vec2, dt_s: f32) {
        if !self.primed {
            self.primed = true;
            self.target = target;
            self.rendered = target;
            self.velocity = Vec2::ZERO;
            return;
        }

        let dt_ms = (dt_s * 1000.0).max(1.0);
        let instantaneous = (target - self.target) / dt_ms;
        self.velocity = self.velocity * VELOCITY_BLEND_OLD
            + instantaneous * (1.0 - VELOCITY_BLEND_OLD);
        self.target = target;
    }

    /// Advance the rendered position by one frame.
    pub fn advance(&mut self, dt_s: f32, tracking: bool) -> Vec2 {
        if !self.primed {
            return self.rendered;
        }

        if !tracking {
            self.velocity *= (-dt_s * DROPOUT_VELOCITY_DECAY).exp();
        }

        let predicted = self.target + self.velocity * self.profile.lookahead_ms;
        let error = predicted.distance(self.rendered);

        if error > self.profile.snap_distance {
            self.rendered = predicted;
            return self.rendered;
        }

        let lambda = (self.profile.gain_base + error * self.profile.gain_error)
            .clamp(self.profile.gain_min, self.profile.gain_max);
        let follow = 1.0 - (-dt_s * lambda).exp();
        self.rendered += (predicted - self.rendered) * follow;
        self.rendered
    }

    pub fn rendered(&self) -> Vec2 {
        self.rendered
    }

    pub fn reset(&mut self) {
        self.primed = false;
        self.velocity = Vec2::ZERO;
    }
}

/// Two consecutive filtered cursor samples, the only motion shape the hit
/// judge consumes.
#[derive(Debug, Clone, Copy)]
pub struct SwipeSegment {
    pub start: Vec2,
    pub end: Vec2,
    /// Instantaneous speed in track units per second.
    pub speed: f32,
}

/// All mutable per-lane cursor state for one play session.
#[derive(Debug, Clone)]
pub struct LaneCursor {
    filter: JitterFilter2d,
    predictor: MotionPredictor,
    filtered: Vec2,
    prev_filtered: Option<Vec2>,
    pub tracking: bool,
    pub gesture: String,
}

impl LaneCursor {
    pub fn new(filter_params: FilterParams, profile: PredictorProfile) -> Self {
        Self {
            filter: JitterFilter2d::new(filter_params),
            predictor: MotionPredictor::new(profile),
            filtered: Vec2::ZERO,
            prev_filtered: None,
            tracking: false,
            gesture: String::new(),
        }
    }

    /// Ingest this frame's pose (if any) and advance the rendered cursor.
    /// Returns the filtered swipe segment for this frame when a pose was
    /// consumed and a previous filtered sample exists.
    pub fn update(&mut self, pose: Option<&HandPose>, dt_s: f32) -> Option<SwipeSegment> {
        let mut segment = None;

        match pose {
            Some(p) => {
                self.tracking = p.tracking;
                if !p.gesture.is_empty() {
                    self.gesture = p.gesture.clone();
                }

                let (px, py) = plane_from_normalized(p.x, p.y);
                let raw = Vec2::new(px, py);
                let (fx, fy) = self.filter.sample((raw.x, raw.y), dt_s);
                let filtered = Vec2::new(fx, fy);

                if let Some(prev) = self.prev_filtered {
                    let speed = prev.distance(filtered) / dt_s.max(1e-4);
                    segment = Some(SwipeSegment {
                        start: prev,
                        end: filtered,
                        speed,
                    });
                }
                self.prev_filtered = Some(filtered);
                self.filtered = filtered;
                self.predictor.set_target(filtered, dt_s);
            }
            None => {
                self.tracking = false;
            }
        }

        self.predictor.advance(dt_s, self.tracking);
        segment
    }

    /// Advance prediction on a frame with no new telemetry. The last
    /// tracking state is kept, so the gap between two polls is
    /// extrapolation, not a dropout.
    pub fn coast(&mut self, dt_s: f32) {
        self.predictor.advance(dt_s, self.tracking);
    }

    pub fn filtered(&self) -> Vec2 {
        self.filtered
    }

    pub fn rendered(&self) -> Vec2 {
        self.predictor.rendered()
    }

    /// True while a pose was consumed this frame and flagged as tracked.
    pub fn tracking(&self) -> bool {
        self.tracking
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.predictor.reset();
        self.prev_filtered = None;
        self.filtered = Vec2::ZERO;
        self.tracking = false;
        self.gesture.clear();
    }
}

/// Which rule of the decision table produced a frame's lane assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignRule {
    /// A pose arrived under an explicit left/right field or carried a
    /// gesture tag naming its side.
    Tagged,
    /// Two untagged candidates: left lane gets the smaller x.
    SortByX,
    /// A lone untagged pose sticks to the lane it last drove.
    SingleHysteresis,
    /// Nothing usable this frame.
    NoPose,
}

/// Assigns up to two normalized poses to the two lanes.
///
/// Rules are tried in priority order (an explicit decision table rather
/// than nested conditionals): tagged poses claim their lane; two untagged
/// candidates are sorted by x; a single untagged candidate follows the
/// lane it was last given. More than two candidates cannot occur with the
/// current normalizer (left/right/single), but if both tagged hands and a
/// single pointer arrive together the tagged hands win and the single
/// pointer is dropped.
#[derive(Debug, Clone)]
pub struct LaneAssigner {
    last_single_lane: Lane,
}

impl Default for LaneAssigner {
    fn default() -> Self {
        // The legacy single-pointer payload drove the right-hand cursor.
        Self {
            last_single_lane: Lane::Right,
        }
    }
}

impl LaneAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_single_lane = Lane::Right;
    }

    pub fn assign(
        &mut self,
        hands: &NormalizedHands,
    ) -> ([Option<HandPose>; 2], AssignRule) {
        let mut lanes: [Option<HandPose>; 2] = [None, None];

        // Rule 1: tagged poses claim their lane outright.
        if let Some(left) = &hands.left {
            lanes[Lane::Left.index()] = Some(left.clone());
        }
        if let Some(right) = &hands.right {
            lanes[Lane::Right.index()] = Some(right.clone());
        }
        if lanes.iter().any(Option::is_some) {
            // A gesture tag naming a side can reroute the single pointer
            // into the remaining free lane.
            if let Some(single) = &hands.single {
                if let Some(lane) = lane_from_gesture(&single.gesture)
                    && lanes[lane.index()].is_none()
                {
                    lanes[lane.index()] = Some(single.clone());
                }
            }
            return (lanes, AssignRule::Tagged);
        }

        let Some(single) = &hands.single else {
            return (lanes, AssignRule::NoPose);
        };

        // Rule 2: a gesture tag on the lone pose still counts as explicit.
        if let Some(lane) = lane_from_gesture(&single.gesture) {
            self.last_single_lane = lane;
            lanes[lane.index()] = Some(single.clone());
            return (lanes, AssignRule::Tagged);
        }

        // Rule 3: hysteresis. The lone pose keeps driving whichever lane
        // it drove last; it only migrates once its x is decisively on the
        // other side of center.
        let (x, _) = plane_from_normalized(single.x, single.y);
        const HYSTERESIS: f32 = 0.6;
        let lane = match self.last_single_lane {
            Lane::Left if x > HYSTERESIS => Lane::Right,
            Lane::Right if x < -HYSTERESIS => Lane::Left,
            keep => keep,
        };
        self.last_single_lane = lane;
        lanes[lane.index()] = Some(single.clone());
        (lanes, AssignRule::SingleHysteresis)
    }
}

fn lane_from_gesture(gesture: &str) -> Option<Lane> {
    if gesture.contains("LEFT") {
        Some(Lane::Left)
    } else if gesture.contains("RIGHT") {
        Some(Lane::Right)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(x: f32, y: f32) -> HandPose {
        HandPose {
            x,
            y,
            tracking: true,
            gesture: String::new(),
        }
    }

    #[test]
    fn predictor_holds_position_at_zero_velocity_and_error() {
        let mut p = MotionPredictor::new(PredictorProfile::hud());
        p.set_target(Vec2::new(100.0, 100.0), 0.016);
        // First target primes rendered == target, velocity == 0.
        for _ in 0..300 {
            p.set_target(Vec2::new(100.0, 100.0), 0.016);
            let r = p.advance(0.016, true);
            assert!((r - Vec2::new(100.0, 100.0)).length() < 1e-3);
        }
    }

    #[test]
    fn predictor_snaps_past_threshold() {
        let mut p = MotionPredictor::new(PredictorProfile::hud());
        p.set_target(Vec2::ZERO, 0.016);
        p.advance(0.016, true);
        // Teleport far beyond snap_distance over a long gap: the velocity
        // estimate stays small and the rendered position must jump.
        p.set_target(Vec2::new(2000.0, 0.0), 10.0);
        let r = p.advance(0.016, true);
        assert!(r.x > 1000.0, "expected snap, got {r:?}");
    }

    #[test]
    fn predictor_decays_velocity_through_dropout() {
        let mut p = MotionPredictor::new(PredictorProfile::hud());
        p.set_target(Vec2::ZERO, 0.016);
        p.advance(0.016, true);
        p.set_target(Vec2::new(8.0, 0.0), 0.016);
        p.advance(0.016, true);
        let moving = p.rendered();

        for _ in 0..120 {
            p.advance(0.016, false);
        }
        // With no new targets and decayed velocity the cursor settles near
        // its last target rather than sailing off along the old velocity.
        assert!(p.rendered().distance(Vec2::new(8.0, 0.0)) < moving.distance(Vec2::ZERO) + 8.0);
        assert!(p.rendered().x < 8.0 + 1.0);
    }

    #[test]
    fn cursor_emits_swipe_segments_from_filtered_samples() {
        let mut c = LaneCursor::new(FilterParams::default(), PredictorProfile::hud());
        assert!(c.update(Some(&pose(0.5, 0.5)), 0.016).is_none());
        let seg = c.update(Some(&pose(0.9, 0.5)), 0.016).expect("segment");
        assert!(seg.speed > 0.0);
        assert!(seg.end.x > seg.start.x);
    }

    #[test]
    fn tagged_hands_claim_their_lanes() {
        let mut assigner = LaneAssigner::new();
        let hands = NormalizedHands {
            left: Some(pose(0.9, 0.5)), // tagged left even though x is right-ish
            right: Some(pose(0.1, 0.5)),
            single: None,
        };
        let (lanes, rule) = assigner.assign(&hands);
        assert_eq!(rule, AssignRule::Tagged);
        assert!(lanes[0].is_some() && lanes[1].is_some());
        assert!((lanes[0].as_ref().unwrap().x - 0.9).abs() < 1e-6);
    }

    #[test]
    fn single_pose_sticks_to_a_lane_until_it_crosses_center() {
        let mut assigner = LaneAssigner::new();
        let single = |x| NormalizedHands {
            left: None,
            right: None,
            single: Some(pose(x, 0.5)),
        };

        // Default single lane is right; mid-track wiggle stays right.
        let (lanes, rule) = assigner.assign(&single(0.45));
        assert_eq!(rule, AssignRule::SingleHysteresis);
        assert!(lanes[1].is_some() && lanes[0].is_none());

        // A decisive move to the far left migrates the assignment.
        let (lanes, _) = assigner.assign(&single(0.05));
        assert!(lanes[0].is_some() && lanes[1].is_none());

        // And it now sticks to the left through the center region.
        let (lanes, _) = assigner.assign(&single(0.55));
        assert!(lanes[0].is_some() && lanes[1].is_none());
    }

    #[test]
    fn gesture_tag_overrides_hysteresis() {
        let mut assigner = LaneAssigner::new();
        let mut p = pose(0.9, 0.5);
        p.gesture = "POINT_LEFT".into();
        let hands = NormalizedHands {
            left: None,
            right: None,
            single: Some(p),
        };
        let (lanes, rule) = assigner.assign(&hands);
        assert_eq!(rule, AssignRule::Tagged);
        assert!(lanes[0].is_some());
    }

    #[test]
    fn no_pose_assigns_nothing() {
        let mut assigner = LaneAssigner::new();
        let (lanes, rule) = assigner.assign(&NormalizedHands::default());
        assert_eq!(rule, AssignRule::NoPose);
        assert!(lanes.iter().all(Option::is_none));
    }
}
