//! Session orchestration: one `tick` per rendered frame wires telemetry,
//! cursors, scheduling, judgement, scoring and effects together.

use rand::rngs::ThreadRng;
use serde::Serialize;
use smallvec::SmallVec;

use crate::config::Config;
use crate::game::cursor::{LaneAssigner, LaneCursor, PredictorProfile, SwipeSegment};
use crate::game::effects::EffectPools;
use crate::game::filter::FilterParams;
use crate::game::judge::{self, HitInfo, SwipeOutcome, Tier};
use crate::game::note::NotePool;
use crate::game::schedule::{BeatScheduler, SpawnCommand};
use crate::game::score::{MissKind, ScoreState};
use crate::game::{Lane, NUM_LANES};
use crate::telemetry::Snapshot;
use crate::telemetry::normalize::{self, FrameDims, HandPose, NormalizedHands};

/// On-screen judgement labels linger this long.
const FLASH_LIFETIME_S: f32 = 0.6;
/// HUD snapshots are throttled to roughly this rate.
const HUD_PUBLISH_INTERVAL_S: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionParams {
    pub bpm: f32,
    pub beat_offset_s: f32,
    pub seed: u32,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beat_offset_s: 0.65,
            seed: 1,
        }
    }
}

/// Everything the frame loop feeds the session each tick.
pub struct FrameInput<'a> {
    pub dt_s: f32,
    pub song_time_s: f32,
    /// Latest telemetry snapshot, if the poller has one. May be the same
    /// snapshot as last frame; it is only re-read when its seq advances.
    pub snapshot: Option<&'a Snapshot>,
    /// Pose used when telemetry carries no hands this frame (mouse or
    /// keyboard fallback). Routed through the same assignment rules.
    pub fallback_pose: Option<HandPose>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    Hit(HitInfo),
    SwingMiss(Lane),
    AutoMiss,
}

/// A judgement label currently on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgementFlash {
    pub lane: Lane,
    pub tier: Tier,
    pub age_s: f32,
}

/// Low-rate scoreboard state for an overlay or remote HUD.
#[derive(Debug, Clone, Serialize)]
pub struct HudSnapshot {
    pub song_time_s: f32,
    pub bpm: f32,
    pub beat_offset_s: f32,
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub live_notes: usize,
    /// Per-lane cursor tracking state, held across poll gaps.
    pub tracking: [bool; NUM_LANES],
    /// Per-lane: a qualifying swipe fired during this HUD interval.
    pub fired: [bool; NUM_LANES],
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub score: ScoreState,
    pub duration_s: f32,
}

#[derive(Debug, Default)]
pub struct FrameReport {
    pub events: SmallVec<[SessionEvent; 4]>,
    pub hud: Option<HudSnapshot>,
}

pub struct Session {
    params: SessionParams,
    swipe_speed: f32,
    hit_z_window: f32,
    cursors: [LaneCursor; NUM_LANES],
    assigner: LaneAssigner,
    pool: NotePool,
    scheduler: BeatScheduler,
    score: ScoreState,
    effects: EffectPools,
    rng: ThreadRng,
    flashes: SmallVec<[JudgementFlash; 8]>,
    spawn_buf: Vec<SpawnCommand>,
    last_snapshot_seq: u64,
    /// Whether the last consumed snapshot yielded hand poses; decides how
    /// stale-seq frames are bridged.
    telemetry_has_hands: bool,
    fired_since_publish: [bool; NUM_LANES],
    hud_elapsed_s: f32,
    song_time_s: f32,
    playing: bool,
}

impl Session {
    pub fn new(params: SessionParams, cfg: &Config) -> Self {
        let filter_params = FilterParams {
            min_cutoff: cfg.filter_min_cutoff,
            beta: cfg.filter_beta,
            derivative_cutoff: cfg.filter_derivative_cutoff,
        };
        let profile = PredictorProfile::track(cfg);
        Self {
            params,
            swipe_speed: cfg.swipe_speed,
            hit_z_window: cfg.hit_z_window,
            cursors: [
                LaneCursor::new(filter_params, profile),
                LaneCursor::new(filter_params, profile),
            ],
            assigner: LaneAssigner::new(),
            pool: NotePool::default(),
            scheduler: BeatScheduler::new(params.bpm, params.beat_offset_s, params.seed),
            score: ScoreState::default(),
            effects: EffectPools::default(),
            rng: rand::rng(),
            flashes: SmallVec::new(),
            spawn_buf: Vec::new(),
            last_snapshot_seq: 0,
            telemetry_has_hands: false,
            fired_since_publish: [false; NUM_LANES],
            hud_elapsed_s: 0.0,
            song_time_s: 0.0,
            playing: false,
        }
    }

    pub fn set_playing(&mut self, playing: bool) {
        if playing != self.playing {
            log::info!("session {}", if playing { "started" } else { "paused" });
        }
        self.playing = playing;
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Restart the session with the same parameters. The scheduler replays
    /// the identical pattern; cursors and filters start cold.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.pool.reset();
        self.score.reset();
        self.effects.reset();
        self.assigner.reset();
        for cursor in &mut self.cursors {
            cursor.reset();
        }
        self.flashes.clear();
        self.hud_elapsed_s = 0.0;
        self.song_time_s = 0.0;
        self.last_snapshot_seq = 0;
        self.telemetry_has_hands = false;
        self.fired_since_publish = [false; NUM_LANES];
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn notes(&self) -> &NotePool {
        &self.pool
    }

    pub fn effects(&self) -> &EffectPools {
        &self.effects
    }

    pub fn cursors(&self) -> &[LaneCursor; NUM_LANES] {
        &self.cursors
    }

    pub fn judgement_flashes(&self) -> &[JudgementFlash] {
        &self.flashes
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            score: self.score,
            duration_s: self.song_time_s,
        }
    }

    pub fn tick(&mut self, input: FrameInput<'_>) -> FrameReport {
        let mut report = FrameReport::default();
        let dt = input.dt_s;
        self.song_time_s = input.song_time_s;

        // 1-2. Hands, cursors, swipe segments. A telemetry snapshot is only
        // fed into the filters once; between polls the cursors coast on
        // their prediction without losing their tracking state.
        let mut segments: [Option<SwipeSegment>; NUM_LANES] = [None, None];
        match self.frame_poses(input.snapshot, input.fallback_pose) {
            Some(poses) => {
                for lane in Lane::BOTH {
                    segments[lane.index()] =
                        self.cursors[lane.index()].update(poses[lane.index()].as_ref(), dt);
                }
            }
            None => {
                for cursor in &mut self.cursors {
                    cursor.coast(dt);
                }
            }
        }
        for lane in Lane::BOTH {
            if segments[lane.index()]
                .as_ref()
                .is_some_and(|s| s.speed >= self.swipe_speed)
            {
                self.fired_since_publish[lane.index()] = true;
            }
        }

        // 3. Spawn everything the beat clock says is due.
        self.spawn_buf.clear();
        self.scheduler
            .advance(input.song_time_s, self.playing, &mut self.spawn_buf);
        for cmd in &self.spawn_buf {
            self.pool.spawn(cmd.lane, cmd.late_s);
        }

        // 4. Note travel and auto misses.
        let auto_misses = self.pool.advance(dt, self.hit_z_window);
        for _ in 0..auto_misses {
            self.score.apply_miss(MissKind::Auto);
            report.events.push(SessionEvent::AutoMiss);
        }

        // 5. Judge this frame's swipes.
        if self.playing {
            for lane in Lane::BOTH {
                let Some(seg) = &segments[lane.index()] else {
                    continue;
                };
                match judge::judge_swipe(
                    &mut self.pool,
                    lane,
                    seg,
                    self.swipe_speed,
                    self.hit_z_window,
                ) {
                    SwipeOutcome::Hit(info) => {
                        // A Miss-tier cut still splits the note but scores
                        // as a swing miss (only reachable with a widened
                        // hit window).
                        self.score.apply_hit(info.tier);
                        self.effects.spawn_split(&info, &mut self.rng);
                        self.flashes.push(JudgementFlash {
                            lane,
                            tier: info.tier,
                            age_s: 0.0,
                        });
                        if info.tier == Tier::Miss {
                            report.events.push(SessionEvent::SwingMiss(lane));
                        } else {
                            report.events.push(SessionEvent::Hit(info));
                        }
                    }
                    SwipeOutcome::NoAttempt => {}
                }
            }
        }

        // 6. Effects and label aging.
        self.effects.update(dt);
        for flash in &mut self.flashes {
            flash.age_s += dt;
        }
        self.flashes.retain(|f| f.age_s < FLASH_LIFETIME_S);

        // 7. Throttled HUD publish.
        self.hud_elapsed_s += dt;
        if self.hud_elapsed_s >= HUD_PUBLISH_INTERVAL_S {
            self.hud_elapsed_s = 0.0;
            report.hud = Some(HudSnapshot {
                song_time_s: input.song_time_s,
                bpm: self.params.bpm,
                beat_offset_s: self.params.beat_offset_s,
                score: self.score.score,
                combo: self.score.combo,
                max_combo: self.score.max_combo,
                live_notes: self.pool.live_count(),
                tracking: [
                    self.cursors[Lane::Left.index()].tracking(),
                    self.cursors[Lane::Right.index()].tracking(),
                ],
                fired: self.fired_since_publish,
            });
            self.fired_since_publish = [false; NUM_LANES];
        }

        report
    }

    /// Resolve this frame's lane poses. `None` means "coast": the latest
    /// snapshot is stale and carried hands last time, so the cursors should
    /// extrapolate rather than re-filter it or read a dropout.
    fn frame_poses(
        &mut self,
        snapshot: Option<&Snapshot>,
        fallback: Option<HandPose>,
    ) -> Option<[Option<HandPose>; NUM_LANES]> {
        if let Some(snap) = snapshot {
            if snap.seq == self.last_snapshot_seq {
                if self.telemetry_has_hands {
                    return None;
                }
            } else {
                self.last_snapshot_seq = snap.seq;
                if let Some(hands) = normalize::read_hands(&snap.value, FrameDims::default()) {
                    self.telemetry_has_hands = true;
                    return Some(self.assigner.assign(&hands).0);
                }
                self.telemetry_has_hands = false;
            }
        }

        // No usable telemetry this frame: the fallback pose (mouse or test
        // driver) goes through the same assignment rules.
        Some(match fallback {
            Some(pose) => {
                let hands = NormalizedHands {
                    left: None,
                    right: None,
                    single: Some(pose),
                };
                self.assigner.assign(&hands).0
            }
            None => [None, None],
        })
    }
}
