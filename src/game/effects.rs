//! Cut feedback: note shards and spark bursts.
//!
//! Both pools are fixed arrays. When a pool is saturated a random occupied
//! slot is recycled rather than the oldest, so a dense burst doesn't wipe
//! out one coherent chunk of the previous burst.

use glam::{Vec2, Vec3};
use rand::RngExt;

use crate::game::judge::{HitInfo, SplitAxis};

pub const SHARD_POOL_SIZE: usize = 40;
pub const SPARK_POOL_SIZE: usize = 120;

const SPARKS_PER_SPLIT: usize = 18;

const SHARD_GRAVITY: f32 = -13.0;
const SPARK_GRAVITY: f32 = -12.0 * 0.7;

/// Each half of a cut note keeps at least this fraction of the face, so a
/// grazing cut still produces two visible pieces.
const PIECE_FRACTION_MIN: f32 = 0.12;
const PIECE_FRACTION_MAX: f32 = 0.88;

#[derive(Debug, Clone, Copy, Default)]
pub struct Shard {
    pub alive: bool,
    pub pos: Vec3,
    pub vel: Vec3,
    /// Half extents of the piece in the note's face plane.
    pub extents: Vec2,
    pub spin: f32,
    pub life: f32,
    pub max_life: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Spark {
    pub alive: bool,
    pub pos: Vec3,
    pub vel: Vec3,
    pub life: f32,
    pub max_life: f32,
}

#[derive(Debug, Clone)]
pub struct EffectPools {
    shards: [Shard; SHARD_POOL_SIZE],
    sparks: [Spark; SPARK_POOL_SIZE],
}

impl Default for EffectPools {
    fn default() -> Self {
        Self {
            shards: [Shard::default(); SHARD_POOL_SIZE],
            sparks: [Spark::default(); SPARK_POOL_SIZE],
        }
    }
}

impl EffectPools {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Spawn the two halves of a cut note plus a spark burst, sized and
    /// positioned from the judged hit.
    pub fn spawn_split<R: RngExt>(&mut self, hit: &HitInfo, rng: &mut R) {
        let center = Vec3::new(hit.pose.x, hit.pose.y, hit.pose.z);
        let half = hit.pose.size * 0.55;
        let ratio = hit.cut_ratio;

        // Fractions of the face kept by each half, measured along the split
        // axis from the cut line.
        let near = ratio.clamp(PIECE_FRACTION_MIN, PIECE_FRACTION_MAX);
        let far = (1.0 - ratio).clamp(PIECE_FRACTION_MIN, PIECE_FRACTION_MAX);

        // Halves separate along the split axis, away from the cut line.
        let normal = match hit.split_axis {
            SplitAxis::Horizontal => Vec3::Y,
            SplitAxis::Vertical => Vec3::X,
        };

        for (fraction, sign) in [(far, 1.0_f32), (near, -1.0_f32)] {
            let piece_half = half * fraction;
            let offset = sign * (half - piece_half);
            let extents = match hit.split_axis {
                SplitAxis::Horizontal => Vec2::new(half, piece_half),
                SplitAxis::Vertical => Vec2::new(piece_half, half),
            };
            let kick = 1.6 + rng.random_range(0.0..1.2);
            let drift = Vec3::new(
                rng.random_range(-0.6..0.6),
                rng.random_range(0.4..1.4),
                rng.random_range(-1.0..0.2),
            );
            let shard = Shard {
                alive: true,
                pos: center + normal * offset,
                vel: normal * (sign * kick) + drift,
                extents,
                spin: rng.random_range(-6.0..6.0),
                life: 0.0,
                max_life: 0.55 + rng.random_range(0.0..0.25),
            };
            *self.claim_shard(rng) = shard;
        }

        for _ in 0..SPARKS_PER_SPLIT {
            let speed = rng.random_range(1.0..4.5);
            let theta = rng.random_range(0.0..std::f32::consts::TAU);
            let spark = Spark {
                alive: true,
                pos: center,
                vel: Vec3::new(
                    theta.cos() * speed,
                    rng.random_range(0.5..3.0),
                    theta.sin() * speed * 0.4,
                ),
                life: 0.0,
                max_life: 0.45 + rng.random_range(0.0..0.35),
            };
            *self.claim_spark(rng) = spark;
        }
    }

    pub fn update(&mut self, dt_s: f32) {
        for shard in self.shards.iter_mut().filter(|s| s.alive) {
            shard.life += dt_s;
            if shard.life >= shard.max_life {
                shard.alive = false;
                continue;
            }
            shard.vel.y += SHARD_GRAVITY * dt_s;
            shard.pos += shard.vel * dt_s;
        }
        for spark in self.sparks.iter_mut().filter(|s| s.alive) {
            spark.life += dt_s;
            if spark.life >= spark.max_life {
                spark.alive = false;
                continue;
            }
            spark.vel.y += SPARK_GRAVITY * dt_s;
            spark.pos += spark.vel * dt_s;
        }
    }

    pub fn live_shards(&self) -> impl Iterator<Item = &Shard> {
        self.shards.iter().filter(|s| s.alive)
    }

    pub fn live_sparks(&self) -> impl Iterator<Item = &Spark> {
        self.sparks.iter().filter(|s| s.alive)
    }

    fn claim_shard<R: RngExt>(&mut self, rng: &mut R) -> &mut Shard {
        let idx = match self.shards.iter().position(|s| !s.alive) {
            Some(i) => i,
            None => rng.random_range(0..SHARD_POOL_SIZE),
        };
        &mut self.shards[idx]
    }

    fn claim_spark<R: RngExt>(&mut self, rng: &mut R) -> &mut Spark {
        let idx = match self.sparks.iter().position(|s| !s.alive) {
            Some(i) => i,
            None => rng.random_range(0..SPARK_POOL_SIZE),
        };
        &mut self.sparks[idx]
    }
}
