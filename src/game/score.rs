//! Score and combo accounting.

use serde::Serialize;

use crate::game::judge::Tier;

pub const PERFECT_POINTS: u32 = 300;
pub const GOOD_POINTS: u32 = 100;

/// How a miss came about. Auto misses are notes that sailed past the hit
/// window untouched; swing misses are slashes that connected with nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissKind {
    Auto,
    Swing,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScoreState {
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub perfects: u32,
    pub goods: u32,
    pub auto_misses: u32,
    pub swing_misses: u32,
}

impl ScoreState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn apply_hit(&mut self, tier: Tier) {
        match tier {
            Tier::Perfect => {
                self.score += PERFECT_POINTS;
                self.perfects += 1;
                self.bump_combo();
            }
            Tier::Good => {
                self.score += GOOD_POINTS;
                self.goods += 1;
                self.bump_combo();
            }
            Tier::Miss => self.apply_miss(MissKind::Swing),
        }
    }

    pub fn apply_miss(&mut self, kind: MissKind) {
        match kind {
            MissKind::Auto => self.auto_misses += 1,
            MissKind::Swing => self.swing_misses += 1,
        }
        self.combo = 0;
    }

    pub fn misses(&self) -> u32 {
        self.auto_misses + self.swing_misses
    }

    fn bump_combo(&mut self) {
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_per_tier() {
        let mut s = ScoreState::default();
        s.apply_hit(Tier::Perfect);
        s.apply_hit(Tier::Good);
        assert_eq!(s.score, PERFECT_POINTS + GOOD_POINTS);
        assert_eq!(s.perfects, 1);
        assert_eq!(s.goods, 1);
        assert_eq!(s.combo, 2);
    }

    #[test]
    fn any_miss_breaks_the_combo_but_keeps_max() {
        let mut s = ScoreState::default();
        for _ in 0..5 {
            s.apply_hit(Tier::Perfect);
        }
        s.apply_miss(MissKind::Auto);
        assert_eq!(s.combo, 0);
        assert_eq!(s.max_combo, 5);
        assert_eq!(s.score, 5 * PERFECT_POINTS);

        s.apply_hit(Tier::Good);
        assert_eq!(s.combo, 1);
        assert_eq!(s.max_combo, 5);
    }

    #[test]
    fn miss_kinds_are_counted_separately() {
        let mut s = ScoreState::default();
        s.apply_miss(MissKind::Auto);
        s.apply_miss(MissKind::Auto);
        s.apply_miss(MissKind::Swing);
        assert_eq!(s.auto_misses, 2);
        assert_eq!(s.swing_misses, 1);
        assert_eq!(s.misses(), 3);
        assert_eq!(s.score, 0);
    }
}
