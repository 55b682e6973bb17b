//! Running totals for one report scope (a player, or a player in one game).

use serde::{Deserialize, Serialize};

use crate::interval::wilson_interval;

/// Match tiers, shallowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    T1,
    T2,
    T3,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::T1, Tier::T2, Tier::T3];

    pub fn index(self) -> usize {
        match self {
            Tier::T1 => 0,
            Tier::T2 => 1,
            Tier::T3 => 2,
        }
    }

    /// Deepest candidate rank that counts as a match at this tier.
    pub fn depth(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::T1 => "T1",
            Tier::T2 => "T2",
            Tier::T3 => "T3",
        }
    }
}

/// Centipawn-loss histogram buckets. Thresholds are cumulative: a loss of 60
/// lands in `>0`, `>10`, `>25` and `>50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpLossBucket {
    Zero,
    Over(i32),
}

pub const CP_LOSS_BUCKETS: [CpLossBucket; 8] = [
    CpLossBucket::Zero,
    CpLossBucket::Over(0),
    CpLossBucket::Over(10),
    CpLossBucket::Over(25),
    CpLossBucket::Over(50),
    CpLossBucket::Over(100),
    CpLossBucket::Over(200),
    CpLossBucket::Over(500),
];

impl CpLossBucket {
    pub fn matches(self, cpl: i32) -> bool {
        match self {
            CpLossBucket::Zero => cpl == 0,
            CpLossBucket::Over(threshold) => cpl > threshold,
        }
    }

    pub fn label(self) -> String {
        match self {
            CpLossBucket::Zero => "=0".to_string(),
            CpLossBucket::Over(threshold) => format!(">{threshold}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatAccumulator {
    pub sample_size: u32,
    pub sample_total_cpl: i64,

    pub tier_totals: [u32; 3],
    pub tier_matches: [u32; 3],

    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub game_list: Vec<String>,

    /// Counts per entry of [`CP_LOSS_BUCKETS`].
    pub cp_loss_count: [u32; 8],
    pub cp_loss_total: u32,
}

impl StatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `other` into `self`.
    pub fn add(&mut self, other: &StatAccumulator) {
        self.sample_size += other.sample_size;
        self.sample_total_cpl += other.sample_total_cpl;
        for i in 0..3 {
            self.tier_totals[i] += other.tier_totals[i];
            self.tier_matches[i] += other.tier_matches[i];
        }
        self.with_rating(other.min_rating);
        self.with_rating(other.max_rating);
        self.game_list.extend(other.game_list.iter().cloned());
        for (count, other_count) in self.cp_loss_count.iter_mut().zip(other.cp_loss_count) {
            *count += other_count;
        }
        self.cp_loss_total += other.cp_loss_total;
    }

    /// Widen the rating bounds to include `rating`.
    pub fn with_rating(&mut self, rating: Option<i32>) {
        let Some(rating) = rating else {
            return;
        };
        self.min_rating = Some(self.min_rating.map_or(rating, |min| min.min(rating)));
        self.max_rating = Some(self.max_rating.map_or(rating, |max| max.max(rating)));
    }

    pub fn record_tier_opportunity(&mut self, tier: Tier, matched: bool) {
        self.tier_totals[tier.index()] += 1;
        if matched {
            self.tier_matches[tier.index()] += 1;
        }
    }

    pub fn record_cp_loss(&mut self, cpl: i32) {
        self.cp_loss_total += 1;
        for (count, bucket) in self.cp_loss_count.iter_mut().zip(CP_LOSS_BUCKETS) {
            if bucket.matches(cpl) {
                *count += 1;
            }
        }
    }

    pub fn record_sample(&mut self, cpl: i32) {
        self.sample_size += 1;
        self.sample_total_cpl += cpl as i64;
    }

    pub fn tier_total(&self, tier: Tier) -> u32 {
        self.tier_totals[tier.index()]
    }

    pub fn tier_matches(&self, tier: Tier) -> u32 {
        self.tier_matches[tier.index()]
    }

    /// Average centipawn loss over the sampled moves.
    pub fn acpl(&self) -> Option<f64> {
        if self.sample_size == 0 {
            return None;
        }
        Some(self.sample_total_cpl as f64 / self.sample_size as f64)
    }

    /// Ascending sort key: the negated lower Wilson bound of the T3 match
    /// rate, or 0 when there were no T3 opportunities.
    pub fn suspicion_key(&self) -> f64 {
        let total = self.tier_total(Tier::T3);
        if total == 0 {
            return 0.0;
        }
        wilson_interval(self.tier_matches(Tier::T3), total)
            .map(|ci| -ci.lower)
            .unwrap_or(0.0)
    }

    pub fn cp_loss_counts(&self) -> Vec<(String, u32)> {
        CP_LOSS_BUCKETS
            .iter()
            .zip(self.cp_loss_count)
            .map(|(bucket, count)| (bucket.label(), count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seed: u32, rating: Option<i32>, game: &str) -> StatAccumulator {
        let mut acc = StatAccumulator::new();
        acc.game_list.push(game.to_string());
        acc.with_rating(rating);
        for i in 0..seed {
            let cpl = ((i * 37 + seed * 11) % 120) as i32;
            acc.record_cp_loss(cpl);
            if i % 3 != 0 {
                acc.record_sample(cpl);
            }
            acc.record_tier_opportunity(Tier::ALL[(i % 3) as usize], i % 2 == 0);
        }
        acc
    }

    fn numeric(acc: &StatAccumulator) -> StatAccumulator {
        let mut stripped = acc.clone();
        stripped.game_list.sort();
        stripped
    }

    #[test]
    fn test_merge_is_associative_and_commutative() {
        let a = sample(7, Some(1500), "a");
        let b = sample(11, None, "b");
        let c = sample(5, Some(1720), "c");

        let mut ab_c = a.clone();
        ab_c.add(&b);
        ab_c.add(&c);

        let mut bc = b.clone();
        bc.add(&c);
        let mut a_bc = a.clone();
        a_bc.add(&bc);

        assert_eq!(numeric(&ab_c), numeric(&a_bc));

        let mut ab = a.clone();
        ab.add(&b);
        let mut ba = b.clone();
        ba.add(&a);
        assert_eq!(numeric(&ab), numeric(&ba));
    }

    #[test]
    fn test_merge_sums_counters() {
        let a = sample(7, Some(1500), "a");
        let b = sample(11, Some(1400), "b");
        let mut merged = a.clone();
        merged.add(&b);

        assert_eq!(merged.sample_size, a.sample_size + b.sample_size);
        assert_eq!(merged.cp_loss_total, 18);
        assert_eq!(merged.tier_totals.iter().sum::<u32>(), 18);
        assert_eq!(merged.game_list, vec!["a", "b"]);
        assert_eq!(merged.min_rating, Some(1400));
        assert_eq!(merged.max_rating, Some(1500));
    }

    #[test]
    fn test_rating_bounds_treat_none_as_absent() {
        let mut acc = StatAccumulator::new();
        acc.with_rating(None);
        assert_eq!((acc.min_rating, acc.max_rating), (None, None));

        acc.with_rating(Some(0));
        acc.with_rating(Some(1200));
        acc.with_rating(None);
        assert_eq!((acc.min_rating, acc.max_rating), (Some(0), Some(1200)));
    }

    #[test]
    fn test_histogram_is_cumulative() {
        for cpl in [0, 1, 10, 11, 25, 26, 50, 51, 100, 101, 200, 201, 500, 501] {
            let mut acc = StatAccumulator::new();
            acc.record_cp_loss(cpl);
            for (bucket, count) in CP_LOSS_BUCKETS.iter().zip(acc.cp_loss_count) {
                let expected = match bucket {
                    CpLossBucket::Zero => cpl == 0,
                    CpLossBucket::Over(n) => cpl > *n,
                };
                assert_eq!(count == 1, expected, "cpl {cpl} bucket {}", bucket.label());
            }
            assert_eq!(acc.cp_loss_count[0] + acc.cp_loss_count[1], acc.cp_loss_total);
        }
    }

    #[test]
    fn test_bucket_labels() {
        let labels: Vec<String> = CP_LOSS_BUCKETS.iter().map(|b| b.label()).collect();
        assert_eq!(labels, vec!["=0", ">0", ">10", ">25", ">50", ">100", ">200", ">500"]);
    }

    #[test]
    fn test_acpl_and_suspicion_key() {
        let mut acc = StatAccumulator::new();
        assert_eq!(acc.acpl(), None);
        assert_eq!(acc.suspicion_key(), 0.0);

        acc.record_sample(10);
        acc.record_sample(25);
        assert_eq!(acc.acpl(), Some(17.5));

        for matched in [true, true, true, false] {
            acc.record_tier_opportunity(Tier::T3, matched);
        }
        assert!((acc.suspicion_key() + 0.3006424831772109).abs() < 1e-9);
    }
}
