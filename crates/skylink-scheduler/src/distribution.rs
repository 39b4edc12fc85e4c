//! A bucketed, exponentially-decaying model of how long a worker takes to
//! complete a read job: "by bucket `b`, what fraction of past reads had
//! completed?"

use skylink_async::time::Duration;

/// Weight given to history on each new sample, matching the decay factor
/// the worker crate uses for its own job-time EWMA.
const SAMPLE_DECAY: f64 = 0.9;

#[derive(Clone, Debug)]
pub struct LatencyDistribution {
    bucket_width: Duration,
    mass: Vec<f64>,
}

impl LatencyDistribution {
    pub fn empty(bucket_width: Duration, num_buckets: usize) -> Self {
        Self { bucket_width, mass: vec![0.0; num_buckets.max(1)] }
    }

    pub fn bucket_width(&self) -> Duration {
        self.bucket_width
    }

    pub fn num_buckets(&self) -> usize {
        self.mass.len()
    }

    fn bucket_index(&self, duration: Duration) -> usize {
        if self.bucket_width.is_zero() {
            return self.mass.len() - 1;
        }
        let idx = (duration.as_nanos() / self.bucket_width.as_nanos().max(1)) as usize;
        idx.min(self.mass.len() - 1)
    }

    /// Records a completed read of `duration`, decaying prior history by
    /// [`SAMPLE_DECAY`] and adding the sample's share to its bucket.
    pub fn add_sample(&mut self, duration: Duration) {
        for m in &mut self.mass {
            *m *= SAMPLE_DECAY;
        }
        let idx = self.bucket_index(duration);
        self.mass[idx] += 1.0 - SAMPLE_DECAY;
    }

    fn total(&self) -> f64 {
        self.mass.iter().sum()
    }

    /// Probability a read from this distribution completes within
    /// `duration`. Zero for a distribution with no observations yet.
    pub fn chance_after(&self, duration: Duration) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let idx = self.bucket_index(duration);
        self.mass[..=idx].iter().sum::<f64>() / total
    }

    /// Remaining-latency distribution given `elapsed` has already passed
    /// without success: buckets before `elapsed` carry no more mass, and
    /// later buckets shift down to start counting from now.
    pub fn shift_by(&self, elapsed: Duration) -> Self {
        let shift = self.bucket_index(elapsed);
        let mut mass = vec![0.0; self.mass.len()];
        for (i, m) in self.mass.iter().enumerate().skip(shift) {
            mass[i - shift] = *m;
        }
        Self { bucket_width: self.bucket_width, mass }
    }

    /// Combines `self` and `other` bucket-wise, weighted by `self_weight`
    /// and `other_weight`. Used to merge a chimera's constituent
    /// distributions as each new member is admitted.
    pub fn merge_with_weight(&self, other: &Self, self_weight: f64, other_weight: f64) -> Self {
        let n = self.mass.len().max(other.mass.len());
        let mut mass = vec![0.0; n];
        let total_weight = self_weight + other_weight;
        if total_weight <= 0.0 {
            return Self { bucket_width: self.bucket_width, mass };
        }
        for i in 0..n {
            let a = self.mass.get(i).copied().unwrap_or(0.0) * self_weight;
            let b = other.mass.get(i).copied().unwrap_or(0.0) * other_weight;
            mass[i] = (a + b) / total_weight;
        }
        Self { bucket_width: self.bucket_width, mass }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist() -> LatencyDistribution {
        LatencyDistribution::empty(Duration::from_millis(10), 8)
    }

    #[test]
    fn chance_after_is_zero_with_no_samples() {
        assert_eq!(dist().chance_after(Duration::from_millis(1000)), 0.0);
    }

    #[test]
    fn chance_after_is_monotone_in_duration() {
        let mut d = dist();
        d.add_sample(Duration::from_millis(30));
        d.add_sample(Duration::from_millis(50));
        let mut last = 0.0;
        for b in 0u32..8 {
            let chance = d.chance_after(Duration::from_millis(10) * b);
            assert!(chance >= last - 1e-9);
            last = chance;
        }
        assert!(d.chance_after(Duration::from_millis(70)) > 0.99);
    }

    #[test]
    fn repeated_fast_samples_converge_chance_near_one_at_their_bucket() {
        let mut d = dist();
        for _ in 0..200 {
            d.add_sample(Duration::from_millis(15));
        }
        assert!(d.chance_after(Duration::from_millis(20)) > 0.95);
        assert!(d.chance_after(Duration::from_millis(5)) < 0.05);
    }

    #[test]
    fn shift_by_drops_mass_before_elapsed() {
        let mut d = dist();
        d.add_sample(Duration::from_millis(15));
        d.add_sample(Duration::from_millis(75));
        let shifted = d.shift_by(Duration::from_millis(40));
        assert_eq!(shifted.chance_after(Duration::from_millis(0)), 0.0);
        assert!(shifted.chance_after(Duration::from_millis(79)) > 0.0);
    }

    #[test]
    fn merge_with_equal_weight_averages_two_distributions() {
        let mut fast = dist();
        fast.add_sample(Duration::from_millis(5));
        let mut slow = dist();
        slow.add_sample(Duration::from_millis(75));
        let merged = fast.merge_with_weight(&slow, 1.0, 1.0);
        assert!(merged.chance_after(Duration::from_millis(10)) > 0.0);
        assert!(merged.chance_after(Duration::from_millis(10)) < fast.chance_after(Duration::from_millis(10)));
    }
}
