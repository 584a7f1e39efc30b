use serde::Serialize;

use super::assumption::{Assumption, AssumptionScores};

/// Observed minimum and maximum of a value. Starts empty so that the first
/// observation sets both ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    min: Option<f64>,
    max: Option<f64>,
}

impl Bounds {
    pub fn observe(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none()
    }
}

/// Ranges seen across one engine's parsed results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    assumptions: usize,
    charge: Bounds,
    length: Bounds,
    score: Bounds,
    rank_score: Bounds,
    mz: Bounds,
    n_gap: Bounds,
    c_gap: Bounds,
}

impl RunStatistics {
    pub fn record(&mut self, assumption: &Assumption) {
        self.assumptions += 1;
        self.charge.observe(f64::from(assumption.charge()));
        self.length.observe(assumption.sequence().len() as f64);
        self.mz.observe(assumption.theoretical_mz());

        let AssumptionScores { rank_score, score } = assumption.scores();
        self.score.observe(score);
        if let Some(rank_score) = rank_score {
            self.rank_score.observe(rank_score);
        }

        if let Some(tag) = assumption.as_tag() {
            self.n_gap.observe(tag.tag.n_gap);
            self.c_gap.observe(tag.tag.c_gap);
        }
    }

    pub fn assumptions(&self) -> usize {
        self.assumptions
    }

    pub fn charge(&self) -> Bounds {
        self.charge
    }

    pub fn length(&self) -> Bounds {
        self.length
    }

    pub fn score(&self) -> Bounds {
        self.score
    }

    pub fn rank_score(&self) -> Bounds {
        self.rank_score
    }

    pub fn mz(&self) -> Bounds {
        self.mz
    }

    pub fn n_gap(&self) -> Bounds {
        self.n_gap
    }

    pub fn c_gap(&self) -> Bounds {
        self.c_gap
    }

    pub fn merge(&mut self, other: &RunStatistics) {
        self.assumptions += other.assumptions;
        for (mine, theirs) in [
            (&mut self.charge, &other.charge),
            (&mut self.length, &other.length),
            (&mut self.score, &other.score),
            (&mut self.rank_score, &other.rank_score),
            (&mut self.mz, &other.mz),
            (&mut self.n_gap, &other.n_gap),
            (&mut self.c_gap, &other.c_gap),
        ] {
            if let (Some(min), Some(max)) = (theirs.min, theirs.max) {
                mine.observe(min);
                mine.observe(max);
            }
        }
    }
}
