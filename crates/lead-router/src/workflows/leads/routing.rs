use super::domain::{Disposition, RoutedLead, ScoredLead};

/// `Engage` only when the score is strictly above the threshold.
pub fn route(score: u32, threshold: u32) -> Disposition {
    if score > threshold {
        Disposition::Engage
    } else {
        Disposition::Nurture
    }
}

/// Threshold policy separating outbound engagement from the nurture track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
    threshold: u32,
}

impl RoutingPolicy {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn disposition(&self, score: u32) -> Disposition {
        route(score, self.threshold)
    }

    pub fn route(&self, scored: ScoredLead) -> RoutedLead {
        let disposition = self.disposition(scored.score());
        RoutedLead::new(scored, disposition)
    }
}
