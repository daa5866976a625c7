use crate::catalog::Commercial;
use crate::daily::EntryKind;
use serde::{Deserialize, Serialize};

/// One spot in a commercial break, before it is placed on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakSpot {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    pub duration: u32,
}

/// Builds commercial breaks from a pool of spots.
///
/// Spots are taken in pool order, resuming where the previous break left off,
/// so consecutive breaks rotate through the whole pool. The result is
/// deterministic for a given pool ordering.
#[derive(Debug, Clone)]
pub struct CommercialFiller {
    pool: Vec<Commercial>,
    position: usize,
}

impl CommercialFiller {
    pub fn new(pool: Vec<Commercial>) -> Self {
        let pool = pool.into_iter().filter(|c| c.duration > 0).collect();
        CommercialFiller { pool, position: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Spots whose total duration is at least `target_secs`.
    ///
    /// The last spot may run past the target. With an empty pool a single
    /// sponsor placeholder of exactly `target_secs` is returned instead.
    /// A zero target yields an empty break.
    pub fn build_sequence(&mut self, target_secs: u32) -> Vec<BreakSpot> {
        if target_secs == 0 {
            return Vec::new();
        }
        if self.pool.is_empty() {
            return vec![BreakSpot {
                kind: EntryKind::SponsorsPlaceholder,
                video_id: None,
                duration: target_secs,
            }];
        }

        let mut spots = Vec::new();
        let mut total = 0u32;
        while total < target_secs {
            let spot = &self.pool[self.position % self.pool.len()];
            self.position = (self.position + 1) % self.pool.len();
            total += spot.duration;
            spots.push(BreakSpot {
                kind: EntryKind::Commercial,
                video_id: Some(spot.video_id.clone()),
                duration: spot.duration,
            });
        }
        spots
    }
}

/// Build one break from the start of `pool`.
pub fn build_commercial_sequence(target_secs: u32, pool: &[Commercial]) -> Vec<BreakSpot> {
    CommercialFiller::new(pool.to_vec()).build_sequence(target_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<Commercial> {
        vec![
            Commercial { video_id: "spot_30".into(), duration: 30 },
            Commercial { video_id: "spot_60".into(), duration: 60 },
        ]
    }

    fn total(spots: &[BreakSpot]) -> u32 {
        spots.iter().map(|s| s.duration).sum()
    }

    #[test]
    fn two_minute_break_covers_target() {
        let spots = build_commercial_sequence(120, &pool());
        assert!(total(&spots) >= 120);
        assert!(spots.iter().all(|s| s.kind == EntryKind::Commercial));
        assert!(spots.iter().all(|s| s.video_id.is_some()));
    }

    #[test]
    fn overfill_is_at_most_one_spot() {
        let spots = build_commercial_sequence(100, &pool());
        let sum = total(&spots);
        assert!(sum >= 100);
        let last = spots.last().unwrap().duration;
        assert!(sum - last < 100);
    }

    #[test]
    fn empty_pool_uses_sponsor_placeholder() {
        let spots = build_commercial_sequence(60, &[]);
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0].kind, EntryKind::SponsorsPlaceholder);
        assert_eq!(spots[0].duration, 60);
        assert!(spots[0].video_id.is_none());
    }

    #[test]
    fn zero_target_is_empty() {
        assert!(build_commercial_sequence(0, &pool()).is_empty());
        assert!(build_commercial_sequence(0, &[]).is_empty());
    }

    #[test]
    fn consecutive_breaks_rotate_through_pool() {
        let mut filler = CommercialFiller::new(pool());
        let first = filler.build_sequence(20);
        let second = filler.build_sequence(20);
        assert_eq!(first[0].video_id.as_deref(), Some("spot_30"));
        assert_eq!(second[0].video_id.as_deref(), Some("spot_60"));
    }

    #[test]
    fn same_pool_gives_same_break() {
        assert_eq!(
            build_commercial_sequence(300, &pool()),
            build_commercial_sequence(300, &pool())
        );
    }

    #[test]
    fn zero_length_spots_are_ignored() {
        let mut p = pool();
        p.insert(0, Commercial { video_id: "blank".into(), duration: 0 });
        let spots = build_commercial_sequence(30, &p);
        assert!(spots.iter().all(|s| s.video_id.as_deref() != Some("blank")));
    }
}
