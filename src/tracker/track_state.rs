use std::fmt;

/// Lifecycle state of a tracked object.
///
/// `Candidate -> Confirmed -> Stale -> Lost`, with `Stale | Lost -> Confirmed`
/// on recapture. `Lost` is terminal for misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackState {
    /// Newly spawned, not yet confirmed
    #[default]
    Candidate,
    /// Actively tracked object
    Confirmed,
    /// Not observed for a while; eligible for recapture
    Stale,
    /// Terminal; purged at the end of the frame
    Lost,
}

/// What happened to an object during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    /// Matched or recaptured; carries the updated consecutive-observed count.
    Observed { consecutive: u32 },
    /// Not matched; carries the updated consecutive-missed count.
    Missed { consecutive: u32 },
}

/// Per-object frame thresholds that drive transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleThresholds {
    pub confirmation_frames: u32,
    pub stale_frames: u32,
    pub lost_frames: u32,
}

impl TrackState {
    /// The single transition function of the lifecycle graph.
    pub fn next(self, event: TrackEvent, thresholds: &LifecycleThresholds) -> TrackState {
        use TrackState::*;
        match (self, event) {
            (Candidate, TrackEvent::Observed { consecutive })
                if consecutive >= thresholds.confirmation_frames =>
            {
                Confirmed
            }
            (Candidate, TrackEvent::Observed { .. }) => Candidate,
            (Confirmed | Stale | Lost, TrackEvent::Observed { .. }) => Confirmed,

            (Candidate, TrackEvent::Missed { consecutive })
                if consecutive >= thresholds.confirmation_frames =>
            {
                Lost
            }
            (Confirmed, TrackEvent::Missed { consecutive })
                if consecutive >= thresholds.stale_frames =>
            {
                Stale
            }
            (Stale, TrackEvent::Missed { consecutive }) if consecutive >= thresholds.lost_frames => {
                Lost
            }
            (state, TrackEvent::Missed { .. }) => state,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == TrackState::Lost
    }

    /// Stale and lost objects can be recaptured by 3D proximity.
    pub fn is_recapturable(self) -> bool {
        matches!(self, TrackState::Stale | TrackState::Lost)
    }
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackState::Candidate => "candidate",
            TrackState::Confirmed => "confirmed",
            TrackState::Stale => "stale",
            TrackState::Lost => "lost",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: LifecycleThresholds = LifecycleThresholds {
        confirmation_frames: 3,
        stale_frames: 5,
        lost_frames: 8,
    };

    fn observed(consecutive: u32) -> TrackEvent {
        TrackEvent::Observed { consecutive }
    }

    fn missed(consecutive: u32) -> TrackEvent {
        TrackEvent::Missed { consecutive }
    }

    #[test]
    fn test_candidate_confirms_at_threshold() {
        assert_eq!(TrackState::Candidate.next(observed(1), &T), TrackState::Candidate);
        assert_eq!(TrackState::Candidate.next(observed(2), &T), TrackState::Candidate);
        assert_eq!(TrackState::Candidate.next(observed(3), &T), TrackState::Confirmed);
    }

    #[test]
    fn test_candidate_missed_goes_straight_to_lost() {
        assert_eq!(TrackState::Candidate.next(missed(2), &T), TrackState::Candidate);
        assert_eq!(TrackState::Candidate.next(missed(3), &T), TrackState::Lost);
    }

    #[test]
    fn test_confirmed_decays_to_stale() {
        assert_eq!(TrackState::Confirmed.next(missed(4), &T), TrackState::Confirmed);
        assert_eq!(TrackState::Confirmed.next(missed(5), &T), TrackState::Stale);
        // Never skips straight to lost
        assert_eq!(TrackState::Confirmed.next(missed(100), &T), TrackState::Stale);
    }

    #[test]
    fn test_stale_decays_to_lost() {
        assert_eq!(TrackState::Stale.next(missed(7), &T), TrackState::Stale);
        assert_eq!(TrackState::Stale.next(missed(8), &T), TrackState::Lost);
    }

    #[test]
    fn test_lost_has_no_missed_transition() {
        assert_eq!(TrackState::Lost.next(missed(1000), &T), TrackState::Lost);
    }

    #[test]
    fn test_recapture_restores_confirmed() {
        assert_eq!(TrackState::Stale.next(observed(1), &T), TrackState::Confirmed);
        assert_eq!(TrackState::Lost.next(observed(1), &T), TrackState::Confirmed);
        assert_eq!(TrackState::Confirmed.next(observed(1), &T), TrackState::Confirmed);
    }

    #[test]
    fn test_display() {
        assert_eq!(TrackState::Stale.to_string(), "stale");
    }
}
