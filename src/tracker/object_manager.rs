//! Owner of the live tracked-object collection.
//!
//! Per frame the manager applies matched observations, recaptures stale/lost
//! objects by 3D proximity, spawns candidates from what is left, advances every
//! untouched object as missed and purges lost objects. Identifiers that no
//! longer resolve are skipped.

use std::collections::{BTreeMap, HashSet};

use nalgebra::distance;
use tracing::debug;

use crate::tracker::config::TrackerConfig;
use crate::tracker::detection::Detection3D;
use crate::tracker::matching::MatchResult;
use crate::tracker::track_state::{LifecycleThresholds, TrackState};
use crate::tracker::tracked_object::{ObjectId, Smoothing, TrackedObject, Transition};

/// Counts of what happened to the object set during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameUpdate {
    pub matched: usize,
    pub recaptured: usize,
    pub spawned: usize,
    /// Unmatched observations dropped for being too close to an existing object
    pub suppressed: usize,
    pub missed: usize,
    pub purged: usize,
}

pub struct ObjectManager {
    objects: BTreeMap<ObjectId, TrackedObject>,
    /// Objects matched, recaptured or spawned during the current frame
    touched: HashSet<ObjectId>,
    next_id: u64,
    frame_count: u64,
    smoothing: Smoothing,
    thresholds: LifecycleThresholds,
    recapture_distance: f32,
    min_new_candidate_distance: f32,
}

impl ObjectManager {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            objects: BTreeMap::new(),
            touched: HashSet::new(),
            next_id: 0,
            frame_count: 0,
            smoothing: Smoothing {
                position: config.position_smoothing,
                size: config.size_smoothing,
                confidence: config.confidence_smoothing,
            },
            thresholds: LifecycleThresholds {
                confirmation_frames: config.confirmation_frames,
                stale_frames: config.stale_frames,
                lost_frames: config.lost_frames,
            },
            recapture_distance: config.recapture_distance,
            min_new_candidate_distance: config.min_new_candidate_distance,
        }
    }

    /// Run steps (e) through (i) for one frame.
    pub fn update(&mut self, observations: &[Detection3D], result: &MatchResult, timestamp: f64) -> FrameUpdate {
        self.begin_frame();

        let matched = self.apply_matches(&result.matches, observations, timestamp);
        let mut unmatched = result.unmatched_detections.clone();
        let recaptured = self.recapture(&mut unmatched, observations, timestamp);
        let (spawned, suppressed) = self.spawn_candidates(&unmatched, observations, timestamp);
        let missed = self.advance_missed();
        let purged = self.purge_lost();

        FrameUpdate {
            matched,
            recaptured,
            spawned,
            suppressed,
            missed,
            purged,
        }
    }

    /// Start a new frame: forget which objects were touched.
    pub fn begin_frame(&mut self) {
        self.touched.clear();
        self.frame_count += 1;
    }

    /// Blend matched observations into their objects.
    pub fn apply_matches(
        &mut self,
        matches: &[(ObjectId, usize)],
        observations: &[Detection3D],
        timestamp: f64,
    ) -> usize {
        let mut applied = 0;
        for &(id, index) in matches {
            let Some(observation) = observations.get(index) else {
                continue;
            };
            if self.observe(id, observation, timestamp) {
                applied += 1;
            }
        }
        applied
    }

    /// Recapture stale and lost objects with the nearest unclaimed observation
    /// inside the recapture radius. Claimed indices are removed from `unmatched`.
    pub fn recapture(&mut self, unmatched: &mut Vec<usize>, observations: &[Detection3D], timestamp: f64) -> usize {
        let candidates: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|obj| obj.state.is_recapturable() && !self.touched.contains(&obj.id()))
            .map(|obj| obj.id())
            .collect();

        let mut recaptured = 0;
        for id in candidates {
            let Some(position) = self.objects.get(&id).map(|obj| obj.position) else {
                continue;
            };

            let mut nearest: Option<(usize, f32)> = None;
            for (slot, &index) in unmatched.iter().enumerate() {
                let Some(observation) = observations.get(index) else {
                    continue;
                };
                let d = distance(&position, &observation.world_position);
                if d <= self.recapture_distance && nearest.is_none_or(|(_, best)| d < best) {
                    nearest = Some((slot, d));
                }
            }

            if let Some((slot, d)) = nearest {
                let index = unmatched.remove(slot);
                if self.observe(id, &observations[index], timestamp) {
                    debug!(object = %id, distance = d, "recaptured");
                    recaptured += 1;
                }
            }
        }
        recaptured
    }

    /// Spawn candidates from unmatched observations that are not within the
    /// minimum distance of any live object. Returns (spawned, suppressed).
    pub fn spawn_candidates(
        &mut self,
        unmatched: &[usize],
        observations: &[Detection3D],
        timestamp: f64,
    ) -> (usize, usize) {
        let mut spawned = 0;
        let mut suppressed = 0;
        for &index in unmatched {
            let Some(observation) = observations.get(index) else {
                continue;
            };
            let crowded = self.objects.values().any(|obj| {
                !obj.state.is_terminal()
                    && distance(&obj.position, &observation.world_position) < self.min_new_candidate_distance
            });
            if crowded {
                suppressed += 1;
                continue;
            }

            let id = self.next_object_id();
            let object = TrackedObject::new(id, observation, self.thresholds, timestamp);
            debug!(object = %id, label = %object.label(), "spawned candidate");
            if object.state != TrackState::Candidate {
                log_transition(
                    id,
                    Transition {
                        from: TrackState::Candidate,
                        to: object.state,
                    },
                );
            }
            self.objects.insert(id, object);
            self.touched.insert(id);
            spawned += 1;
        }
        (spawned, suppressed)
    }

    /// Advance every live object not touched this frame as missed.
    pub fn advance_missed(&mut self) -> usize {
        let mut missed = 0;
        for (id, obj) in self.objects.iter_mut() {
            if self.touched.contains(id) || obj.state.is_terminal() {
                continue;
            }
            if let Some(transition) = obj.miss() {
                log_transition(*id, transition);
            }
            missed += 1;
        }
        missed
    }

    /// Drop every lost object.
    pub fn purge_lost(&mut self) -> usize {
        let before = self.objects.len();
        self.objects.retain(|id, obj| {
            let keep = !obj.state.is_terminal();
            if !keep {
                debug!(object = %id, "purged");
            }
            keep
        });
        before - self.objects.len()
    }

    fn observe(&mut self, id: ObjectId, observation: &Detection3D, timestamp: f64) -> bool {
        let Some(obj) = self.objects.get_mut(&id) else {
            return false;
        };
        if let Some(transition) = obj.observe(observation, &self.smoothing, timestamp) {
            log_transition(id, transition);
        }
        self.touched.insert(id);
        true
    }

    fn next_object_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&TrackedObject> {
        self.objects.get(&id)
    }

    /// Live objects in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedObject> + '_ {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Forcibly drop an object.
    pub fn remove(&mut self, id: ObjectId) -> Option<TrackedObject> {
        self.touched.remove(&id);
        self.objects.remove(&id)
    }

    /// Drop every object. Identifiers are never reused.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.touched.clear();
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

fn log_transition(id: ObjectId, transition: Transition) {
    debug!(object = %id, from = %transition.from, to = %transition.to, "lifecycle transition");
}
