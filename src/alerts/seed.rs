//! Startup alert set and the re-fetch variant used by "refresh alerts"

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::{Alert, BehaviourType};

/// Range fresh ids are drawn from on refresh
const REFRESH_ID_MAX: u64 = 1_000_000;

/// The five alerts the monitor starts with, relative to `now`
pub fn seed_alerts(now: DateTime<Utc>) -> Vec<Alert> {
    let rows = [
        (1, 3, BehaviourType::Fall, 0.95, Duration::minutes(2), "cam-01", 1),
        (2, 1, BehaviourType::Loitering, 0.82, Duration::minutes(15), "cam-02", 2),
        (3, 5, BehaviourType::LyingMotionless, 0.99, Duration::hours(1), "cam-01", 1),
        (4, 2, BehaviourType::Loitering, 0.78, Duration::hours(3), "cam-03", 2),
        (5, 8, BehaviourType::Fall, 0.91, Duration::hours(5), "cam-01", 1),
    ];

    rows.into_iter()
        .map(|(id, person_id, behaviour_type, confidence, age, camera, snapshot)| Alert {
            id,
            person_id,
            behaviour_type,
            confidence,
            timestamp: now - age,
            camera_id: camera.to_string(),
            snapshot_path: format!("/placeholders/snapshot-{}.png", snapshot),
            metadata: None,
        })
        .collect()
}

/// Seed alerts re-issued under fresh random ids, unique within the batch
pub fn refreshed_alerts<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Vec<Alert> {
    let mut used = HashSet::new();
    seed_alerts(now)
        .into_iter()
        .map(|mut alert| {
            let id = loop {
                let candidate = rng.gen_range(1..=REFRESH_ID_MAX);
                if used.insert(candidate) {
                    break candidate;
                }
            };
            alert.id = id;
            alert
        })
        .collect()
}
