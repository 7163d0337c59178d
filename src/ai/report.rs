//! Pre-aggregation of alert and stats data for report generation

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{NaiveDate, SecondsFormat};

use super::ReportInput;
use crate::alerts::{Alert, BehaviourType};
use crate::config::ConfigChange;
use crate::error::ValidationErrors;
use crate::stats::Stats;

/// Most alerts listed line by line in the anomaly summary
const MAX_LISTED_ALERTS: usize = 20;

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if start > end {
        errors.push("dateRange", "The start date must not be after the end date.");
    }
    errors.into_result()
}

/// Alerts whose calendar date (UTC) lies within `[start, end]`
pub fn alerts_in_range<'a, I>(alerts: I, start: NaiveDate, end: NaiveDate) -> Vec<&'a Alert>
where
    I: IntoIterator<Item = &'a Alert>,
{
    alerts
        .into_iter()
        .filter(|a| {
            let day = a.timestamp.date_naive();
            start <= day && day <= end
        })
        .collect()
}

/// Build the report input for `[start, end]`
pub fn prepare_report_input<'a, I>(
    start: NaiveDate,
    end: NaiveDate,
    alerts: I,
    stats: &Stats,
    history: &[ConfigChange],
) -> Result<ReportInput, ValidationErrors>
where
    I: IntoIterator<Item = &'a Alert>,
{
    validate_range(start, end)?;

    let mut in_range = alerts_in_range(alerts, start, end);
    in_range.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(ReportInput {
        start_date: start,
        end_date: end,
        anomalies: summarize_anomalies(&in_range, start, end),
        system_performance: summarize_performance(stats),
        configuration_changes: summarize_changes(history, start, end),
    })
}

fn summarize_anomalies(alerts: &[&Alert], start: NaiveDate, end: NaiveDate) -> String {
    if alerts.is_empty() {
        return "No anomalies detected.".to_string();
    }

    let mut per_behaviour: BTreeMap<BehaviourType, usize> = BTreeMap::new();
    let mut per_camera: BTreeMap<&str, usize> = BTreeMap::new();
    for alert in alerts {
        *per_behaviour.entry(alert.behaviour_type).or_insert(0) += 1;
        *per_camera.entry(alert.camera_id.as_str()).or_insert(0) += 1;
    }

    let behaviours: Vec<String> = BehaviourType::ALL
        .iter()
        .map(|b| format!("{} {}", per_behaviour.get(b).copied().unwrap_or(0), b.label()))
        .collect();
    let cameras: Vec<String> = per_camera
        .iter()
        .map(|(camera, count)| format!("{} ({})", camera, count))
        .collect();

    let mut out = format!(
        "{} alerts between {} and {}: {}.\nCameras: {}.",
        alerts.len(),
        start,
        end,
        behaviours.join(", "),
        cameras.join(", ")
    );

    for alert in alerts.iter().take(MAX_LISTED_ALERTS) {
        let _ = write!(
            out,
            "\n- {} {} person {} on {} ({:.0}%)",
            alert.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            alert.behaviour_type.label(),
            alert.person_id,
            alert.camera_id,
            alert.confidence * 100.0
        );
    }
    if alerts.len() > MAX_LISTED_ALERTS {
        let _ = write!(out, "\n- ... and {} more", alerts.len() - MAX_LISTED_ALERTS);
    }

    out
}

fn summarize_performance(stats: &Stats) -> String {
    format!(
        "Active cameras: {}. Alerts recorded overall: {} ({} today). Average detection confidence: {:.1}%.",
        stats.active_cameras,
        stats.total_alerts,
        stats.alerts_today,
        stats.average_confidence * 100.0
    )
}

fn summarize_changes(history: &[ConfigChange], start: NaiveDate, end: NaiveDate) -> String {
    let lines: Vec<String> = history
        .iter()
        .filter(|c| {
            let day = c.at.date_naive();
            start <= day && day <= end
        })
        .map(|c| {
            format!(
                "- {}: {}",
                c.at.to_rfc3339_opts(SecondsFormat::Secs, true),
                c.changes.join("; ")
            )
        })
        .collect();

    if lines.is_empty() {
        "No configuration changes were made.".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::test_alert;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn alert_at(id: u64, d: u32, hour: u32) -> Alert {
        let mut alert = test_alert(id, BehaviourType::Fall, 0.9);
        alert.timestamp = Utc.with_ymd_and_hms(2026, 3, d, hour, 0, 0).unwrap();
        alert
    }

    #[test]
    fn test_range_is_inclusive_on_both_ends() {
        let alerts = vec![
            alert_at(1, 9, 23),
            alert_at(2, 10, 0),
            alert_at(3, 12, 23),
            alert_at(4, 13, 0),
        ];
        let ids: Vec<u64> = alerts_in_range(&alerts, day(10), day(12))
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let err = prepare_report_input(day(12), day(10), &[], &Stats::default(), &[]).unwrap_err();
        assert!(err.field("dateRange").is_some());
    }

    #[test]
    fn test_summaries() {
        let mut loiter = alert_at(2, 11, 8);
        loiter.behaviour_type = BehaviourType::Loitering;
        loiter.camera_id = "cam-02".to_string();
        let alerts = vec![alert_at(1, 10, 9), loiter];

        let history = vec![ConfigChange {
            at: Utc.with_ymd_and_hms(2026, 3, 11, 12, 0, 0).unwrap(),
            changes: vec!["camera.fps: 30 -> 15".to_string()],
        }];
        let stats = Stats::from_alerts(&alerts, 3, day(11));

        let input = prepare_report_input(day(10), day(11), &alerts, &stats, &history).unwrap();
        assert!(input
            .anomalies
            .starts_with("2 alerts between 2026-03-10 and 2026-03-11: 1 fall, 0 lying motionless, 1 loitering."));
        assert!(input.anomalies.contains("Cameras: cam-01 (1), cam-02 (1)."));
        assert!(input.anomalies.contains("loitering person 1 on cam-02 (90%)"));
        assert!(input.system_performance.starts_with("Active cameras: 3. Alerts recorded overall: 2 (1 today)."));
        assert_eq!(input.configuration_changes, "- 2026-03-11T12:00:00Z: camera.fps: 30 -> 15");
    }

    #[test]
    fn test_empty_range_placeholders() {
        let input = prepare_report_input(day(1), day(2), &[], &Stats::default(), &[]).unwrap();
        assert_eq!(input.anomalies, "No anomalies detected.");
        assert_eq!(input.configuration_changes, "No configuration changes were made.");
    }
}
