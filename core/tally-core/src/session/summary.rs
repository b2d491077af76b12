//! Read-only queries over a session history: per-task totals and the name
//! lists offered when starting or resuming.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};

use super::types::{EndKind, SessionRecord, SummaryPolicy};

/// Total time per task name (case-sensitive), each rounded to the nearest minute.
pub fn summarize(
    records: &[SessionRecord],
    now: DateTime<Utc>,
    policy: SummaryPolicy,
) -> BTreeMap<String, Duration> {
    let mut totals: BTreeMap<String, Duration> = BTreeMap::new();

    for record in records {
        let duration = match (record.duration(), policy) {
            (Some(duration), _) => duration,
            (None, SummaryPolicy::IncludeRunning) => now - record.start,
            (None, SummaryPolicy::ExcludeRunning) => continue,
        };
        let entry = totals
            .entry(record.task_name.clone())
            .or_insert_with(Duration::zero);
        *entry = *entry + duration;
    }

    totals
        .into_iter()
        .map(|(name, total)| (name, round_to_minute(total)))
        .collect()
}

/// Sum of every closed session's duration, unrounded.
pub fn total_closed(records: &[SessionRecord]) -> Duration {
    records
        .iter()
        .filter_map(SessionRecord::duration)
        .fold(Duration::zero(), |acc, d| acc + d)
}

/// Rounds half a minute and up to the next whole minute.
pub fn round_to_minute(duration: Duration) -> Duration {
    let millis = duration.num_milliseconds();
    Duration::minutes((millis + 30_000).div_euclid(60_000))
}

/// Distinct non-empty task names, case-sensitive, ascending.
pub fn known_task_names(records: &[SessionRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.task_name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Names whose latest closed session was paused and which are not running now.
///
/// Names are grouped case-insensitively; the spelling of the most recently
/// ended record is reported.
pub fn resumable_task_names(records: &[SessionRecord]) -> Vec<String> {
    struct Group<'a> {
        running: bool,
        latest: Option<&'a SessionRecord>,
    }

    let mut groups: HashMap<String, Group<'_>> = HashMap::new();

    for record in records {
        if record.task_name.trim().is_empty() {
            continue;
        }
        let group = groups
            .entry(record.task_name.to_lowercase())
            .or_insert(Group {
                running: false,
                latest: None,
            });

        match record.end {
            None => group.running = true,
            Some(end) => {
                let newer = group
                    .latest
                    .and_then(|latest| latest.end)
                    .map_or(true, |latest_end| end >= latest_end);
                if newer {
                    group.latest = Some(record);
                }
            }
        }
    }

    let mut names: Vec<String> = groups
        .into_values()
        .filter(|group| !group.running)
        .filter_map(|group| group.latest)
        .filter(|latest| latest.end_kind == Some(EndKind::Paused))
        .map(|latest| latest.task_name.clone())
        .collect();

    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    names
}
