use crate::config::{Ranking, WeekConfig};
use crate::error::AppError;
use crate::models::weeklog::{CategoryBoard, Leaderboard, LogEntry, Run};
use std::collections::HashSet;

/// Replays decoded entries into ranked per-category boards.
///
/// Entries are walked newest first, so the latest run a player submitted in a
/// category is the one that counts. Each category keeps its own sorted list
/// and runs are placed by ordered insertion.
pub fn reconstruct(entries: &[LogEntry], week: &WeekConfig) -> Result<Leaderboard, AppError> {
    let registry = &week.registry;
    let mut boards: Vec<(Ranking, HashSet<u64>, Vec<Run>)> = registry
        .iter()
        .map(|c| (c.ranking(), HashSet::new(), Vec::new()))
        .collect();

    for entry in entries.iter().rev() {
        let index = registry
            .index_of(&entry.category)
            .ok_or_else(|| AppError::Category(entry.category.clone()))?;
        let (ranking, seen, runs) = &mut boards[index as usize];
        if !seen.insert(entry.steamid) {
            continue;
        }

        let run = to_run(entry, *ranking, week);
        // goes ahead of equal runs, so on a tie the earlier submission ranks first
        let pos = runs
            .iter()
            .position(|existing| !precedes(existing, &run, *ranking))
            .unwrap_or(runs.len());
        runs.insert(pos, run);
    }

    Ok(Leaderboard {
        boards: registry
            .iter()
            .zip(boards)
            .map(|(category, (_, _, runs))| CategoryBoard {
                category: category.id.clone(),
                runs,
            })
            .collect(),
    })
}

fn to_run(entry: &LogEntry, ranking: Ranking, week: &WeekConfig) -> Run {
    let (portals, segmented) = match ranking {
        Ranking::Portals => (Some(entry.portals), Some(false)),
        Ranking::Time => (None, None),
    };
    Run {
        steamid: entry.steamid,
        time: entry.time,
        portals,
        date: week.clock.absolute(entry.timestamp),
        note: String::new(),
        segmented,
    }
}

/// Whether `a` ranks strictly ahead of `b`.
fn precedes(a: &Run, b: &Run, ranking: Ranking) -> bool {
    match ranking {
        Ranking::Time => a.time < b.time,
        Ranking::Portals => {
            let (ap, bp) = (a.portals.unwrap_or(0), b.portals.unwrap_or(0));
            if ap != bp {
                return ap < bp;
            }
            let (aseg, bseg) = (a.segmented.unwrap_or(false), b.segmented.unwrap_or(false));
            if aseg != bseg {
                return aseg;
            }
            a.time < b.time
        }
    }
}
