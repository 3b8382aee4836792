use crate::codec;
use crate::config::WeekConfig;
use crate::error::AppError;
use crate::models::weeklog::*;
use crate::reconstruct;
use crate::store::{self, WeekLog};
use crate::validation;
use chrono::Utc;
use serde_json::Value;

pub fn read(log: &WeekLog, week: &WeekConfig) -> Result<Vec<LogEntry>, AppError> {
    let entries = log.read(&week.registry)?;
    tracing::debug!(entries = entries.len(), "weeklog read");
    Ok(entries)
}

pub fn add(log: &WeekLog, week: &WeekConfig, req: &AddEntryRequest) -> Result<&'static str, AppError> {
    let entry = validation::validate_entry(req, &week.clock, Utc::now())?;
    log.append(&entry, &week.registry)?;
    tracing::info!(
        steamid = entry.steamid,
        category = %entry.category,
        time = entry.time,
        portals = entry.portals,
        timestamp = entry.timestamp,
        tombstone = entry.is_tombstone(),
        "weeklog entry added"
    );
    Ok(SUCCESS)
}

pub fn remove(log: &WeekLog, timestamp: Option<&Value>) -> Result<&'static str, AppError> {
    let timestamp = validation::validate_timestamp(timestamp)?;
    match log.remove(timestamp) {
        Ok(()) => {
            tracing::info!(timestamp, "weeklog entry removed");
            Ok(SUCCESS)
        }
        Err(e) => {
            tracing::warn!(timestamp, error = %e, "weeklog remove failed");
            Err(e)
        }
    }
}

/// Rebuilds the leaderboard and returns it with the digest of the log bytes
/// it was built from.
pub fn reconstruct_snapshot(log: &WeekLog, week: &WeekConfig) -> Result<(String, Leaderboard), AppError> {
    let bytes = log.snapshot()?;
    let entries = codec::decode(&bytes, &week.registry).map_err(|e| {
        tracing::warn!(error = %e, "weeklog could not be decoded");
        e
    })?;
    let leaderboard = reconstruct::reconstruct(&entries, week)?;
    Ok((store::digest(&bytes), leaderboard))
}

pub fn reconstruct(log: &WeekLog, week: &WeekConfig) -> Result<Leaderboard, AppError> {
    reconstruct_snapshot(log, week).map(|(_, leaderboard)| leaderboard)
}

pub fn reset(log: &WeekLog, week: &WeekConfig) -> Result<&'static str, AppError> {
    log.reset()?;
    tracing::info!(week = ?week.number, "weeklog reset");
    Ok(SUCCESS)
}

/// Runs one of the named weeklog commands. The week configuration is only
/// loaded once the command is known to need it.
pub fn dispatch<F>(log: &WeekLog, command: &str, args: &[Value], week: F) -> Result<CommandOutput, AppError>
where
    F: FnOnce() -> Result<WeekConfig, AppError>,
{
    match command {
        "read" => read(log, &week()?).map(CommandOutput::Entries),
        "add" => add(log, &week()?, &validation::add_request_from_args(args)).map(CommandOutput::Status),
        "remove" => remove(log, args.first()).map(CommandOutput::Status),
        "reconstruct" => reconstruct(log, &week()?).map(CommandOutput::Leaderboard),
        other => Err(AppError::Command(other.to_string())),
    }
}
