//! Change-request approval, application and persistence
//!
//! A change request names one model field by path (`objects[0].props[2].name`)
//! together with the value it expects to find there and the value to write.
//! Applying re-checks the live value first; a mismatch turns the request into
//! a rejection instead of overwriting newer data.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use panelkit_core::prelude::*;
use panelkit_core::{ChangeRequest, STALE_DATA_REASON};

// ─────────────────────────────────────────────────────────
// Path locator
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Split `a.b[0].c` into key and index segments
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let mut segments = Vec::new();
    if path.trim().is_empty() {
        return Err(Error::path_not_found(path));
    }

    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !key.is_empty() {
            segments.push(PathSegment::Key(key.to_string()));
        } else if rest.is_empty() {
            return Err(Error::change_request(format!(
                "Empty segment in property path '{}'",
                path
            )));
        }

        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(|| {
                Error::change_request(format!("Unclosed '[' in property path '{}'", path))
            })?;
            let index = rest[1..close].trim().parse::<usize>().map_err(|_| {
                Error::change_request(format!("Bad index in property path '{}'", path))
            })?;
            segments.push(PathSegment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(Error::change_request(format!(
                    "Unexpected text after index in property path '{}'",
                    path
                )));
            }
        }
    }
    Ok(segments)
}

pub fn lookup<'a>(model: &'a Value, path: &str) -> Result<&'a Value> {
    let mut current = model;
    for segment in parse_path(path)? {
        let next = match (&segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(i), Value::Array(items)) => items.get(*i),
            _ => None,
        };
        current = next.ok_or_else(|| Error::path_not_found(path))?;
    }
    Ok(current)
}

pub fn lookup_mut<'a>(model: &'a mut Value, path: &str) -> Result<&'a mut Value> {
    let mut current = model;
    for segment in parse_path(path)? {
        let next = match (&segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key),
            (PathSegment::Index(i), Value::Array(items)) => items.get_mut(*i),
            _ => None,
        };
        current = next.ok_or_else(|| Error::path_not_found(path))?;
    }
    Ok(current)
}

// ─────────────────────────────────────────────────────────
// Review and apply
// ─────────────────────────────────────────────────────────

pub fn approve(record: &mut ChangeRequest) -> Result<()> {
    if record.is_processed {
        return Err(Error::change_request(format!(
            "Change request {} has already been applied",
            record.code
        )));
    }
    record.is_approved = true;
    record.is_rejected = false;
    record.rejection_reason = None;
    Ok(())
}

pub fn reject(record: &mut ChangeRequest, reason: Option<String>) -> Result<()> {
    if record.is_processed {
        return Err(Error::change_request(format!(
            "Change request {} has already been applied",
            record.code
        )));
    }
    record.is_rejected = true;
    record.is_approved = false;
    record.rejection_reason = reason.filter(|r| !r.trim().is_empty());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// New value written, record marked processed
    Applied,
    /// Live value differed from the recorded old value; record auto-rejected
    Stale,
    /// Not approved, already rejected or already processed
    NotEligible,
    /// The property path does not resolve in the model
    PathNotFound,
}

/// Apply one change request to the model
///
/// The model is only written on [`ApplyOutcome::Applied`].
pub fn apply_change_request(model: &mut Value, record: &mut ChangeRequest) -> ApplyOutcome {
    if !record.is_eligible_for_apply() {
        return ApplyOutcome::NotEligible;
    }

    let Ok(slot) = lookup_mut(model, &record.property_path) else {
        warn!(
            "Change request {}: path '{}' not found",
            record.code, record.property_path
        );
        return ApplyOutcome::PathNotFound;
    };

    if *slot != record.old_value {
        debug!(
            "Change request {} is stale: expected {}, found {}",
            record.code, record.old_value, slot
        );
        record.is_rejected = true;
        record.is_approved = false;
        record.rejection_reason = Some(STALE_DATA_REASON.to_string());
        return ApplyOutcome::Stale;
    }

    *slot = record.new_value.clone();
    record.is_processed = true;
    ApplyOutcome::Applied
}

/// Apply every eligible record in order, returning one outcome per record
pub fn apply_all(
    model: &mut Value,
    records: &mut [ChangeRequest],
) -> Vec<(String, ApplyOutcome)> {
    records
        .iter_mut()
        .filter(|r| r.is_eligible_for_apply())
        .map(|r| {
            let outcome = apply_change_request(model, r);
            (r.code.clone(), outcome)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────
// File store
// ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChangeRequestFile {
    #[serde(rename = "ChangeRequests", default)]
    change_requests: Vec<ChangeRequest>,
}

/// Persistence for change-request records, keyed by request code
pub trait ChangeRequestBackend: std::fmt::Debug + Send {
    fn load(&self, request_code: &str) -> Result<Vec<ChangeRequest>>;

    fn save(&self, request_code: &str, records: &[ChangeRequest]) -> Result<()>;

    /// Known request codes, sorted
    fn request_codes(&self) -> Result<Vec<String>>;
}

/// Request codes become file names, so only `[A-Za-z0-9_-]` is accepted
pub fn validate_request_code(request_code: &str) -> Result<()> {
    let valid = !request_code.is_empty()
        && request_code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::change_request(format!(
            "Invalid request code '{}'",
            request_code
        )))
    }
}

/// Directory of `<request_code>.json` files
#[derive(Debug, Clone)]
pub struct ChangeRequestStore {
    dir: PathBuf,
}

impl ChangeRequestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, request_code: &str) -> Result<PathBuf> {
        validate_request_code(request_code)?;
        Ok(self.dir.join(format!("{}.json", request_code)))
    }
}

impl ChangeRequestBackend for ChangeRequestStore {
    /// Load the records of one request code; a missing file is an empty list
    fn load(&self, request_code: &str) -> Result<Vec<ChangeRequest>> {
        let path = self.path_for(request_code)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut file = File::open(&path)?;
        file.lock_shared().map_err(|e| {
            Error::change_request(format!("Failed to lock {}: {}", path.display(), e))
        })?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let parsed: ChangeRequestFile = serde_json::from_str(&content).map_err(|e| {
            Error::change_request(format!("Invalid change request file {}: {}", path.display(), e))
        })?;
        Ok(parsed.change_requests)
    }

    fn save(&self, request_code: &str, records: &[ChangeRequest]) -> Result<()> {
        let path = self.path_for(request_code)?;
        std::fs::create_dir_all(&self.dir)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive().map_err(|e| {
            Error::change_request(format!("Failed to lock {}: {}", path.display(), e))
        })?;

        let content = serde_json::to_string_pretty(&ChangeRequestFile {
            change_requests: records.to_vec(),
        })?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        debug!("Saved {} change requests to {:?}", records.len(), path);
        Ok(())
    }

    fn request_codes(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut codes: Vec<String> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .filter(|code| validate_request_code(code).is_ok())
            .collect();
        codes.sort();
        Ok(codes)
    }
}
