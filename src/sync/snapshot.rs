use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::data::entity::{GeoEntity, OwnerProfile};
use crate::prelude::HashMap;

/// One published result of the entity source
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Sequence number of the request that produced it; 0 before the first fetch
    pub seq: u64,
    pub entities: Arc<Vec<GeoEntity>>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            seq: 0,
            entities: Arc::new(Vec::new()),
            fetched_at: None,
        }
    }

    pub fn new(seq: u64, entities: Vec<GeoEntity>) -> Self {
        Self {
            seq,
            entities: Arc::new(entities),
            fetched_at: Some(Utc::now()),
        }
    }

    /// Whether no fetch has completed yet
    pub fn is_initial(&self) -> bool {
        self.seq == 0
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Orders overlapping requests.
///
/// Each request takes a ticket when it starts; a completed response is only
/// applied if its ticket is newer than the last applied one, so a slow
/// request can never overwrite the result of a faster, later one.
#[derive(Debug, Default)]
pub struct SequenceGate {
    issued: u64,
    applied: u64,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for a request that is about to start
    pub fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Records `seq` as applied if it is newer than everything applied so far
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq > self.applied {
            self.applied = seq;
            true
        } else {
            false
        }
    }

    pub fn last_applied(&self) -> u64 {
        self.applied
    }
}

/// Copies resolved owner names onto the posts they belong to
pub fn apply_display_names(entities: &mut [GeoEntity], profiles: &[OwnerProfile]) {
    let names: HashMap<&str, &str> = profiles
        .iter()
        .map(|p| (p.id.as_str(), p.display_name.as_str()))
        .collect();

    for entity in entities.iter_mut() {
        if let Some(owner) = entity.owner_id.as_deref() {
            if let Some(name) = names.get(owner) {
                entity.display_name = Some((*name).to_string());
            }
        }
    }
}

/// Distinct owner ids in first-seen order
pub fn owner_ids(entities: &[GeoEntity]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for owner in entities.iter().filter_map(|e| e.owner_id.as_ref()) {
        if !ids.contains(owner) {
            ids.push(owner.clone());
        }
    }
    ids
}
