//! In-memory registry state and the default-selection rules.
//!
//! Everything here is pure: the registry clones a state, mutates the clone,
//! persists what changed and only then publishes it.

use mr_core::{Purpose, RegistrationRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub(crate) struct RegistryState {
    pub records: BTreeMap<String, RegistrationRecord>,
    pub defaults: BTreeMap<Purpose, String>,
    /// Declared purposes plus custom ones that no record serves yet.
    pub purposes: BTreeSet<Purpose>,
    pub next_seq: u64,
}

impl RegistryState {
    /// Rebuilds state from persisted records and the persisted default index.
    ///
    /// Index entries pointing at a missing or ineligible record are dropped;
    /// purposes left without a default are recomputed from scores.
    pub fn reconcile(
        records: impl IntoIterator<Item = RegistrationRecord>,
        persisted_defaults: BTreeMap<String, String>,
    ) -> Self {
        let mut state = Self::default();
        for record in records {
            if let Some(previous) = state.records.get(&record.model_id) {
                warn!(
                    "Duplicate persisted record {}, keeping the later registration",
                    record.model_id
                );
                if previous.registration_seq > record.registration_seq {
                    continue;
                }
            }
            state.next_seq = state.next_seq.max(record.registration_seq + 1);
            state.purposes.extend(record.purposes.iter().cloned());
            state.records.insert(record.model_id.clone(), record);
        }

        for (tag, id) in persisted_defaults {
            let purpose = Purpose::new(&tag);
            match state.records.get(&id) {
                Some(record) if record.is_eligible_for(&purpose) => {
                    state.purposes.insert(purpose.clone());
                    state.defaults.insert(purpose, id);
                }
                _ => warn!(model_id = %id, purpose = %tag, "Dropping stale default"),
            }
        }

        let missing: Vec<Purpose> = state
            .purposes
            .iter()
            .filter(|p| !state.defaults.contains_key(*p))
            .cloned()
            .collect();
        for purpose in missing {
            state.recompute_default(&purpose);
        }

        state
    }

    pub fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Highest scoring eligible record, later registration on ties.
    pub fn best_for(&self, purpose: &Purpose) -> Option<&RegistrationRecord> {
        self.records
            .values()
            .filter(|r| r.is_eligible_for(purpose))
            .fold(None, |best: Option<&RegistrationRecord>, candidate| match best {
                Some(current) if !candidate.outranks(current, purpose) => Some(current),
                _ => Some(candidate),
            })
    }

    pub fn recompute_default(&mut self, purpose: &Purpose) {
        match self.best_for(purpose).map(|r| r.model_id.clone()) {
            Some(id) => {
                if self.defaults.get(purpose) != Some(&id) {
                    info!(model_id = %id, purpose = %purpose, "Default changed");
                }
                self.defaults.insert(purpose.clone(), id);
            }
            None => {
                if self.defaults.remove(purpose).is_some() {
                    info!(purpose = %purpose, "Purpose no longer has a default");
                }
            }
        }
    }

    /// Stores `record` and updates defaults for every purpose it touches,
    /// old and new. `previous` is the record it replaces, if any.
    ///
    /// An explicitly chosen default stays in place while its record remains
    /// eligible and its score does not drop, and is only displaced by a record
    /// whose score, eligibility or registration changed.
    pub fn upsert(&mut self, record: RegistrationRecord, previous: Option<&RegistrationRecord>) {
        let id = record.model_id.clone();
        let mut touched: BTreeSet<Purpose> = record.purposes.iter().cloned().collect();
        if let Some(previous) = previous {
            touched.extend(previous.purposes.iter().cloned());
        }
        self.purposes.extend(record.purposes.iter().cloned());
        self.records.insert(id.clone(), record);

        for purpose in touched {
            self.reevaluate(&purpose, &id, previous);
        }
    }

    fn reevaluate(&mut self, purpose: &Purpose, id: &str, previous: Option<&RegistrationRecord>) {
        let Some(candidate) = self.records.get(id) else {
            self.recompute_default(purpose);
            return;
        };

        let Some(current_id) = self.defaults.get(purpose) else {
            self.recompute_default(purpose);
            return;
        };

        if current_id == id {
            let old_score = previous.map_or(0.0, |p| p.score_for(purpose));
            if candidate.is_eligible_for(purpose) && candidate.score_for(purpose) >= old_score {
                debug!(model_id = %id, purpose = %purpose, "Default kept");
            } else {
                self.recompute_default(purpose);
            }
            return;
        }

        let standing_unchanged = previous.is_some_and(|p| {
            p.is_eligible_for(purpose)
                && p.score_for(purpose) == candidate.score_for(purpose)
                && p.registration_seq == candidate.registration_seq
        });

        match self.records.get(current_id) {
            Some(current) if current.is_eligible_for(purpose) => {
                if standing_unchanged {
                    debug!(model_id = %id, purpose = %purpose, "Standing unchanged, default kept");
                } else if candidate.is_eligible_for(purpose) && candidate.outranks(current, purpose) {
                    info!(
                        model_id = %id,
                        purpose = %purpose,
                        previous = %current_id,
                        "Default changed"
                    );
                    self.defaults.insert(purpose.clone(), id.to_string());
                }
            }
            _ => self.recompute_default(purpose),
        }
    }

    /// Removes a record and recomputes every purpose it was default for.
    pub fn remove(&mut self, id: &str) -> Option<RegistrationRecord> {
        let removed = self.records.remove(id)?;
        let orphaned: Vec<Purpose> = self
            .defaults
            .iter()
            .filter(|(_, default_id)| default_id.as_str() == id)
            .map(|(purpose, _)| purpose.clone())
            .collect();
        for purpose in orphaned {
            self.recompute_default(&purpose);
        }
        Some(removed)
    }

    /// Default index in its persisted shape.
    pub fn default_index(&self) -> BTreeMap<String, String> {
        self.defaults
            .iter()
            .map(|(purpose, id)| (purpose.to_string(), id.clone()))
            .collect()
    }
}
