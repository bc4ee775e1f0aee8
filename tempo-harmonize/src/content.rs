//! Applying harmonization to stored content.
//!
//! Records are rewritten one at a time without a surrounding transaction. A
//! partially applied bulk run is safe to repeat because harmonized timestamps
//! harmonize to themselves.

use crate::{HarmonizationEngine, ImpactReport};
use serde::Serialize;
use std::collections::BTreeMap;
use tempo_core::{TempoResult, TemporalContent, TemporalField, Timestamp};
use tempo_storage::{TemporalContentRepository, TemporalUpdate};
use tracing::{info, warn};

/// Old and new value of one temporal field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub old: Timestamp,
    pub new: Timestamp,
}

/// Outcome of harmonizing a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarmonizationResult {
    pub success: bool,
    /// Fields whose harmonized value differs from the stored one.
    pub changes: BTreeMap<TemporalField, FieldChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HarmonizationResult {
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    fn update(&self) -> TemporalUpdate {
        TemporalUpdate {
            start_time: self.changes.get(&TemporalField::StartTime).map(|c| c.new),
            end_time: self.changes.get(&TemporalField::EndTime).map(|c| c.new),
        }
    }
}

/// Result for one record of a bulk pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordHarmonization {
    pub collection: String,
    pub id: i64,
    #[serde(flatten)]
    pub result: HarmonizationResult,
}

/// Summary of a harmonization pass over every monitored record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkHarmonizationReport {
    pub examined: usize,
    pub changed: usize,
    pub failed: usize,
    /// Changed or failed records only, in scan order.
    pub results: Vec<RecordHarmonization>,
}

/// Harmonizes records and writes the results back through the repository.
pub struct ContentHarmonizer {
    engine: HarmonizationEngine,
    repository: TemporalContentRepository,
}

impl ContentHarmonizer {
    pub fn new(engine: HarmonizationEngine, repository: TemporalContentRepository) -> Self {
        Self { engine, repository }
    }

    pub fn engine(&self) -> &HarmonizationEngine {
        &self.engine
    }

    /// Compute harmonized start/end values and persist them unless `dry_run`.
    ///
    /// Store failures are reported through `success = false`, never returned.
    pub fn harmonize_content(
        &self,
        content: &TemporalContent,
        dry_run: bool,
    ) -> HarmonizationResult {
        let mut changes = BTreeMap::new();
        for field in TemporalField::ALL {
            if let Some(old) = content.temporal_value(field) {
                let new = self.engine.harmonize(old);
                if new != old {
                    changes.insert(field, FieldChange { old, new });
                }
            }
        }

        let mut result = HarmonizationResult {
            success: true,
            changes,
            error: None,
        };
        let update = result.update();
        if dry_run || update.is_empty() {
            return result;
        }

        if let Err(e) = self.repository.store().update_temporal_fields(
            &content.collection_name,
            content.id,
            update,
        ) {
            warn!(
                collection = %content.collection_name,
                id = content.id,
                error = %e,
                "Failed to persist harmonized timestamps"
            );
            result.success = false;
            result.error = Some(e.to_string());
        }
        result
    }

    /// Harmonize every record of the variant, continuing past failures.
    pub fn harmonize_all(
        &self,
        workspace_id: i64,
        language_id: i64,
        dry_run: bool,
    ) -> TempoResult<BulkHarmonizationReport> {
        let mut report = BulkHarmonizationReport::default();

        for content in self.repository.find_all(workspace_id, language_id)? {
            report.examined += 1;
            let result = self.harmonize_content(&content, dry_run);
            if !result.success {
                report.failed += 1;
            } else if result.is_changed() {
                report.changed += 1;
            } else {
                continue;
            }
            report.results.push(RecordHarmonization {
                collection: content.collection_name.clone(),
                id: content.id,
                result,
            });
        }

        info!(
            workspace_id,
            language_id,
            dry_run,
            examined = report.examined,
            changed = report.changed,
            failed = report.failed,
            "Harmonization pass complete"
        );
        Ok(report)
    }

    /// Impact of harmonizing every stored start/end timestamp of the variant.
    pub fn impact(&self, workspace_id: i64, language_id: i64) -> TempoResult<ImpactReport> {
        let timestamps: Vec<Timestamp> = self
            .repository
            .find_all(workspace_id, language_id)?
            .iter()
            .flat_map(|c| [c.start_time, c.end_time])
            .flatten()
            .collect();
        Ok(self.engine.calculate_impact(&timestamps))
    }
}
