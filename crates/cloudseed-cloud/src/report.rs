//! Step records for a provisioning run

use crate::error::CloudError;
use crate::ensure::Provisioned;
use serde::{Deserialize, Serialize};

/// A remote resource touched by a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceRef {
    Container { name: String },
    Blob { container: String, name: String },
    Database { id: String },
    Collection { database: String, id: String },
    Document { database: String, collection: String, id: String },
}

impl ResourceRef {
    /// Whether deleting this resource removes everything beneath it
    pub fn is_top_level(&self) -> bool {
        matches!(self, ResourceRef::Container { .. } | ResourceRef::Database { .. })
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceRef::Container { name } => write!(f, "container {}", name),
            ResourceRef::Blob { container, name } => write!(f, "blob {}/{}", container, name),
            ResourceRef::Database { id } => write!(f, "database {}", id),
            ResourceRef::Collection { database, id } => write!(f, "collection {}/{}", database, id),
            ResourceRef::Document {
                database,
                collection,
                id,
            } => write!(f, "document {}/{}/{}", database, collection, id),
        }
    }
}

/// What a step did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Created by this run
    Created,
    /// Already present; nothing was created
    Existing,
    /// Settings changed on an existing resource
    Configured,
    Uploaded,
    Downloaded,
    Queried { rows: usize },
    Deleted,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Created => write!(f, "created"),
            Outcome::Existing => write!(f, "existing"),
            Outcome::Configured => write!(f, "configured"),
            Outcome::Uploaded => write!(f, "uploaded"),
            Outcome::Downloaded => write!(f, "downloaded"),
            Outcome::Queried { rows } => write!(f, "queried ({} rows)", rows),
            Outcome::Deleted => write!(f, "deleted"),
        }
    }
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step name (e.g. "create-container")
    pub name: String,
    pub outcome: Outcome,
    pub resource: ResourceRef,
}

/// Ordered record of every completed step in a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: impl Into<String>, outcome: Outcome, resource: ResourceRef) {
        self.steps.push(StepRecord {
            name: name.into(),
            outcome,
            resource,
        });
    }

    /// Record an ensure step as `Created` or `Existing`
    pub fn record_provisioned<T>(
        &mut self,
        name: impl Into<String>,
        provisioned: &Provisioned<T>,
        resource: ResourceRef,
    ) {
        let outcome = if provisioned.was_created() {
            Outcome::Created
        } else {
            Outcome::Existing
        };
        self.record(name, outcome, resource);
    }

    /// Resources created by this run that have not been deleted since, in creation order
    pub fn created(&self) -> Vec<&ResourceRef> {
        self.steps
            .iter()
            .filter(|s| s.outcome == Outcome::Created)
            .map(|s| &s.resource)
            .filter(|r| {
                !self
                    .steps
                    .iter()
                    .any(|s| s.outcome == Outcome::Deleted && &s.resource == *r)
            })
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        let count = |pred: fn(&Outcome) -> bool| self.steps.iter().filter(|s| pred(&s.outcome)).count();
        RunSummary {
            created: count(|o| *o == Outcome::Created),
            existing: count(|o| *o == Outcome::Existing),
            deleted: count(|o| *o == Outcome::Deleted),
            other: count(|o| {
                !matches!(o, Outcome::Created | Outcome::Existing | Outcome::Deleted)
            }),
        }
    }
}

/// Summary of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub existing: usize,
    pub deleted: usize,
    pub other: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} already existed, {} deleted, {} other steps",
            self.created, self.existing, self.deleted, self.other
        )
    }
}

/// What to do with resources created by a run that then fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Leave everything in place
    #[default]
    Leave,
    /// Delete the top-level resources this run created
    RemoveCreated,
}

/// A step failed; carries the steps that completed before it
#[derive(Debug, thiserror::Error)]
#[error("step '{step}' failed: {source}")]
pub struct StepFailure {
    pub step: String,
    #[source]
    pub source: CloudError,
    pub report: RunReport,
}

impl StepFailure {
    pub fn new(step: impl Into<String>, source: CloudError, report: RunReport) -> Self {
        Self {
            step: step.into(),
            source,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> ResourceRef {
        ResourceRef::Container {
            name: "photos".to_string(),
        }
    }

    fn blob() -> ResourceRef {
        ResourceRef::Blob {
            container: "photos".to_string(),
            name: "DSC01432.JPG".to_string(),
        }
    }

    #[test]
    fn test_created_excludes_deleted_resources() {
        let mut report = RunReport::new();
        report.record_provisioned("create-container", &Provisioned::Created(()), container());
        report.record("upload", Outcome::Uploaded, blob());
        assert_eq!(report.created(), vec![&container()]);

        report.record("delete-container", Outcome::Deleted, container());
        assert!(report.created().is_empty());
    }

    #[test]
    fn test_existing_resources_are_not_created() {
        let mut report = RunReport::new();
        report.record_provisioned("create-container", &Provisioned::Existing(()), container());
        assert!(report.created().is_empty());
        assert_eq!(report.steps[0].outcome, Outcome::Existing);
    }

    #[test]
    fn test_summary() {
        let mut report = RunReport::new();
        report.record("a", Outcome::Created, container());
        report.record("b", Outcome::Existing, container());
        report.record("c", Outcome::Queried { rows: 1 }, container());
        report.record("d", Outcome::Deleted, container());

        assert_eq!(
            report.summary().to_string(),
            "1 created, 1 already existed, 1 deleted, 1 other steps"
        );
    }

    #[test]
    fn test_top_level_resources() {
        assert!(container().is_top_level());
        assert!(!blob().is_top_level());
        assert_eq!(blob().to_string(), "blob photos/DSC01432.JPG");
    }

    #[test]
    fn test_step_failure_keeps_source() {
        use std::error::Error;

        let failure = StepFailure::new(
            "upload",
            CloudError::NotFound("container photos".to_string()),
            RunReport::new(),
        );
        assert_eq!(
            failure.to_string(),
            "step 'upload' failed: Resource not found: container photos"
        );
        assert!(failure.source().is_some());
    }
}
