pub mod blob;
pub mod config;
pub mod documents;

use cloudseed_cloud::{CleanupPolicy, CloudError, ResourceRef, RunReport, StepFailure};
use std::future::Future;
use tracing::{info, warn};

/// Wrap an error from `step` together with the steps completed so far
pub(crate) fn fail<'a, E: Into<CloudError>>(
    step: &'static str,
    report: &'a RunReport,
) -> impl FnOnce(E) -> StepFailure + 'a {
    move |err| StepFailure::new(step, err.into(), report.clone())
}

/// Apply `policy` to the top-level resources a failed run created
///
/// Resources go in reverse creation order. A failed removal is logged and
/// skipped; the caller still reports the step that failed.
pub(crate) async fn remove_created<F, Fut>(report: &RunReport, policy: CleanupPolicy, mut remove: F)
where
    F: FnMut(ResourceRef) -> Fut,
    Fut: Future<Output = cloudseed_cloud::Result<()>>,
{
    if policy == CleanupPolicy::Leave {
        return;
    }

    let created: Vec<ResourceRef> = report
        .created()
        .into_iter()
        .filter(|r| r.is_top_level())
        .cloned()
        .collect();

    for resource in created.into_iter().rev() {
        let label = resource.to_string();
        match remove(resource).await {
            Ok(()) => info!(resource = %label, "Removed after failed run"),
            Err(e) => warn!(resource = %label, error = %e, "Cleanup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudseed_cloud::Outcome;
    use std::sync::Mutex;

    fn report() -> RunReport {
        let mut report = RunReport::new();
        report.record(
            "create-database",
            Outcome::Created,
            ResourceRef::Database {
                id: "FamilyRegistry".to_string(),
            },
        );
        report.record(
            "create-collection",
            Outcome::Created,
            ResourceRef::Collection {
                database: "FamilyRegistry".to_string(),
                id: "FamilyCollection".to_string(),
            },
        );
        report
    }

    #[tokio::test]
    async fn test_leave_policy_removes_nothing() {
        let removed = Mutex::new(Vec::new());
        remove_created(&report(), CleanupPolicy::Leave, |r| {
            removed.lock().unwrap().push(r);
            async { Ok(()) }
        })
        .await;
        assert!(removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_created_only_touches_top_level() {
        let removed = Mutex::new(Vec::new());
        remove_created(&report(), CleanupPolicy::RemoveCreated, |r| {
            removed.lock().unwrap().push(r);
            async { Err(CloudError::NotFound("already gone".to_string())) }
        })
        .await;
        assert_eq!(
            *removed.lock().unwrap(),
            vec![ResourceRef::Database {
                id: "FamilyRegistry".to_string()
            }]
        );
    }

    #[test]
    fn test_fail_keeps_partial_report() {
        let report = report();
        let failure = fail("seed", &report)(CloudError::InvalidDocument("no id".to_string()));
        assert_eq!(failure.step, "seed");
        assert_eq!(failure.report.steps.len(), 2);
    }
}
