use super::{fail, remove_created};
use crate::console::{CONTINUE_PROMPT, Console};
use cloudseed_cloud::{
    BlobService, CleanupPolicy, CloudError, ContainerAccess, Outcome, ResourceRef, RunReport,
    StepFailure, ensure,
};
use std::path::PathBuf;

/// Inputs of the photo storage walkthrough
#[derive(Debug, Clone)]
pub struct BlobOptions {
    pub container: String,
    /// Defaults to the source file name
    pub blob_name: Option<String>,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub keep_container: bool,
    pub cleanup: CleanupPolicy,
}

impl BlobOptions {
    fn blob_name(&self) -> Result<String, CloudError> {
        if let Some(name) = &self.blob_name {
            return Ok(name.clone());
        }
        self.source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                CloudError::InvalidName(format!(
                    "cannot derive a blob name from '{}'",
                    self.source.display()
                ))
            })
    }
}

pub async fn handle(
    blobs: &dyn BlobService,
    console: &Console,
    options: &BlobOptions,
) -> anyhow::Result<RunReport> {
    match run(blobs, console, options).await {
        Ok(report) => {
            tracing::debug!(summary = %report.summary(), "Photo storage walkthrough finished");
            Ok(report)
        }
        Err(failure) => {
            remove_created(&failure.report, options.cleanup, |resource| async move {
                match resource {
                    ResourceRef::Container { name } => blobs.delete_container(&name).await,
                    _ => Ok(()),
                }
            })
            .await;
            Err(failure.into())
        }
    }
}

/// Create the container, round-trip one file through it, then delete it
pub async fn run(
    blobs: &dyn BlobService,
    console: &Console,
    options: &BlobOptions,
) -> Result<RunReport, StepFailure> {
    let mut report = RunReport::new();
    let container = options.container.as_str();
    let container_ref = ResourceRef::Container {
        name: container.to_string(),
    };

    let provisioned = ensure(
        || blobs.find_container(container),
        |name| blobs.create_container(name),
        container,
    )
    .await
    .map_err(fail("create-container", &report))?;
    report.record_provisioned("create-container", &provisioned, container_ref.clone());

    blobs
        .set_container_access(container, ContainerAccess::Blob)
        .await
        .map_err(fail("set-access", &report))?;
    report.record("set-access", Outcome::Configured, container_ref.clone());

    console
        .status(format!("{} created!", container))
        .map_err(fail("create-container", &report))?;
    console
        .pause(CONTINUE_PROMPT)
        .map_err(fail("create-container", &report))?;

    let blob = options.blob_name().map_err(fail("upload", &report))?;
    let blob_ref = ResourceRef::Blob {
        container: container.to_string(),
        name: blob.clone(),
    };

    let data = tokio::fs::read(&options.source)
        .await
        .map_err(fail("read-source", &report))?;
    blobs
        .upload_blob(container, &blob, data)
        .await
        .map_err(fail("upload", &report))?;
    report.record("upload", Outcome::Uploaded, blob_ref.clone());

    console
        .status(format!("{} uploaded!", blob))
        .map_err(fail("upload", &report))?;
    console
        .pause(CONTINUE_PROMPT)
        .map_err(fail("upload", &report))?;

    let data = blobs
        .download_blob(container, &blob)
        .await
        .map_err(fail("download", &report))?;
    tokio::fs::write(&options.destination, data)
        .await
        .map_err(fail("write-destination", &report))?;
    report.record("download", Outcome::Downloaded, blob_ref);

    console
        .status(format!(
            "{} downloaded to {}!",
            blob,
            options.destination.display()
        ))
        .map_err(fail("download", &report))?;
    console
        .pause(CONTINUE_PROMPT)
        .map_err(fail("download", &report))?;

    if options.keep_container {
        tracing::info!(container, "Keeping container");
        return Ok(report);
    }

    blobs
        .delete_container(container)
        .await
        .map_err(fail("delete-container", &report))?;
    report.record("delete-container", Outcome::Deleted, container_ref);

    console
        .status("Container deleted!")
        .map_err(fail("delete-container", &report))?;
    console
        .pause(CONTINUE_PROMPT)
        .map_err(fail("delete-container", &report))?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::testing::Captured;
    use cloudseed_cloud::MemoryBlobService;
    use std::fs;

    struct Fixture {
        dir: tempfile::TempDir,
        options: BlobOptions,
    }

    fn fixture(content: &[u8]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("DSC01432.JPG");
        fs::write(&source, content).unwrap();
        let options = BlobOptions {
            container: "photos".to_string(),
            blob_name: None,
            source,
            destination: dir.path().join("AzureBlobDownloadedCopy.JPG"),
            keep_container: false,
            cleanup: CleanupPolicy::Leave,
        };
        Fixture { dir, options }
    }

    #[tokio::test]
    async fn test_round_trip_and_teardown() {
        colored::control::set_override(false);
        let fx = fixture(b"\xff\xd8\xff\xe0 not really a jpeg");
        let blobs = MemoryBlobService::new();
        let captured = Captured::default();

        let report = run(&blobs, &captured.console(), &fx.options).await.unwrap();

        assert_eq!(
            fs::read(&fx.options.destination).unwrap(),
            b"\xff\xd8\xff\xe0 not really a jpeg"
        );
        assert!(blobs.find_container("photos").await.unwrap().is_none());
        assert!(report.created().is_empty());

        let outcomes: Vec<Outcome> = report.steps.iter().map(|s| s.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Created,
                Outcome::Configured,
                Outcome::Uploaded,
                Outcome::Downloaded,
                Outcome::Deleted
            ]
        );

        let text = captured.text();
        let expected = [
            "photos created!".to_string(),
            "DSC01432.JPG uploaded!".to_string(),
            format!(
                "DSC01432.JPG downloaded to {}!",
                fx.options.destination.display()
            ),
            "Container deleted!".to_string(),
        ];
        assert_eq!(text.lines().collect::<Vec<_>>(), expected);
        drop(fx.dir);
    }

    #[tokio::test]
    async fn test_existing_container_is_reused() {
        let mut fx = fixture(b"data");
        fx.options.keep_container = true;
        fx.options.blob_name = Some("renamed.bin".to_string());
        let blobs = MemoryBlobService::new();
        blobs.create_container("photos").await.unwrap();

        let report = run(&blobs, &Captured::default().console(), &fx.options)
            .await
            .unwrap();

        assert_eq!(report.steps[0].outcome, Outcome::Existing);
        let container = blobs.find_container("photos").await.unwrap().unwrap();
        assert_eq!(container.access, ContainerAccess::Blob);
        assert_eq!(
            blobs.download_blob("photos", "renamed.bin").await.unwrap(),
            b"data"
        );
    }

    #[tokio::test]
    async fn test_missing_source_fails_with_partial_report() {
        let mut fx = fixture(b"data");
        fx.options.source = fx.dir.path().join("missing.jpg");
        let blobs = MemoryBlobService::new();

        let failure = run(&blobs, &Captured::default().console(), &fx.options)
            .await
            .unwrap_err();

        assert_eq!(failure.step, "read-source");
        assert!(matches!(failure.source, CloudError::Io(_)));
        assert_eq!(failure.report.steps.len(), 2);
        assert_eq!(
            failure.report.created(),
            vec![&ResourceRef::Container {
                name: "photos".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_cleanup_on_failure_removes_created_container() {
        let mut fx = fixture(b"data");
        fx.options.source = fx.dir.path().join("missing.jpg");
        fx.options.cleanup = CleanupPolicy::RemoveCreated;
        let blobs = MemoryBlobService::new();

        let err = handle(&blobs, &Captured::default().console(), &fx.options)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("step 'read-source' failed"));
        assert_eq!(blobs.container_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_leaves_container_by_default() {
        let mut fx = fixture(b"data");
        fx.options.source = fx.dir.path().join("missing.jpg");
        let blobs = MemoryBlobService::new();

        handle(&blobs, &Captured::default().console(), &fx.options)
            .await
            .unwrap_err();

        assert_eq!(blobs.container_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_container_name() {
        let mut fx = fixture(b"data");
        fx.options.container = "My_Photos".to_string();
        let blobs = MemoryBlobService::new();

        let failure = run(&blobs, &Captured::default().console(), &fx.options)
            .await
            .unwrap_err();
        assert_eq!(failure.step, "create-container");
        assert!(matches!(failure.source, CloudError::InvalidName(_)));
        assert!(failure.report.steps.is_empty());
    }
}
