use super::{fail, remove_created};
use crate::console::{CONTINUE_PROMPT, Console};
use crate::family::{self, Family, PETKOVI_ID};
use cloudseed_cloud::{
    CleanupPolicy, Collection, CollectionSpec, DatabaseSpec, DocumentService, Filter, Outcome,
    ResourceRef, RunReport, StepFailure, ensure,
};
use serde_json::Value;

const DELETE_PROMPT: &str = "Press any key to delete database...";

/// Inputs of the family registry walkthrough
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub database: String,
    pub collection: String,
    pub keep_database: bool,
    pub cleanup: CleanupPolicy,
}

pub async fn handle(
    docs: &dyn DocumentService,
    console: &Console,
    options: &DocumentOptions,
) -> anyhow::Result<RunReport> {
    match run(docs, console, options).await {
        Ok(report) => {
            tracing::debug!(summary = %report.summary(), "Family registry walkthrough finished");
            Ok(report)
        }
        Err(failure) => {
            remove_created(&failure.report, options.cleanup, |resource| async move {
                match resource {
                    ResourceRef::Database { id } => docs.delete_database(&id).await,
                    _ => Ok(()),
                }
            })
            .await;
            Err(failure.into())
        }
    }
}

/// Provision the registry, seed both families, read one back three ways
pub async fn run(
    docs: &dyn DocumentService,
    console: &Console,
    options: &DocumentOptions,
) -> Result<RunReport, StepFailure> {
    let mut report = RunReport::new();
    let database = options.database.as_str();
    let collection = options.collection.as_str();
    let database_ref = ResourceRef::Database {
        id: database.to_string(),
    };

    let provisioned = ensure(
        || docs.find_database(database),
        |spec: DatabaseSpec| async move { docs.create_database(&spec).await },
        DatabaseSpec::new(database),
    )
    .await
    .map_err(fail("create-database", &report))?;
    report.record_provisioned("create-database", &provisioned, database_ref.clone());

    if provisioned.was_created() {
        console
            .status(format!("{} created!", database))
            .map_err(fail("create-database", &report))?;
        console
            .pause(CONTINUE_PROMPT)
            .map_err(fail("create-database", &report))?;
    }

    let provisioned = ensure(
        || docs.find_collection(database, collection),
        |spec: CollectionSpec| async move { docs.create_collection(database, &spec).await },
        CollectionSpec::new(collection),
    )
    .await
    .map_err(fail("create-collection", &report))?;
    report.record_provisioned(
        "create-collection",
        &provisioned,
        ResourceRef::Collection {
            database: database.to_string(),
            id: collection.to_string(),
        },
    );

    if provisioned.was_created() {
        console
            .status(format!("{} created!", collection))
            .map_err(fail("create-collection", &report))?;
        console
            .pause(CONTINUE_PROMPT)
            .map_err(fail("create-collection", &report))?;
    }

    let families = Collection::new(docs, database, collection);

    for family in family::seed() {
        let id = family.id.clone();
        let provisioned = ensure(
            || families.find::<Family>(&id),
            |family: Family| async move { families.insert(&family).await },
            family,
        )
        .await
        .map_err(fail("seed", &report))?;
        report.record_provisioned(
            "seed",
            &provisioned,
            ResourceRef::Document {
                database: database.to_string(),
                collection: collection.to_string(),
                id,
            },
        );
    }

    let by_sql: Vec<Value> = families
        .query_sql(&format!(
            "SELECT * FROM Families f WHERE f.id = \"{}\"",
            PETKOVI_ID
        ))
        .await
        .map_err(fail("query-sql", &report))?;
    report.record(
        "query-sql",
        Outcome::Queried { rows: by_sql.len() },
        ResourceRef::Collection {
            database: database.to_string(),
            id: collection.to_string(),
        },
    );
    print_rows(console, &by_sql, "SQL").map_err(fail("query-sql", &report))?;

    let by_filter: Vec<Value> = families
        .query_filter(Filter::eq("id", PETKOVI_ID))
        .await
        .map_err(fail("query-filter", &report))?;
    report.record(
        "query-filter",
        Outcome::Queried {
            rows: by_filter.len(),
        },
        ResourceRef::Collection {
            database: database.to_string(),
            id: collection.to_string(),
        },
    );
    print_rows(console, &by_filter, "filter").map_err(fail("query-filter", &report))?;

    let by_closure: Vec<Value> = families
        .query_fn(|f| f.id().eq(PETKOVI_ID), |f| f.whole())
        .await
        .map_err(fail("query-fn", &report))?;
    report.record(
        "query-fn",
        Outcome::Queried {
            rows: by_closure.len(),
        },
        ResourceRef::Collection {
            database: database.to_string(),
            id: collection.to_string(),
        },
    );
    print_rows(console, &by_closure, "closure").map_err(fail("query-fn", &report))?;

    if options.keep_database {
        tracing::info!(database, "Keeping database");
        return Ok(report);
    }

    console
        .pause(DELETE_PROMPT)
        .map_err(fail("delete-database", &report))?;
    docs.delete_database(database)
        .await
        .map_err(fail("delete-database", &report))?;
    report.record("delete-database", Outcome::Deleted, database_ref);

    Ok(report)
}

/// Rows are printed as returned, system properties included
fn print_rows(console: &Console, rows: &[Value], form: &str) -> Result<(), cloudseed_cloud::CloudError> {
    for row in rows {
        console.line(format!("\tRead {} from {}", row, form))?;
    }
    Ok(())
}
