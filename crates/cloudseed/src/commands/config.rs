use cloudseed_config::{Settings, mask_secret};
use colored::Colorize;

/// Render resolved settings with secrets masked
pub fn render(settings: &Settings) -> String {
    let unset = || "(not set)".dimmed().to_string();
    let source = settings
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    // Connection strings embed the account key
    let connection_string = settings
        .storage
        .connection_string
        .as_deref()
        .map(mask_connection_string)
        .unwrap_or_else(unset);
    let endpoint = settings
        .documents
        .endpoint
        .clone()
        .unwrap_or_else(unset);
    let key = settings
        .documents
        .key
        .as_deref()
        .map(mask_secret)
        .unwrap_or_else(unset);

    [
        format!("{} {}", "Config:".bold(), source),
        String::new(),
        "storage".bold().to_string(),
        format!("  connection_string: {}", connection_string),
        format!("  container: {}", settings.storage.container.cyan()),
        "documents".bold().to_string(),
        format!("  endpoint: {}", endpoint),
        format!("  key: {}", key),
        format!("  database: {}", settings.documents.database.cyan()),
        format!("  collection: {}", settings.documents.collection.cyan()),
    ]
    .join("\n")
}

pub fn handle(settings: &Settings) {
    println!("{}", render(settings));
}

fn mask_connection_string(connection_string: &str) -> String {
    connection_string
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("AccountKey") => {
                format!("{}={}", key, mask_secret(value))
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}
