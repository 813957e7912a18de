// Identifier list loading (arguments and/or a file)

use anyhow::{Context, Result};
use eligibility_core::domain::Identifier;
use std::path::Path;

/// Merge positional identifiers with the contents of `file`.
///
/// The file holds one identifier per line; blank lines and `#` comments are
/// skipped. Order is preserved and duplicates are kept.
pub async fn load_identifiers(args: &[String], file: Option<&Path>) -> Result<Vec<Identifier>> {
    let mut raw: Vec<String> = args.to_vec();

    if let Some(path) = file {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        raw.extend(parse_lines(&contents));
    }

    if raw.is_empty() {
        anyhow::bail!("No identifiers given (pass them as arguments or with --file)");
    }

    Identifier::parse_all(raw).context("Invalid identifier")
}

fn parse_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
