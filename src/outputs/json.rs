//! JSON snapshot output for the static site.
//!
//! The snapshot is a pretty-printed JSON array written wholesale on every
//! run; any existing file at the path is replaced.
//!
//! # Output Structure
//!
//! ```text
//! public/
//! └── hot.json
//! ```

use crate::models::FeedItem;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write the snapshot to `path`, creating missing parent directories.
///
/// # Errors
///
/// Returns an error if directory creation, serialization, or the file write
/// fails. Callers treat this as fatal.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_snapshot(items: &[FeedItem], path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(items)?;

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        info!(dir = %dir.display(), "Ensuring output directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create output dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(count = items.len(), "Wrote snapshot");

    Ok(())
}
