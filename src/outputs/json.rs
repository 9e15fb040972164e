//! JSON digest output.
//!
//! # Output Structure
//!
//! Files are organized by date with edition names:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```
//!
//! A second run in the same edition overwrites the earlier file.

use crate::models::Digest;
use crate::utils::ensure_writable_dir;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the digest file for `digest` under `json_output_dir`.
pub fn digest_path(digest: &Digest, json_output_dir: &str) -> PathBuf {
    PathBuf::from(json_output_dir)
        .join(&digest.local_date)
        .join(format!("{}.json", digest.time_of_day))
}

/// Write a [`Digest`] to `{json_output_dir}/{date}/{time_of_day}.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, count = digest.items.len()))]
pub async fn write_digest(digest: &Digest, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    ensure_writable_dir(json_output_dir).await?;

    let path = digest_path(digest, json_output_dir);
    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    let json = serde_json::to_string_pretty(digest)?;
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON digest");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_digest_layout() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().to_str().unwrap();
        let digest = Digest {
            local_date: "2025-05-06".into(),
            time_of_day: "morning".into(),
            local_time: "07:30:00".into(),
            stale: false,
            items: vec![
                Item::new("wire", "Title", "https://example.com/a", "2 hours ago", "Sum", None).unwrap(),
            ],
        };

        let path = write_digest(&digest, out).await.unwrap();
        assert_eq!(path, dir.path().join("2025-05-06").join("morning.json"));

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(written["time_of_day"], "morning");
        assert_eq!(written["items"][0]["rawTime"], "2 hours ago");
        assert_eq!(written["items"][0]["imageUrl"], "placeholder");
    }
}
