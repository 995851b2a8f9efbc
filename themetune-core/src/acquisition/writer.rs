use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::source::ThemeBody;
use crate::error::{Result, ThemeError};

/// Stream `body` into `target` via a sibling temp file, renaming into place
/// only once the whole body has been written and synced. Returns the number
/// of bytes written.
///
/// Errors from the body stream are returned unchanged so callers can tell
/// transfer failures from local write failures.
pub async fn write_atomically(target: &Path, mut body: ThemeBody) -> Result<u64> {
    let tmp = temp_path_for(target)?;

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, target).await?;
        Ok::<_, ThemeError>(written)
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let file_name = target.file_name().ok_or_else(|| {
        ThemeError::InvalidInput(format!("download target has no file name: {}", target.display()))
    })?;
    let tmp_name = format!(
        ".{}.part-{}",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    );
    Ok(target.with_file_name(tmp_name))
}
