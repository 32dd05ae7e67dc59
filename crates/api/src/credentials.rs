use std::path::Path;

/// Write the service-account key provided through the environment to the
/// file the Sheets client reads. Parent directories are created as needed.
pub async fn provision_credentials(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    tracing::info!(path = %path.display(), "Service-account credentials written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets").join("credentials.json");

        provision_credentials(&path, r#"{"client_email":"x"}"#)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"client_email":"x"}"#
        );
    }
}
