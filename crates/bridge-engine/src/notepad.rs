//! Notepad file I/O (§4.3, design note §9): "files, not databases... write-temp
//! and rename for durability." Reads are a single-reader-per-cycle plain read;
//! writes (appends from the model, or a clear from the HTTP surface) go
//! through a temp file and an atomic rename.

use std::path::Path;

use tokio::io::AsyncWriteExt;

pub async fn read(path: &str) -> std::io::Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Replace the notepad's contents entirely via write-temp-and-rename.
pub async fn write_all(path: &str, content: &str) -> std::io::Result<()> {
    let target = Path::new(path);
    let tmp_path = target.with_extension("tmp");

    {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
    }

    tokio::fs::rename(&tmp_path, target).await
}

/// Append to the notepad, read-modify-write through the same durable path.
pub async fn append(path: &str, addition: &str) -> std::io::Result<()> {
    let current = read(path).await?;
    let updated = if current.is_empty() {
        addition.to_string()
    } else {
        format!("{current}\n{addition}")
    };
    write_all(path, &updated).await
}

/// Truncate the notepad to empty (`POST /api/clear-notepad/`, §6).
pub async fn clear(path: &str) -> std::io::Result<()> {
    write_all(path, "").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let content = read("/nonexistent/notepad.txt").await.unwrap();
        assert_eq!(content, "");
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notepad.txt");
        let path = path.to_str().unwrap();

        write_all(path, "remember the key").await.unwrap();
        assert_eq!(read(path).await.unwrap(), "remember the key");
    }

    #[tokio::test]
    async fn append_joins_with_a_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notepad.txt");
        let path = path.to_str().unwrap();

        append(path, "first").await.unwrap();
        append(path, "second").await.unwrap();
        assert_eq!(read(path).await.unwrap(), "first\nsecond");
    }

    #[tokio::test]
    async fn clear_truncates_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notepad.txt");
        let path = path.to_str().unwrap();

        write_all(path, "something").await.unwrap();
        clear(path).await.unwrap();
        assert_eq!(read(path).await.unwrap(), "");
    }
}
