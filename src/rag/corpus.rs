use std::path::Path;

use super::chunker::Document;

/// Loads every `*.txt` file directly under `dir`, sorted by file name.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub async fn load_documents(dir: &Path) -> std::io::Result<Vec<Document>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    if names.is_empty() {
        tracing::warn!(dir = %dir.display(), "no .txt documents found");
    }

    let mut documents = Vec::with_capacity(names.len());
    for name in names {
        let bytes = tokio::fs::read(dir.join(&name)).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        documents.push(Document::new(name, text));
    }
    Ok(documents)
}
