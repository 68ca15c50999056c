use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::chunk::split_text;
use crate::embed::Embedder;
use crate::error::{DocError, Result};
use crate::store::{Chunk, VectorStore};

/// Sentinel returned when no document has been ingested for the session.
/// The orchestrator checks `has_document` first; this is the defensive
/// fallback, not the primary gate.
pub const NO_DOCUMENT: &str =
    "No PDF has been uploaded for this session. Please upload a PDF first.";

/// Sentinel returned when similarity search comes back empty.
pub const NOT_FOUND: &str =
    "I couldn't find relevant information in the provided PDF. Please try a different question.";

const TOP_K: usize = 8;

/// Phrasings that ask what the document is about in general. Similarity
/// search against these returns poor results, so they route to a structured
/// begin/middle/end sample instead.
const OVERVIEW_PATTERNS: [&str; 4] = [
    "about the pdf",
    "what's in this document",
    "tell me about this document",
    "what is this pdf about",
];

/// Owns uploaded files and the per-session vector indexes.
pub struct DocumentManager {
    upload_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    indexes: DashMap<String, VectorStore>,
}

impl DocumentManager {
    pub fn new(upload_dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let upload_dir = upload_dir.into();
        std::fs::create_dir_all(&upload_dir)?;
        Ok(Self {
            upload_dir,
            embedder,
            indexes: DashMap::new(),
        })
    }

    /// Ingest an uploaded PDF: persist it, extract its text, chunk, embed,
    /// and index. Replaces any previous document for the session. Returns
    /// the number of chunks indexed.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn process_file(&self, session_id: &str, bytes: Vec<u8>) -> Result<usize> {
        let stored = self
            .upload_dir
            .join(format!("{session_id}-{}.pdf", Uuid::new_v4()));
        tokio::fs::write(&stored, &bytes).await?;
        debug!(path = %stored.display(), "upload written to disk");

        // pdf parsing is CPU-bound — keep it off the async workers
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| DocError::Parse(e.to_string()))?
            .map_err(|e| DocError::Parse(e.to_string()))?;

        info!(chars = text.len(), "pdf text extracted");
        self.ingest_text(session_id, &text).await
    }

    /// Chunk, embed, and index already-extracted text for a session.
    pub async fn ingest_text(&self, session_id: &str, text: &str) -> Result<usize> {
        let pieces = split_text(text);
        if pieces.is_empty() {
            return Err(DocError::Parse(
                "document contains no extractable text".to_string(),
            ));
        }

        let embeddings = self.embedder.embed(&pieces).await?;
        if embeddings.len() != pieces.len() {
            return Err(DocError::Parse(format!(
                "embedding count mismatch: {} chunks, {} vectors",
                pieces.len(),
                embeddings.len()
            )));
        }

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| Chunk { text, embedding })
            .collect();
        let count = chunks.len();
        self.indexes
            .insert(session_id.to_string(), VectorStore::new(chunks));
        info!(session = %session_id, chunks = count, "document indexed");
        Ok(count)
    }

    pub fn has_document(&self, session_id: &str) -> bool {
        self.indexes.contains_key(session_id)
    }

    /// Return excerpt text for a query against the session's document.
    ///
    /// Overview-style questions get a begin/middle/end sample; everything
    /// else gets the top-8 similar chunks separated by blank lines.
    #[instrument(skip(self))]
    pub async fn search(&self, session_id: &str, query: &str) -> Result<String> {
        if !self.has_document(session_id) {
            return Ok(NO_DOCUMENT.to_string());
        }

        if is_overview_query(query) {
            debug!("overview query — returning document sample");
            return Ok(self
                .indexes
                .get(session_id)
                .map(|index| index.overview_sample())
                .unwrap_or_else(|| NO_DOCUMENT.to_string()));
        }

        // Embed before re-acquiring the index so no map ref is held across
        // the network call.
        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vec = vectors
            .into_iter()
            .next()
            .ok_or_else(|| DocError::Parse("embeddings API returned no vector".to_string()))?;

        let Some(index) = self.indexes.get(session_id) else {
            return Ok(NO_DOCUMENT.to_string());
        };
        let hits = index.search(&query_vec, TOP_K);
        debug!(hits = hits.len(), "similarity search complete");
        if hits.is_empty() {
            return Ok(NOT_FOUND.to_string());
        }
        Ok(hits.join("\n\n"))
    }

    /// Remove stored files and indexes for one session, or for every session
    /// when `session_id` is `None`.
    #[instrument(skip(self))]
    pub async fn cleanup(&self, session_id: Option<&str>) -> Result<()> {
        match session_id {
            Some(id) => {
                self.indexes.remove(id);
                self.remove_files(Some(&format!("{id}-"))).await?;
                info!(session = %id, "session documents cleaned up");
            }
            None => {
                self.indexes.clear();
                self.remove_files(None).await?;
                info!("all documents cleaned up");
            }
        }
        Ok(())
    }

    async fn remove_files(&self, prefix: Option<&str>) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.upload_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let matches = prefix.map(|p| name.starts_with(p)).unwrap_or(true);
            if matches {
                if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                    warn!(file = %name, error = %e, "failed to remove upload");
                }
            }
        }
        Ok(())
    }
}

fn is_overview_query(query: &str) -> bool {
    let q = query.to_lowercase();
    OVERVIEW_PATTERNS.iter().any(|p| q.contains(p))
}
