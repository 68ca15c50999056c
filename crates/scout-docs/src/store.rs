/// One embedded chunk of an ingested document.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// In-memory per-session vector index: brute-force cosine search over the
/// document's chunks. Document sizes here (hundreds of chunks) don't warrant
/// an ANN structure.
#[derive(Debug, Default)]
pub struct VectorStore {
    chunks: Vec<Chunk>,
}

impl VectorStore {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top-`k` chunk texts by cosine similarity, most similar first.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<&str> {
        let mut scored: Vec<(f32, &str)> = self
            .chunks
            .iter()
            .map(|c| (cosine(query, &c.embedding), c.text.as_str()))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(k).map(|(_, t)| t).collect()
    }

    /// Structured begin/middle/end sample of the document.
    ///
    /// Used for overview-style questions where similarity search against a
    /// vague query ranks poorly.
    pub fn overview_sample(&self) -> String {
        let n = self.chunks.len();
        let sample = |range: std::ops::Range<usize>| {
            self.chunks[range]
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        let start = sample(0..n.min(2));
        let mid_at = n / 2;
        let middle = sample(mid_at..(mid_at + 2).min(n));
        let end = sample(n.saturating_sub(2)..n);

        format!(
            "Here's an overview of the PDF content:\n\n\
             From the beginning:\n{start}\n\n\
             From the middle:\n{middle}\n\n\
             From the end:\n{end}"
        )
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}
