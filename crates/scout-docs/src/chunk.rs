//! Recursive character text splitter.
//!
//! Splits document text on a separator ladder (paragraph → line → word →
//! character), then greedily merges the pieces back into chunks of at most
//! `CHUNK_SIZE` bytes with `CHUNK_OVERLAP` bytes carried between adjacent
//! chunks so retrieval hits keep their surrounding context.

use std::collections::VecDeque;

pub const CHUNK_SIZE: usize = 1500;
pub const CHUNK_OVERLAP: usize = 500;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Split `text` into retrieval chunks using the default size and overlap.
pub fn split_text(text: &str) -> Vec<String> {
    split_with(text, &SEPARATORS, CHUNK_SIZE, CHUNK_OVERLAP)
}

fn split_with(text: &str, separators: &[&str], size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= size {
        return vec![text.to_string()];
    }

    let (sep, rest) = match separators.split_first() {
        Some((s, r)) => (*s, r),
        None => return hard_split(text, size, overlap),
    };
    if sep.is_empty() {
        return hard_split(text, size, overlap);
    }

    // Pieces still over the limit fall through to the next separator.
    let mut units: Vec<String> = Vec::new();
    for piece in text.split(sep) {
        if piece.is_empty() {
            continue;
        }
        if piece.len() > size {
            units.extend(split_with(piece, rest, size, overlap));
        } else {
            units.push(piece.to_string());
        }
    }

    merge_units(units, sep, size, overlap)
}

/// Greedy merge with overlap carry-over.
///
/// Invariant maintained: `total` always equals the joined byte length of
/// `current` (unit lengths plus one separator between each pair).
fn merge_units(units: Vec<String>, sep: &str, size: usize, overlap: usize) -> Vec<String> {
    let sep_len = sep.len();
    let mut chunks: Vec<String> = Vec::new();
    let mut current: VecDeque<String> = VecDeque::new();
    let mut total = 0usize;

    for unit in units {
        let added = unit.len() + if current.is_empty() { 0 } else { sep_len };
        if total + added > size && !current.is_empty() {
            chunks.push(join(&current, sep));
            // Shed leading units until the retained tail fits the overlap
            // budget and leaves room for the incoming unit.
            while total > overlap || (total + unit.len() + sep_len > size && total > 0) {
                match current.pop_front() {
                    Some(front) => {
                        total -= front.len() + if current.is_empty() { 0 } else { sep_len };
                    }
                    None => break,
                }
            }
        }
        if !current.is_empty() {
            total += sep_len;
        }
        total += unit.len();
        current.push_back(unit);
    }

    if !current.is_empty() {
        chunks.push(join(&current, sep));
    }
    chunks
}

fn join(units: &VecDeque<String>, sep: &str) -> String {
    units.iter().cloned().collect::<Vec<_>>().join(sep)
}

/// Last-resort split at character boundaries with a sliding overlap window.
fn hard_split(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = size.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("just a short paragraph");
        assert_eq!(chunks, vec!["just a short paragraph"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("").is_empty());
    }

    #[test]
    fn paragraphs_stay_whole_when_they_fit() {
        let para = "word ".repeat(100); // 500 bytes
        let text = format!("{para}\n\n{para}\n\n{para}\n\n{para}");
        let chunks = split_text(&text);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.len() <= CHUNK_SIZE, "chunk of {} bytes", c.len());
        }
    }

    #[test]
    fn adjacent_chunks_share_overlap() {
        let text = (0..400)
            .map(|i| format!("sentence number {i} carries some context."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = split_text(&text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            // the tail of one chunk reappears at the head of the next
            let tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count().saturating_sub(40))
                .collect();
            assert!(
                pair[1].contains(tail.split_whitespace().next().unwrap_or("")),
                "no shared context between adjacent chunks"
            );
        }
    }

    #[test]
    fn unbroken_run_falls_back_to_char_split() {
        let text = "x".repeat(4000);
        let chunks = split_text(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.len() <= CHUNK_SIZE);
        }
    }
}
