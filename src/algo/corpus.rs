//! Sparse `index:count` document format.
//!
//! One line per document, each a comma-separated list of `index:count`
//! pairs with 1-based word indices. Absent words count zero. The result is
//! a dense word × document [`CountMatrix`].

use std::path::Path;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::algo::nmf::CountMatrix;
use crate::error::{NmfError, Result};

/// Largest dense matrix the loader will allocate (2 GiB of `f64`).
pub const MAX_CELLS: usize = 1 << 28;

/// One parsed document: (0-based word index, count) pairs in line order.
pub type SparseDoc = Vec<(usize, f64)>;

/// Parse a single document line. `line_no` is 1-based and only used for errors.
///
/// A blank line is a document with no words.
pub fn parse_line(line: &str, line_no: usize) -> Result<SparseDoc> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    line.split(',')
        .map(|pair| -> Result<(usize, f64)> {
            let pair = pair.trim();
            let (idx, cnt) = pair
                .split_once(':')
                .ok_or_else(|| NmfError::parse(line_no, format!("expected 'index:count', got '{pair}'")))?;
            let idx: usize = idx
                .trim()
                .parse()
                .map_err(|e| NmfError::parse(line_no, format!("bad word index '{idx}': {e}")))?;
            if idx == 0 {
                return Err(NmfError::parse(line_no, "word indices are 1-based, got 0"));
            }
            let cnt: u64 = cnt
                .trim()
                .parse()
                .map_err(|e| NmfError::parse(line_no, format!("bad count '{cnt}': {e}")))?;
            Ok((idx - 1, cnt as f64))
        })
        .collect()
}

/// Parse a whole document file body into a word × document matrix.
///
/// * `n_words` - Vocabulary size. `None` infers it from the largest index.
pub fn parse_counts(text: &str, n_words: Option<usize>) -> Result<CountMatrix> {
    let lines: Vec<&str> = text.lines().collect();
    let docs: Vec<SparseDoc> = lines
        .par_iter()
        .enumerate()
        .map(|(i, line)| parse_line(line, i + 1))
        .collect::<Result<_>>()?;

    // (1-based index, 1-based line) of the largest word index
    let widest = docs
        .iter()
        .enumerate()
        .flat_map(|(i, doc)| doc.iter().map(move |&(idx, _)| (idx + 1, i + 1)))
        .max_by_key(|&(idx, _)| idx);

    let rows = match n_words {
        Some(n) => {
            if let Some((line, idx)) = docs.iter().enumerate().find_map(|(i, doc)| {
                doc.iter()
                    .find(|&&(idx, _)| idx >= n)
                    .map(|&(idx, _)| (i + 1, idx + 1))
            }) {
                return Err(NmfError::parse(
                    line,
                    format!("word index {idx} exceeds vocabulary size {n}"),
                ));
            }
            n
        }
        None => widest.map_or(0, |(idx, _)| idx),
    };

    if rows.checked_mul(docs.len()).map_or(true, |cells| cells > MAX_CELLS) {
        let message = format!(
            "{rows} words x {} documents exceeds the {MAX_CELLS}-cell limit",
            docs.len()
        );
        return Err(match (n_words, widest) {
            (None, Some((_, line))) => NmfError::parse(line, message),
            _ => NmfError::invalid_dimension(message),
        });
    }

    let mut x = Array2::<f64>::zeros((rows, docs.len()));
    for (doc, pairs) in docs.iter().enumerate() {
        // Repeated indices: last one wins
        for &(word, count) in pairs {
            x[[word, doc]] = count;
        }
    }

    let matrix = CountMatrix::new(x)?;
    let empty = matrix.empty_documents();
    if !empty.is_empty() {
        warn!(count = empty.len(), "documents without any words");
    }
    debug!(
        words = matrix.n_words(),
        docs = matrix.n_docs(),
        nnz = matrix.nnz(),
        "parsed count matrix"
    );
    Ok(matrix)
}

/// Load a document file from disk.
pub fn load_counts(path: impl AsRef<Path>, n_words: Option<usize>) -> Result<CountMatrix> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_counts(&text, n_words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_basic() {
        let doc = parse_line("1:3,4:1, 2 : 7", 1).unwrap();
        assert_eq!(doc, vec![(0, 3.0), (3, 1.0), (1, 7.0)]);
    }

    #[test]
    fn parse_line_blank_is_empty_doc() {
        assert!(parse_line("   ", 1).unwrap().is_empty());
    }

    #[test]
    fn parse_line_rejects_zero_index() {
        let err = parse_line("0:2", 5).unwrap_err();
        assert!(matches!(err, NmfError::Parse { line: 5, .. }));
    }

    #[test]
    fn parse_line_rejects_missing_colon() {
        assert!(parse_line("3", 1).is_err());
    }

    #[test]
    fn parse_line_rejects_negative_count() {
        assert!(parse_line("3:-1", 1).is_err());
    }

    #[test]
    fn parse_line_rejects_fractional_count() {
        assert!(parse_line("3:1.5", 1).is_err());
    }

    #[test]
    fn parse_counts_words_by_documents() {
        let x = parse_counts("1:2,3:1\n2:5\n", None).unwrap();
        assert_eq!(x.dim(), (3, 2));
        let v = x.view();
        assert_eq!(v[[0, 0]], 2.0);
        assert_eq!(v[[2, 0]], 1.0);
        assert_eq!(v[[1, 1]], 5.0);
        assert_eq!(v[[0, 1]], 0.0);
    }

    #[test]
    fn parse_counts_explicit_vocab_size() {
        let x = parse_counts("1:1\n2:1", Some(10)).unwrap();
        assert_eq!(x.dim(), (10, 2));
    }

    #[test]
    fn parse_counts_index_out_of_range() {
        let err = parse_counts("1:1\n9:1", Some(4)).unwrap_err();
        assert!(matches!(err, NmfError::Parse { line: 2, .. }), "{err}");
    }

    #[test]
    fn parse_counts_blank_line_is_zero_column() {
        let x = parse_counts("1:1\n\n2:1", None).unwrap();
        assert_eq!(x.n_docs(), 3);
        assert_eq!(x.empty_documents(), vec![1]);
    }

    #[test]
    fn parse_counts_last_duplicate_wins() {
        let x = parse_counts("1:1,1:4", None).unwrap();
        assert_eq!(x.view()[[0, 0]], 4.0);
    }

    #[test]
    fn parse_counts_reports_bad_line_number() {
        let err = parse_counts("1:1\n2:1\n2;1", None).unwrap_err();
        assert!(matches!(err, NmfError::Parse { line: 3, .. }));
    }

    #[test]
    fn parse_counts_huge_index_is_error() {
        let err = parse_counts("18446744073709551615:1", None).unwrap_err();
        assert!(matches!(err, NmfError::Parse { line: 1, .. }), "{err}");

        let err = parse_counts("1:1\n2:1\n1000000000:1", None).unwrap_err();
        assert!(matches!(err, NmfError::Parse { line: 3, .. }), "{err}");
    }

    #[test]
    fn parse_counts_huge_explicit_size_is_error() {
        assert!(matches!(
            parse_counts("1:1", Some(usize::MAX)),
            Err(NmfError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn parse_counts_empty_input() {
        assert!(matches!(
            parse_counts("", None),
            Err(NmfError::InvalidDimension { .. })
        ));
    }
}
