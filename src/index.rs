use crate::document::{DocId, Product};
use crate::error::{Result, SearchError};
use crate::tokenizer::Tokenizer;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

/// One document's entry under a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: usize,
}

/// Inverted index: term -> postings, plus the length statistics BM25 needs.
///
/// Documents are appended with consecutive ids starting at 0, so every
/// posting list is sorted by `doc_id`. There is no update or delete path; a
/// built index is only read.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<usize>,
    total_length: usize,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index for a catalog, one document per product in order.
    ///
    /// Tokenization runs in parallel; postings are appended sequentially so
    /// the result does not depend on thread scheduling.
    pub fn build(products: &[Product], tokenizer: &Tokenizer) -> Result<Self> {
        let analyzed: Vec<(HashMap<String, usize>, usize)> = products
            .par_iter()
            .map(|product| {
                let tokens = tokenizer.analyze(&product.searchable_text());
                let length = tokens.len();
                let mut frequencies = HashMap::new();
                for token in tokens {
                    *frequencies.entry(token).or_insert(0) += 1;
                }
                (frequencies, length)
            })
            .collect();

        let mut index = Self::new();
        for (doc_id, (frequencies, length)) in analyzed.into_iter().enumerate() {
            index.add_document(doc_id, &frequencies, length)?;
        }

        Ok(index)
    }

    /// Tokenize `text` and add it as document `doc_id`.
    pub fn index_text(&mut self, doc_id: DocId, text: &str, tokenizer: &Tokenizer) -> Result<()> {
        let frequencies = tokenizer.analyze_with_frequencies(text);
        let length = frequencies.values().sum();
        self.add_document(doc_id, &frequencies, length)
    }

    /// Append a document's postings.
    ///
    /// `doc_id` must be the next unused id; this keeps posting lists sorted
    /// and rules out indexing the same document twice.
    pub fn add_document(
        &mut self,
        doc_id: DocId,
        frequencies: &HashMap<String, usize>,
        length: usize,
    ) -> Result<()> {
        let expected = self.doc_lengths.len();
        if doc_id != expected {
            return Err(SearchError::OutOfOrderDocument {
                expected,
                got: doc_id,
            });
        }

        for (term, &count) in frequencies {
            self.postings.entry(term.clone()).or_default().push(Posting {
                doc_id,
                term_frequency: count,
            });
        }

        self.doc_lengths.push(length);
        self.total_length += length;

        Ok(())
    }

    /// Postings for a term, empty when the term is unknown.
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of documents containing the term
    pub fn doc_frequency(&self, term: &str) -> usize {
        self.postings(term).len()
    }

    /// Occurrences of `term` in one document.
    pub fn term_frequency(&self, term: &str, doc_id: DocId) -> usize {
        let postings = self.postings(term);
        postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .map(|i| postings[i].term_frequency)
            .unwrap_or(0)
    }

    pub fn doc_length(&self, doc_id: DocId) -> Option<usize> {
        self.doc_lengths.get(doc_id).copied()
    }

    /// Mean token count over all indexed documents, 0 for an empty index.
    pub fn avg_doc_length(&self) -> f64 {
        if self.doc_lengths.is_empty() {
            0.0
        } else {
            self.total_length as f64 / self.doc_lengths.len() as f64
        }
    }

    pub fn total_documents(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_documents: self.total_documents(),
            total_terms: self.postings.len(),
            total_postings: self.postings.values().map(Vec::len).sum(),
            avg_doc_length: self.avg_doc_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_terms: usize,
    pub total_postings: usize,
    pub avg_doc_length: f64,
}
