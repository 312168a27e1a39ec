//! Byte-budgeted batch packing for extend requests.
//!
//! # Size accounting
//! A batch is serialized as `{"files":{"<path>":{"hash":"…","content":"…"},…}}`.
//! Its size is the request envelope, one comma between consecutive documents,
//! and the payload of every document:
//!
//! ```text
//! payload = len("\"hash\":\"\"") + 64          hash field
//!         + len("\"\":{}") + len(",\"content\":\"\"")
//!         + len(encoded path) + len(content)
//! ```
//!
//! JSON escaping of the content is not counted. The ceiling leaves 1 KiB of
//! headroom under 4 MiB for request framing.
//!
//! # Invariants
//! - Missing paths are consumed in the order given; batch boundaries are greedy.
//! - Every batch stays strictly under the ceiling unless it holds a single
//!   oversized document.
//! - Paths absent from the file set are skipped.

use crate::bundle::{BundleFile, FileMap};
use crate::hashing::CONTENT_HASH_HEX_LEN;
use std::collections::BTreeSet;

/// Upper bound (exclusive) for the serialized size of one batch.
pub const MAX_BATCH_BYTES: usize = 4 * 1024 * 1024 - 1024;

const REQUEST_ENVELOPE: &str = r#"{"files":{}}"#;
const PATH_KEY_FRAMING: &str = r#""":{}"#;
const HASH_FIELD_FRAMING: &str = r#""hash":"""#;
const CONTENT_FIELD_FRAMING: &str = r#","content":"""#;

/// Serialized size contributed by one document.
pub fn payload_size(encoded_path: &str, file: &BundleFile) -> usize {
    HASH_FIELD_FRAMING.len()
        + CONTENT_HASH_HEX_LEN
        + PATH_KEY_FRAMING.len()
        + CONTENT_FIELD_FRAMING.len()
        + encoded_path.len()
        + file.content.len()
}

/// One extend request worth of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    documents: FileMap,
    payload_bytes: usize,
}

impl Batch {
    /// Documents in this batch keyed by encoded path.
    pub const fn documents(&self) -> &FileMap {
        &self.documents
    }

    /// Consume the batch, yielding its documents.
    pub fn into_documents(self) -> FileMap {
        self.documents
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the batch holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Estimated serialized request size.
    pub fn serialized_size(&self) -> usize {
        if self.documents.is_empty() {
            return 0;
        }
        REQUEST_ENVELOPE.len() + (self.documents.len() - 1) + self.payload_bytes
    }

    fn size_with(&self, payload: usize) -> usize {
        REQUEST_ENVELOPE.len() + self.documents.len() + self.payload_bytes + payload
    }

    fn push(&mut self, path: &str, file: &BundleFile, payload: usize) {
        self.documents.insert(path.to_owned(), file.clone());
        self.payload_bytes += payload;
    }
}

/// Group `missing` paths into ordered batches under [`MAX_BATCH_BYTES`].
pub fn pack_batches(missing: &[String], files: &FileMap) -> Vec<Batch> {
    pack_with_ceiling(missing, files, MAX_BATCH_BYTES)
}

fn pack_with_ceiling(missing: &[String], files: &FileMap, ceiling: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = Batch::default();
    let mut seen = BTreeSet::new();

    for path in missing {
        let Some(file) = files.get(path) else {
            continue;
        };
        if !seen.insert(path.as_str()) {
            continue;
        }
        let payload = payload_size(path, file);
        if !current.is_empty() && current.size_with(payload) >= ceiling {
            batches.push(std::mem::take(&mut current));
        }
        current.push(path, file, payload);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn file_of_len(len: usize) -> BundleFile {
        BundleFile::from_raw(&vec![b'a'; len])
    }

    #[test]
    fn framing_constants_match_wire_format() {
        assert_eq!(REQUEST_ENVELOPE.len(), 12);
        assert_eq!(HASH_FIELD_FRAMING.len() + CONTENT_HASH_HEX_LEN, 73);
        assert_eq!(PATH_KEY_FRAMING.len() + CONTENT_FIELD_FRAMING.len(), 18);
    }

    #[test]
    fn estimate_matches_serialized_json_for_plain_content() -> Result<(), serde_json::Error> {
        let mut files = FileMap::new();
        files.insert("a.java".to_owned(), file_of_len(10));
        files.insert("dir/b%20c.java".to_owned(), file_of_len(3));
        let missing: Vec<String> = files.keys().cloned().collect();

        let batches = pack_batches(&missing, &files);
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        let json = serde_json::to_string(&serde_json::json!({ "files": batch.documents() }))?;
        assert_eq!(batch.serialized_size(), json.len());
        Ok(())
    }

    #[test]
    fn empty_missing_yields_no_batches() {
        let mut files = FileMap::new();
        files.insert("a.java".to_owned(), file_of_len(1));
        assert!(pack_batches(&[], &files).is_empty());
    }

    #[test]
    fn unknown_paths_are_skipped() {
        let files = FileMap::new();
        assert!(pack_batches(&["gone.java".to_owned()], &files).is_empty());
    }

    #[test]
    fn five_one_mebibyte_files_split_three_and_two() {
        let mut files = FileMap::new();
        let mut missing = Vec::new();
        for index in 0..5 {
            let path = format!("file{index}.java");
            files.insert(path.clone(), file_of_len(1024 * 1024));
            missing.push(path);
        }

        let batches = pack_batches(&missing, &files);
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![3, 2]);
        assert!(batches.iter().all(|b| b.serialized_size() < MAX_BATCH_BYTES));
    }

    #[test]
    fn oversized_document_gets_its_own_batch() {
        let mut files = FileMap::new();
        files.insert("small1".to_owned(), file_of_len(10));
        files.insert("huge".to_owned(), file_of_len(MAX_BATCH_BYTES));
        files.insert("small2".to_owned(), file_of_len(10));
        let missing = vec!["small1".to_owned(), "huge".to_owned(), "small2".to_owned()];

        let batches = pack_batches(&missing, &files);
        let keys: Vec<Vec<&str>> = batches
            .iter()
            .map(|b| b.documents().keys().map(String::as_str).collect())
            .collect();
        assert_eq!(keys, vec![vec!["small1"], vec!["huge"], vec!["small2"]]);
    }

    #[test]
    fn duplicate_missing_paths_are_packed_once() {
        let mut files = FileMap::new();
        files.insert("a".to_owned(), file_of_len(5));
        let batches = pack_batches(&["a".to_owned(), "a".to_owned()], &files);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].serialized_size(), 12 + payload_size("a", &files["a"]));
    }

    fn arb_files() -> impl Strategy<Value = (Vec<String>, FileMap)> {
        prop::collection::vec(0usize..5_000, 0..24).prop_map(|lengths| {
            let mut files = FileMap::new();
            let mut missing = Vec::new();
            for (index, len) in lengths.into_iter().enumerate() {
                let path = format!("src/f{index}.rs");
                files.insert(path.clone(), file_of_len(len));
                missing.push(path);
            }
            (missing, files)
        })
    }

    const TEST_CEILING: usize = 4_096;

    proptest! {
        #[test]
        fn batches_respect_the_ceiling((missing, files) in arb_files()) {
            for batch in pack_with_ceiling(&missing, &files, TEST_CEILING) {
                prop_assert!(batch.serialized_size() < TEST_CEILING || batch.len() == 1);
            }
        }

        #[test]
        fn packing_is_deterministic_ordered_and_complete((missing, files) in arb_files()) {
            let first = pack_with_ceiling(&missing, &files, TEST_CEILING);
            let second = pack_with_ceiling(&missing, &files, TEST_CEILING);
            prop_assert_eq!(&first, &second);

            let position = |path: &String| missing.iter().position(|p| p == path);
            let mut previous_max = None;
            let mut total = 0;
            for batch in &first {
                let indices: Vec<usize> = batch.documents().keys().filter_map(position).collect();
                total += indices.len();
                let min = indices.iter().min().copied();
                prop_assert!(previous_max < min);
                previous_max = indices.iter().max().copied();
            }
            prop_assert_eq!(total, missing.len());
        }

        #[test]
        fn batches_are_filled_greedily((missing, files) in arb_files()) {
            let batches = pack_with_ceiling(&missing, &files, TEST_CEILING);
            for pair in batches.windows(2) {
                let next_first = missing
                    .iter()
                    .find(|path| pair[1].documents().contains_key(*path));
                if let Some(path) = next_first {
                    let payload = payload_size(path, &files[path]);
                    prop_assert!(pair[0].serialized_size() + 1 + payload >= TEST_CEILING);
                }
            }
        }
    }
}
