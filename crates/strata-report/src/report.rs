//! The validation report and its canonicalization cache.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufReader, BufWriter, Cursor, Write};

use serde_json::Value;
use tempfile::NamedTempFile;

use strata_canonical::{
    pump, sort_document, CanonicalError, CanonicalWriter, CountingWriter, DocumentCodec,
    DocumentSource, Lexer, SortCheckingSource, SortLimits, TokenSource, DEFAULT_MAX_KEY_MEMORY,
};
use strata_idref::{IdRefNode, IdReference, RelabelingSource};

use crate::errors::ReportError;
use crate::extract::{extract, Extraction};
use crate::selection::{MetadataSelection, SubsetSelection};
use crate::tempfiles::TempFileManager;

/// Where the canonical bytes currently live.
enum CanonicalCache {
    /// Not canonicalized yet, or the cache was invalidated.
    Unchecked,
    /// The relabeled document is already canonical; serve it by streaming
    /// from the original source, no copy is kept.
    Streamed,
    /// Sorted canonical bytes held in memory.
    Memory(Vec<u8>),
    /// Sorted canonical bytes spilled to a temp file. Deleted on drop.
    Disk(NamedTempFile),
}

/// What canonicalization observed about the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalSummary {
    /// True when the relabeled document was already in canonical key order.
    pub already_canonical: bool,
    /// Size of the canonical form in bytes.
    pub bytes: u64,
}

/// The result of validating one typed document, and the engine that carries
/// the document from validation to durable storage.
///
/// Reports own no thread state; each is safe to move to its own worker.
pub struct ValidationReport {
    type_id: String,
    errors: Vec<String>,
    document: Box<dyn DocumentSource + Send + Sync>,
    subset_selection: SubsetSelection,
    metadata_selection: MetadataSelection,
    id_refs: Vec<IdReference>,
    tree: IdRefNode,
    mapping: Option<BTreeMap<String, String>>,
    cache: CanonicalCache,
    summary: Option<CanonicalSummary>,
}

impl ValidationReport {
    /// Builds a report from the validator's output for one document.
    pub fn new(
        document: Box<dyn DocumentSource + Send + Sync>,
        type_id: impl Into<String>,
        errors: Vec<String>,
        subset_selection: SubsetSelection,
        metadata_selection: MetadataSelection,
        id_refs: Vec<IdReference>,
    ) -> Self {
        let tree = IdRefNode::build(&id_refs);
        Self {
            type_id: type_id.into(),
            errors,
            document,
            subset_selection,
            metadata_selection,
            id_refs,
            tree,
            mapping: None,
            cache: CanonicalCache::Unchecked,
            summary: None,
        }
    }

    /// True when validation produced no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Validation error messages, empty for a valid document.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Fully qualified id of the schema the document was validated against.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Identifier occurrences in validator order.
    pub fn id_references(&self) -> &[IdReference] {
        &self.id_refs
    }

    /// Identifier occurrences bucketed by nesting depth, shallow to deep.
    pub fn id_references_by_depth(&self) -> Vec<Vec<&IdReference>> {
        self.tree.grouped_by_depth()
    }

    /// Distinct original identifiers, sorted.
    pub fn all_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.id_refs.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// The absolute-id mapping, once set.
    pub fn absolute_id_mapping(&self) -> Option<&BTreeMap<String, String>> {
        self.mapping.as_ref()
    }

    /// Result of the last canonicalization, if one completed.
    pub fn canonical_summary(&self) -> Option<CanonicalSummary> {
        self.summary
    }

    /// Fixes the original-id to absolute-id mapping for this report.
    ///
    /// May be called at most once; the mapping is part of the document's
    /// final identity. Setting it invalidates any canonical cache, since
    /// cached bytes were produced under the old (empty) mapping.
    pub fn set_absolute_id_mapping(
        &mut self,
        mapping: BTreeMap<String, String>,
    ) -> Result<(), ReportError> {
        if self.mapping.is_some() {
            return Err(ReportError::MappingAlreadySet);
        }
        for reference in &mut self.id_refs {
            reference.absolute_id = mapping.get(&reference.id).cloned();
        }
        self.tree = IdRefNode::build(&self.id_refs);
        self.mapping = Some(mapping);
        self.cache = CanonicalCache::Unchecked;
        self.summary = None;
        Ok(())
    }

    /// Opens a token source over the relabeled document.
    fn open_relabeled(&self) -> Result<Box<dyn TokenSource + '_>, CanonicalError> {
        let inner = self.document.open()?;
        match &self.mapping {
            Some(mapping) if !mapping.is_empty() => {
                Ok(Box::new(RelabelingSource::new(inner, &self.tree, mapping)))
            }
            _ => Ok(inner),
        }
    }

    /// Opens a token source over the canonical form: the cache when one
    /// exists, the relabeled original otherwise.
    fn open_canonical_source(&self) -> Result<Box<dyn TokenSource + '_>, CanonicalError> {
        match &self.cache {
            CanonicalCache::Memory(bytes) => Ok(Box::new(Lexer::new(
                Cursor::new(bytes.as_slice()),
                DocumentCodec::STANDARD,
            ))),
            CanonicalCache::Disk(file) => Ok(Box::new(Lexer::new(
                BufReader::new(file.reopen()?),
                DocumentCodec::STANDARD,
            ))),
            CanonicalCache::Streamed | CanonicalCache::Unchecked => self.open_relabeled(),
        }
    }

    /// Produces (or reuses) the canonical form of the relabeled document.
    ///
    /// One streaming pass measures the relabeled size and checks key order.
    /// Already-canonical documents are served by re-streaming; nothing is
    /// cached for them. Otherwise the document is sorted in memory when its
    /// measured size is at most `max_in_memory` or when no temp-file
    /// facility is available, and spilled to disk through `tempfiles`
    /// otherwise. Invalid reports are a no-op.
    pub fn ensure_canonicalized(
        &mut self,
        tempfiles: Option<&TempFileManager>,
        max_in_memory: u64,
    ) -> Result<CanonicalSummary, ReportError> {
        if !self.is_valid() {
            return Ok(CanonicalSummary {
                already_canonical: true,
                bytes: 0,
            });
        }
        if let Some(summary) = self.summary {
            return Ok(summary);
        }

        let (size, sorted) = {
            let mut source = SortCheckingSource::new(self.open_relabeled()?);
            let mut counting = CountingWriter::sink();
            let mut writer = CanonicalWriter::new(&mut counting);
            pump(&mut source, &mut writer)?;
            (counting.written(), source.is_sorted())
        };
        let summary = CanonicalSummary {
            already_canonical: sorted,
            bytes: size,
        };
        if sorted {
            self.cache = CanonicalCache::Streamed;
            self.summary = Some(summary);
            return Ok(summary);
        }

        // The key bound only matters when everything stays in memory; with
        // a spill facility the payload is already off-heap.
        let limits = SortLimits {
            max_key_memory: if tempfiles.is_some() {
                None
            } else {
                Some(DEFAULT_MAX_KEY_MEMORY)
            },
        };
        let cache = match tempfiles {
            Some(tfm) if size > max_in_memory => {
                let spill = tfm.create("sortinp", ".json")?;
                {
                    let mut source = self.open_relabeled()?;
                    let mut writer = CanonicalWriter::new(BufWriter::new(spill.as_file()));
                    pump(&mut source, &mut writer)?;
                }
                let mut input = spill.reopen()?;
                let sorted_file = tfm.create("sortout", ".json")?;
                {
                    let mut out = BufWriter::new(sorted_file.as_file());
                    sort_document(&mut input, &mut out, limits, DocumentCodec::STANDARD)?;
                    out.flush()?;
                }
                // The unsorted spill is deleted here; only the sorted file
                // lives as long as the report.
                drop(spill);
                CanonicalCache::Disk(sorted_file)
            }
            _ => {
                let mut relabeled = Vec::with_capacity(size as usize);
                {
                    let mut source = self.open_relabeled()?;
                    let mut writer = CanonicalWriter::new(&mut relabeled);
                    pump(&mut source, &mut writer)?;
                }
                let mut sorted_bytes = Vec::with_capacity(size as usize);
                sort_document(
                    &mut Cursor::new(relabeled),
                    &mut sorted_bytes,
                    limits,
                    DocumentCodec::STANDARD,
                )?;
                CanonicalCache::Memory(sorted_bytes)
            }
        };
        self.cache = cache;
        self.summary = Some(summary);
        Ok(summary)
    }

    /// A write-once handle over the canonical bytes.
    pub fn writable(&self) -> Writable<'_> {
        Writable { report: self }
    }

    /// Extracts the schema-designated searchable subset, bounded by
    /// `max_bytes`. Invalid reports yield an empty object.
    pub fn extract_subset(&self, max_bytes: u64) -> Result<Value, ReportError> {
        if !self.is_valid() {
            return Ok(Extraction::default().subset);
        }
        let mut source = self.open_canonical_source()?;
        let extraction = extract(&mut *source, &self.subset_selection, None, max_bytes)?;
        Ok(extraction.subset)
    }

    /// Extracts subset and metadata in one pass, bounded by `max_bytes`.
    /// Invalid reports yield an empty extraction.
    pub fn extract_subset_and_metadata(&self, max_bytes: u64) -> Result<Extraction, ReportError> {
        if !self.is_valid() {
            return Ok(Extraction::default());
        }
        let mut source = self.open_canonical_source()?;
        Ok(extract(
            &mut *source,
            &self.subset_selection,
            Some(&self.metadata_selection),
            max_bytes,
        )?)
    }

    /// Materializes the relabeled document as a JSON value, without
    /// touching the canonical cache. Intended for small documents only.
    pub fn relabeled_value(&self) -> Result<Value, ReportError> {
        let mut source = self.open_relabeled()?;
        let mut writer = CanonicalWriter::new(Vec::new());
        pump(&mut source, &mut writer)?;
        let bytes = writer.finish()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation report for {}: ", self.type_id)?;
        if self.is_valid() {
            write!(
                f,
                "valid, {} identifier occurrence(s)",
                self.id_refs.len()
            )
        } else {
            write!(f, "invalid, {} error(s)", self.errors.len())?;
            for error in &self.errors {
                write!(f, "\n\t{error}")?;
            }
            Ok(())
        }
    }
}

impl fmt::Debug for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationReport")
            .field("type_id", &self.type_id)
            .field("errors", &self.errors.len())
            .field("id_refs", &self.id_refs.len())
            .field("mapping_set", &self.mapping.is_some())
            .finish()
    }
}

/// Streams a report's canonical bytes to any sink.
///
/// Serves from the cache when one exists; otherwise the relabeled document
/// is re-streamed, which is only canonical if [`ValidationReport::ensure_canonicalized`]
/// reported it already sorted.
pub struct Writable<'r> {
    report: &'r ValidationReport,
}

impl Writable<'_> {
    /// Writes the canonical bytes to `out`, returning the byte count.
    /// Invalid reports write nothing.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<u64, ReportError> {
        let report = self.report;
        if !report.is_valid() {
            return Ok(0);
        }
        match &report.cache {
            CanonicalCache::Memory(bytes) => {
                out.write_all(bytes)?;
                Ok(bytes.len() as u64)
            }
            CanonicalCache::Disk(file) => {
                let mut reader = BufReader::new(file.reopen()?);
                Ok(io::copy(&mut reader, out)?)
            }
            CanonicalCache::Streamed | CanonicalCache::Unchecked => {
                let mut source = report.open_relabeled()?;
                let mut counting = CountingWriter::new(out);
                let mut writer = CanonicalWriter::new(&mut counting);
                pump(&mut source, &mut writer)?;
                Ok(counting.written())
            }
        }
    }
}
