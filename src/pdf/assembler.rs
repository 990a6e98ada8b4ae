//! Multi-source PDF reassembly
//!
//! Builds a new document from an ordered list of page references that may
//! point into several uploaded sources. The operation is all-or-nothing:
//!
//! 1. Every distinct source is read and parsed, every page number checked.
//! 2. Only then are page objects copied (structurally, no re-rendering) into
//!    a fresh document, with `/Rotate` overwritten where a rotation is asked.
//! 3. The serialized bytes go through [`ArtifactStore::write`], which renames
//!    a finished temp file into place. A failure at any step leaves no output.

use std::collections::HashMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use super::error::AssemblyError;
use super::types::{AssemblyResult, PageReference};
use crate::storage::{ArtifactStore, Directory, StorageError};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `/Parent` chains in broken files
const MAX_TREE_DEPTH: usize = 64;

/// Builds output artifacts from stored sources
#[derive(Clone)]
pub struct DocumentAssembler {
    store: ArtifactStore,
}

impl DocumentAssembler {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Assemble `pages` in order and store the result as `output_name` in the
    /// output directory.
    pub async fn build(
        &self,
        pages: &[PageReference],
        output_name: &str,
    ) -> Result<AssemblyResult, AssemblyError> {
        if pages.is_empty() {
            return Err(AssemblyError::EmptyRequest);
        }

        let mut sources: HashMap<String, Vec<u8>> = HashMap::new();
        for reference in pages {
            if sources.contains_key(&reference.source_pdf) {
                continue;
            }
            let data = self
                .store
                .read(Directory::Sources, &reference.source_pdf)
                .await
                .map_err(|e| match e {
                    StorageError::NotFound(name) => AssemblyError::MissingSource(name),
                    StorageError::InvalidName(name) => AssemblyError::InvalidSourceName(name),
                    StorageError::Io(e) => AssemblyError::Build(e.to_string()),
                })?;
            sources.insert(reference.source_pdf.clone(), data);
        }

        let references = pages.to_vec();
        let bytes = tokio::task::spawn_blocking(move || assemble(&sources, &references))
            .await
            .map_err(|e| AssemblyError::Join(e.to_string()))??;

        let file_size = self
            .store
            .write(Directory::Outputs, output_name, &bytes)
            .await
            .map_err(AssemblyError::WriteFailure)?;

        tracing::info!(
            output = %output_name,
            pages = pages.len(),
            sources = count_distinct_sources(pages),
            size = file_size,
            "Assembled PDF"
        );

        Ok(AssemblyResult {
            page_count: pages.len(),
            file_size,
        })
    }
}

fn count_distinct_sources(pages: &[PageReference]) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for reference in pages {
        if !seen.contains(&reference.source_pdf.as_str()) {
            seen.push(&reference.source_pdf);
        }
    }
    seen.len()
}

/// A parsed source with its page count
struct LoadedSource {
    doc: Document,
    page_count: usize,
}

/// Assemble an in-memory PDF from `pages`, reading sources from `sources`.
///
/// Validates every reference before building anything.
pub fn assemble(
    sources: &HashMap<String, Vec<u8>>,
    pages: &[PageReference],
) -> Result<Vec<u8>, AssemblyError> {
    if pages.is_empty() {
        return Err(AssemblyError::EmptyRequest);
    }

    // Distinct sources in first-reference order
    let mut order: Vec<&str> = Vec::new();
    let mut loaded: HashMap<&str, LoadedSource> = HashMap::new();

    for reference in pages {
        let name = reference.source_pdf.as_str();
        if !loaded.contains_key(name) {
            let data = sources
                .get(name)
                .ok_or_else(|| AssemblyError::MissingSource(name.to_string()))?;
            let doc = Document::load_mem(data).map_err(|e| AssemblyError::Malformed {
                source_pdf: name.to_string(),
                reason: e.to_string(),
            })?;
            let page_count = doc.get_pages().len();
            order.push(name);
            loaded.insert(name, LoadedSource { doc, page_count });
        }

        let page_count = loaded[name].page_count;
        if reference.page_number == 0 || reference.page_number as usize > page_count {
            return Err(AssemblyError::PageOutOfRange {
                source_pdf: name.to_string(),
                page: reference.page_number,
                page_count,
            });
        }
    }

    let mut output = Document::with_version("1.7");
    let mut next_id = 1;
    let mut page_dicts: Vec<Option<Dictionary>> = vec![None; pages.len()];

    for name in order {
        let Some(mut source) = loaded.remove(name) else {
            continue;
        };

        // Give every source a disjoint id range before merging object tables
        source.doc.renumber_objects_with(next_id);
        next_id = source.doc.max_id + 1;

        let page_ids = source.doc.get_pages();
        for (slot, reference) in page_dicts.iter_mut().zip(pages) {
            if reference.source_pdf != name {
                continue;
            }
            let page_id = page_ids
                .get(&reference.page_number)
                .copied()
                .ok_or_else(|| AssemblyError::PageOutOfRange {
                    source_pdf: name.to_string(),
                    page: reference.page_number,
                    page_count: page_ids.len(),
                })?;
            *slot = Some(materialize_page(&source.doc, page_id).map_err(|e| {
                AssemblyError::Malformed {
                    source_pdf: name.to_string(),
                    reason: e.to_string(),
                }
            })?);
        }

        output.objects.extend(source.doc.objects);
    }

    output.max_id = next_id - 1;
    let pages_id = output.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (dict, reference) in page_dicts.into_iter().zip(pages) {
        let mut dict = dict.ok_or_else(|| AssemblyError::Build("page was not copied".into()))?;
        dict.set("Parent", pages_id);

        let rotation = reference.normalized_rotation();
        if rotation != 0 {
            dict.set("Rotate", rotation);
        }

        if !reference.unique_id.is_empty() {
            tracing::trace!(
                unique_id = %reference.unique_id,
                source = %reference.source_pdf,
                page = reference.page_number,
                rotation = rotation,
                "Copied page"
            );
        }

        kids.push(Object::Reference(output.add_object(dict)));
    }

    output.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );

    let catalog_id = output.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    output.trailer.set("Root", catalog_id);

    // Drop the source catalogs, page trees and unreferenced pages
    output.prune_objects();

    let mut buffer = Vec::new();
    output.save_to(&mut buffer).map_err(lopdf::Error::from)?;
    Ok(buffer)
}

/// Clone a page dictionary with its inherited attributes made explicit, so it
/// renders the same under a new parent.
fn materialize_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary, lopdf::Error> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    let mut parent = parent_of(&page);

    for _ in 0..MAX_TREE_DEPTH {
        let Some(parent_id) = parent else {
            break;
        };
        let node = doc.get_dictionary(parent_id)?;
        for key in INHERITABLE_KEYS {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        parent = parent_of(node);
    }

    Ok(page)
}

fn parent_of(dict: &Dictionary) -> Option<ObjectId> {
    dict.get(b"Parent").and_then(Object::as_reference).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing as fixtures;
    use tempfile::TempDir;

    fn sources(entries: &[(&str, Vec<u8>)]) -> HashMap<String, Vec<u8>> {
        entries
            .iter()
            .map(|(name, data)| (name.to_string(), data.clone()))
            .collect()
    }

    fn three_pages() -> Vec<u8> {
        fixtures::pdf_with_pages(&[(100.0, 500.0), (200.0, 500.0), (300.0, 500.0)]).unwrap()
    }

    #[test]
    fn test_pages_follow_request_order() {
        let sources = sources(&[("a.pdf", three_pages())]);
        let pages = vec![
            PageReference::new("a.pdf", 3, 0),
            PageReference::new("a.pdf", 1, 0),
            PageReference::new("a.pdf", 2, 0),
        ];

        let bytes = assemble(&sources, &pages).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let widths = fixtures::page_widths(&doc);

        assert_eq!(widths, vec![300.0, 100.0, 200.0]);
    }

    #[test]
    fn test_multiple_sources_and_repeats() {
        let other = fixtures::pdf_with_pages(&[(400.0, 500.0), (500.0, 500.0)]).unwrap();
        let sources = sources(&[("a.pdf", three_pages()), ("b.pdf", other)]);
        let pages = vec![
            PageReference::new("b.pdf", 2, 0),
            PageReference::new("a.pdf", 1, 0),
            PageReference::new("b.pdf", 2, 0),
            PageReference::new("a.pdf", 3, 0),
        ];

        let bytes = assemble(&sources, &pages).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let widths = fixtures::page_widths(&doc);

        assert_eq!(widths, vec![500.0, 100.0, 500.0, 300.0]);
    }

    #[test]
    fn test_rotation_is_written_normalized() {
        let sources = sources(&[("a.pdf", three_pages())]);
        let pages = vec![
            PageReference::new("a.pdf", 1, 450),
            PageReference::new("a.pdf", 2, 90),
            PageReference::new("a.pdf", 3, 360),
        ];

        let bytes = assemble(&sources, &pages).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let rotations = fixtures::page_rotations(&doc);

        assert_eq!(rotations, vec![90, 90, 0]);
    }

    #[test]
    fn test_out_of_range_page() {
        let sources = sources(&[("a.pdf", three_pages())]);
        let pages = vec![
            PageReference::new("a.pdf", 1, 0),
            PageReference::new("a.pdf", 4, 0),
        ];

        let result = assemble(&sources, &pages);
        assert!(matches!(
            result,
            Err(AssemblyError::PageOutOfRange { page: 4, page_count: 3, .. })
        ));

        let zero = assemble(&sources, &[PageReference::new("a.pdf", 0, 0)]);
        assert!(matches!(zero, Err(AssemblyError::PageOutOfRange { page: 0, .. })));
    }

    #[test]
    fn test_missing_and_malformed_sources() {
        let sources = sources(&[("a.pdf", three_pages()), ("bad.pdf", b"nope".to_vec())]);

        let missing = assemble(&sources, &[PageReference::new("zzz.pdf", 1, 0)]);
        assert!(matches!(missing, Err(AssemblyError::MissingSource(name)) if name == "zzz.pdf"));

        let malformed = assemble(
            &sources,
            &[PageReference::new("a.pdf", 1, 0), PageReference::new("bad.pdf", 1, 0)],
        );
        assert!(matches!(malformed, Err(AssemblyError::Malformed { .. })));
    }

    #[test]
    fn test_inherited_media_box_is_materialized() {
        // Page tree where MediaBox lives only on the /Pages node
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(250),
                    Object::Integer(400),
                ],
                "Rotate" => 180,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();

        let sources = sources(&[("inherit.pdf", data)]);
        let bytes = assemble(&sources, &[PageReference::new("inherit.pdf", 1, 0)]).unwrap();
        let out = Document::load_mem(&bytes).unwrap();
        let id = fixtures::page_ids(&out)[0];

        assert_eq!(fixtures::page_width(&out, id), Some(250.0));
        // Rotation 0 keeps whatever the source page had
        assert_eq!(fixtures::page_rotation(&out, id), 180);
    }

    #[tokio::test]
    async fn test_build_writes_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("uploads"), temp_dir.path().join("output"));
        store.ensure_dirs().await.unwrap();
        store.write(Directory::Sources, "a.pdf", &three_pages()).await.unwrap();

        let assembler = DocumentAssembler::new(store.clone());
        let pages = vec![PageReference::new("a.pdf", 2, 90), PageReference::new("a.pdf", 1, 0)];
        let result = assembler.build(&pages, "abc12345_out.pdf").await.unwrap();

        assert_eq!(result.page_count, 2);
        let stored = store.stat(Directory::Outputs, "abc12345_out.pdf").await.unwrap();
        assert_eq!(stored.size, result.file_size);
    }

    #[tokio::test]
    async fn test_build_failure_leaves_no_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("uploads"), temp_dir.path().join("output"));
        store.ensure_dirs().await.unwrap();
        store.write(Directory::Sources, "a.pdf", &three_pages()).await.unwrap();

        let assembler = DocumentAssembler::new(store.clone());
        let pages = vec![
            PageReference::new("a.pdf", 1, 0),
            PageReference::new("a.pdf", 9, 0),
            PageReference::new("a.pdf", 2, 0),
        ];
        let result = assembler.build(&pages, "abc12345_out.pdf").await;
        assert!(matches!(result, Err(AssemblyError::PageOutOfRange { .. })));

        let missing = assembler
            .build(&[PageReference::new("gone.pdf", 1, 0)], "abc12345_out.pdf")
            .await;
        assert!(matches!(missing, Err(AssemblyError::MissingSource(_))));

        assert!(store.list(Directory::Outputs).await.unwrap().is_empty());
    }
}
