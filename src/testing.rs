//! Generated PDFs for tests and benches

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Build a PDF whose pages have the given `(width, height)` media boxes.
///
/// Page widths double as identities when checking page order.
pub fn pdf_with_pages(sizes: &[(f32, f32)]) -> lopdf::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for &(width, height) in sizes {
        let content = Content {
            operations: vec![
                Operation::new(
                    "rg",
                    vec![Object::Real(0.2), Object::Real(0.4), Object::Real(0.8)],
                ),
                Operation::new(
                    "re",
                    vec![
                        Object::Integer(10),
                        Object::Integer(10),
                        Object::Real(width / 2.0),
                        Object::Real(height / 2.0),
                    ],
                ),
                Operation::new("f", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width),
                Object::Real(height),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {},
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => sizes.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Fixture"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Pages of a PDF in order, as object ids
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// MediaBox width of a page
pub fn page_width(doc: &Document, page_id: ObjectId) -> Option<f32> {
    let page = doc.get_dictionary(page_id).ok()?;
    let media_box = page.get(b"MediaBox").and_then(Object::as_array).ok()?;
    media_box.get(2)?.as_float().ok()
}

/// `/Rotate` of a page, 0 when absent
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    doc.get_dictionary(page_id)
        .and_then(|page| page.get(b"Rotate"))
        .and_then(Object::as_i64)
        .unwrap_or(0)
}

/// Widths of every page, in order
pub fn page_widths(doc: &Document) -> Vec<f32> {
    page_ids(doc)
        .into_iter()
        .filter_map(|id| page_width(doc, id))
        .collect()
}

/// `/Rotate` of every page, in order
pub fn page_rotations(doc: &Document) -> Vec<i64> {
    page_ids(doc)
        .into_iter()
        .map(|id| page_rotation(doc, id))
        .collect()
}
