use super::*;
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use tempfile::TempDir;

fn build_pdf(pages_text: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages_text {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content should encode"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).expect("page count fits");
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf should serialize");
    bytes
}

#[test]
fn missing_pdf_fails_fast() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let missing = temp_dir.path().join("FAQ-Arabic.pdf");

    let err = extract_text_from_pdf(&missing).expect_err("missing file should fail");
    assert!(matches!(err, FaqError::Ingestion(_)));
    assert!(err.to_string().contains("FAQ-Arabic.pdf"));
}

#[test]
fn invalid_pdf_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("broken.pdf");
    std::fs::write(&path, b"not a pdf").expect("should write file");

    assert!(extract_text_from_pdf(&path).is_err());
}

#[test]
fn pages_are_read_in_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("faq.pdf");
    std::fs::write(&path, build_pdf(&["Opening hours", "Library location"]))
        .expect("should write pdf");

    let text = extract_text_from_pdf(&path).expect("text should be extracted");

    let first = text.find("Opening").expect("first page text present");
    let second = text.find("Library").expect("second page text present");
    assert!(first < second);
}

#[test]
fn extract_from_memory() {
    let text = extract_text_from_bytes(&build_pdf(&["Hello"])).expect("text should be extracted");
    assert!(text.contains("Hello"));
}
