use super::*;
use tempfile::TempDir;

#[test]
fn extracts_plain_text_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("notes.txt");
    std::fs::write(&path, "Field guide to African mammals.").expect("should write file");

    let document = extract_text(&path).expect("extraction should succeed");
    assert_eq!(document.text, "Field guide to African mammals.");
    assert_eq!(document.source, path);
}

#[test]
fn extracts_markdown_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("notes.md");
    std::fs::write(&path, "# Mammals\n\nLions and zebras.").expect("should write file");

    let document = extract_text(&path).expect("extraction should succeed");
    assert!(document.text.contains("Lions"));
}

#[test]
fn missing_file_is_fatal() {
    let result = extract_text(Path::new("/nonexistent/guide.pdf"));
    assert!(matches!(result, Err(PdfChatError::Extraction(_))));
}

#[test]
fn empty_file_is_fatal() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("empty.txt");
    std::fs::write(&path, "   \n\t  ").expect("should write file");

    let result = extract_text(&path);
    assert!(matches!(result, Err(PdfChatError::Extraction(_))));
}

#[test]
fn unsupported_extension_is_fatal() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("guide.docx");
    std::fs::write(&path, "not really a docx").expect("should write file");

    let result = extract_text(&path);
    assert!(matches!(result, Err(PdfChatError::Extraction(_))));
}
