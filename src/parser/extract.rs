use lopdf::Document;
use tracing::debug;

/// Text of every page in order, one line break between pages.
///
/// Only an unloadable document is an error; a page whose content cannot be
/// decoded contributes nothing, and a document with no text layer gives "".
pub fn text_from_pdf(bytes: &[u8]) -> lopdf::Result<String> {
    let doc = Document::load_mem(bytes)?;

    let mut chunks = Vec::new();
    for page in doc.get_pages().into_keys() {
        match doc.extract_text(&[page]) {
            Ok(text) if !text.trim().is_empty() => chunks.push(text),
            Ok(_) => {}
            Err(e) => debug!(page, error = %e, "no text on page"),
        }
    }

    Ok(chunks.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::testing::pdf;

    #[test]
    fn pages_are_concatenated_in_order() {
        let bytes = pdf(&[&["First page entry"], &["Second page entry"]]);
        let text = text_from_pdf(&bytes).unwrap();
        let first = text.find("First page entry").unwrap();
        let second = text.find("Second page entry").unwrap();
        assert!(first < second);
        let between = &text[first..second];
        assert!(between.contains('\n'));
    }

    #[test]
    fn corrupt_bytes_are_an_error() {
        assert!(text_from_pdf(b"%PDF-1.5\ngarbage").is_err());
        assert!(text_from_pdf(&[]).is_err());
    }

    #[test]
    fn image_only_page_gives_empty_text() {
        let bytes = pdf(&[&[]]);
        assert_eq!(text_from_pdf(&bytes).unwrap(), "");
    }
}
