pub mod extract;
pub mod fields;
pub mod segment;

use crate::db::RecordRow;

/// Three-pass pipeline: PDF bytes → text → entry blobs → structured rows.
/// A document with no extractable text gives no rows.
pub fn records_from_pdf(bytes: &[u8]) -> lopdf::Result<Vec<RecordRow>> {
    let text = extract::text_from_pdf(bytes)?;
    Ok(segment::split_entries(&text)
        .iter()
        .map(|blob| fields::explode(blob))
        .collect())
}
