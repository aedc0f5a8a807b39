//! "Out of stock" marker detection.

/// True when the lower-cased document contains any marker phrase.
///
/// Plain substring containment, no word boundaries. Markers are expected
/// to be lower-cased already.
pub fn is_out_of_stock(text_lower: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|m| !m.is_empty() && text_lower.contains(m.as_str()))
}

/// Lower-case a document and check it against the markers.
pub fn document_out_of_stock(document: &str, markers: &[String]) -> bool {
    !markers.is_empty() && is_out_of_stock(&document.to_lowercase(), markers)
}
