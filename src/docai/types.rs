//! Wire types for batch recognition jobs and their output documents.

use serde::Deserialize;

/// Structured description of one recognized document, as written to a job output file.
///
/// The recognizer emits a full text blob plus layout metadata; each paragraph references
/// its span of the blob through a text anchor rather than carrying the text itself.
#[derive(Debug, Deserialize)]
pub struct RecognizedDocument {
    /// Full text blob covering the whole output file.
    #[serde(default)]
    pub text: String,
    /// Per-page layout metadata in document order.
    #[serde(default)]
    pub pages: Vec<DocumentPage>,
}

/// One page of a recognized document.
#[derive(Debug, Deserialize)]
pub struct DocumentPage {
    /// Paragraphs detected on the page, in reading order.
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

/// One detected paragraph.
#[derive(Debug, Deserialize)]
pub struct Paragraph {
    /// Layout metadata anchoring the paragraph into the text blob.
    #[serde(default)]
    pub layout: Option<ParagraphLayout>,
}

/// Layout metadata for a paragraph.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphLayout {
    /// Anchor locating the paragraph text within the blob.
    #[serde(default)]
    pub text_anchor: Option<TextAnchor>,
}

/// Reference into the document text blob.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnchor {
    /// Byte spans making up the anchored text.
    #[serde(default)]
    pub text_segments: Vec<TextSegment>,
}

/// One byte span of the text blob.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    /// Span start, absent on spans beginning at offset zero.
    #[serde(default)]
    pub start_index: Option<TextIndex>,
    /// Span end, absent on spans running to the end of the blob.
    #[serde(default)]
    pub end_index: Option<TextIndex>,
}

/// Byte offset into the text blob.
///
/// The service serializes 64-bit offsets as JSON strings; small documents come back with
/// plain numbers. Both spellings decode to the same offset.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TextIndex {
    /// Offset written as a JSON number.
    Number(u64),
    /// Offset written as a decimal string.
    Text(String),
}

impl TextIndex {
    /// Interpret the index as a byte offset, if representable.
    pub fn as_offset(&self) -> Option<usize> {
        match self {
            TextIndex::Number(value) => usize::try_from(*value).ok(),
            TextIndex::Text(value) => value.parse().ok(),
        }
    }
}

impl RecognizedDocument {
    /// Resolve every paragraph against the text blob, in document order.
    ///
    /// Offsets are clamped to the blob length; a span that still fails to resolve (for
    /// example one not on a character boundary) yields an empty string, and so does a
    /// paragraph without any anchored segment. Every paragraph keeps its place in the
    /// resolved sequence.
    pub fn paragraph_texts(&self) -> Vec<&str> {
        let blob_len = self.text.len();
        let mut resolved = Vec::new();

        for page in &self.pages {
            for paragraph in &page.paragraphs {
                let Some(segment) = paragraph
                    .layout
                    .as_ref()
                    .and_then(|layout| layout.text_anchor.as_ref())
                    .and_then(|anchor| anchor.text_segments.first())
                else {
                    resolved.push("");
                    continue;
                };

                let start = segment
                    .start_index
                    .as_ref()
                    .and_then(TextIndex::as_offset)
                    .unwrap_or(0)
                    .min(blob_len);
                let end = segment
                    .end_index
                    .as_ref()
                    .and_then(TextIndex::as_offset)
                    .unwrap_or(blob_len)
                    .min(blob_len);

                if start >= end {
                    resolved.push("");
                    continue;
                }
                resolved.push(self.text.get(start..end).unwrap_or(""));
            }
        }

        resolved
    }
}

#[derive(Deserialize)]
pub(crate) struct OperationHandle {
    pub(crate) name: String,
}

#[derive(Deserialize)]
pub(crate) struct OperationStatus {
    #[serde(default)]
    pub(crate) done: bool,
    #[serde(default)]
    pub(crate) error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationError {
    #[serde(default)]
    pub(crate) code: i64,
    #[serde(default)]
    pub(crate) message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_anchors_with_numeric_and_string_offsets() {
        let document: RecognizedDocument = serde_json::from_str(
            r#"{
                "text": "Alpha one.Beta two.",
                "pages": [
                    {
                        "paragraphs": [
                            { "layout": { "textAnchor": { "textSegments": [
                                { "endIndex": 10 }
                            ] } } },
                            { "layout": { "textAnchor": { "textSegments": [
                                { "startIndex": "10", "endIndex": "19" }
                            ] } } }
                        ]
                    }
                ]
            }"#,
        )
        .expect("document json");

        assert_eq!(document.paragraph_texts(), vec!["Alpha one.", "Beta two."]);
    }

    #[test]
    fn collects_paragraphs_across_pages_in_document_order() {
        let document: RecognizedDocument = serde_json::from_str(
            r#"{
                "text": "first.second.third.",
                "pages": [
                    {
                        "paragraphs": [
                            { "layout": { "textAnchor": { "textSegments": [
                                { "startIndex": 0, "endIndex": 6 }
                            ] } } },
                            { "layout": { "textAnchor": { "textSegments": [
                                { "startIndex": 6, "endIndex": 13 }
                            ] } } }
                        ]
                    },
                    {
                        "paragraphs": [
                            { "layout": { "textAnchor": { "textSegments": [
                                { "startIndex": 13, "endIndex": 19 }
                            ] } } }
                        ]
                    }
                ]
            }"#,
        )
        .expect("document json");

        assert_eq!(
            document.paragraph_texts(),
            vec!["first.", "second.", "third."]
        );
    }

    #[test]
    fn clamps_out_of_range_spans_and_empties_missing_anchors() {
        let document: RecognizedDocument = serde_json::from_str(
            r#"{
                "text": "short",
                "pages": [
                    {
                        "paragraphs": [
                            { "layout": { "textAnchor": { "textSegments": [
                                { "startIndex": 0, "endIndex": 99 }
                            ] } } },
                            { "layout": { "textAnchor": { "textSegments": [] } } },
                            {}
                        ]
                    }
                ]
            }"#,
        )
        .expect("document json");

        assert_eq!(document.paragraph_texts(), vec!["short", "", ""]);
    }

    #[test]
    fn paragraph_without_segments_keeps_its_place_between_neighbours() {
        let document: RecognizedDocument = serde_json::from_str(
            r#"{
                "text": "first.second.",
                "pages": [
                    {
                        "paragraphs": [
                            { "layout": { "textAnchor": { "textSegments": [
                                { "startIndex": 0, "endIndex": 6 }
                            ] } } },
                            { "layout": { "textAnchor": { "textSegments": [] } } },
                            { "layout": { "textAnchor": { "textSegments": [
                                { "startIndex": 6, "endIndex": 13 }
                            ] } } }
                        ]
                    }
                ]
            }"#,
        )
        .expect("document json");

        assert_eq!(document.paragraph_texts(), vec!["first.", "", "second."]);
    }

    #[test]
    fn span_off_a_character_boundary_resolves_to_empty() {
        let document: RecognizedDocument = serde_json::from_str(
            r#"{
                "text": "über",
                "pages": [
                    {
                        "paragraphs": [
                            { "layout": { "textAnchor": { "textSegments": [
                                { "startIndex": 0, "endIndex": 5 }
                            ] } } },
                            { "layout": { "textAnchor": { "textSegments": [
                                { "startIndex": 1, "endIndex": 3 }
                            ] } } }
                        ]
                    }
                ]
            }"#,
        )
        .expect("document json");

        assert_eq!(document.paragraph_texts(), vec!["über", ""]);
    }

    #[test]
    fn empty_document_resolves_to_no_paragraphs() {
        let document: RecognizedDocument =
            serde_json::from_str(r#"{ "text": "" }"#).expect("document json");
        assert!(document.paragraph_texts().is_empty());
    }
}
