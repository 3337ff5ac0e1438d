//! Normalization of raw engine detections into the uniform result shape.
//!
//! The engine returns one whole-image detection followed by per-region
//! detections in its own reading order. The whole-image detection becomes the
//! full text; the rest become fragments. The engine reports no per-region
//! confidence, so a synthetic estimate is derived from the text length —
//! the exact formula and clamp range are part of the API contract.

use serde::Deserialize;

use pagelens_core::{BoundingBox, OcrData, OcrFragment};

const CONFIDENCE_FLOOR: f64 = 0.70;
const CONFIDENCE_CEIL: f64 = 0.95;

/// One raw text detection from the engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

/// Polygon vertex. The engine omits zero-valued coordinates.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
}

/// Synthetic confidence: `clamp(0.70 + 0.01 × text length, 0.70, 0.95)`.
pub fn synthetic_confidence(text: &str) -> f64 {
    let estimate = CONFIDENCE_FLOOR + 0.01 * text.chars().count() as f64;
    estimate.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEIL)
}

/// Axis-aligned box from the first three polygon vertices:
/// `(x0, y0, x1 − x0, y2 − y0)`. Absent coordinates count as 0; an absent
/// polygon (or an empty vertex list) yields no box.
pub fn derive_bounding_box(poly: Option<&BoundingPoly>) -> Option<BoundingBox> {
    let vertices = &poly?.vertices;
    let v0 = vertices.first()?;
    let x0 = v0.x.unwrap_or(0);
    let y0 = v0.y.unwrap_or(0);
    let x1 = vertices.get(1).and_then(|v| v.x).unwrap_or(0);
    let y2 = vertices.get(2).and_then(|v| v.y).unwrap_or(0);
    Some(BoundingBox { x: x0, y: y0, width: x1 - x0, height: y2 - y0 })
}

/// Map raw detections to the normalized result. Zero detections is a
/// successful empty result, not an error.
pub fn normalize(annotations: &[TextAnnotation]) -> OcrData {
    let Some((first, rest)) = annotations.split_first() else {
        return OcrData::default();
    };

    let results = rest
        .iter()
        .map(|detection| {
            let text = detection.description.clone().unwrap_or_default();
            OcrFragment {
                confidence: synthetic_confidence(&text),
                bounding_box: derive_bounding_box(detection.bounding_poly.as_ref()),
                text,
            }
        })
        .collect();

    OcrData { text: first.description.clone().unwrap_or_default(), results }
}
