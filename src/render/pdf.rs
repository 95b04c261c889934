//! PDF branch: embed annotation objects instead of drawing pixels.
//!
//! The uploaded PDF is parsed, a `Square` annotation (the box) and a
//! `FreeText` annotation (confidence + label) are added per field, and the
//! document is re-serialised. The page content stream is never touched, so
//! text stays selectable and the file stays the user's file.
//!
//! Two coordinate fixes happen on the way in:
//!
//! * regions arrive in the pixel space of the backend's page render
//!   (`pdf_raster_dpi`), so each axis is scaled by `72 / dpi` into points;
//! * PDF pages have a bottom-left origin, so the rectangle is flipped with
//!   the page's `MediaBox` height.

use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::annotation::Annotation;
use crate::config::ValidationConfig;
use crate::error::SlotError;

/// Embed annotations into the first page of a PDF, returning new bytes.
pub(crate) fn annotate_pdf(
    bytes: &[u8],
    annotations: &[Annotation],
    config: &ValidationConfig,
) -> Result<Vec<u8>, SlotError> {
    let mut doc = Document::load_mem(bytes)
        .map_err(|e| SlotError::render(format!("cannot parse PDF: {e}")))?;

    let page_id = doc
        .get_pages()
        .into_values()
        .next()
        .ok_or_else(|| SlotError::render("PDF has no pages"))?;

    let media_box = resolve_media_box(&doc, page_id)
        .ok_or_else(|| SlotError::render("page has no MediaBox"))?;
    let (page_width, page_height) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);

    // Backend reports regions in render pixels; one point is dpi/72 pixels.
    let to_points = 72.0 / config.pdf_raster_dpi as f32;
    debug!(page_width, page_height, count = annotations.len(), "embedding PDF annotations");

    let mut new_annots: Vec<ObjectId> = Vec::new();
    for annotation in annotations {
        let Some(region) = annotation.region else {
            continue;
        };
        let clipped = region
            .scale(to_points, to_points)
            .clip(page_width, page_height);
        if clipped.is_degenerate() {
            warn!(label = %annotation.label, "region outside the page; skipped");
            continue;
        }
        let flipped = clipped.pdf_flip_y(page_height);
        let tier = config.confidence.tier(annotation.confidence);
        let [r, g, b] = tier.rgb_f32();
        let colour = vec![r.into(), g.into(), b.into()];
        let text = format!("{}% {}", annotation.confidence_percent(), annotation.label);

        let square_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Square",
            "Rect" => rect_array(flipped.x, flipped.y, flipped.right(), flipped.y + flipped.height),
            "C" => colour.clone(),
            "BS" => dictionary! { "W" => config.stroke_width as i64 },
            "Contents" => Object::string_literal(text.clone()),
        });
        new_annots.push(square_id);

        // Label to the right of the box, clamped onto the page.
        let label_x = (flipped.right() + 10.0).min(page_width - 10.0);
        let label_top = (flipped.y + flipped.height).min(page_height);
        let label_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "FreeText",
            "Rect" => rect_array(label_x, (label_top - 24.0).max(0.0), page_width, label_top),
            "Contents" => Object::string_literal(text),
            "DA" => Object::string_literal(format!("/Helv 9 Tf {r} {g} {b} rg")),
        });
        new_annots.push(label_id);
    }

    append_annots(&mut doc, page_id, &new_annots)?;

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| SlotError::render(format!("cannot serialise PDF: {e}")))?;
    Ok(out)
}

fn rect_array(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Object> {
    vec![x0.into(), y0.into(), x1.into(), y1.into()]
}

/// Read the page's `MediaBox`, walking `/Parent` links for inherited boxes.
fn resolve_media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let mut current = page_id;
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(obj) = dict.get(b"MediaBox") {
            let obj = match obj {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            let arr = obj.as_array().ok()?;
            if arr.len() == 4 {
                let mut mb = [0.0f32; 4];
                for (slot, item) in mb.iter_mut().zip(arr) {
                    *slot = object_to_f32(item)?;
                }
                return Some(mb);
            }
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

fn object_to_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Append references to the page's `/Annots` array, creating it if absent.
fn append_annots(doc: &mut Document, page_id: ObjectId, ids: &[ObjectId]) -> Result<(), SlotError> {
    let page = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| SlotError::render(format!("cannot access page: {e}")))?;

    if let Ok(Object::Array(arr)) = page.get_mut(b"Annots") {
        arr.extend(ids.iter().map(|id| Object::Reference(*id)));
    } else {
        page.set(
            "Annots",
            Object::Array(ids.iter().map(|id| Object::Reference(*id)).collect()),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn letter_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        if let Ok(dict) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
            dict.set("Parent", Object::Reference(pages_id));
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn point_space_config() -> ValidationConfig {
        // dpi 72 makes the pixel→point scale the identity.
        ValidationConfig::builder().pdf_raster_dpi(72).build().unwrap()
    }

    #[test]
    fn media_box_is_inherited_from_pages_node() {
        let bytes = letter_pdf();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = doc.get_pages().into_values().next().unwrap();
        assert_eq!(resolve_media_box(&doc, page_id), Some([0.0, 0.0, 612.0, 792.0]));
    }

    #[test]
    fn square_rect_is_flipped_into_page_space() {
        let bytes = letter_pdf();
        let annotation = Annotation::new("DOB", Rect::new(100.0, 100.0, 80.0, 50.0), 0.95);
        let out = annotate_pdf(&bytes, &[annotation], &point_space_config()).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let page_id = doc.get_pages().into_values().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 2);

        let square = doc
            .get_object(annots[0].as_reference().unwrap())
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(square.get(b"Subtype").unwrap().as_name().unwrap(), b"Square");
        let rect = square.get(b"Rect").unwrap().as_array().unwrap();
        let ys: Vec<f32> = rect.iter().map(|o| object_to_f32(o).unwrap()).collect();
        // Top y=100, height 50 on a 792pt page → bottom edge at 792-150 = 642.
        assert!((ys[0] - 100.0).abs() < 0.01);
        assert!((ys[1] - 642.0).abs() < 0.01);
        assert!((ys[3] - 692.0).abs() < 0.01);

        let label = doc
            .get_object(annots[1].as_reference().unwrap())
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(label.get(b"Subtype").unwrap().as_name().unwrap(), b"FreeText");
    }

    #[test]
    fn region_scaled_from_render_pixels() {
        let bytes = letter_pdf();
        // dpi 144 → scale 0.5: pixel (200,200,160,100) lands at points (100,100,80,50).
        let config = ValidationConfig::builder().pdf_raster_dpi(144).build().unwrap();
        let annotation = Annotation::new("Name", Rect::new(200.0, 200.0, 160.0, 100.0), 0.8);
        let out = annotate_pdf(&bytes, &[annotation], &config).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let page_id = doc.get_pages().into_values().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        let square = doc
            .get_object(annots[0].as_reference().unwrap())
            .unwrap()
            .as_dict()
            .unwrap();
        let rect = square.get(b"Rect").unwrap().as_array().unwrap();
        let vals: Vec<f32> = rect.iter().map(|o| object_to_f32(o).unwrap()).collect();
        assert!((vals[0] - 100.0).abs() < 0.01);
        assert!((vals[1] - (792.0 - 150.0)).abs() < 0.01);
    }

    #[test]
    fn garbage_bytes_fail_with_render_error() {
        let err = annotate_pdf(b"%PDF-nope", &[], &point_space_config()).unwrap_err();
        assert!(matches!(err, SlotError::RenderFailure { .. }));
    }

    #[test]
    fn region_less_annotations_add_nothing() {
        let bytes = letter_pdf();
        let mut annotation = Annotation::new("Gender", Rect::new(0.0, 0.0, 1.0, 1.0), 0.6);
        annotation.region = None;
        let out = annotate_pdf(&bytes, &[annotation], &point_space_config()).unwrap();
        let doc = Document::load_mem(&out).unwrap();
        let page_id = doc.get_pages().into_values().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        assert!(annots.is_empty());
    }
}
