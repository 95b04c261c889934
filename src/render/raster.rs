//! Bitmap branch: draw bounding boxes and labels into the decoded image.
//!
//! Coordinates arrive in the image's own pixel space, so no scaling happens
//! here; each region is clipped into the canvas and stroked in its
//! confidence-tier colour, with the confidence percentage and field label
//! drawn just right of the box. Output is always PNG regardless of the
//! input encoding (JPEG sources would otherwise re-compress the overlay).

use ab_glyph::{FontRef, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::annotation::Annotation;
use crate::config::ValidationConfig;
use crate::error::SlotError;
use crate::geometry::Rect;

// Bundled so label rendering never depends on host fonts.
static LABEL_FONT: Lazy<FontRef<'static>> = Lazy::new(|| {
    FontRef::try_from_slice(include_bytes!("../../assets/DejaVuSans.ttf"))
        .expect("bundled label font is a valid TTF")
});

/// Annotate a bitmap in place and re-encode it as PNG.
pub(crate) fn annotate_image(
    bytes: &[u8],
    annotations: &[Annotation],
    config: &ValidationConfig,
) -> Result<Vec<u8>, SlotError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| SlotError::render(format!("cannot decode image: {e}")))?;
    let mut canvas: RgbaImage = decoded.to_rgba8();
    let (width, height) = canvas.dimensions();
    debug!(width, height, count = annotations.len(), "annotating bitmap");

    for annotation in annotations {
        let Some(region) = annotation.region else {
            continue;
        };
        let clipped = region.clip(width as f32, height as f32);
        if clipped.is_degenerate() {
            warn!(label = %annotation.label, "region outside the image; skipped");
            continue;
        }
        let tier = config.confidence.tier(annotation.confidence);
        let [r, g, b] = tier.rgb();
        let colour = Rgba([r, g, b, 255]);

        draw_box(&mut canvas, &clipped, colour, config.stroke_width);
        draw_label(&mut canvas, &clipped, annotation, colour, config.label_scale);
    }

    let mut out = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut out);
    canvas
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| SlotError::render(format!("cannot encode PNG: {e}")))?;
    Ok(out)
}

/// Stroke a hollow rectangle `stroke_width` pixels thick by drawing nested
/// 1px hollow rects (imageproc strokes are always 1px).
fn draw_box(canvas: &mut RgbaImage, region: &Rect, colour: Rgba<u8>, stroke_width: u32) {
    let (width, height) = canvas.dimensions();
    for inset in 0..stroke_width as i32 {
        let x = region.x as i32 + inset;
        let y = region.y as i32 + inset;
        let w = (region.width as i64 - 2 * inset as i64).max(1) as u32;
        let h = (region.height as i64 - 2 * inset as i64).max(1) as u32;
        if x >= width as i32 || y >= height as i32 {
            break;
        }
        let rect = imageproc::rect::Rect::at(x, y).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, colour);
    }
}

/// Draw "NN%" and the field label on two lines just right of the box,
/// on a translucent white backing strip for legibility.
fn draw_label(
    canvas: &mut RgbaImage,
    region: &Rect,
    annotation: &Annotation,
    colour: Rgba<u8>,
    label_scale: f32,
) {
    let (width, height) = canvas.dimensions();
    let scale = PxScale::from(label_scale);
    let line_height = label_scale.ceil() as u32;

    let x = (region.right() as u32).saturating_add(10);
    let y = region.y.max(0.0) as u32;
    if x >= width || y >= height {
        return;
    }

    let percent = format!("{}%", annotation.confidence_percent());
    let longest = percent.len().max(annotation.label.len()) as u32;
    // Rough advance width; the backing strip only needs to cover the text.
    let strip_w = (longest * line_height * 3 / 5).clamp(1, width - x);
    let strip_h = (2 * line_height).clamp(1, height - y);
    draw_filled_rect_mut(
        canvas,
        imageproc::rect::Rect::at(x as i32, y as i32).of_size(strip_w, strip_h),
        Rgba([255, 255, 255, 200]),
    );

    draw_text_mut(canvas, colour, x as i32, y as i32, scale, &*LABEL_FONT, &percent);
    if y + line_height < height {
        draw_text_mut(
            canvas,
            colour,
            x as i32,
            (y + line_height) as i32,
            scale,
            &*LABEL_FONT,
            &annotation.label,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut out = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn stroke_lands_on_box_edge_in_tier_colour() {
        let png = white_png(400, 300);
        let annotation = Annotation::new("Name", Rect::new(50.0, 50.0, 100.0, 60.0), 0.95);
        let config = ValidationConfig::default();

        let out = annotate_image(&png, &[annotation], &config).unwrap();
        let rendered = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(rendered.dimensions(), (400, 300));
        // High tier strokes green on the top-left corner of the box.
        assert_eq!(*rendered.get_pixel(50, 50), Rgba([0, 128, 0, 255]));
        // Well inside the box stays untouched.
        assert_eq!(*rendered.get_pixel(100, 80), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn out_of_bounds_region_is_skipped_not_fatal() {
        let png = white_png(100, 100);
        let annotation = Annotation::new("Ghost", Rect::new(500.0, 500.0, 50.0, 50.0), 0.5);
        let out = annotate_image(&png, &[annotation], &ValidationConfig::default()).unwrap();
        let rendered = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(rendered.dimensions(), (100, 100));
    }

    #[test]
    fn garbage_bytes_fail_with_render_error() {
        let err = annotate_image(b"not an image", &[], &ValidationConfig::default()).unwrap_err();
        assert!(matches!(err, SlotError::RenderFailure { .. }));
    }

    #[test]
    fn low_tier_strokes_red() {
        let png = white_png(200, 200);
        let annotation = Annotation::new("Addr", Rect::new(10.0, 10.0, 50.0, 50.0), 0.3);
        let out = annotate_image(&png, &[annotation], &ValidationConfig::default()).unwrap();
        let rendered = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(*rendered.get_pixel(10, 10), Rgba([255, 0, 0, 255]));
    }
}
