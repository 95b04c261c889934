//! Renderer integration: annotated previews for bitmaps and PDFs.

use docgate::{
    annotate_preview, Annotation, ArtifactKind, Rect, SlotError, UploadedFile, ValidationConfig,
};
use image::{Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object};

fn white_png_file(width: u32, height: u32) -> UploadedFile {
    let img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    UploadedFile::new("scan.png", "image/png", bytes)
}

fn letter_pdf_file() -> UploadedFile {
    let mut doc = Document::with_version("1.5");
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    });
    if let Ok(dict) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
        dict.set("Parent", Object::Reference(pages_id));
    }
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    UploadedFile::new("doc.pdf", "application/pdf", bytes)
}

fn field(label: &str, rect: Rect, confidence: f32) -> Annotation {
    Annotation::new(label, rect, confidence)
}

#[tokio::test]
async fn no_annotations_passes_original_through() {
    let file = white_png_file(100, 100);
    let artifact = annotate_preview(&file, &[], &ValidationConfig::default())
        .await
        .unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Original);
    assert_eq!(artifact.media_type, "image/png");
    assert_eq!(artifact.bytes, file.bytes);
}

#[tokio::test]
async fn region_less_annotations_also_pass_through() {
    let file = white_png_file(100, 100);
    let mut a = field("Gender", Rect::new(0.0, 0.0, 1.0, 1.0), 0.5);
    a.region = None;
    let artifact = annotate_preview(&file, &[a], &ValidationConfig::default())
        .await
        .unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Original);
}

#[tokio::test]
async fn bitmap_preview_draws_boxes_in_tier_colours() {
    let file = white_png_file(400, 300);
    let annotations = [
        field("Name", Rect::new(40.0, 40.0, 120.0, 50.0), 0.95),
        field("DOB", Rect::new(40.0, 150.0, 120.0, 50.0), 0.75),
    ];
    let artifact = annotate_preview(&file, &annotations, &ValidationConfig::default())
        .await
        .unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Annotated);
    assert_eq!(artifact.media_type, "image/png");

    let rendered = image::load_from_memory(&artifact.bytes).unwrap().to_rgba8();
    assert_eq!(rendered.dimensions(), (400, 300));
    // High tier: green stroke on the first box edge.
    assert_eq!(*rendered.get_pixel(40, 40), Rgba([0, 128, 0, 255]));
    // Medium tier: orange stroke on the second box edge.
    assert_eq!(*rendered.get_pixel(40, 150), Rgba([255, 165, 0, 255]));
    // Untouched pixels survive annotation.
    assert_eq!(*rendered.get_pixel(300, 280), Rgba([255, 255, 255, 255]));
}

#[tokio::test]
async fn out_of_bounds_regions_clip_instead_of_failing() {
    let file = white_png_file(100, 100);
    let annotations = [
        field("Partial", Rect::new(-30.0, 80.0, 90.0, 90.0), 0.4),
        field("Outside", Rect::new(900.0, 900.0, 10.0, 10.0), 0.4),
    ];
    let artifact = annotate_preview(&file, &annotations, &ValidationConfig::default())
        .await
        .unwrap();
    let rendered = image::load_from_memory(&artifact.bytes).unwrap().to_rgba8();
    assert_eq!(rendered.dimensions(), (100, 100));
}

#[tokio::test]
async fn pdf_preview_embeds_annotations_without_rasterising() {
    let file = letter_pdf_file();
    // dpi 72 keeps coordinates in point space for a readable assertion.
    let config = ValidationConfig::builder().pdf_raster_dpi(72).build().unwrap();
    let annotations = [field("DOB", Rect::new(100.0, 100.0, 80.0, 50.0), 0.95)];

    let artifact = annotate_preview(&file, &annotations, &config).await.unwrap();
    assert_eq!(artifact.kind, ArtifactKind::Annotated);
    assert_eq!(artifact.media_type, "application/pdf");

    let doc = Document::load_mem(&artifact.bytes).unwrap();
    let page_id = doc.get_pages().into_values().next().unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let annots = page.get(b"Annots").unwrap().as_array().unwrap();
    // One Square box plus one FreeText label per field.
    assert_eq!(annots.len(), 2);

    let square = doc
        .get_object(annots[0].as_reference().unwrap())
        .unwrap()
        .as_dict()
        .unwrap();
    assert_eq!(square.get(b"Subtype").unwrap().as_name().unwrap(), b"Square");
    let rect = square.get(b"Rect").unwrap().as_array().unwrap();
    // Bottom-left origin: top y=100, height 50 on a 792pt page → y₀ = 642.
    let y0 = match rect[1] {
        Object::Real(v) => v,
        Object::Integer(v) => v as f32,
        _ => panic!("Rect entry is not numeric"),
    };
    assert!((y0 - 642.0).abs() < 0.01);
}

#[tokio::test]
async fn corrupt_bitmap_reports_render_failure() {
    let file = UploadedFile::new("broken.png", "image/png", vec![1, 2, 3, 4]);
    let annotations = [field("Name", Rect::new(0.0, 0.0, 10.0, 10.0), 0.9)];
    let err = annotate_preview(&file, &annotations, &ValidationConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SlotError::RenderFailure { .. }));
}

#[tokio::test]
async fn unknown_media_type_reports_render_failure() {
    let file = UploadedFile::new("doc.bin", "application/octet-stream", vec![0; 16]);
    let annotations = [field("Name", Rect::new(0.0, 0.0, 10.0, 10.0), 0.9)];
    let err = annotate_preview(&file, &annotations, &ValidationConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SlotError::RenderFailure { .. }));
}
