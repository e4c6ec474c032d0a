//! PNG and PDF encoding of rendered pages.

use crate::renderer::{PngRenderResult, RenderResult, RendererError};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

fn check_buffer(result: &PngRenderResult) -> RenderResult<()> {
    let expected = result.width as usize * result.height as usize * 4;
    if result.width == 0 || result.height == 0 || result.rgba_data.len() != expected {
        return Err(RendererError::InvalidTarget(format!(
            "{}x{} with {} bytes",
            result.width,
            result.height,
            result.rgba_data.len()
        )));
    }
    Ok(())
}

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(result: &PngRenderResult) -> RenderResult<Vec<u8>> {
    check_buffer(result)?;
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, result.width, result.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| RendererError::Encode(format!("Failed to write PNG header: {}", e)))?;
        writer
            .write_image_data(&result.rgba_data)
            .map_err(|e| RendererError::Encode(format!("Failed to write PNG data: {}", e)))?;
    }
    Ok(png_data)
}

/// Encode a rendered page as a one-page PDF the size of the bitmap.
///
/// Pages are opaque, so alpha is dropped and the raster is embedded as a
/// DeviceRGB image.
pub fn encode_pdf(result: &PngRenderResult) -> RenderResult<Vec<u8>> {
    check_buffer(result)?;
    let (width, height) = (result.width as i64, result.height as i64);
    let rgb: Vec<u8> = result.rgba_data.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("cm", vec![width.into(), 0.into(), 0.into(), height.into(), 0.into(), 0.into()]),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content = content.encode().map_err(|e| RendererError::Encode(format!("PDF content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| RendererError::Encode(format!("Failed to write PDF: {}", e)))?;
    Ok(bytes)
}
