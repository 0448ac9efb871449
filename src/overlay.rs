use crate::errors::AppError;
use crate::vision::ReadPage;
use crate::AppResult;
use bytes::Bytes;
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use mime::Mime;

const BOX_COLOR: Rgba<u8> = Rgba([230, 57, 70, 255]);
const BOX_THICKNESS: u32 = 2;

/// Per-axis scale from source-image pixel space to the displayed size.
/// The axes scale independently, so CSS-style non-uniform stretching is
/// representable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    pub fn new(natural: (u32, u32), displayed: (u32, u32)) -> Self {
        Self {
            x: displayed.0 as f64 / natural.0 as f64,
            y: displayed.1 as f64 / natural.1 as f64,
        }
    }
}

/// Axis-aligned rectangle for one detected text line, derived from the
/// vendor's 8-number bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LineRect {
    /// Corner order is top-left, top-right, bottom-right, bottom-left, so
    /// the rectangle spans from the first corner to its diagonal opposite
    /// at indices 4 and 5. Boxes with fewer than 6 coordinates are skipped.
    pub fn from_bounding_box(bounding_box: &[f64]) -> Option<Self> {
        if bounding_box.len() < 6 {
            return None;
        }
        Some(LineRect {
            x: bounding_box[0],
            y: bounding_box[1],
            width: bounding_box[4] - bounding_box[0],
            height: bounding_box[5] - bounding_box[1],
        })
    }

    pub fn scaled(&self, scale: ScaleFactors) -> LineRect {
        LineRect {
            x: self.x * scale.x,
            y: self.y * scale.y,
            width: self.width * scale.x,
            height: self.height * scale.y,
        }
    }
}

/// Draws one rectangle outline per detected line onto the source image,
/// re-encoded in its original format. When a displayed width/height is
/// given the image is resized to it and the boxes are scaled by
/// displayed/natural per axis; omitted axes keep their natural size.
pub fn render_line_boxes(
    mime: Mime,
    data: Bytes,
    pages: &[ReadPage],
    display_width: Option<u32>,
    display_height: Option<u32>,
) -> AppResult<Bytes> {
    let image_format = ImageFormat::from_mime_type(&mime).ok_or_else(|| AppError::SystemError {
        message: format!("Unsupported image mime type: {}", mime),
    })?;
    let image = image::load_from_memory_with_format(&data, image_format)?;
    let natural = (image.width(), image.height());
    let displayed = (
        display_width.unwrap_or(natural.0),
        display_height.unwrap_or(natural.1),
    );

    let mut image = if displayed == natural {
        image.to_rgba8()
    } else {
        imageops::resize(
            &image.to_rgba8(),
            displayed.0,
            displayed.1,
            imageops::FilterType::Triangle,
        )
    };

    let scale = ScaleFactors::new(natural, displayed);
    for page in pages {
        for line in &page.lines {
            if let Some(rect) = LineRect::from_bounding_box(&line.bounding_box) {
                draw_rect_outline(&mut image, rect.scaled(scale));
            }
        }
    }

    let mut output = std::io::Cursor::new(Vec::new());
    image.write_to(&mut output, image_format)?;
    Ok(output.into_inner().into())
}

fn draw_rect_outline(image: &mut RgbaImage, rect: LineRect) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }
    let x1 = rect.x.max(0.0).round() as u32;
    let y1 = rect.y.max(0.0).round() as u32;
    let x2 = (rect.x + rect.width).max(0.0).round() as u32;
    let y2 = (rect.y + rect.height).max(0.0).round() as u32;
    for x in x1..=x2 {
        for t in 0..BOX_THICKNESS {
            put_pixel_clamped(image, x, y1.saturating_add(t));
            put_pixel_clamped(image, x, y2.saturating_sub(t));
        }
    }
    for y in y1..=y2 {
        for t in 0..BOX_THICKNESS {
            put_pixel_clamped(image, x1.saturating_add(t), y);
            put_pixel_clamped(image, x2.saturating_sub(t), y);
        }
    }
}

fn put_pixel_clamped(image: &mut RgbaImage, x: u32, y: u32) {
    let safe_x = x.min(image.width() - 1);
    let safe_y = y.min(image.height() - 1);
    image.put_pixel(safe_x, safe_y, BOX_COLOR);
}
