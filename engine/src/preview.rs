//! Paints recorded redaction boxes onto a copy of the source image, for
//! checking outputs by eye.

use std::path::Path;

use image::{DynamicImage, Rgba};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use ocrr_core::BBox;

use crate::output::{self, OutputError};

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("cannot load image: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Fills every box in black. Boxes are clipped to the image; empty ones are
/// ignored. Returns the number of boxes painted.
pub fn paint_boxes(img: &mut DynamicImage, boxes: &[BBox]) -> usize {
    let (width, height) = (img.width() as i32, img.height() as i32);
    let mut canvas = img.to_rgba8();
    let mut painted = 0;

    for b in boxes {
        let x1 = b.x1.clamp(0, width);
        let y1 = b.y1.clamp(0, height);
        let x2 = b.x2.clamp(0, width);
        let y2 = b.y2.clamp(0, height);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }
        let rect = Rect::at(x1, y1).of_size((x2 - x1) as u32, (y2 - y1) as u32);
        draw_filled_rect_mut(&mut canvas, rect, Rgba([0, 0, 0, 255]));
        painted += 1;
    }

    *img = DynamicImage::ImageRgba8(canvas);
    painted
}

/// Reads `coordinates`, masks `image` and saves the result to `out`.
pub fn mask_file(image: &Path, coordinates: &Path, out: &Path) -> Result<usize, PreviewError> {
    let boxes = output::read_coordinates(coordinates)?;
    let mut img = image::open(image)?;
    let painted = paint_boxes(&mut img, &boxes);

    // JPEG has no alpha channel
    let img = DynamicImage::ImageRgb8(img.to_rgb8());
    img.save(out)?;
    log::info!(
        "[Preview] {} box(es) painted on {} -> {}",
        painted,
        image.display(),
        out.display()
    );
    Ok(painted)
}
