//! Sample sources for the command-line tool
use std::path::Path;

use anyhow::{Result, ensure};
use depthmesh::source::{DepthFrame, Pinhole, Rgb};

/// Loads a 16-bit depth PNG (in millimeters) and an optional color image
pub fn load_frame(
    depth: &Path,
    color: Option<&Path>,
    camera: &Pinhole,
) -> Result<DepthFrame> {
    let img = image::open(depth)?.into_luma16();
    let (w, h) = img.dimensions();
    let mut frame = DepthFrame::from_depth_map(
        w as usize,
        h as usize,
        img.as_raw(),
        camera,
    )?;

    if let Some(path) = color {
        let rgb = image::open(path)?.into_rgb8();
        ensure!(
            rgb.dimensions() == (w, h),
            "color image is {:?}, but depth image is {:?}",
            rgb.dimensions(),
            (w, h)
        );
        frame.set_colors(rgb.pixels().map(|p| Rgb::from(p.0)).collect())?;
    }
    Ok(frame)
}

/// Builds a hemisphere in front of a distant wall
///
/// The hemisphere sits within the default clip range; the wall does not, so
/// the silhouette edge shows how clipped cells leave holes.
pub fn synthetic_frame(
    width: usize,
    height: usize,
    camera: &Pinhole,
) -> DepthFrame {
    let mut frame = DepthFrame::new(width, height);
    let radius = width.min(height) as f32 / 3.0;
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    for y in 0..height {
        for x in 0..width {
            let u = (x as f32 - cx) / radius;
            let v = (y as f32 - cy) / radius;
            let r2 = u * u + v * v;
            let (depth, color) = if r2 < 1.0 {
                let z = (1.0 - r2).sqrt();
                let shade = (64.0 + 191.0 * z) as u8;
                (700.0 - 150.0 * z, Rgb::new(shade, shade / 2, 255 - shade))
            } else {
                (1500.0, Rgb::new(40, 40, 40))
            };
            frame.set(x, y, depth, camera.unproject(x, y, depth));
            frame.set_color(x, y, color);
        }
    }
    frame
}
