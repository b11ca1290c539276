//! Per-frame depth and color samples
//!
//! A [`SampleSource`] is the boundary between a depth sensor (or a recording
//! of one) and the mesher.  It exposes a fixed `width × height` grid; each cell
//! has a distance, a world-space position, and (if the frame carries one) a
//! color that is already registered to the depth grid.
use crate::Error;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 8-bit RGB color
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

static_assertions::assert_eq_size!(Rgb, [u8; 3]);

impl Rgb {
    /// Opaque white, used when a frame has no color channel
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    /// Builds a new color
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Source of per-pixel samples, refreshed once per frame
///
/// Coordinates are always in the range `0..width()` and `0..height()`; the
/// mesher never asks for a sample outside of the grid.
pub trait SampleSource {
    /// Grid width, in cells
    fn width(&self) -> usize;

    /// Grid height, in cells
    fn height(&self) -> usize;

    /// Raw sensor distance at the given cell
    ///
    /// Values `<= 0` mean that the sensor has no reading for this cell.
    fn distance_at(&self, x: usize, y: usize) -> f32;

    /// World-space position of the given cell
    fn world_position_at(&self, x: usize, y: usize) -> Vector3<f32>;

    /// Checks whether [`color_at`](SampleSource::color_at) is meaningful for
    /// this frame
    fn has_color_channel(&self) -> bool;

    /// Registered color at the given cell
    ///
    /// Only called when [`has_color_channel`](SampleSource::has_color_channel)
    /// returns `true`.
    fn color_at(&self, x: usize, y: usize) -> Rgb;
}

/// Pinhole camera intrinsics, used to back-project depth maps
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pinhole {
    /// Focal length along X, in pixels
    pub fx: f32,
    /// Focal length along Y, in pixels
    pub fy: f32,
    /// Principal point X, in pixels
    pub cx: f32,
    /// Principal point Y, in pixels
    pub cy: f32,
}

impl Default for Pinhole {
    /// Nominal intrinsics for a 640×480 structured-light sensor
    fn default() -> Self {
        Self {
            fx: 525.0,
            fy: 525.0,
            cx: 319.5,
            cy: 239.5,
        }
    }
}

impl Pinhole {
    /// Back-projects a pixel at the given depth into camera space
    ///
    /// The returned position has `z == depth`, so clip distances are expressed
    /// in the same units as the depth map.
    pub fn unproject(&self, x: usize, y: usize, depth: f32) -> Vector3<f32> {
        Vector3::new(
            (x as f32 - self.cx) * depth / self.fx,
            (y as f32 - self.cy) * depth / self.fy,
            depth,
        )
    }
}

/// Owned, in-memory grid of samples
///
/// Cells start out invalid (zero distance, origin position) until they are
/// assigned with [`DepthFrame::set`].
#[derive(Clone, Debug)]
pub struct DepthFrame {
    width: usize,
    height: usize,
    distance: Vec<f32>,
    position: Vec<Vector3<f32>>,
    color: Option<Vec<Rgb>>,
}

impl DepthFrame {
    /// Builds an empty frame without a color channel
    pub fn new(width: usize, height: usize) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            distance: vec![0.0; n],
            position: vec![Vector3::zeros(); n],
            color: None,
        }
    }

    /// Builds a frame from row-major sample buffers
    pub fn from_buffers(
        width: usize,
        height: usize,
        distance: Vec<f32>,
        position: Vec<Vector3<f32>>,
        color: Option<Vec<Rgb>>,
    ) -> Result<Self, Error> {
        let expected = width * height;
        let lengths = [distance.len(), position.len()]
            .into_iter()
            .chain(color.as_ref().map(|c| c.len()));
        for actual in lengths {
            if actual != expected {
                return Err(Error::BadGridSize { expected, actual });
            }
        }
        Ok(Self {
            width,
            height,
            distance,
            position,
            color,
        })
    }

    /// Builds a frame by back-projecting a row-major depth map
    ///
    /// Each depth value is used both as the cell's distance and as the
    /// world-space Z coordinate; zero depths remain invalid.
    pub fn from_depth_map(
        width: usize,
        height: usize,
        depth: &[u16],
        camera: &Pinhole,
    ) -> Result<Self, Error> {
        let expected = width * height;
        if depth.len() != expected {
            return Err(Error::BadGridSize {
                expected,
                actual: depth.len(),
            });
        }
        let mut out = Self::new(width, height);
        for (i, &d) in depth.iter().enumerate() {
            if d == 0 {
                continue;
            }
            let (x, y) = (i % width, i / width);
            let d = f32::from(d);
            out.distance[i] = d;
            out.position[i] = camera.unproject(x, y, d);
        }
        Ok(out)
    }

    /// Assigns distance and position for a single cell
    pub fn set(&mut self, x: usize, y: usize, distance: f32, p: Vector3<f32>) {
        let i = self.index(x, y);
        self.distance[i] = distance;
        self.position[i] = p;
    }

    /// Assigns a color for a single cell
    ///
    /// The first call allocates a color channel, with every other cell
    /// initialized to [`Rgb::WHITE`].
    pub fn set_color(&mut self, x: usize, y: usize, c: Rgb) {
        let i = self.index(x, y);
        let n = self.width * self.height;
        self.color.get_or_insert_with(|| vec![Rgb::WHITE; n])[i] = c;
    }

    /// Replaces the whole color channel
    pub fn set_colors(&mut self, colors: Vec<Rgb>) -> Result<(), Error> {
        let expected = self.width * self.height;
        if colors.len() != expected {
            return Err(Error::BadGridSize {
                expected,
                actual: colors.len(),
            });
        }
        self.color = Some(colors);
        Ok(())
    }

    /// Drops the color channel, e.g. when the color stream is lost
    pub fn clear_colors(&mut self) {
        self.color = None;
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(x < self.width && y < self.height, "({x}, {y}) out of range");
        y * self.width + x
    }
}

impl SampleSource for DepthFrame {
    fn width(&self) -> usize {
        self.width
    }
    fn height(&self) -> usize {
        self.height
    }
    fn distance_at(&self, x: usize, y: usize) -> f32 {
        self.distance[self.index(x, y)]
    }
    fn world_position_at(&self, x: usize, y: usize) -> Vector3<f32> {
        self.position[self.index(x, y)]
    }
    fn has_color_channel(&self) -> bool {
        self.color.is_some()
    }
    fn color_at(&self, x: usize, y: usize) -> Rgb {
        let i = self.index(x, y);
        self.color.as_ref().map(|c| c[i]).unwrap_or(Rgb::WHITE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bad_buffer_sizes() {
        let r = DepthFrame::from_buffers(
            2,
            2,
            vec![1.0; 4],
            vec![Vector3::zeros(); 3],
            None,
        );
        assert!(matches!(
            r,
            Err(Error::BadGridSize {
                expected: 4,
                actual: 3
            })
        ));

        let r = DepthFrame::from_buffers(
            2,
            2,
            vec![1.0; 4],
            vec![Vector3::zeros(); 4],
            Some(vec![Rgb::WHITE; 5]),
        );
        assert!(matches!(
            r,
            Err(Error::BadGridSize {
                expected: 4,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_lazy_color_channel() {
        let mut f = DepthFrame::new(3, 2);
        assert!(!f.has_color_channel());
        f.set_color(1, 1, Rgb::new(10, 20, 30));
        assert!(f.has_color_channel());
        assert_eq!(f.color_at(1, 1), Rgb::new(10, 20, 30));
        assert_eq!(f.color_at(0, 0), Rgb::WHITE);
        f.clear_colors();
        assert!(!f.has_color_channel());
    }

    #[test]
    fn test_depth_map_unprojection() {
        let cam = Pinhole {
            fx: 100.0,
            fy: 200.0,
            cx: 1.0,
            cy: 0.0,
        };
        let f = DepthFrame::from_depth_map(2, 2, &[0, 500, 600, 700], &cam)
            .unwrap();
        assert_eq!(f.distance_at(0, 0), 0.0);
        assert_eq!(f.distance_at(1, 0), 500.0);
        assert_eq!(f.world_position_at(1, 0), Vector3::new(0.0, 0.0, 500.0));
        assert_eq!(f.world_position_at(0, 1), Vector3::new(-6.0, 3.0, 600.0));
        assert_eq!(f.world_position_at(1, 1).z, 700.0);
    }
}
