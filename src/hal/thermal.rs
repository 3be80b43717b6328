use nalgebra::DMatrix;

use crate::Error;

/// One capture from the thermal camera.
///
/// Rows run along the yaw axis of the rig. A frame is immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermalFrame {
    pixels: DMatrix<f32>,
}

impl ThermalFrame {
    /// Build a frame from row-major samples.
    pub fn from_row_slice(width: usize, height: usize, samples: &[f32]) -> Result<Self, Error> {
        let expected = width * height;
        if samples.len() != expected {
            return Err(Error::FrameSize {
                expected,
                actual: samples.len(),
            });
        }

        Ok(Self {
            pixels: DMatrix::from_row_slice(height, width, samples),
        })
    }

    /// Build a frame by evaluating `f(row, column)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: FnMut(usize, usize) -> f32,
    {
        Self {
            pixels: DMatrix::from_fn(height, width, f),
        }
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn pixels(&self) -> &DMatrix<f32> {
        &self.pixels
    }
}

/// A camera that captures a whole thermal frame on demand.
///
/// Capturing may be slow compared to a scheduler tick, so it is only called
/// from a task state that has no other deadline.
pub trait ThermalCamera {
    /// Prepare the camera. Called once before the first capture.
    fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn capture(&mut self) -> Result<ThermalFrame, Error>;
}

impl<T> ThermalCamera for &mut T
where
    T: ThermalCamera + ?Sized,
{
    fn init(&mut self) -> Result<(), Error> {
        (**self).init()
    }

    fn capture(&mut self) -> Result<ThermalFrame, Error> {
        (**self).capture()
    }
}
