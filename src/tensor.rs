//! Score tensors and where they live.

use crate::error::{DecodeError, Result};
use ndarray::{Array3, ArrayView3};
use std::fmt;

/// Memory a tensor resides in, as reported by the upstream tensor runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Device {
    /// Host memory.
    #[default]
    Host,
    /// Accelerator memory on the device with the given ordinal.
    Accelerator(usize),
}

impl Device {
    #[inline]
    pub fn is_accelerator(self) -> bool {
        matches!(self, Device::Accelerator(_))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Host => write!(f, "host"),
            Device::Accelerator(ordinal) => write!(f, "accelerator:{ordinal}"),
        }
    }
}

/// Per-timestep transition scores with layout `(T, B, C)`, where
/// `C = 2·nbase·(nbase+1)`, tagged with the device they reside on.
#[derive(Clone, Debug, PartialEq)]
pub struct Scores {
    data: Array3<f32>,
    device: Device,
}

impl Scores {
    /// Scores held in host memory.
    pub fn host(data: Array3<f32>) -> Self {
        Self::on(data, Device::Host)
    }

    pub fn on(data: Array3<f32>, device: Device) -> Self {
        Self { data, device }
    }

    /// Build host scores from a flat `T·B·C` buffer in row-major order.
    pub fn from_shape_vec(shape: (usize, usize, usize), data: Vec<f32>) -> Result<Self> {
        let expected = shape.0 * shape.1 * shape.2;
        let found = data.len();
        Array3::from_shape_vec(shape, data)
            .map(Self::host)
            .map_err(|_| DecodeError::shape("score buffer", [expected], [found]))
    }

    /// Same scores, retagged as residing on `device`.
    pub fn to_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    #[inline]
    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    #[inline]
    pub fn timesteps(&self) -> usize {
        self.data.dim().0
    }

    #[inline]
    pub fn batch(&self) -> usize {
        self.data.dim().1
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn into_inner(self) -> Array3<f32> {
        self.data
    }
}

impl From<Array3<f32>> for Scores {
    fn from(data: Array3<f32>) -> Self {
        Self::host(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_default_device() {
        let s = Scores::from(Array3::zeros((3, 2, 12)));
        assert_eq!(s.device(), Device::Host);
        assert_eq!((s.timesteps(), s.batch(), s.channels()), (3, 2, 12));
    }

    #[test]
    fn retag_keeps_data() {
        let s = Scores::host(Array3::from_elem((1, 1, 4), 2.0)).to_device(Device::Accelerator(0));
        assert!(s.device().is_accelerator());
        assert_eq!(s.view()[[0, 0, 3]], 2.0);
    }

    #[test]
    fn flat_buffer_must_fill_shape() {
        assert!(Scores::from_shape_vec((2, 1, 4), vec![0.0; 8]).is_ok());
        let err = Scores::from_shape_vec((2, 1, 4), vec![0.0; 7]).unwrap_err();
        assert_eq!(err, DecodeError::shape("score buffer", [8], [7]));
    }
}
