use image::GrayImage;
use imageproc::distance_transform::Norm;

/// Square structuring element used by the feature detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelSize {
    /// 3×3, used for per-region analysis
    Three,
    /// 5×5, used for whole-image previews
    Five,
}

impl KernelSize {
    /// Chebyshev radius of the square element
    pub fn radius(self) -> u8 {
        match self {
            KernelSize::Three => 1,
            KernelSize::Five => 2,
        }
    }
}

/// Erosion followed by dilation with a square element
pub fn open(binary: &GrayImage, kernel: KernelSize) -> GrayImage {
    imageproc::morphology::open(binary, Norm::LInf, kernel.radius())
}

/// One dilation pass with a square element
pub fn dilate(binary: &GrayImage, kernel: KernelSize) -> GrayImage {
    imageproc::morphology::dilate(binary, Norm::LInf, kernel.radius())
}
