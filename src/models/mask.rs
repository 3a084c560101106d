use image::GrayImage;

/// Compact bit matrix marking defective pixels of one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefectMask {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl DefectMask {
    /// Create an all-clear mask with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Get mask width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get mask height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of pixels covered by the mask
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// True for a zero-area mask
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get bit at (x, y)
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        (self.data[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Set bit at (x, y); out-of-range coordinates are ignored
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        if value {
            self.data[byte_index] |= 1 << bit_index;
        } else {
            self.data[byte_index] &= !(1 << bit_index);
        }
    }

    /// Number of defective pixels
    pub fn count_set(&self) -> usize {
        // Padding bits past width*height are never set.
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// True if at least one pixel is set
    pub fn any(&self) -> bool {
        self.data.iter().any(|&b| b != 0)
    }

    /// Share of set pixels, in percent. An empty mask reports 100.
    pub fn percentage(&self) -> f32 {
        if self.is_empty() {
            return 100.0;
        }
        self.count_set() as f32 / self.len() as f32 * 100.0
    }

    /// Logical OR with another mask of the same dimensions.
    ///
    /// Masks of different size are ignored; they cannot come from the same region.
    pub fn union_with(&mut self, other: &DefectMask) {
        if self.width != other.width || self.height != other.height {
            return;
        }
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a |= *b;
        }
    }

    /// Build a mask from any nonzero pixel of a grayscale image
    pub fn from_gray_image(image: &GrayImage) -> Self {
        let (w, h) = image.dimensions();
        let mut mask = Self::new(w as usize, h as usize);
        for (x, y, p) in image.enumerate_pixels() {
            if p.0[0] != 0 {
                mask.set(x as usize, y as usize, true);
            }
        }
        mask
    }
}

impl Default for DefectMask {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
