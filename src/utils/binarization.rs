use image::{GrayImage, Luma};

/// Inverse global threshold: 255 where `gray < threshold`, 0 elsewhere
pub fn threshold_below(gray: &[u8], width: usize, height: usize, threshold: u8) -> GrayImage {
    binarize_with(gray, width, height, |v| v < threshold)
}

/// Upper global threshold: 255 where `gray > threshold`, 0 elsewhere
pub fn threshold_above(gray: &[u8], width: usize, height: usize, threshold: u8) -> GrayImage {
    binarize_with(gray, width, height, |v| v > threshold)
}

fn binarize_with<F>(gray: &[u8], width: usize, height: usize, is_candidate: F) -> GrayImage
where
    F: Fn(u8) -> bool,
{
    let mut binary = GrayImage::new(width as u32, height as u32);

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if gray.get(idx).copied().is_some_and(&is_candidate) {
                binary.put_pixel(x as u32, y as u32, Luma([255]));
            }
        }
    }

    binary
}
