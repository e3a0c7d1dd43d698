//! Structural similarity (SSIM) for grayscale images.
//!
//! Uniform 7x7 window, sample covariance, K1 = 0.01, K2 = 0.03 and a data
//! range of 255. The score is the mean over all windows that lie fully
//! inside the image. Window sums come from summed-area tables, so the cost
//! is linear in the pixel count.

use image::GrayImage;

/// Side length of the sliding window.
pub const WINDOW: u32 = 7;

const DATA_RANGE: f64 = 255.0;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Summed-area table with a zero first row and column.
struct Integral {
    width: usize,
    values: Vec<f64>,
}

impl Integral {
    fn build(width: u32, height: u32, value: impl Fn(u32, u32) -> f64) -> Self {
        let w = width as usize + 1;
        let mut values = vec![0.0; w * (height as usize + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(x, y);
                let i = (y as usize + 1) * w + x as usize + 1;
                values[i] = values[i - w] + row;
            }
        }
        Self { width: w, values }
    }

    /// Sum over the window with top-left corner `(x, y)`.
    fn window(&self, x: usize, y: usize, size: usize) -> f64 {
        let w = self.width;
        let (x1, y1) = (x + size, y + size);
        self.values[y1 * w + x1] - self.values[y * w + x1] - self.values[y1 * w + x]
            + self.values[y * w + x]
    }
}

/// Mean SSIM of two equally sized images.
///
/// Returns `None` when the sizes differ or an image is smaller than the
/// window.
pub fn ssim(a: &GrayImage, b: &GrayImage) -> Option<f64> {
    if a.dimensions() != b.dimensions() {
        return None;
    }
    let (width, height) = a.dimensions();
    if width < WINDOW || height < WINDOW {
        return None;
    }

    let pa = |x, y| a.get_pixel(x, y).0[0] as f64;
    let pb = |x, y| b.get_pixel(x, y).0[0] as f64;

    let sum_a = Integral::build(width, height, pa);
    let sum_b = Integral::build(width, height, pb);
    let sum_aa = Integral::build(width, height, |x, y| pa(x, y) * pa(x, y));
    let sum_bb = Integral::build(width, height, |x, y| pb(x, y) * pb(x, y));
    let sum_ab = Integral::build(width, height, |x, y| pa(x, y) * pb(x, y));

    let size = WINDOW as usize;
    let n = (size * size) as f64;
    let cov_norm = n / (n - 1.0);
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let mut total = 0.0;
    let mut count = 0usize;
    for y in 0..=(height as usize - size) {
        for x in 0..=(width as usize - size) {
            let mean_a = sum_a.window(x, y, size) / n;
            let mean_b = sum_b.window(x, y, size) / n;
            let var_a = cov_norm * (sum_aa.window(x, y, size) / n - mean_a * mean_a);
            let var_b = cov_norm * (sum_bb.window(x, y, size) / n - mean_b * mean_b);
            let cov = cov_norm * (sum_ab.window(x, y, size) / n - mean_a * mean_b);

            let numerator = (2.0 * mean_a * mean_b + c1) * (2.0 * cov + c2);
            let denominator = (mean_a * mean_a + mean_b * mean_b + c1) * (var_a + var_b + c2);
            total += numerator / denominator;
            count += 1;
        }
    }

    Some(total / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]))
    }

    #[test]
    fn test_identical_images_score_one() {
        let img = gradient(40, 30);
        let score = ssim(&img, &img).unwrap();
        assert!((score - 1.0).abs() < 1e-9, "score was {}", score);
    }

    #[test]
    fn test_inverted_image_scores_low() {
        let img = gradient(40, 30);
        let mut inverted = img.clone();
        image::imageops::invert(&mut inverted);
        let score = ssim(&img, &inverted).unwrap();
        assert!(score < 0.2, "score was {}", score);
    }

    #[test]
    fn test_noise_lowers_score() {
        let img = gradient(40, 30);
        let noisy = GrayImage::from_fn(40, 30, |x, y| {
            let base = img.get_pixel(x, y).0[0] as i32;
            let offset = if (x + y) % 2 == 0 { 25 } else { -25 };
            Luma([(base + offset).clamp(0, 255) as u8])
        });
        let score = ssim(&img, &noisy).unwrap();
        assert!(score < 0.99 && score > 0.0, "score was {}", score);
    }

    #[test]
    fn test_size_mismatch_and_small_images() {
        assert!(ssim(&gradient(10, 10), &gradient(11, 10)).is_none());
        assert!(ssim(&gradient(6, 10), &gradient(6, 10)).is_none());
    }
}
