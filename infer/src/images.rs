//! Image decoding and tensor conversion for the inference driver.

use std::path::Path;

use anyhow::Context;
use image::imageops::FilterType;
use ndarray::Array4;

/// Decodes each image, resizes it to `(h, w)` and stacks the batch into
/// an NHWC tensor of RGB values scaled to `[0, 1]`.
pub fn load_images<P: AsRef<Path>>(paths: &[P], h: usize, w: usize) -> anyhow::Result<Array4<f32>> {
    let mut batch = Array4::zeros((paths.len(), h, w, 3));
    for (i, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let img = image::open(path)
            .with_context(|| format!("failed to open image {}", path.display()))?
            .resize_exact(w as u32, h as u32, FilterType::Triangle)
            .to_rgb8();
        for (x, y, pixel) in img.enumerate_pixels() {
            for c in 0..3 {
                batch[[i, y as usize, x as usize, c]] = pixel.0[c] as f32 / 255.0;
            }
        }
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_land_as_unit_scaled_nhwc_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]));
        img.save(&path).unwrap();

        let batch = load_images(&[&path], 2, 2).unwrap();
        assert_eq!(batch.dim(), (1, 2, 2, 3));
        assert!((batch[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(batch[[0, 0, 0, 1]], 0.0);
        assert_eq!(batch[[0, 0, 0, 2]], 0.0);
    }

    #[test]
    fn missing_files_name_the_path() {
        let err = load_images(&["no/such/file.png"], 2, 2).unwrap_err();
        assert!(err.to_string().contains("no/such/file.png"));
    }
}
