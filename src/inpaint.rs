//! Region masks and inpainting for removing objects from a background frame

use crate::error::{Error, Result};
use crate::frame::Frame;
use ndarray::Array2;

/// Pixels to be replaced by inpainting (`true` = masked)
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    mask: Array2<bool>,
}

impl RegionMask {
    pub fn from_array(mask: Array2<bool>) -> Self {
        Self { mask }
    }

    /// Rasterize a closed polygon given as (x, y) vertices in pixel units
    ///
    /// A pixel is masked when its center lies inside the polygon (even-odd rule).
    pub fn from_polygon(height: usize, width: usize, vertices: &[(f32, f32)]) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(Error::Config(format!(
                "polygon mask needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        let mask = Array2::from_shape_fn((height, width), |(row, col)| {
            point_in_polygon(col as f32 + 0.5, row as f32 + 0.5, vertices)
        });
        Ok(Self { mask })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.mask.dim()
    }

    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.mask
    }
}

fn point_in_polygon(x: f32, y: f32, vertices: &[(f32, f32)]) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Fill masked pixels from their unmasked surroundings
///
/// Works from the mask boundary inward. In each pass every masked pixel
/// touching a known pixel takes the inverse-square-distance weighted mean of
/// the known pixels within `radius`; those pixels then count as known for
/// the next pass.
pub fn inpaint(image: &Frame, mask: &RegionMask, radius: usize) -> Result<Frame> {
    if image.dim() != mask.dim() {
        return Err(Error::ShapeMismatch {
            expected: image.dim(),
            actual: mask.dim(),
        });
    }
    if radius == 0 {
        return Err(Error::Config("inpaint radius must be > 0".into()));
    }
    let remaining = mask.masked_count();
    if remaining == 0 {
        return Ok(image.clone());
    }
    if remaining == image.len() {
        return Err(Error::Config(
            "inpaint mask covers the whole frame, nothing to fill from".into(),
        ));
    }

    let (height, width) = image.dim();
    let mut out = image.clone();
    let mut known = mask.as_array().mapv(|m| !m);
    let mut passes = 0;

    loop {
        let front: Vec<(usize, usize)> = known
            .indexed_iter()
            .filter(|&((r, c), &k)| !k && touches_known(&known, r, c))
            .map(|(idx, _)| idx)
            .collect();
        if front.is_empty() {
            break;
        }

        let filled: Vec<f32> = front
            .iter()
            .map(|&(r, c)| weighted_fill(&out, &known, r, c, radius))
            .collect();
        for (&(r, c), value) in front.iter().zip(filled) {
            out[[r, c]] = value;
            known[[r, c]] = true;
        }
        passes += 1;
    }

    tracing::debug!(
        "inpainted {} pixels of a {}x{} frame in {} passes",
        remaining,
        width,
        height,
        passes
    );
    Ok(out)
}

fn neighborhood(
    center: (usize, usize),
    radius: usize,
    dim: (usize, usize),
) -> impl Iterator<Item = (usize, usize)> {
    let (r, c) = center;
    let rows = r.saturating_sub(radius)..(r + radius + 1).min(dim.0);
    let cols = c.saturating_sub(radius)..(c + radius + 1).min(dim.1);
    rows.flat_map(move |rr| cols.clone().map(move |cc| (rr, cc)))
        .filter(move |&p| p != center)
}

fn touches_known(known: &Array2<bool>, r: usize, c: usize) -> bool {
    neighborhood((r, c), 1, known.dim()).any(|p| known[p])
}

fn weighted_fill(image: &Frame, known: &Array2<bool>, r: usize, c: usize, radius: usize) -> f32 {
    let mut sum = 0.0f32;
    let mut weight_sum = 0.0f32;
    for (rr, cc) in neighborhood((r, c), radius, known.dim()) {
        if !known[[rr, cc]] {
            continue;
        }
        let dr = rr as f32 - r as f32;
        let dc = cc as f32 - c as f32;
        let weight = 1.0 / (dr * dr + dc * dc);
        sum += weight * image[[rr, cc]];
        weight_sum += weight;
    }
    // a front pixel always has a known 8-neighbor, so weight_sum > 0
    sum / weight_sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_rasterization() {
        let mask = RegionMask::from_polygon(6, 6, &[(1.0, 1.0), (4.0, 1.0), (4.0, 4.0), (1.0, 4.0)])
            .unwrap();
        assert_eq!(mask.masked_count(), 9);
        assert!(mask.as_array()[[2, 2]]);
        assert!(!mask.as_array()[[0, 0]]);
        assert!(!mask.as_array()[[4, 4]]);
    }

    #[test]
    fn test_polygon_needs_three_vertices() {
        assert!(RegionMask::from_polygon(4, 4, &[(0.0, 0.0), (1.0, 1.0)]).is_err());
    }

    #[test]
    fn test_constant_surround_fills_constant() {
        let mut image = Frame::from_elem((7, 7), 0.6);
        let mut mask = Array2::from_elem((7, 7), false);
        for r in 2..5 {
            for c in 2..5 {
                image[[r, c]] = 0.0;
                mask[[r, c]] = true;
            }
        }

        let out = inpaint(&image, &RegionMask::from_array(mask), 3).unwrap();
        assert!(out.iter().all(|&v| (v - 0.6).abs() < 1e-6));
    }

    #[test]
    fn test_unmasked_pixels_untouched() {
        let image = Frame::from_shape_fn((5, 5), |(r, c)| (r * 5 + c) as f32 / 25.0);
        let mut mask = Array2::from_elem((5, 5), false);
        mask[[2, 2]] = true;

        let out = inpaint(&image, &RegionMask::from_array(mask.clone()), 1).unwrap();
        for ((idx, &m), (&before, &after)) in
            mask.indexed_iter().zip(image.iter().zip(out.iter()))
        {
            if !m {
                assert_eq!(before, after, "pixel {idx:?} changed");
            }
        }
        // center of a linear ramp is the mean of its symmetric neighbors
        assert!((out[[2, 2]] - image[[2, 2]]).abs() < 1e-6);
    }

    #[test]
    fn test_full_mask_rejected() {
        let image = Frame::zeros((3, 3));
        let mask = RegionMask::from_array(Array2::from_elem((3, 3), true));
        assert!(matches!(inpaint(&image, &mask, 3), Err(Error::Config(_))));
    }
}
