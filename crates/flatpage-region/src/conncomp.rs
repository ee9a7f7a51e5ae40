//! Connected component analysis
//!
//! Two-pass labeling with a union-find forest. Labels are consecutive,
//! start at 1, and follow raster order of each component's first pixel.

use crate::error::{RegionError, RegionResult};
use flatpage_core::{Box, Pix, PixelDepth};

/// Connectivity type for component analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectivityType {
    /// 4-way connectivity (up, down, left, right)
    #[default]
    FourWay,
    /// 8-way connectivity (includes diagonals)
    EightWay,
}

/// A connected component in an image
#[derive(Debug, Clone)]
pub struct ConnectedComponent {
    /// Unique label for this component
    pub label: u32,
    /// Number of pixels in this component
    pub pixel_count: u32,
    /// Bounding box of this component
    pub bounds: Box,
}

impl ConnectedComponent {
    /// Create a new connected component
    pub fn new(label: u32, pixel_count: u32, bounds: Box) -> Self {
        Self {
            label,
            pixel_count,
            bounds,
        }
    }
}

struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        // Slot 0 is the background.
        Self { parent: vec![0] }
    }

    fn make_set(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grand = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grand;
            x = grand;
        }
        x
    }

    fn union(&mut self, a: u32, b: u32) -> u32 {
        let ra = self.find(a);
        let rb = self.find(b);
        let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[drop as usize] = keep;
        keep
    }
}

fn check_binary(pix: &Pix) -> RegionResult<()> {
    if pix.depth() != PixelDepth::Bit1 {
        return Err(RegionError::UnsupportedDepth {
            expected: "1 bpp",
            actual: pix.depth().bits(),
        });
    }
    Ok(())
}

/// Label foreground pixels; returns a row-major label buffer and components.
fn label_pixels(
    pix: &Pix,
    connectivity: ConnectivityType,
) -> RegionResult<(Vec<u32>, Vec<ConnectedComponent>)> {
    check_binary(pix)?;
    let w = pix.width() as usize;
    let h = pix.height() as usize;
    let mut labels = vec![0u32; w * h];
    let mut sets = UnionFind::new();

    for y in 0..h {
        for x in 0..w {
            if pix.get_pixel_unchecked(x as u32, y as u32) == 0 {
                continue;
            }
            let mut current = 0u32;
            let mut neighbor = |nx: usize, ny: usize, current: &mut u32| {
                let l = labels[ny * w + nx];
                if l != 0 {
                    *current = if *current == 0 {
                        sets.find(l)
                    } else {
                        sets.union(*current, l)
                    };
                }
            };
            if x > 0 {
                neighbor(x - 1, y, &mut current);
            }
            if y > 0 {
                neighbor(x, y - 1, &mut current);
                if connectivity == ConnectivityType::EightWay {
                    if x > 0 {
                        neighbor(x - 1, y - 1, &mut current);
                    }
                    if x + 1 < w {
                        neighbor(x + 1, y - 1, &mut current);
                    }
                }
            }
            if current == 0 {
                current = sets.make_set();
            }
            labels[y * w + x] = current;
        }
    }

    // Second pass: resolve roots to consecutive labels and measure.
    let mut remap = vec![0u32; sets.parent.len()];
    let mut components: Vec<ConnectedComponent> = Vec::new();
    let mut extents: Vec<(i32, i32, i32, i32)> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if labels[idx] == 0 {
                continue;
            }
            let root = sets.find(labels[idx]) as usize;
            if remap[root] == 0 {
                components.push(ConnectedComponent::new(
                    components.len() as u32 + 1,
                    0,
                    Box::default(),
                ));
                extents.push((x as i32, y as i32, x as i32, y as i32));
                remap[root] = components.len() as u32;
            }
            let label = remap[root];
            labels[idx] = label;
            let k = (label - 1) as usize;
            components[k].pixel_count += 1;
            let e = &mut extents[k];
            e.0 = e.0.min(x as i32);
            e.1 = e.1.min(y as i32);
            e.2 = e.2.max(x as i32);
            e.3 = e.3.max(y as i32);
        }
    }
    for (comp, (x0, y0, x1, y1)) in components.iter_mut().zip(extents) {
        comp.bounds = Box::new_unchecked(x0, y0, x1 - x0 + 1, y1 - y0 + 1);
    }
    Ok((labels, components))
}

/// Find all connected components in a binary image
///
/// Returns a vector of connected components, each with a label, pixel count,
/// and bounding box.
pub fn find_connected_components(
    pix: &Pix,
    connectivity: ConnectivityType,
) -> RegionResult<Vec<ConnectedComponent>> {
    Ok(label_pixels(pix, connectivity)?.1)
}

/// Label all connected components in a binary image
///
/// Returns a 32-bit image where each pixel contains the label of its
/// component (0 for background).
pub fn label_connected_components(pix: &Pix, connectivity: ConnectivityType) -> RegionResult<Pix> {
    Ok(label_with_components(pix, connectivity)?.0)
}

/// Label an image and return the label map together with the components.
///
/// `components[i].label == i + 1`.
pub fn label_with_components(
    pix: &Pix,
    connectivity: ConnectivityType,
) -> RegionResult<(Pix, Vec<ConnectedComponent>)> {
    let (labels, components) = label_pixels(pix, connectivity)?;
    let w = pix.width();
    let mut out = Pix::new(w, pix.height(), PixelDepth::Bit32)?.to_mut();
    for (i, &l) in labels.iter().enumerate() {
        if l != 0 {
            out.set_pixel_unchecked(i as u32 % w, i as u32 / w, l);
        }
    }
    Ok((out.into(), components))
}
