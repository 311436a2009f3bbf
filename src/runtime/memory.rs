use super::binding::{ImageAccess, ImageBinding};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug)]
struct Raster {
    width: usize,
    height: usize,
    bands: usize,
    data: Vec<f64>,
}

impl Raster {
    fn offset(&self, x: usize, y: usize, band: usize) -> usize {
        (band * self.height + y) * self.width + x
    }
}

/// In-memory band-sequential raster.
///
/// Clones share storage, so a clone can be bound as a destination and the
/// results read back through any other handle after evaluation. Disjoint regions
/// may be written from several threads at once.
#[derive(Clone, Debug)]
pub struct MemoryImage {
    raster: Arc<RwLock<Raster>>,
    access: ImageAccess,
}

impl MemoryImage {
    /// Zero-filled image.
    pub fn new(width: usize, height: usize, bands: usize) -> Self {
        Self::from_fn(width, height, bands, |_, _, _| 0.0)
    }

    pub fn from_fn(
        width: usize,
        height: usize,
        bands: usize,
        mut value: impl FnMut(usize, usize, usize) -> f64,
    ) -> Self {
        let mut data = Vec::with_capacity(width * height * bands);
        for band in 0..bands {
            for y in 0..height {
                for x in 0..width {
                    data.push(value(x, y, band));
                }
            }
        }
        Self {
            raster: Arc::new(RwLock::new(Raster {
                width,
                height,
                bands,
                data,
            })),
            access: ImageAccess::ReadWrite,
        }
    }

    /// Single-band image from rows of equal length.
    pub fn from_rows(rows: &[&[f64]]) -> Self {
        let width = rows.first().map_or(0, |row| row.len());
        Self::from_fn(width, rows.len(), 1, |x, y, _| {
            rows[y].get(x).copied().unwrap_or(f64::NAN)
        })
    }

    /// Handle onto the same storage with restricted access.
    pub fn with_access(&self, access: ImageAccess) -> Self {
        Self {
            raster: Arc::clone(&self.raster),
            access,
        }
    }

    pub fn get(&self, x: usize, y: usize, band: usize) -> Option<f64> {
        let raster = self.raster.read().unwrap_or_else(PoisonError::into_inner);
        if x >= raster.width || y >= raster.height || band >= raster.bands {
            return None;
        }
        Some(raster.data[raster.offset(x, y, band)])
    }

    /// Values of one band in row-major order.
    pub fn band(&self, band: usize) -> Vec<Vec<f64>> {
        let raster = self.raster.read().unwrap_or_else(PoisonError::into_inner);
        if band >= raster.bands {
            return Vec::new();
        }
        (0..raster.height)
            .map(|y| {
                (0..raster.width)
                    .map(|x| raster.data[raster.offset(x, y, band)])
                    .collect()
            })
            .collect()
    }
}

impl ImageBinding for MemoryImage {
    fn width(&self) -> usize {
        self.raster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .width
    }

    fn height(&self) -> usize {
        self.raster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .height
    }

    fn band_count(&self) -> usize {
        self.raster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bands
    }

    fn access(&self) -> ImageAccess {
        self.access
    }

    fn read(&self, x: usize, y: usize, band: usize) -> f64 {
        self.get(x, y, band).unwrap_or(f64::NAN)
    }

    fn write(&mut self, x: usize, y: usize, band: usize, value: f64) {
        let mut raster = self.raster.write().unwrap_or_else(PoisonError::into_inner);
        if x < raster.width && y < raster.height && band < raster.bands {
            let offset = raster.offset(x, y, band);
            raster.data[offset] = value;
        }
    }
}
