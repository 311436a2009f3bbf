use super::error::BindingError;
use crate::codegen::CompiledProcedure;
use crate::language::roles::ImageRole;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl ImageAccess {
    pub fn can_read(self) -> bool {
        matches!(self, ImageAccess::ReadOnly | ImageAccess::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, ImageAccess::WriteOnly | ImageAccess::ReadWrite)
    }
}

/// Raster storage supplied by the caller. Coordinates and bands passed to
/// `read` and `write` are always within the reported extent.
pub trait ImageBinding: Send {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn band_count(&self) -> usize;

    fn access(&self) -> ImageAccess {
        ImageAccess::ReadWrite
    }

    fn read(&self, x: usize, y: usize, band: usize) -> f64;
    fn write(&mut self, x: usize, y: usize, band: usize, value: f64);
}

/// Images keyed by parameter name, handed to `build_runtime`.
#[derive(Default)]
pub struct Bindings {
    images: BTreeMap<String, Box<dyn ImageBinding>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: impl Into<String>, image: impl ImageBinding + 'static) -> Self {
        self.insert(name, Box::new(image));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, image: Box<dyn ImageBinding>) {
        self.images.insert(name.into(), image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    /// Orders the bindings by image slot and checks them against the
    /// procedure's parameters. The shared extent of the destinations is the
    /// evaluation domain.
    pub(crate) fn resolve(
        mut self,
        procedure: &CompiledProcedure,
    ) -> Result<BoundImages, BindingError> {
        if let Some(name) = self
            .images
            .keys()
            .find(|name| procedure.image_index(name).is_none())
        {
            return Err(BindingError::Unexpected { name: name.clone() });
        }

        let mut domain: Option<(usize, usize)> = None;
        let mut images = Vec::with_capacity(procedure.images.len());
        for slot in &procedure.images {
            let image = self
                .images
                .remove(&slot.name)
                .ok_or_else(|| BindingError::Missing {
                    name: slot.name.clone(),
                })?;
            match slot.role {
                ImageRole::Source if !image.access().can_read() => {
                    return Err(BindingError::NotReadable {
                        name: slot.name.clone(),
                    })
                }
                ImageRole::Dest if !image.access().can_write() => {
                    return Err(BindingError::NotWritable {
                        name: slot.name.clone(),
                    })
                }
                ImageRole::Dest => {
                    let extent = (image.width(), image.height());
                    match domain {
                        None => domain = Some(extent),
                        Some(expected) if extent != expected => {
                            return Err(BindingError::DimensionMismatch {
                                name: slot.name.clone(),
                                width: extent.0,
                                height: extent.1,
                                expected_width: expected.0,
                                expected_height: expected.1,
                            })
                        }
                        Some(_) => {}
                    }
                }
                ImageRole::Source => {}
            }
            images.push(image);
        }

        let (width, height) = domain.ok_or(BindingError::NoDestination)?;
        Ok(BoundImages {
            images,
            width,
            height,
        })
    }
}

pub(crate) struct BoundImages {
    pub images: Vec<Box<dyn ImageBinding>>,
    pub width: usize,
    pub height: usize,
}
