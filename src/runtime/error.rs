use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

/// Raised while building a runtime, before any pixel is processed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingError {
    #[error("No binding supplied for image `{name}`")]
    Missing { name: String },
    #[error("Binding `{name}` does not match any image parameter")]
    Unexpected { name: String },
    #[error("Source image `{name}` is bound to an image that cannot be read")]
    NotReadable { name: String },
    #[error("Destination image `{name}` is bound to an image that cannot be written")]
    NotWritable { name: String },
    #[error(
        "Destination image `{name}` is {width}x{height} but the domain is {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        name: String,
        width: usize,
        height: usize,
        expected_width: usize,
        expected_height: usize,
    },
    #[error("Script declares no destination image, so there is no domain to evaluate")]
    NoDestination,
}

/// Raised while evaluating a pixel.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("Pixel ({x}, {y}) is outside the {width}x{height} domain")]
    PixelOutsideDomain {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("Read of `{name}` at ({x}, {y}) is outside the image")]
    OutsideImage { name: String, x: f64, y: f64 },
    #[error("Band {band} of `{name}` is out of range, image has {bands} band(s)")]
    BandOutOfRange { name: String, band: f64, bands: usize },
    #[error("Local `{name}` was read before being assigned")]
    UnsetLocal { name: String },
    #[error("Destination `{name}` band {band} was read before being written for this pixel")]
    DestNotWritten { name: String, band: usize },
    #[error("Internal evaluation error: {message}")]
    Internal { message: String },
}
