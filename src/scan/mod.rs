//! Scan loops: continuous camera sampling and single-pass image decoding.

mod live;
mod result;
mod still;

pub use live::{
    start_camera_scan, ErrorCallback, ResultCallback, ScanCallbacks, ScanHandle, ScanLoop,
    ScanOptions,
};
pub use result::DecodedResult;
pub use still::{decode_static_image, decode_static_image_with};

pub(crate) use still::decode_still;
