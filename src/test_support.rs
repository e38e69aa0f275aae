//! Fixtures shared by unit tests.

use crate::capture::Frame;
use crate::normalize::PixelFormat;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;

/// Renders `payload` centered on a white `size`×`size` canvas.
pub(crate) fn qr_gray(payload: &str, size: u32) -> GrayImage {
    let code = QrCode::new(payload.as_bytes()).expect("payload fits in a QR code");
    let modules = code.width() as u32 + 8;
    let module = (size / modules).max(1);
    let rendered = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(module, module)
        .build();

    let mut canvas = GrayImage::from_pixel(size, size, Luma([255]));
    let x = size.saturating_sub(rendered.width()) / 2;
    let y = size.saturating_sub(rendered.height()) / 2;
    image::imageops::overlay(&mut canvas, &rendered, x as i64, y as i64);
    canvas
}

/// A gray camera frame carrying `payload`.
pub(crate) fn qr_frame(payload: &str, size: u32) -> Frame {
    let image = qr_gray(payload, size);
    Frame::new(image.into_raw(), size, size, PixelFormat::Gray8, 0)
}

/// PNG bytes of `image`.
pub(crate) fn png_bytes(image: GrayImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("PNG encoding succeeds");
    bytes.into_inner()
}
