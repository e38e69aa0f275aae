//! End-to-end scanning through the public API.

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::QrCode;
use qrscan::capture::{Camera, CameraProvider, DeviceTracker, Frame, MockCamera};
use qrscan::config::ScannerConfig;
use qrscan::decode::{Capabilities, DecodeChain};
use qrscan::normalize::{Normalizer, PixelBuffer, PixelFormat};
use qrscan::scan::{decode_static_image, start_camera_scan, ScanCallbacks, ScanOptions};
use qrscan::session::{ScanMode, ScannerSession, SessionState, SessionUpdate};
use qrscan::{decode_frame, ScanError};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

fn render(payload: &str, size: u32) -> GrayImage {
    let code = QrCode::new(payload.as_bytes()).unwrap();
    let module = (size / (code.width() as u32 + 8)).max(1);
    let rendered = code
        .render::<Luma<u8>>()
        .module_dimensions(module, module)
        .build();
    let mut canvas = GrayImage::from_pixel(size, size, Luma([255]));
    let x = (size - rendered.width()) / 2;
    let y = (size - rendered.height()) / 2;
    image::imageops::overlay(&mut canvas, &rendered, x as i64, y as i64);
    canvas
}

fn encode(image: GrayImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image).write_to(&mut out, format).unwrap();
    out.into_inner()
}

#[test]
fn hello_bitmap_decodes() {
    let buffer = PixelBuffer::from_gray(render("HELLO", 200));
    assert_eq!(decode_frame(&buffer).as_deref(), Some("HELLO"));
}

#[test]
fn blank_white_bitmap_has_no_code() {
    let buffer = PixelBuffer::new(200, 200, PixelFormat::Gray8, vec![255; 200 * 200]).unwrap();
    assert_eq!(decode_frame(&buffer), None);
}

#[test]
fn static_png_and_jpeg_decode() {
    let payload = "https://example.org/ticket/42";
    for format in [ImageFormat::Png, ImageFormat::Jpeg] {
        let bytes = encode(render(payload, 320), format);
        assert_eq!(decode_static_image(&bytes).unwrap(), payload);
    }
}

#[test]
fn static_blank_image_reports_no_code() {
    let blank = encode(GrayImage::from_pixel(300, 300, Luma([255])), ImageFormat::Png);
    assert_eq!(decode_static_image(&blank), Err(ScanError::NoCodeFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn camera_scan_delivers_one_result() {
    let tracker = DeviceTracker::new();
    let camera = MockCamera::with_frames(vec![Frame::from_image(
        &DynamicImage::ImageLuma8(render("live", 240)),
        0,
    )])
    .with_tracker(tracker.clone());
    let (tx, rx) = tokio::sync::oneshot::channel();

    let handle = start_camera_scan(
        Box::new(camera),
        Arc::new(DecodeChain::live(&Capabilities::none())),
        Normalizer::default(),
        ScanCallbacks::new(
            move |result| {
                let _ = tx.send(result);
            },
            |e| panic!("unexpected error: {e}"),
        ),
        ScanOptions {
            sample_interval: Duration::from_millis(5),
            ..ScanOptions::default()
        },
    );

    let result = tokio::time::timeout(Duration::from_secs(10), rx).await.unwrap().unwrap();
    assert_eq!(result.text(), "live");
    assert!(handle.is_stopped());
    assert_eq!(tracker.open_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn session_camera_then_upload() {
    let tracker = DeviceTracker::new();
    let frame = Frame::from_image(&DynamicImage::ImageLuma8(render("first", 240)), 0);
    let cameras: Arc<dyn CameraProvider> = {
        let tracker = tracker.clone();
        Arc::new(move || -> Box<dyn Camera + Send> {
            Box::new(MockCamera::with_frames(vec![frame.clone()]).with_tracker(tracker.clone()))
        })
    };
    let config = ScannerConfig::from_toml(
        r#"
        [capture]
        width = 320
        height = 240

        [decode]
        sample_interval_ms = 5
        "#,
    )
    .unwrap();

    let mut session = ScannerSession::new(config, cameras, None);
    session.start(ScanMode::Camera).unwrap();

    let update = tokio::time::timeout(Duration::from_secs(10), session.next_event())
        .await
        .unwrap();
    let SessionUpdate::Result(first) = update else {
        panic!("expected a camera result, got {update:?}");
    };
    assert_eq!(first.text(), "first");
    assert_eq!(tracker.open_count(), 0);

    session.scan_again(Some(ScanMode::Upload)).unwrap();
    assert_eq!(session.state(), &SessionState::Scanning(ScanMode::Upload));
    assert_eq!(tracker.opened_total(), 1);

    let second = session
        .submit_image(&encode(render("second", 240), ImageFormat::Png))
        .unwrap();
    assert_eq!(second.text(), "second");
    assert!(second.cycle() > first.cycle());

    session.shutdown();
    assert_eq!(session.state(), &SessionState::Idle);
}
