use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};
use qrcode::QrCode;
use qrscan::normalize::{FrameInput, Normalizer, PixelBuffer};
use qrscan::{decode_frame, Capabilities, DecodeChain};

fn qr_buffer(payload: &str, size: u32) -> PixelBuffer {
    let code = QrCode::new(payload.as_bytes()).unwrap();
    let module = (size / (code.width() as u32 + 8)).max(1);
    let rendered = code
        .render::<Luma<u8>>()
        .module_dimensions(module, module)
        .build();
    let mut canvas = GrayImage::from_pixel(size, size, Luma([255]));
    let offset = ((size - rendered.width()) / 2) as i64;
    image::imageops::overlay(&mut canvas, &rendered, offset, offset);
    PixelBuffer::from_gray(canvas)
}

fn bench_decode(c: &mut Criterion) {
    let hello = qr_buffer("HELLO", 200);
    let url = qr_buffer("https://example.com/a/longer/path?with=query&and=more", 640);
    let blank = PixelBuffer::from_gray(GrayImage::from_pixel(640, 640, Luma([255])));

    c.bench_function("decode_frame_hello_200", |b| b.iter(|| decode_frame(black_box(&hello))));
    c.bench_function("decode_frame_url_640", |b| b.iter(|| decode_frame(black_box(&url))));
    c.bench_function("decode_frame_blank_640", |b| b.iter(|| decode_frame(black_box(&blank))));

    let large = qr_buffer("downscaled", 2400);
    let normalizer = Normalizer::default();
    let chain = DecodeChain::still(&Capabilities::none(), true);
    c.bench_function("normalize_and_decode_2400", |b| {
        b.iter(|| {
            let frame = normalizer
                .normalize(FrameInput::Bitmap(black_box(&large)))
                .unwrap()
                .unwrap();
            chain.decode(&frame)
        })
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
