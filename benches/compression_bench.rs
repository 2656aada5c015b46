use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use media_uploader::processing::{compress_bytes, resize_image};
use media_uploader::{validate_batch, BatchPolicy, CompressionOptions, FileHandle, OutputFormat};
use std::io::Cursor;

fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    });
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn bench_compression_options_creation(c: &mut Criterion) {
    c.bench_function("compression_options_creation", |b| {
        b.iter(|| {
            CompressionOptions::new(
                black_box(Some(0.85)),
                black_box(Some(800)),
                black_box(Some(600)),
                black_box(Some("image/webp")),
            )
        })
    });
}

fn bench_image_resizing(c: &mut Criterion) {
    let mut group = c.benchmark_group("image_resizing");

    for size in [Small, Medium, Large].iter() {
        let (width, height) = match size {
            Small => (800, 600),
            Medium => (1920, 1080),
            Large => (3840, 2160),
        };

        let img = DynamicImage::new_rgb8(width, height);
        let options = CompressionOptions {
            max_width: width / 2,
            max_height: height / 2,
            ..CompressionOptions::default()
        };

        group.bench_with_input(
            BenchmarkId::new("resize", format!("{}x{}", width, height)),
            &(img, options),
            |b, (img, options)| {
                b.iter(|| {
                    let mut img = img.clone();
                    resize_image(black_box(&mut img), black_box(options));
                })
            },
        );
    }

    group.finish();
}

fn bench_compress_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_bytes");
    group.sample_size(10);
    let source = create_test_png(1280, 720);

    for format in [OutputFormat::Jpeg, OutputFormat::WebP, OutputFormat::Png] {
        let options = CompressionOptions {
            max_width: 640,
            max_height: 360,
            format,
            ..CompressionOptions::default()
        };
        group.bench_with_input(
            BenchmarkId::new("encode", format),
            &options,
            |b, options| b.iter(|| compress_bytes(black_box(&source), black_box(options))),
        );
    }

    group.finish();
}

fn bench_batch_validation(c: &mut Criterion) {
    let files: Vec<FileHandle> = (0..100)
        .map(|i| {
            let mime = if i % 3 == 0 { "application/zip" } else { "image/png" };
            FileHandle::new(format!("file_{}.bin", i), mime, vec![0u8; 1024])
        })
        .collect();
    let policy = BatchPolicy {
        max_files: 200,
        ..BatchPolicy::default()
    };

    c.bench_function("validate_batch_100", |b| {
        b.iter(|| validate_batch(black_box(&files), black_box(&policy)))
    });
}

enum ImageSize {
    Small,
    Medium,
    Large,
}

use ImageSize::*;

criterion_group!(
    benches,
    bench_compression_options_creation,
    bench_image_resizing,
    bench_compress_bytes,
    bench_batch_validation
);
criterion_main!(benches);
