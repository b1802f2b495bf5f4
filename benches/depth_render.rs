use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tof_capture::depth_pipeline::{
    DepthRenderer, PipelineConfig, RawDepthFrame, RotationClass, StreamFileHeader,
};

fn generate_mock_depth_frame(width: usize, height: usize) -> RawDepthFrame {
    let samples = (0..width * height)
        .map(|i| {
            let confidence = (i % 8) as u16;
            let range = (i % 5000) as u16;
            (confidence << 13) | range
        })
        .collect();
    RawDepthFrame::new(samples, width, height).unwrap()
}

fn benchmark_render_by_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_by_rotation");
    let config = PipelineConfig::default();
    let renderer = DepthRenderer::new(&config);
    let frame = generate_mock_depth_frame(config.sensor_width, config.sensor_height);

    for (rotation, label) in [
        (RotationClass::Natural, "natural"),
        (RotationClass::Rotated90, "rotated90"),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &frame, |b, frame| {
            b.iter(|| {
                let _ = renderer.render(black_box(frame), rotation, false);
            });
        });
    }

    group.finish();
}

fn benchmark_ranging_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranging_modes");
    let config = PipelineConfig::builder().confidence_threshold(0.3).build();
    let renderer = DepthRenderer::new(&config);
    let frame = generate_mock_depth_frame(config.sensor_width, config.sensor_height);

    for (dynamic, label) in [(false, "static"), (true, "dynamic")] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &frame, |b, frame| {
            b.iter(|| {
                let _ = renderer.render(black_box(frame), RotationClass::Natural, dynamic);
            });
        });
    }

    group.finish();
}

fn benchmark_header_codec(c: &mut Criterion) {
    let header = StreamFileHeader::dynamic(0, 310, 205, 2);
    c.bench_function("header_encode_decode", |b| {
        b.iter(|| {
            let bytes = black_box(header).encode();
            let _ = StreamFileHeader::decode(&bytes);
        });
    });
}

criterion_group!(
    benches,
    benchmark_render_by_rotation,
    benchmark_ranging_modes,
    benchmark_header_codec
);
criterion_main!(benches);
