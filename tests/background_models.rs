use std::fs::File;
use std::path::Path;

use image::{GrayImage, Luma};
use ndarray::Array2;
use ndarray_npy::WriteNpyExt;
use tempfile::TempDir;

use video_background::sampler::sample_indices;
use video_background::{
    AggregationMethod, BackgroundModel, ChunkedSettings, ChunkedStatic, Error, ImageSequence,
    InpaintSettings, InpaintedStatic, MemorySource, NoSubtraction, OffloadedStreaming, Polarity,
    RawFrame, RegionMask, SampledSettings, SampledStatic, SlidingWindow, SlidingWindowSettings,
    StaticImage, StreamingSettings, VideoSource,
};

fn uniform(value: u8) -> RawFrame {
    RawFrame::gray_u8(Array2::from_elem((3, 3), value))
}

/// Frames of a dark scene crossed by a bright 2x2 block moving left to right
fn write_moving_block(dir: &Path, frames: u32) {
    for i in 0..frames {
        let x0 = i % 6;
        let image = GrayImage::from_fn(8, 6, |x, y| {
            if (x0..x0 + 2).contains(&x) && (2..4).contains(&y) {
                Luma([230])
            } else {
                Luma([20])
            }
        });
        image.save(dir.join(format!("frame_{i:04}.png"))).unwrap();
    }
}

#[test]
fn static_npy_background_respects_polarity() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("background.npy");
    Array2::<u8>::from_elem((3, 3), 127)
        .write_npy(File::create(&path).unwrap())
        .unwrap();

    let mut model = StaticImage::new(&path);
    model.initialize().unwrap();

    let expected = (200.0 - 127.0) / 255.0;
    let bright = model.subtract(&uniform(200)).unwrap();
    assert!(bright.iter().all(|&v| (v - expected).abs() < 1e-5));

    model.set_polarity(Polarity::DarkOnBright);
    let dark = model.subtract(&uniform(200)).unwrap();
    assert!(dark.iter().all(|&v| v == 0.0));
}

#[test]
fn sampling_a_thousand_frames_hits_both_ends() {
    let indices = sample_indices(1000, 500, None).unwrap();
    assert_eq!(indices.len(), 500);
    assert_eq!(indices[0], 0);
    assert_eq!(indices[499], 999);
    assert!(indices.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn sampled_background_removes_moving_object() {
    let dir = TempDir::new().unwrap();
    write_moving_block(dir.path(), 12);

    let source = ImageSequence::open(dir.path()).unwrap();
    assert_eq!(source.frame_count(), 12);
    let settings = SampledSettings {
        num_sample_frames: 12,
        method: AggregationMethod::Mode,
        show_progress: false,
    };
    let mut model = SampledStatic::new(source, settings);
    model.initialize().unwrap();

    // the block never stays put, so the mode is the dark scene everywhere
    let background = model.background_image().unwrap();
    assert_eq!(background.dim(), (6, 8));
    assert!(background.iter().all(|&v| (v - 20.0 / 255.0).abs() < 1e-6));

    let mut frames = ImageSequence::open(dir.path()).unwrap();
    let first = frames.next_frame().unwrap();
    let foreground = model.subtract(&first).unwrap();
    let lit = foreground.iter().filter(|&&v| v > 0.5).count();
    assert_eq!(lit, 4);
}

#[test]
fn inpainted_background_drops_masked_object() {
    let dir = TempDir::new().unwrap();
    write_moving_block(dir.path(), 1);

    // outline the block at x 0..2, y 2..4
    let mask = RegionMask::from_polygon(6, 8, &[(0.0, 2.0), (2.0, 2.0), (2.0, 4.0), (0.0, 4.0)])
        .unwrap();
    assert_eq!(mask.masked_count(), 4);

    let source = ImageSequence::open(dir.path()).unwrap();
    let mut model = InpaintedStatic::new(source, mask, InpaintSettings::default());
    model.initialize().unwrap();

    let background = model.background_image().unwrap();
    assert!(background.iter().all(|&v| (v - 20.0 / 255.0).abs() < 1e-5));
}

#[test]
fn every_model_returns_non_negative_frames_of_input_shape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("background.npy");
    Array2::<u8>::from_elem((3, 3), 100)
        .write_npy(File::create(&path).unwrap())
        .unwrap();

    let frames: Vec<RawFrame> = (0..20u8).map(|i| uniform(i * 12)).collect();
    let source = || MemorySource::new(frames.clone()).unwrap();
    let method = AggregationMethod::Median;

    let mut models: Vec<Box<dyn BackgroundModel>> = vec![
        Box::new(NoSubtraction::new(3, 3)),
        Box::new(StaticImage::new(&path)),
        Box::new(SampledStatic::new(
            source(),
            SampledSettings {
                num_sample_frames: 5,
                method,
                show_progress: false,
            },
        )),
        Box::new(ChunkedStatic::new(
            source(),
            ChunkedSettings {
                num_sample_frames: 3,
                num_chunks: 2,
                method,
                show_progress: false,
            },
        )),
        Box::new(
            SlidingWindow::new(SlidingWindowSettings {
                num_sample_frames: 4,
                sample_every_n_frames: 2,
                method,
            })
            .unwrap(),
        ),
        Box::new(
            OffloadedStreaming::new(
                3,
                3,
                StreamingSettings {
                    num_images: 4,
                    every_n_image: 2,
                    method,
                },
            )
            .unwrap(),
        ),
    ];

    for model in models.iter_mut() {
        model.initialize().unwrap();
        assert!(model.is_initialized());
        for (i, frame) in frames.iter().enumerate() {
            let polarity = if i % 2 == 0 {
                Polarity::BrightOnDark
            } else {
                Polarity::DarkOnBright
            };
            model.set_polarity(polarity);
            let out = model.subtract(frame).unwrap();
            assert_eq!(out.dim(), (3, 3));
            assert!(out.iter().all(|&v| v >= 0.0));
        }
    }
}

#[test]
fn subtract_before_initialize_is_rejected() {
    let mut model = StaticImage::new("unused.npy");
    assert!(matches!(
        model.subtract(&uniform(0)),
        Err(Error::Precondition(_))
    ));
}
