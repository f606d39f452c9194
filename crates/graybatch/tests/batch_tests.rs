//! End-to-end batch behavior on the host runtime

use std::fs;
use std::path::{Path, PathBuf};

use graybatch::{BatchConfig, BatchOrchestrator, Error, FileState, FileStatus};
use graybatch_gpu::{GpuError, HostBuffer, HostRuntime, KernelStatus, Region, Runtime};
use image::{ImageFormat, ImageReader, RgbImage};
use tempfile::TempDir;

/// Host runtime whose kernel fails for one image width.
struct FailingKernel {
    inner: HostRuntime,
    fail_width: usize,
}

impl Runtime for FailingKernel {
    type Buffer = HostBuffer;

    fn name(&self) -> &str {
        "failing-kernel"
    }

    fn alloc(&self, len: usize) -> graybatch_gpu::Result<HostBuffer> {
        self.inner.alloc(len)
    }

    fn free(&self, buffer: HostBuffer) {
        self.inner.free(buffer)
    }

    fn copy_to_device(&self, src: &[u8], dst: &mut HostBuffer) -> graybatch_gpu::Result<()> {
        self.inner.copy_to_device(src, dst)
    }

    fn copy_to_host(&self, src: &HostBuffer, dst: &mut [u8]) -> graybatch_gpu::Result<()> {
        self.inner.copy_to_host(src, dst)
    }

    fn rgb_to_gray(
        &self,
        src: &HostBuffer,
        src_step: usize,
        dst: &mut HostBuffer,
        dst_step: usize,
        region: Region,
    ) -> KernelStatus {
        if region.width == self.fail_width {
            return KernelStatus::EXECUTION_ERROR;
        }
        self.inner.rgb_to_gray(src, src_step, dst, dst_step, region)
    }
}

struct Workspace {
    _dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input_images");
        let output = dir.path().join("output_images");
        fs::create_dir_all(&input).unwrap();
        Self {
            _dir: dir,
            input,
            output,
        }
    }

    fn config(&self) -> BatchConfig {
        BatchConfig::new(&self.input, &self.output)
    }

    fn add_image(&self, name: &str, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 31 % 256) as u8, (y * 17 % 256) as u8, 90])
        });
        img.save(self.input.join(name)).unwrap();
    }

    fn add_image_as(&self, name: &str, width: u32, height: u32, format: ImageFormat) {
        RgbImage::from_pixel(width, height, image::Rgb([200, 40, 10]))
            .save_with_format(self.input.join(name), format)
            .unwrap();
    }

    fn outputs(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.output) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn dimensions(path: &Path) -> (u32, u32) {
    let img = image::open(path).unwrap();
    (img.width(), img.height())
}

#[test]
fn test_batch_converts_every_candidate() {
    let ws = Workspace::new();
    ws.add_image("photo.jpg", 16, 9);
    ws.add_image("logo.png", 5, 7);
    ws.add_image("scan.jpeg", 3, 3);
    fs::write(ws.input.join("readme.txt"), b"ignored").unwrap();

    let batch = BatchOrchestrator::new(ws.config(), HostRuntime::new()).unwrap();
    let report = batch.run().unwrap();

    assert_eq!(report.candidates(), 3);
    assert!(report.is_clean());
    assert_eq!(
        ws.outputs(),
        vec!["logo_grayscale.png", "photo_grayscale.jpg", "scan_grayscale.jpeg"]
    );
    assert_eq!(batch.runtime().live_allocations(), 0);
    assert_eq!(batch.runtime().total_allocations(), 6);
}

#[test]
fn test_output_dimensions_match_input() {
    let ws = Workspace::new();
    ws.add_image("wide.png", 40, 3);
    ws.add_image("tall.jpg", 2, 33);

    let report = BatchOrchestrator::new(ws.config(), HostRuntime::new())
        .unwrap()
        .run()
        .unwrap();

    for outcome in &report.outcomes {
        let output = outcome.output().unwrap();
        assert_eq!(dimensions(output), dimensions(&outcome.source));
    }
}

#[test]
fn test_output_is_single_channel() {
    let ws = Workspace::new();
    ws.add_image("color.png", 6, 4);

    BatchOrchestrator::new(ws.config(), HostRuntime::new())
        .unwrap()
        .run()
        .unwrap();

    let out = image::open(ws.output.join("color_grayscale.png")).unwrap();
    assert_eq!(out.color(), image::ColorType::L8);
    assert_eq!(out.into_luma8().into_raw().len(), 24);
}

#[test]
fn test_rerun_overwrites_outputs() {
    let ws = Workspace::new();
    ws.add_image("photo.jpg", 8, 8);

    let batch = BatchOrchestrator::new(ws.config(), HostRuntime::new()).unwrap();
    let first = batch.run().unwrap();
    let second = batch.run().unwrap();

    let expected = ws.output.join("photo_grayscale.jpg");
    assert_eq!(first.outcomes[0].output(), Some(expected.as_path()));
    assert_eq!(second.outcomes[0].output(), Some(expected.as_path()));
    assert_eq!(ws.outputs(), vec!["photo_grayscale.jpg"]);
}

#[test]
fn test_compute_failure_is_isolated() {
    let ws = Workspace::new();
    ws.add_image("a.png", 4, 4);
    ws.add_image("b.png", 7, 4);
    ws.add_image("c.jpg", 5, 5);
    ws.add_image("d.png", 9, 2);

    let runtime = FailingKernel {
        inner: HostRuntime::new(),
        fail_width: 7,
    };
    let batch = BatchOrchestrator::new(ws.config(), runtime).unwrap();
    let report = batch.run().unwrap();

    assert_eq!(report.candidates(), 4);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(
        ws.outputs(),
        vec!["a_grayscale.png", "c_grayscale.jpg", "d_grayscale.png"]
    );

    let failed = report
        .outcomes
        .iter()
        .find(|o| !o.is_done())
        .unwrap();
    assert!(failed.source.ends_with("b.png"));
    match &failed.status {
        FileStatus::Skipped { stage, error } => {
            assert_eq!(*stage, FileState::Uploaded);
            assert!(matches!(
                error,
                Error::Device(GpuError::KernelFailed { code }) if *code == KernelStatus::EXECUTION_ERROR.0
            ));
        }
        FileStatus::Done { .. } => unreachable!(),
    }

    // every acquired buffer came back, including the failed file's pair
    let host = &batch.runtime().inner;
    assert_eq!(host.live_allocations(), 0);
    assert_eq!(host.bytes_in_use(), 0);
    assert_eq!(host.total_allocations(), 8);
    assert_eq!(host.total_frees(), 8);
}

#[test]
fn test_corrupt_input_is_skipped() {
    let ws = Workspace::new();
    ws.add_image("good.png", 3, 2);
    fs::write(ws.input.join("broken.jpg"), b"\xff\xd8 truncated").unwrap();

    let batch = BatchOrchestrator::new(ws.config(), HostRuntime::new()).unwrap();
    let report = batch.run().unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(ws.outputs(), vec!["good_grayscale.png"]);

    let skipped = report.outcomes.iter().find(|o| !o.is_done()).unwrap();
    assert!(matches!(skipped.error(), Some(Error::Decode { .. })));
    assert_eq!(batch.runtime().total_allocations(), 2);
}

#[test]
fn test_mislabelled_input_is_converted() {
    let ws = Workspace::new();
    ws.add_image_as("photo.jpg", 4, 3, ImageFormat::Png);

    let report = BatchOrchestrator::new(ws.config(), HostRuntime::new())
        .unwrap()
        .run()
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(ws.outputs(), vec!["photo_grayscale.jpg"]);
    assert_eq!(dimensions(&ws.output.join("photo_grayscale.jpg")), (4, 3));
}

#[test]
fn test_encode_failure_leaves_no_output() {
    let ws = Workspace::new();
    ws.add_image("ok.png", 2, 2);
    // PNG contents under a JPEG name; JPEG cannot hold a 70000 pixel row
    ws.add_image_as("wide.jpg", 70_000, 1, ImageFormat::Png);

    let batch = BatchOrchestrator::new(ws.config(), HostRuntime::new()).unwrap();
    let report = batch.run().unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(ws.outputs(), vec!["ok_grayscale.png"]);

    let skipped = report.outcomes.iter().find(|o| !o.is_done()).unwrap();
    match &skipped.status {
        FileStatus::Skipped { stage, error } => {
            assert_eq!(*stage, FileState::Downloaded);
            assert!(matches!(error, Error::Encode { .. }));
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(batch.runtime().live_allocations(), 0);
}

#[test]
fn test_empty_directory_succeeds_without_output() {
    let ws = Workspace::new();
    fs::write(ws.input.join("notes.txt"), b"nothing to see").unwrap();

    let report = BatchOrchestrator::new(ws.config(), HostRuntime::new())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.candidates(), 0);
    assert!(report.is_clean());
    assert!(ws.outputs().is_empty());
    assert!(!ws.output.exists());
}

#[test]
fn test_missing_input_directory_is_fatal() {
    let ws = Workspace::new();
    let config = BatchConfig::new(ws.input.join("missing"), &ws.output);

    let batch = BatchOrchestrator::new(config, HostRuntime::new()).unwrap();
    let err = batch.run().unwrap_err();

    assert!(matches!(err, Error::Directory { .. }));
    assert!(err.is_fatal());
    assert!(!ws.output.exists());
    assert_eq!(batch.runtime().total_allocations(), 0);
}

#[test]
fn test_unwritable_output_directory_is_fatal() {
    let ws = Workspace::new();
    ws.add_image("a.png", 2, 2);
    // a file where the output directory should be
    let blocker = ws.input.join("blocker");
    fs::write(&blocker, b"").unwrap();

    let config = BatchConfig::new(&ws.input, blocker.join("out"));
    let err = BatchOrchestrator::new(config, HostRuntime::new())
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, Error::Directory { .. }));
}

#[test]
fn test_png_substitution_reports_written_path() {
    let ws = Workspace::new();
    fs::create_dir_all(&ws.output).unwrap();

    ws.add_image("src.png", 3, 3);

    let record = graybatch::codec::decode(&ws.input.join("src.png")).unwrap();
    let gray = graybatch::ImageRecord::new(Path::new("scan.tiff"), 3, 3, record.pixels().to_vec())
        .unwrap()
        .into_gray(vec![128; 9])
        .unwrap();

    let encoded = graybatch::codec::save_gray(&gray, &ws.output).unwrap();
    assert!(encoded.substituted);
    assert_eq!(encoded.path, ws.output.join("scan_grayscale.png"));

    let format = ImageReader::open(&encoded.path)
        .unwrap()
        .with_guessed_format()
        .unwrap()
        .format();
    assert_eq!(format, Some(ImageFormat::Png));
}
