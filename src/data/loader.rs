// ============================================================
// Layer 4 — Digit Loaders
// ============================================================
// Two DigitSource implementations:
//
//   BurnMnistSource → burn's MnistDataset, which downloads the
//                     CVDF mirror of MNIST into the burn-dataset
//                     cache on first use.
//   IdxDirSource    → the four IDX files already on disk, plain
//                     or gzipped, e.g. an offline copy.
//
// IDX layout (all integers big-endian u32):
//   images: magic 2051 | count | rows | cols | count*rows*cols bytes
//   labels: magic 2049 | count | count bytes
//
// Acquisition failure is the one expected error of a run; both
// sources return it instead of aborting.

use anyhow::{anyhow, bail, ensure, Context, Result};
use burn::data::dataset::{vision::MnistDataset, Dataset};
use flate2::read::GzDecoder;
use std::{
    any::Any,
    fs,
    io::Read,
    panic,
    path::{Path, PathBuf},
};

use crate::domain::digit::{RawDigit, Split};
use crate::domain::traits::DigitSource;

const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;
const MAX_LABEL: u8 = 9;

// ─── BurnMnistSource ──────────────────────────────────────────────────────────

/// MNIST fetched and cached by burn's dataset crate
#[derive(Debug, Default, Clone, Copy)]
pub struct BurnMnistSource;

impl BurnMnistSource {
    pub fn new() -> Self {
        Self
    }
}

impl DigitSource for BurnMnistSource {
    fn load(&self, split: Split) -> Result<Vec<RawDigit>> {
        tracing::info!("Fetching MNIST {split} split (cached after the first download)");

        // MnistDataset panics when the download or cache write fails
        let dataset = catch_quietly(move || match split {
            Split::Train => MnistDataset::train(),
            Split::Test  => MnistDataset::test(),
        })
        .map_err(|cause| anyhow!("Cannot fetch the MNIST {split} split: {cause}"))?;

        let digits: Vec<RawDigit> = dataset
            .iter()
            .map(|item| {
                let pixels = item
                    .image
                    .iter()
                    .flat_map(|row| row.iter().map(|&p| p as u8))
                    .collect();
                RawDigit::new(pixels, item.label)
            })
            .collect();

        tracing::info!("Loaded {} {split} images from burn's MNIST cache", digits.len());
        Ok(digits)
    }

    fn describe(&self) -> String {
        "MNIST (burn dataset cache)".to_string()
    }
}

/// Run `f`, turning a panic into its message.
///
/// The panic hook is silenced for the duration so the failure is
/// reported once, as an error, instead of also as a raw panic line
/// on stderr. The hook is process-wide, so panics on other threads in
/// that window go unprinted too.
fn catch_quietly<T>(f: impl FnOnce() -> T + panic::UnwindSafe) -> Result<T, String> {
    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let outcome = panic::catch_unwind(f);
    panic::set_hook(hook);
    outcome.map_err(|cause| panic_message(cause.as_ref()))
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown failure".to_string()
    }
}

// ─── IdxDirSource ─────────────────────────────────────────────────────────────

/// MNIST-format IDX files read from a local directory
#[derive(Debug, Clone)]
pub struct IdxDirSource {
    dir: PathBuf,
}

impl IdxDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File stems for a split: (images, labels)
    fn file_stems(split: Split) -> (&'static str, &'static str) {
        match split {
            Split::Train => ("train-images-idx3-ubyte", "train-labels-idx1-ubyte"),
            Split::Test  => ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
        }
    }

    /// Prefer the decompressed file, fall back to `<stem>.gz`
    fn resolve(&self, stem: &str) -> Result<PathBuf> {
        let plain = self.dir.join(stem);
        if plain.is_file() {
            return Ok(plain);
        }
        let gz = self.dir.join(format!("{stem}.gz"));
        if gz.is_file() {
            return Ok(gz);
        }
        bail!(
            "Neither '{}' nor '{}' exists",
            plain.display(),
            gz.display()
        )
    }
}

impl DigitSource for IdxDirSource {
    fn load(&self, split: Split) -> Result<Vec<RawDigit>> {
        let (images_stem, labels_stem) = Self::file_stems(split);

        let images_path = self.resolve(images_stem)?;
        let labels_path = self.resolve(labels_stem)?;

        let images = parse_images(&read_bytes(&images_path)?)
            .with_context(|| format!("Malformed image file '{}'", images_path.display()))?;
        let labels = parse_labels(&read_bytes(&labels_path)?)
            .with_context(|| format!("Malformed label file '{}'", labels_path.display()))?;

        ensure!(
            images.len() == labels.len(),
            "{split} split has {} images but {} labels",
            images.len(),
            labels.len()
        );

        let digits: Vec<RawDigit> = images
            .into_iter()
            .zip(labels)
            .map(|(pixels, label)| RawDigit::new(pixels, label))
            .collect();

        tracing::info!(
            "Loaded {} {split} images from '{}'",
            digits.len(),
            self.dir.display()
        );
        Ok(digits)
    }

    fn describe(&self) -> String {
        format!("IDX files in '{}'", self.dir.display())
    }
}

/// Read a whole file, gunzipping it when the name ends in `.gz`
fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let raw = fs::read(path).with_context(|| format!("Cannot read '{}'", path.display()))?;

    if path.extension().and_then(|e| e.to_str()) != Some("gz") {
        return Ok(raw);
    }

    let mut decoded = Vec::new();
    GzDecoder::new(raw.as_slice())
        .read_to_end(&mut decoded)
        .with_context(|| format!("Cannot decompress '{}'", path.display()))?;
    Ok(decoded)
}

fn be_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    let word: [u8; 4] = bytes
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| anyhow!("truncated header at byte {offset}"))?;
    Ok(u32::from_be_bytes(word))
}

/// Parse an IDX3 image file into one pixel vector per image
pub fn parse_images(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let magic = be_u32(bytes, 0)?;
    ensure!(magic == IMAGE_MAGIC, "bad magic number {magic}, expected {IMAGE_MAGIC}");

    let count = be_u32(bytes, 4)? as usize;
    let rows  = be_u32(bytes, 8)? as usize;
    let cols  = be_u32(bytes, 12)? as usize;
    let (image_len, expected) = rows
        .checked_mul(cols)
        .and_then(|len| Some((len, count.checked_mul(len)?)))
        .ok_or_else(|| anyhow!("header sizes overflow: {count} images of {rows}x{cols}"))?;

    let body = &bytes[16..];
    ensure!(
        body.len() == expected,
        "header announces {count} images of {rows}x{cols} but {} pixel bytes follow",
        body.len()
    );
    ensure!(image_len > 0 || count == 0, "image size {rows}x{cols} is empty");

    Ok(body.chunks(image_len.max(1)).map(<[u8]>::to_vec).collect())
}

/// Parse an IDX1 label file
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    let magic = be_u32(bytes, 0)?;
    ensure!(magic == LABEL_MAGIC, "bad magic number {magic}, expected {LABEL_MAGIC}");

    let count = be_u32(bytes, 4)? as usize;
    let body  = &bytes[8..];
    ensure!(
        body.len() == count,
        "header announces {count} labels but {} bytes follow",
        body.len()
    );
    if let Some(bad) = body.iter().find(|&&l| l > MAX_LABEL) {
        bail!("label {bad} is outside 0..={MAX_LABEL}");
    }
    Ok(body.to_vec())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    pub(crate) fn idx_images(images: &[Vec<u8>], rows: u32, cols: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
        out.extend_from_slice(&(images.len() as u32).to_be_bytes());
        out.extend_from_slice(&rows.to_be_bytes());
        out.extend_from_slice(&cols.to_be_bytes());
        for image in images {
            out.extend_from_slice(image);
        }
        out
    }

    pub(crate) fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&LABEL_MAGIC.to_be_bytes());
        out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        out.extend_from_slice(labels);
        out
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    fn three_digits() -> (Vec<Vec<u8>>, Vec<u8>) {
        let images = vec![vec![0u8; 784], vec![255u8; 784], (0..784).map(|i| (i % 256) as u8).collect()];
        (images, vec![7, 0, 9])
    }

    #[test]
    fn test_reads_plain_idx_files() {
        let dir = tempfile::tempdir().unwrap();
        let (images, labels) = three_digits();
        fs::write(dir.path().join("t10k-images-idx3-ubyte"), idx_images(&images, 28, 28)).unwrap();
        fs::write(dir.path().join("t10k-labels-idx1-ubyte"), idx_labels(&labels)).unwrap();

        let digits = IdxDirSource::new(dir.path()).load(Split::Test).unwrap();
        assert_eq!(digits.len(), 3);
        assert_eq!(digits[0].label, 7);
        assert_eq!(digits[1].pixels, vec![255u8; 784]);
        assert_eq!(digits[2].pixels[300], (300 % 256) as u8);
    }

    #[test]
    fn test_reads_gzipped_idx_files() {
        let dir = tempfile::tempdir().unwrap();
        let (images, labels) = three_digits();
        fs::write(
            dir.path().join("train-images-idx3-ubyte.gz"),
            gzip(&idx_images(&images, 28, 28)),
        )
        .unwrap();
        fs::write(dir.path().join("train-labels-idx1-ubyte.gz"), gzip(&idx_labels(&labels)))
            .unwrap();

        let digits = IdxDirSource::new(dir.path()).load(Split::Train).unwrap();
        let got: Vec<u8> = digits.iter().map(|d| d.label).collect();
        assert_eq!(got, labels);
    }

    #[test]
    fn test_missing_files_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IdxDirSource::new(dir.path()).load(Split::Train).unwrap_err();
        assert!(err.to_string().contains("train-images-idx3-ubyte"), "{err}");
    }

    #[test]
    fn test_count_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (images, _) = three_digits();
        fs::write(dir.path().join("t10k-images-idx3-ubyte"), idx_images(&images, 28, 28)).unwrap();
        fs::write(dir.path().join("t10k-labels-idx1-ubyte"), idx_labels(&[1, 2])).unwrap();
        assert!(IdxDirSource::new(dir.path()).load(Split::Test).is_err());
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut bytes = idx_labels(&[1, 2, 3]);
        bytes[3] = 0x03;
        let err = parse_labels(&bytes).unwrap_err();
        assert!(err.to_string().contains("magic"), "{err}");
        assert!(parse_images(&idx_labels(&[1])).is_err());
    }

    #[test]
    fn test_truncated_body_is_rejected() {
        let mut bytes = idx_images(&[vec![1u8; 784]], 28, 28);
        bytes.truncate(bytes.len() - 10);
        assert!(parse_images(&bytes).is_err());
        assert!(parse_images(&[0, 0]).is_err());
    }

    #[test]
    fn test_oversized_header_is_rejected() {
        let mut bytes = IMAGE_MAGIC.to_be_bytes().to_vec();
        for _ in 0..3 {
            bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        }
        bytes.extend_from_slice(&[0; 8]);
        assert!(parse_images(&bytes).is_err());
    }

    #[test]
    fn test_catch_quietly_turns_panics_into_errors() {
        assert_eq!(catch_quietly(|| 7), Ok(7));
        let err = catch_quietly(|| -> u8 { panic!("download failed: {}", 404) }).unwrap_err();
        assert_eq!(err, "download failed: 404");
    }

    #[test]
    fn test_out_of_range_label_is_rejected() {
        assert!(parse_labels(&idx_labels(&[3, 10])).is_err());
    }
}
