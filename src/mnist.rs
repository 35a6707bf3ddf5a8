//! MNIST in the IDX file format.
//!
//! Image files are IDX3 (magic 2051, then item count, rows and columns as
//! big-endian `u32`, then one byte per pixel); label files are IDX1 (magic
//! 2049, then item count, then one byte per label). Pixels are scaled to
//! `[0, 1]` and labels are one-hot encoded.

use std::path::Path;

use crate::{Dataset, Error, Result};

pub const NUM_CLASSES: usize = 10;

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn file_names(self) -> (&'static str, &'static str) {
        match self {
            Split::Train => ("train-images-idx3-ubyte", "train-labels-idx1-ubyte"),
            Split::Test => ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
        }
    }
}

/// Load one MNIST split from `dir`.
pub fn load_mnist<P: AsRef<Path>>(dir: P, split: Split) -> Result<Dataset> {
    let (images_name, labels_name) = split.file_names();
    let images = std::fs::read(dir.as_ref().join(images_name))?;
    let labels = std::fs::read(dir.as_ref().join(labels_name))?;
    from_idx_bytes(&images, &labels)
}

/// Build a dataset from the raw bytes of an image file and a label file.
pub fn from_idx_bytes(images: &[u8], labels: &[u8]) -> Result<Dataset> {
    let (count, pixels_per_image, pixels) = parse_images(images)?;
    let labels = parse_labels(labels)?;
    if labels.len() != count {
        return Err(Error::InvalidData(format!(
            "image file has {count} items but label file has {}",
            labels.len()
        )));
    }

    let inputs = pixels.iter().map(|&p| f32::from(p) / 255.0).collect();
    let mut targets = vec![0.0_f32; count * NUM_CLASSES];
    for (i, &label) in labels.iter().enumerate() {
        targets[i * NUM_CLASSES + label as usize] = 1.0;
    }
    Dataset::from_flat(inputs, targets, pixels_per_image, NUM_CLASSES)
}

/// Returns `(count, rows * cols, pixels)`.
fn parse_images(bytes: &[u8]) -> Result<(usize, usize, &[u8])> {
    let mut header = Header::new(bytes);
    header.expect_magic(IMAGES_MAGIC, "image")?;
    let count = header.next_u32()? as usize;
    let rows = header.next_u32()? as usize;
    let cols = header.next_u32()? as usize;
    let body = header.rest();

    let dim = rows
        .checked_mul(cols)
        .filter(|&d| d > 0)
        .ok_or_else(|| {
            Error::InvalidData(format!("image file declares invalid image size {rows}x{cols}"))
        })?;
    let expected = count.checked_mul(dim).ok_or_else(|| {
        Error::InvalidData(format!(
            "image file declares {count} images of {rows}x{cols}, which overflows"
        ))
    })?;
    if body.len() != expected {
        return Err(Error::InvalidData(format!(
            "image file declares {count} images of {rows}x{cols} but has {} pixel bytes",
            body.len()
        )));
    }
    Ok((count, dim, body))
}

fn parse_labels(bytes: &[u8]) -> Result<&[u8]> {
    let mut header = Header::new(bytes);
    header.expect_magic(LABELS_MAGIC, "label")?;
    let count = header.next_u32()? as usize;
    let body = header.rest();

    if body.len() != count {
        return Err(Error::InvalidData(format!(
            "label file declares {count} labels but has {} bytes",
            body.len()
        )));
    }
    if let Some(bad) = body.iter().find(|&&l| l as usize >= NUM_CLASSES) {
        return Err(Error::InvalidData(format!("label {bad} is not a digit")));
    }
    Ok(body)
}

struct Header<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Header<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn next_u32(&mut self) -> Result<u32> {
        let end = self.pos + 4;
        let chunk = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| Error::InvalidData("truncated IDX header".to_owned()))?;
        self.pos = end;
        Ok(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    fn expect_magic(&mut self, magic: u32, what: &str) -> Result<()> {
        let got = self.next_u32()?;
        if got != magic {
            return Err(Error::InvalidData(format!(
                "bad {what} file magic {got}, expected {magic}"
            )));
        }
        Ok(())
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}
