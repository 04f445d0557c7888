//! Size field patching for assembled eir boot images.
//!
//! The image header carries the total image length as a little-endian `u64`
//! at byte offset 16. The linker cannot know the final length, so the field
//! is filled in after the image has been assembled:
//!
//! | Offset | Length | Field                |
//! |--------|--------|----------------------|
//! | 0..16  | 16     | opaque header prefix |
//! | 16..24 | 8      | total image size     |
//! | 24..   | rest   | opaque payload       |

use std::fs;
use std::mem::size_of;
use std::path::Path;

mod error;

pub use error::{PatchError, Result};

pub const SIZE_FIELD_OFFSET: usize = 16;
pub const SIZE_FIELD_LEN: usize = size_of::<u64>();
/// Smallest image that still contains the whole size field.
pub const MIN_IMAGE_LEN: usize = SIZE_FIELD_OFFSET + SIZE_FIELD_LEN;

/// Outcome of a successful [`patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchReport {
    /// Value written to the size field, i.e. the image length.
    pub image_len: u64,
    /// Value the size field held before patching.
    pub previous_size: u64,
}

impl PatchReport {
    pub fn was_stale(&self) -> bool {
        self.image_len != self.previous_size
    }
}

/// Decodes the size field of `image`.
pub fn read_size_field(image: &[u8]) -> Result<u64> {
    let field: [u8; SIZE_FIELD_LEN] = image
        .get(SIZE_FIELD_OFFSET..MIN_IMAGE_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(PatchError::TooShort { len: image.len() })?;

    Ok(u64::from_le_bytes(field))
}

/// Stores the length of `image` into its own size field and returns that
/// length. The buffer is left untouched on error.
pub fn patch_image(image: &mut [u8]) -> Result<u64> {
    if image.len() < MIN_IMAGE_LEN {
        return Err(PatchError::TooShort { len: image.len() });
    }

    let len = image.len() as u64;
    image[SIZE_FIELD_OFFSET..MIN_IMAGE_LEN].copy_from_slice(&len.to_le_bytes());

    Ok(len)
}

/// Reads the image at `input`, patches its size field and writes the result
/// to `output`. Both paths may name the same file.
pub fn patch(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<PatchReport> {
    let input = input.as_ref();
    let output = output.as_ref();

    let mut image = fs::read(input).map_err(|source| PatchError::NotFound {
        path: input.to_path_buf(),
        source,
    })?;
    log::debug!("read {} bytes from {}", image.len(), input.display());

    // a short image fails here, before the output is opened
    let previous_size = read_size_field(&image)?;
    let image_len = patch_image(&mut image)?;
    log::debug!(
        "size field at {:#x}: {:#x} -> {:#x}",
        SIZE_FIELD_OFFSET,
        previous_size,
        image_len
    );

    fs::write(output, &image).map_err(|source| PatchError::WriteError {
        path: output.to_path_buf(),
        source,
    })?;

    Ok(PatchReport {
        image_len,
        previous_size,
    })
}
