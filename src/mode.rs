//! Permission model: 9-bit octal modes and their `rwx` rendering.

use serde::{Deserialize, Serialize};

use crate::error::VfsError;

/// Unix-style permission bits, always in `0..=0o777` (3 classes x rwx).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct FileMode(pub u16);

impl FileMode {
    pub const FILE_DEFAULT: FileMode = FileMode(0o644);
    pub const DIR_DEFAULT: FileMode = FileMode(0o755);

    /// Pretty-print like `rwxr-xr--`.
    pub fn display(self) -> String {
        let mut s = String::with_capacity(9);
        for shift in [6u16, 3, 0] {
            let bits = (self.0 >> shift) & 7;
            s.push(if bits & 4 != 0 { 'r' } else { '-' });
            s.push(if bits & 2 != 0 { 'w' } else { '-' });
            s.push(if bits & 1 != 0 { 'x' } else { '-' });
        }
        s
    }

    /// Parse an octal mode string of 1-3 digits.
    ///
    /// Anything else (empty input, non-octal characters, a value above
    /// `0o777`) fails with `InvalidMode`.
    pub fn parse(text: &str) -> Result<FileMode, VfsError> {
        if text.is_empty() || text.len() > 3 || !text.chars().all(|c| c.is_digit(8)) {
            return Err(VfsError::InvalidMode(String::from(text)));
        }
        let value = u16::from_str_radix(text, 8)
            .map_err(|_| VfsError::InvalidMode(String::from(text)))?;
        if value > 0o777 {
            return Err(VfsError::InvalidMode(String::from(text)));
        }
        Ok(FileMode(value))
    }
}
