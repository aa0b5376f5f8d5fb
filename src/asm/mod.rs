//! Program files: assembly text, JSON images and listings.
//!
//! This module provides:
//! - A line assembler (text → program + initial memory)
//! - A listing renderer (program + memory → readable text)
//! - JSON program images for saving and loading
//! - Random program generation

pub mod assembler;
pub mod disasm;
pub mod generate;
pub mod image;

pub use assembler::{assemble, Assembly, AssemblerError};
pub use disasm::{disassemble, listing};
pub use generate::generate;
pub use image::{load_image, save_image, ImageError, ProgramImage};

use std::path::Path;
use thiserror::Error;

/// Load a program file. `.json` files are images; anything else is assembly.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Assembly, LoadError> {
    let path = path.as_ref();
    let is_image = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_image {
        return Ok(load_image(path)?);
    }

    let source = std::fs::read_to_string(path)?;
    Ok(assemble(&source)?)
}

/// Errors that can occur while loading a program file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblerError),

    #[error("image error: {0}")]
    Image(#[from] ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_file_by_extension() {
        let dir = std::env::temp_dir();
        let asm_path = dir.join(format!("sison-load-{}.asm", std::process::id()));
        let json_path = dir.join(format!("sison-load-{}.json", std::process::id()));

        std::fs::write(&asm_path, "LOAD 5\nHLT\nDAT 5 3\n").unwrap();
        let from_asm = load_file(&asm_path).unwrap();
        save_image(&json_path, &from_asm).unwrap();
        let from_json = load_file(&json_path).unwrap();

        let _ = std::fs::remove_file(&asm_path);
        let _ = std::fs::remove_file(&json_path);

        assert_eq!(from_asm, from_json);
        assert_eq!(from_json.memory.read(5), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_file("/nonexistent/sison/program.asm").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
