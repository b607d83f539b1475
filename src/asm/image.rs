//! Program image files.
//!
//! An image is plain text:
//! - One machine word per line, as 32 binary digits (MSB first), optionally prefixed by `0b`
//! - Anything after the 32 digits is ignored
//! - Lines starting with `;` are comments
//! - Blank lines are ignored

use crate::bits::Word;
use crate::asm::disasm::disassemble_instruction;
use std::path::Path;
use std::io::Write;
use thiserror::Error;

/// A loaded program image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    /// The machine words.
    pub words: Vec<Word>,
}

impl ProgramImage {
    /// Create an image from words.
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    /// Get the number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Parse image text.
    pub fn parse(text: &str) -> Result<Self, ImageError> {
        let mut words = Vec::new();

        for (line_num, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }

            let token = trimmed.split(|c: char| c.is_whitespace() || c == ';').next().unwrap_or_default();
            let digits = token.strip_prefix("0b").unwrap_or(token);
            let word = Word::parse(digits).map_err(|e| ImageError::Parse {
                line: line_num + 1,
                message: e.to_string(),
            })?;
            words.push(word);
        }

        Ok(Self { words })
    }

    /// Render as image text, with a disassembly comment on each line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("; vn32 program image\n");
        out.push_str(&format!("; {} words\n\n", self.len()));
        for (i, word) in self.words.iter().enumerate() {
            out.push_str(&format!("{} ; {:03} {}\n", word, i, disassemble_instruction(*word)));
        }
        out
    }
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ImageError::Io(e.to_string()))?;
    ProgramImage::parse(&text)
}

/// Save an image file to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ImageError::Io(e.to_string()))?;
    file.write_all(image.render().as_bytes())
        .map_err(|e| ImageError::Io(e.to_string()))
}

/// Errors that can occur during image operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_parse_roundtrip() {
        let image = ProgramImage::new(vec![
            Word::from_u32(0x8100_0001),
            Word::from_u32(0x8301_0203),
        ]);
        let text = image.render();
        assert!(text.contains("Load r1, #0"));
        assert_eq!(ProgramImage::parse(&text).unwrap(), image);
    }

    #[test]
    fn test_parse_error_line() {
        let text = "; header\n10000001000000000000000000000001\n1012\n";
        assert!(matches!(
            ProgramImage::parse(text),
            Err(ImageError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_parse_tolerates_prefix_and_indent() {
        let text = "  0b10000001000000000000000000000001 ; Load r1, #0\n";
        let image = ProgramImage::parse(text).unwrap();
        assert_eq!(image.words, vec![Word::from_u32(0x8100_0001)]);
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("vn32-image-{}.img", std::process::id()));
        let image = ProgramImage::new(vec![Word::from_u32(0x8203_0003)]);

        save_image(&path, &image).unwrap();
        let loaded = load_image(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, image);
    }
}
