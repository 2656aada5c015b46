#![allow(dead_code)]

use image::{ImageBuffer, ImageFormat, Rgb};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    img.save_with_format(&path, ImageFormat::Png).unwrap();
    path
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(contents).unwrap();
    path
}

/// Two images and a text file at the top level, plus one text file in a
/// subdirectory.
pub fn create_mixed_batch(dir: &Path) -> Vec<PathBuf> {
    let mut files = vec![
        write_png(dir, "a.png", 40, 30),
        write_png(dir, "b.png", 12, 12),
        write_file(dir, "notes.txt", b"plain text notes"),
    ];

    let subdir = dir.join("nested");
    std::fs::create_dir(&subdir).unwrap();
    files.push(write_file(&subdir, "deep.txt", b"nested text"));

    files
}
