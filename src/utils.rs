/// Utility functions for common operations
///
/// Helpers shared by the validator, compressor and CLI output.
use crate::constants::SUPPORTED_INPUT_EXTENSIONS;
use crate::error::{Result, UploadError};
use glob::glob;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Format file size in human-readable format
///
/// # Arguments
/// * `bytes` - Size in bytes
///
/// # Returns
/// * Human-readable size string (e.g., "1.2 MB", "512 KB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Calculate compression ratio as a percentage
///
/// Positive means reduction, negative means the output grew.
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    ((original_size as f64 - compressed_size as f64) / original_size as f64) * 100.0
}

/// Percentage of `part` in `whole`, 100 when `whole` is zero.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 100.0;
    }
    (part as f64 / whole as f64) * 100.0
}

pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_INPUT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expands CLI inputs (files, directories or glob patterns) into file paths.
///
/// Explicit file arguments are always kept so the validator can report on
/// them; directory and glob expansion only picks up supported extensions.
pub fn collect_input_files(inputs: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let input_path = Path::new(input);

        if input_path.is_file() {
            files.push(input_path.to_path_buf());
        } else if input_path.is_dir() {
            let walker = if recursive {
                WalkDir::new(input_path).sort_by_file_name().into_iter()
            } else {
                WalkDir::new(input_path).sort_by_file_name().max_depth(1).into_iter()
            };

            // Hidden entries below the root are skipped; the root itself may be hidden.
            for entry in walker
                .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            {
                let entry = entry?;
                let path = entry.path();
                if path.is_file() && is_supported_input(path) {
                    files.push(path.to_path_buf());
                }
            }
        } else if let Ok(pattern) = glob(input) {
            let before = files.len();
            for entry in pattern.flatten() {
                if entry.is_file() && is_supported_input(&entry) {
                    files.push(entry);
                }
            }
            if files.len() == before {
                return Err(UploadError::NoFilesFound(input.clone()));
            }
        } else {
            return Err(UploadError::NoFilesFound(input.clone()));
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_file_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_calculate_compression_ratio() {
        assert_eq!(calculate_compression_ratio(1000, 800), 20.0);
        assert_eq!(calculate_compression_ratio(1000, 1200), -20.0);
        assert_eq!(calculate_compression_ratio(1000, 1000), 0.0);
        assert_eq!(calculate_compression_ratio(0, 500), 0.0);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(1, 4), 25.0);
        assert_eq!(percent_of(3, 3), 100.0);
        assert_eq!(percent_of(0, 0), 100.0);
    }

    #[test]
    fn test_is_supported_input() {
        assert!(is_supported_input(Path::new("photo.JPG")));
        assert!(is_supported_input(Path::new("clip.mp4")));
        assert!(is_supported_input(Path::new("report.pdf")));
        assert!(!is_supported_input(Path::new("archive")));
        assert!(!is_supported_input(Path::new("script.sh")));
    }

    #[test]
    fn test_collect_input_files_directory() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.png", "c.sh", ".hidden.jpg"] {
            File::create(temp_dir.path().join(name))
                .unwrap()
                .write_all(b"data")
                .unwrap();
        }
        let sub = temp_dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        File::create(sub.join("d.pdf")).unwrap().write_all(b"data").unwrap();

        let input = temp_dir.path().to_string_lossy().to_string();
        let flat = collect_input_files(&[input.clone()], false).unwrap();
        assert_eq!(flat.len(), 2);

        let recursive = collect_input_files(&[input], true).unwrap();
        assert_eq!(recursive.len(), 3);
    }

    #[test]
    fn test_collect_input_files_explicit_file_kept() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bundle.zip");
        File::create(&path).unwrap().write_all(b"PK").unwrap();

        let files = collect_input_files(&[path.to_string_lossy().to_string()], false).unwrap();
        assert_eq!(files, vec![path]);
    }

    #[test]
    fn test_collect_input_files_missing() {
        let result = collect_input_files(&["/nonexistent/*.jpg".to_string()], false);
        assert!(matches!(result, Err(UploadError::NoFilesFound(_))));
    }
}
