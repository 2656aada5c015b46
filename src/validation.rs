use crate::constants::DEFAULT_MAX_FILES;
use crate::file::{known_mime_types, FileHandle};
use crate::utils::format_file_size;
use serde::Serialize;
use thiserror::Error;

/// Reasons a file or batch is refused before any upload starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File type {0} is not supported")]
    UnsupportedType(String),

    #[error("File size {} exceeds the maximum of {}", human_size(.size), human_size(.max))]
    FileTooLarge { size: u64, max: u64 },

    #[error("Too many files. Maximum {0} allowed.")]
    TooManyFiles(usize),

    #[error("Total size {} exceeds the maximum of {}", human_size(.size), human_size(.max))]
    BatchTooLarge { size: u64, max: u64 },
}

fn human_size(bytes: &u64) -> String {
    format_file_size(*bytes)
}

/// Outcome of validating a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn fail(error: ValidationError) -> Self {
        Self {
            valid: false,
            errors: vec![error.to_string()],
        }
    }
}

/// Outcome of validating a whole batch.
#[derive(Debug, Clone)]
pub struct BatchValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub valid_files: Vec<FileHandle>,
    pub total_size: u64,
}

impl BatchValidation {
    fn rejected(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
            valid_files: Vec::new(),
            total_size: 0,
        }
    }
}

/// Batch-level policy. An empty `allowed_types` accepts every known category.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPolicy {
    pub max_files: usize,
    pub allowed_types: Vec<String>,
    pub max_size: Option<u64>,
    pub max_total_size: Option<u64>,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            allowed_types: Vec::new(),
            max_size: None,
            max_total_size: None,
        }
    }
}

/// Checks `file` against a MIME whitelist.
///
/// With an empty whitelist the file is accepted iff its MIME type belongs to
/// one of the known categories.
pub fn validate_type(file: &FileHandle, allowed_types: &[String]) -> ValidationResult {
    let mime = file.mime_type().trim().to_ascii_lowercase();

    let accepted = if allowed_types.is_empty() {
        known_mime_types().any(|known| known == mime)
    } else {
        allowed_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&mime))
    };

    if accepted {
        ValidationResult::ok()
    } else {
        ValidationResult::fail(ValidationError::UnsupportedType(file.mime_type().to_string()))
    }
}

/// Checks `file` against its category limit, or `max_size_override` if given.
pub fn validate_size(file: &FileHandle, max_size_override: Option<u64>) -> ValidationResult {
    let max = max_size_override.unwrap_or_else(|| file.category().max_size());
    let size = file.size_bytes();

    if size <= max {
        ValidationResult::ok()
    } else {
        ValidationResult::fail(ValidationError::FileTooLarge { size, max })
    }
}

/// Validates a batch against `policy`.
///
/// Exceeding `max_files` aborts immediately with a single error and no
/// per-file work. Individual file failures are collected while the rest of
/// the batch is still checked. Exceeding `max_total_size` rejects the whole
/// batch even though each remaining file passed on its own.
pub fn validate_batch(files: &[FileHandle], policy: &BatchPolicy) -> BatchValidation {
    if files.len() > policy.max_files {
        return BatchValidation::rejected(vec![
            ValidationError::TooManyFiles(policy.max_files).to_string()
        ]);
    }

    let mut errors = Vec::new();
    let mut valid_files = Vec::new();
    let mut total_size = 0u64;

    for file in files {
        let type_check = validate_type(file, &policy.allowed_types);
        let check = if type_check.valid {
            validate_size(file, policy.max_size)
        } else {
            type_check
        };

        if check.valid {
            total_size += file.size_bytes();
            valid_files.push(file.clone());
        } else {
            errors.extend(
                check
                    .errors
                    .into_iter()
                    .map(|err| format!("{}: {}", file.name(), err)),
            );
        }
    }

    if let Some(max_total) = policy.max_total_size {
        if total_size > max_total {
            errors.push(
                ValidationError::BatchTooLarge {
                    size: total_size,
                    max: max_total,
                }
                .to_string(),
            );
            valid_files.clear();
        }
    }

    tracing::debug!(
        files = files.len(),
        valid = valid_files.len(),
        errors = errors.len(),
        total_size,
        "Batch validated"
    );

    BatchValidation {
        valid: errors.is_empty(),
        errors,
        valid_files,
        total_size,
    }
}
