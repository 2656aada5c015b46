use crate::file::FileCategory;

pub const MIB: u64 = 1024 * 1024;

pub const IMAGE_MAX_SIZE: u64 = 10 * MIB;
pub const VIDEO_MAX_SIZE: u64 = 100 * MIB;
pub const DOCUMENT_MAX_SIZE: u64 = 25 * MIB;
pub const AUDIO_MAX_SIZE: u64 = 50 * MIB;
pub const FALLBACK_MAX_SIZE: u64 = 10 * MIB;

pub const DEFAULT_MAX_FILES: usize = 10;
pub const DEFAULT_CONCURRENCY: usize = 3;

pub const DEFAULT_MAX_WIDTH: u32 = 1920;
pub const DEFAULT_MAX_HEIGHT: u32 = 1080;
pub const DEFAULT_QUALITY: f32 = 0.8;
pub const DEFAULT_OUTPUT_MIME: &str = "image/jpeg";

pub const DEFAULT_FIELD_NAME: &str = "file";
pub const DEFAULT_METHOD: &str = "POST";

/// Size of each body chunk handed to the connection; progress granularity.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

pub const VIDEO_PREVIEW_OFFSET_SECS: f64 = 1.0;
pub const PREVIEW_JPEG_QUALITY: u8 = 80;

pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;
pub const ZOPFLI_ITERATIONS: u8 = 15;

pub const DOCUMENT_ICON: &str = "file-text";
pub const AUDIO_ICON: &str = "music";
pub const UNKNOWN_ICON: &str = "file";

/// Category table. Lookup walks it in order and the first list containing
/// the MIME type wins.
pub const CATEGORY_MIME_TYPES: &[(FileCategory, &[&str])] = &[
    (
        FileCategory::Image,
        &[
            "image/jpeg",
            "image/jpg",
            "image/png",
            "image/gif",
            "image/webp",
            "image/bmp",
            "image/tiff",
            "image/svg+xml",
        ],
    ),
    (
        FileCategory::Video,
        &["video/mp4", "video/webm", "video/ogg", "video/quicktime"],
    ),
    (
        FileCategory::Document,
        &[
            "application/pdf",
            "application/msword",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/vnd.ms-excel",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "text/plain",
        ],
    ),
    (
        FileCategory::Audio,
        &["audio/mpeg", "audio/mp3", "audio/wav", "audio/ogg"],
    ),
];

/// Extension fallback used when magic-byte sniffing gives no answer.
pub const EXTENSION_MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("svg", "image/svg+xml"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("ogv", "video/ogg"),
    ("mov", "video/quicktime"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("txt", "text/plain"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("zip", "application/zip"),
];

/// Non-canonical MIME names that content sniffing reports, mapped onto the
/// names used in `CATEGORY_MIME_TYPES`.
pub const MIME_ALIASES: &[(&str, &str)] = &[
    ("audio/x-wav", "audio/wav"),
    ("audio/wave", "audio/wav"),
    ("audio/vnd.wave", "audio/wav"),
    ("audio/x-mp3", "audio/mpeg"),
    ("image/jpg", "image/jpeg"),
    ("image/x-ms-bmp", "image/bmp"),
    ("image/x-bmp", "image/bmp"),
    ("video/x-quicktime", "video/quicktime"),
];

pub const FALLBACK_MIME: &str = "application/octet-stream";

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{prefix:>3} [{bar:30.cyan/blue}] {percent:>3}% {msg}";
pub const OVERALL_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} files";

pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "svg", "mp4", "webm", "ogv", "mov",
    "pdf", "doc", "docx", "xls", "xlsx", "txt", "mp3", "wav", "ogg",
];
