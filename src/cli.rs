use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "media-uploader",
    about = "Validate, preview, compress and upload batches of media files",
    long_about = "media-uploader checks a batch of files against type, size and count limits, \
                  builds previews, optionally shrinks images, and sends each file as a \
                  multipart/form-data request with bounded concurrency and live progress.",
    version,
    after_help = "EXAMPLES:\n  \
    media-uploader validate ./photos -r --max-files 20\n  \
    media-uploader preview clip.mp4\n  \
    media-uploader compress photo.png small.jpg -w 800 -q 0.7\n  \
    media-uploader upload https://example.com/upload \"./photos/*.jpg\" -c 4 --compress"
)]
pub struct Args {
    #[arg(long, global = true, conflicts_with = "verbose", help = "Only print errors")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Print debug output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by subcommands that take a batch of inputs.
#[derive(ClapArgs, Debug, Clone)]
pub struct InputArgs {
    #[arg(
        required = true,
        help = "Files, directories or glob patterns",
        long_help = "Each input can be a file, a directory or a glob expression. \
                     Examples: './media', '*.png', '/path/to/uploads/*.{jpg,mp4}'"
    )]
    pub inputs: Vec<String>,

    #[arg(short = 'r', long, help = "Descend into subdirectories")]
    pub recursive: bool,

    #[arg(long, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Maximum number of files in one batch")]
    pub max_files: Option<usize>,

    #[arg(
        long = "allow",
        value_name = "MIME",
        help = "Accepted MIME type (repeatable)",
        long_help = "Restrict the batch to these MIME types. \
                     Without this flag every known image, video, document and audio type is accepted."
    )]
    pub allowed_types: Vec<String>,

    #[arg(long, value_name = "BYTES", help = "Per-file size limit overriding the category limit")]
    pub max_size: Option<u64>,

    #[arg(long, value_name = "BYTES", help = "Limit on the combined size of the batch")]
    pub max_total_size: Option<u64>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CompressArgs {
    #[arg(short = 'w', long, help = "Maximum width in pixels (default: 1920)")]
    pub width: Option<u32>,

    #[arg(short = 'H', long, help = "Maximum height in pixels (default: 1080)")]
    pub height: Option<u32>,

    #[arg(
        short = 'q',
        long,
        help = "Encoder quality in (0, 1] (default: 0.8)",
        long_help = "Encoder quality from just above 0 (smallest) to 1 (best). \
                     For PNG output: >=0.9 uses Zopfli, >=0.7 uses high compression."
    )]
    pub quality: Option<f32>,

    #[arg(short = 'f', long, help = "Output format (jpeg, png, webp or a MIME type)")]
    pub format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Check a batch against the upload limits",
        long_about = "Validate every input against the allowed types, per-category size limits, \
                      the file count limit and the total size limit, and print a report."
    )]
    Validate {
        #[command(flatten)]
        input: InputArgs,
    },

    #[command(
        about = "Print the preview for one file as JSON",
        long_about = "Generate the preview a picker would show: a data URL with dimensions for images, \
                      a captured frame with duration for videos (requires ffmpeg and ffprobe), \
                      or an icon name for everything else."
    )]
    Preview {
        #[arg(help = "File to preview")]
        input: PathBuf,

        #[arg(long, help = "Print the complete data URL instead of a truncated one")]
        full: bool,
    },

    #[command(
        about = "Shrink a single image",
        long_about = "Scale an image down to fit the bounds and re-encode it. \
                      Images are never upscaled."
    )]
    Compress {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(help = "Output image file path")]
        output: PathBuf,

        #[command(flatten)]
        options: CompressArgs,
    },

    #[command(
        about = "Upload a batch of files to an HTTP endpoint",
        long_about = "Validate the batch, then send every file as its own multipart/form-data request. \
                      Failed files do not stop the batch; the exit status is non-zero if any file failed. \
                      Press Ctrl-C to cancel the remaining uploads."
    )]
    Upload {
        #[arg(help = "Endpoint URL receiving the uploads")]
        endpoint: String,

        #[command(flatten)]
        input: InputArgs,

        #[arg(short = 'c', long, help = "Uploads in flight at once (default: 3)")]
        concurrency: Option<usize>,

        #[arg(long, value_name = "SECONDS", help = "Per-file upload timeout")]
        timeout: Option<u64>,

        #[arg(long, help = "Compress images before uploading")]
        compress: bool,

        #[command(flatten)]
        compression: CompressArgs,

        #[arg(short = 'F', long = "field", help = "Multipart field name (default: file)")]
        field_name: Option<String>,

        #[arg(short = 'X', long, help = "HTTP method: POST, PUT or PATCH (default: POST)")]
        method: Option<String>,

        #[arg(
            long = "header",
            value_name = "KEY:VALUE",
            help = "Extra request header (repeatable)"
        )]
        headers: Vec<String>,
    },
}

/// Splits a `KEY:VALUE` header argument.
pub fn parse_header(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_upload_flags() {
        let args = Args::try_parse_from([
            "media-uploader",
            "upload",
            "http://localhost/upload",
            "a.png",
            "b.pdf",
            "-c",
            "2",
            "--compress",
            "-q",
            "0.5",
            "-X",
            "put",
            "--header",
            "Authorization: Bearer x",
        ])
        .unwrap();

        match args.command {
            Commands::Upload {
                endpoint,
                input,
                concurrency,
                compress,
                compression,
                method,
                headers,
                ..
            } => {
                assert_eq!(endpoint, "http://localhost/upload");
                assert_eq!(input.inputs, vec!["a.png", "b.pdf"]);
                assert_eq!(concurrency, Some(2));
                assert!(compress);
                assert_eq!(compression.quality, Some(0.5));
                assert_eq!(method.as_deref(), Some("put"));
                assert_eq!(headers, vec!["Authorization: Bearer x"]);
            }
            _ => panic!("expected upload command"),
        }
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("X-Token: abc:def"),
            Some(("X-Token".to_string(), "abc:def".to_string()))
        );
        assert_eq!(parse_header("no-colon"), None);
        assert_eq!(parse_header(": value"), None);
    }
}
