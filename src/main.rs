use anyhow::{bail, Context, Result};
use clap::Parser;
use media_uploader::cli::{parse_header, Args, Commands, CompressArgs, InputArgs};
use media_uploader::formats::{is_decodable_mime, OutputFormat};
use media_uploader::utils::{calculate_compression_ratio, collect_input_files, format_file_size};
use media_uploader::{
    compress_image, create_batch_session, logger, status, BatchUploadManager, CompressionOptions,
    FileHandle, NoopObserver, PreviewGenerator, ProgressRenderer, UploadConfig, UploadError,
};
use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

const PREVIEW_URL_DISPLAY_LEN: usize = 64;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);

    match run(args.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Validate { input } => validate(&input).await,
        Commands::Preview { input, full } => preview(&input, full).await,
        Commands::Compress {
            input,
            output,
            options,
        } => compress(&input, &output, &options).await,
        Commands::Upload {
            endpoint,
            input,
            concurrency,
            timeout,
            compress,
            compression,
            field_name,
            method,
            headers,
        } => {
            let mut config = load_config(&input).await?;
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            if let Some(secs) = timeout {
                config.timeout_secs = Some(secs);
            }
            config.compress |= compress;
            apply_compression_overrides(&mut config, &compression);
            if let Some(field_name) = field_name {
                config.field_name = field_name;
            }
            if let Some(method) = method {
                config.method = method;
            }
            for raw in &headers {
                let (key, value) = parse_header(raw)
                    .with_context(|| format!("Invalid header '{}', expected KEY:VALUE", raw))?;
                config.headers.insert(key, value);
            }
            upload(&endpoint, &input, &config).await
        }
    }
}

async fn load_config(input: &InputArgs) -> Result<UploadConfig> {
    let mut config = match &input.config {
        Some(path) => UploadConfig::from_toml_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => UploadConfig::default(),
    };

    if let Some(max_files) = input.max_files {
        config.max_files = max_files;
    }
    if !input.allowed_types.is_empty() {
        config.allowed_types = input.allowed_types.clone();
    }
    if input.max_size.is_some() {
        config.max_size = input.max_size;
    }
    if input.max_total_size.is_some() {
        config.max_total_size = input.max_total_size;
    }

    Ok(config)
}

fn apply_compression_overrides(config: &mut UploadConfig, args: &CompressArgs) {
    if let Some(width) = args.width {
        config.max_width = width;
    }
    if let Some(height) = args.height {
        config.max_height = height;
    }
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(format) = &args.format {
        config.format = format.clone();
    }
}

async fn load_files(input: &InputArgs) -> Result<Vec<FileHandle>> {
    let paths = collect_input_files(&input.inputs, input.recursive)?;
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        files.push(FileHandle::from_path(path).await?);
    }
    Ok(files)
}

async fn validate(input: &InputArgs) -> Result<ExitCode> {
    let config = load_config(input).await?;
    let mut session = create_batch_session(Arc::new(NoopObserver));
    for file in load_files(input).await? {
        session.add_file(file);
    }

    let report = session.validate(&config.to_policy());

    status!("📊 Checked {} files ({})", session.files().len(), format_file_size(report.total_size));
    for file in &report.valid_files {
        status!(
            "  ✅ {} [{}, {}]",
            file.name(),
            file.mime_type(),
            format_file_size(file.size_bytes())
        );
    }
    for error in &report.errors {
        eprintln!("  ❌ {}", error);
    }

    if report.valid {
        status!("✅ Batch is valid");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("❌ Batch rejected with {} error(s)", report.errors.len());
        Ok(ExitCode::FAILURE)
    }
}

async fn preview(input: &Path, full: bool) -> Result<ExitCode> {
    let file = FileHandle::from_path(input).await?;
    let preview = PreviewGenerator::default()
        .generate_preview(&file, &CancellationToken::new())
        .await
        .with_context(|| format!("Failed to preview {}", input.display()))?;

    let mut value = serde_json::to_value(&preview)?;
    if !full {
        if let Some(serde_json::Value::String(url)) = value.get_mut("url") {
            if url.len() > PREVIEW_URL_DISPLAY_LEN {
                let truncated: String = url.chars().take(PREVIEW_URL_DISPLAY_LEN).collect();
                *url = format!("{}...", truncated);
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(ExitCode::SUCCESS)
}

async fn compress(input: &Path, output: &Path, args: &CompressArgs) -> Result<ExitCode> {
    let file = FileHandle::from_path(input).await?;
    if !is_decodable_mime(file.mime_type()) {
        return Err(UploadError::UnsupportedFormat(file.mime_type().to_string()).into());
    }

    let format = match &args.format {
        Some(format) => Some(format.clone()),
        None => output
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| OutputFormat::from_str(ext).ok())
            .map(|format| format.mime_type().to_string()),
    };
    let options = CompressionOptions::new(args.quality, args.width, args.height, format.as_deref())?;

    status!("🚀 Compressing {} as {}", input.display(), options.format);
    let start_time = Instant::now();
    let compressed = compress_image(&file, &options, &CancellationToken::new()).await?;
    tokio::fs::write(output, compressed.data())
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    status!(
        "✅ {} -> {} ({:.1}% smaller) in {:.2?}",
        format_file_size(file.size_bytes()),
        format_file_size(compressed.size_bytes()),
        calculate_compression_ratio(file.size_bytes(), compressed.size_bytes()),
        start_time.elapsed()
    );
    Ok(ExitCode::SUCCESS)
}

async fn upload(endpoint: &str, input: &InputArgs, config: &UploadConfig) -> Result<ExitCode> {
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        bail!("Endpoint must be an http(s) URL: {}", endpoint);
    }

    let policy = config.to_policy();
    let options = config.to_batch_options()?;
    let files = load_files(input).await?;

    let renderer = Arc::new(if logger::is_quiet() {
        ProgressRenderer::hidden()
    } else {
        ProgressRenderer::new()
    });
    let mut session = create_batch_session(renderer.clone());
    for file in files {
        session.add_file(file);
    }

    let token = session.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling remaining uploads");
            token.cancel();
        }
    });

    let manager = BatchUploadManager::http();
    let outcomes = match session.submit(&manager, endpoint, &policy, &options).await {
        Ok(outcomes) => outcomes,
        Err(UploadError::Validation(errors)) => {
            renderer.finish();
            for error in &errors {
                eprintln!("  ❌ {}", error);
            }
            eprintln!("❌ Batch rejected, nothing was uploaded");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };
    renderer.finish();

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(response) => status!("  ✅ {}: {}", outcome.file_name, response),
            Err(e) => {
                failed += 1;
                eprintln!("  ❌ {}: {}", outcome.file_name, e);
            }
        }
    }

    let progress = session.progress();
    status!(
        "📊 {} uploaded, {} failed ({} of {} finished)",
        outcomes.len() - failed,
        failed,
        progress.completed,
        progress.total
    );

    if failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

