//! Outfit Frame Finishing CLI Tool
//!
//! Command-line interface for assessing and cleaning backdrops on generated
//! outfit frames.

use crate::{
    segmentation::{analyze_background, remove_border_background, BackgroundAssessment},
    services::FrameIOService,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace};

/// Outfit frame finishing CLI tool
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "pawdrobe")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input frame files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch processing). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Assess backdrop coverage and report without writing any files
    #[arg(short, long)]
    pub analyze: bool,

    /// Only clean frames whose backdrop assessment raises an issue
    #[arg(long)]
    pub only_flagged: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Process directory recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for batch processing (e.g., "*.png")
    #[arg(long)]
    pub pattern: Option<String>,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose).context("Failed to initialize tracing")?;

    if cli.analyze && cli.output.is_some() {
        warn!("--output is ignored in analyze mode");
    }

    info!("Starting outfit frame finishing CLI");
    info!("Input(s): {}", cli.input.join(", "));

    let start_time = Instant::now();
    let processed_count = process_inputs(&cli)?;

    let total_time = start_time.elapsed();
    info!(
        "Processed {} frame(s) in {:.2}s",
        processed_count,
        total_time.as_secs_f64()
    );

    Ok(())
}

/// Initialize tracing based on verbosity level
fn init_tracing(verbose_count: u8) -> Result<()> {
    use crate::tracing_config::{TracingConfig, TracingFormat};

    TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(TracingFormat::Console)
        .init()
        .context("Failed to initialize tracing subscriber")?;

    if verbose_count > 0 {
        match verbose_count {
            1 => debug!("🔧 Debug level: Showing internal state and computations"),
            _ => trace!("🔍 Trace level: Showing extremely detailed traces"),
        }
    }

    Ok(())
}

/// Process all inputs and return the number of frames handled
fn process_inputs(cli: &Cli) -> Result<usize> {
    // Handle stdin specially (single input)
    if cli.input.len() == 1 && cli.input.first().is_some_and(|s| s == "-") {
        return process_stdin(cli);
    }

    // Collect frame files from inputs (files and directories)
    let mut all_files = Vec::new();

    for input in &cli.input {
        let path = PathBuf::from(input);

        if path.is_file() {
            if FrameIOService::is_supported_format(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            let dir_files = find_frame_files(&path, cli.recursive, cli.pattern.as_deref())?;
            all_files.extend(dir_files);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    if all_files.is_empty() {
        warn!("No supported frame files found in the provided inputs");
        return Ok(0);
    }

    // Sort files alphanumerically for consistent processing order
    all_files.sort();

    info!("Found {} frame file(s) to process", all_files.len());

    let progress = if all_files.len() > 1 {
        let pb = ProgressBar::new(all_files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut processed_count = 0;
    let mut failed_count = 0;
    let file_count = all_files.len();

    // Validate and prepare output directory for batch processing
    let output_dir = if file_count > 1 {
        if let Some(ref output) = cli.output {
            if output == "-" {
                anyhow::bail!("Cannot use stdout (-) as output when processing multiple files");
            }
            let output_path = PathBuf::from(output);
            if !output_path.exists() {
                std::fs::create_dir_all(&output_path).with_context(|| {
                    format!(
                        "Failed to create output directory: {}",
                        output_path.display()
                    )
                })?;
            } else if output_path.is_file() {
                anyhow::bail!(
                    "Output path exists and is a file, not a directory: {}",
                    output_path.display()
                );
            }
            Some(output_path)
        } else {
            None
        }
    } else {
        None
    };

    for input_file in &all_files {
        if let Some(ref pb) = progress {
            pb.set_message(format!("Processing {}", input_file.display()));
        }

        let output_path = if file_count == 1 {
            cli.output.clone()
        } else {
            output_dir
                .as_ref()
                .map(|dir| generate_output_path_with_dir(input_file, dir))
        };

        let outcome = if cli.analyze {
            analyze_single_file(input_file)
        } else {
            clean_single_file(cli, input_file, output_path.as_ref())
        };

        match outcome {
            Ok(()) => processed_count += 1,
            Err(e) => {
                error!("❌ Failed to process {}: {}", input_file.display(), e);
                failed_count += 1;
            },
        }

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Completed! Processed: {processed_count}, Failed: {failed_count}"
        ));
    }

    if failed_count > 0 {
        warn!("Some files failed to process. Processed: {processed_count}, Failed: {failed_count}");
    }

    Ok(processed_count)
}

/// Handle a frame arriving on stdin
fn process_stdin(cli: &Cli) -> Result<usize> {
    info!("Reading frame from stdin");

    let image_data = read_stdin()?;
    let image = FrameIOService::load_from_bytes(&image_data)
        .context("Failed to decode frame from stdin")?;
    let rgba = image.to_rgba8();

    if cli.analyze {
        report_assessment("stdin", &analyze_background(&rgba));
        return Ok(1);
    }

    if cli.only_flagged && !analyze_background(&rgba).has_issue {
        info!("Backdrop already clean, passing frame through unchanged");
        write_output(cli.output.as_ref(), &image_data)?;
        return Ok(1);
    }

    let start_time = Instant::now();
    let cleaned = remove_border_background(&rgba).context("Failed to remove backdrop")?;
    let png = encode_png(&cleaned)?;
    write_output(cli.output.as_ref(), &png)?;

    info!(
        "Cleaned stdin frame in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(1)
}

/// Assess a single frame and report backdrop coverage
fn analyze_single_file(input_path: &Path) -> Result<()> {
    let image = FrameIOService::load_image(input_path).context("Failed to load frame")?;
    let assessment = analyze_background(&image.to_rgba8());
    report_assessment(&input_path.display().to_string(), &assessment);
    Ok(())
}

/// Clean a single frame and write the result
fn clean_single_file(cli: &Cli, input_path: &Path, output_path: Option<&String>) -> Result<()> {
    let image = FrameIOService::load_image(input_path).context("Failed to load frame")?;
    let rgba = image.to_rgba8();

    if cli.only_flagged {
        let assessment = analyze_background(&rgba);
        if !assessment.has_issue {
            info!("Skipping {} (backdrop already clean)", input_path.display());
            return Ok(());
        }
        info!(
            "Cleaning {} ({} backdrop, {:.1}% of pixels)",
            input_path.display(),
            assessment.classification,
            assessment.background_percentage
        );
    }

    let start_time = Instant::now();
    let cleaned = remove_border_background(&rgba).context("Failed to remove backdrop")?;
    let processing_time = start_time.elapsed();

    match output_path {
        Some(target) if target == "-" => {
            let png = encode_png(&cleaned)?;
            write_stdout(&png)?;
            info!(
                "Cleaned {} in {:.2}s - output to stdout",
                input_path.display(),
                processing_time.as_secs_f64()
            );
        },
        Some(target) => {
            FrameIOService::save_png(&cleaned, target).context("Failed to save cleaned frame")?;
            info!(
                "Cleaned {} in {:.2}s -> {}",
                input_path.display(),
                processing_time.as_secs_f64(),
                target
            );
        },
        None => {
            let output = generate_output_path(input_path);
            FrameIOService::save_png(&cleaned, &output)
                .context("Failed to save cleaned frame")?;
            info!(
                "Cleaned {} in {:.2}s -> {}",
                input_path.display(),
                processing_time.as_secs_f64(),
                output.display()
            );
        },
    }

    Ok(())
}

/// Print one assessment line for a frame
fn report_assessment(name: &str, assessment: &BackgroundAssessment) {
    if assessment.has_issue {
        println!(
            "{}: {} backdrop ({:.1}% of pixels, {:.1}% of edge, confidence {:.2})",
            name,
            assessment.classification,
            assessment.background_percentage,
            assessment.edge_background_percentage,
            assessment.confidence
        );
    } else {
        println!("{}: clean", name);
    }
}

/// Read frame data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read frame data from stdin")?;

    if buffer.is_empty() {
        anyhow::bail!("No data received from stdin");
    }

    Ok(buffer)
}

/// Write frame data to stdout
fn write_stdout(data: &[u8]) -> Result<()> {
    io::stdout()
        .write_all(data)
        .context("Failed to write frame data to stdout")?;
    io::stdout().flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Write bytes to the requested output, defaulting to stdout for stdin input
fn write_output(output_target: Option<&String>, data: &[u8]) -> Result<()> {
    match output_target {
        Some(target) if target != "-" => {
            let output_path = PathBuf::from(target);
            if let Some(parent) = output_path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            std::fs::write(&output_path, data)
                .with_context(|| format!("Failed to write output: {}", output_path.display()))?;
            info!("Frame written to: {}", output_path.display());
        },
        _ => {
            write_stdout(data)?;
            info!("Frame written to stdout");
        },
    }
    Ok(())
}

/// Encode an RGBA image as PNG bytes
fn encode_png(image: &image::RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .context("Failed to encode PNG")?;
    Ok(bytes)
}

/// Find frame files in a directory
fn find_frame_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if FrameIOService::is_supported_format(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if FrameIOService::is_supported_format(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}

/// Check if file matches the given pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => {
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            } else {
                false
            }
        },
        None => true,
    }
}

/// Generate output path with a `_cleaned` suffix
fn generate_output_path(input_path: &Path) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    let dir = input_path.parent().unwrap_or(Path::new("."));

    dir.join(format!("{}_cleaned.png", stem.to_string_lossy()))
}

/// Generate output path inside a chosen output directory
fn generate_output_path_with_dir(input_path: &Path, output_dir: &Path) -> String {
    let stem = input_path.file_stem().unwrap_or_default();
    let output_filename = format!("{}_cleaned.png", stem.to_string_lossy());

    output_dir
        .join(output_filename)
        .to_string_lossy()
        .to_string()
}
