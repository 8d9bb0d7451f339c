use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use pdf_content_extractor::{
    ExtractOptions, ExtractionReport, OcrBackendKind, OcrConfig, PageSelection, QualityMode,
    available_backends, build_rag_view, build_recognizer, dump_images, extract_pdf_content,
    read_pages, render_summary, summarize, to_json_string, validated_pages_json,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pdf-content-extractor",
    version,
    about = "Extract text, tables and images from PDFs into validated JSON"
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract page content and write JSON output.
    Extract(ExtractArgs),
    /// List OCR backends and whether they can be used.
    Backends,
    /// Print per-page statistics for a saved extraction result.
    Summary(SummaryArgs),
    /// Write the images of one page to a directory.
    DumpImages(DumpImagesArgs),
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input PDF path.
    pdf_file: PathBuf,

    /// Output JSON path (default: stdout).
    output_file: Option<PathBuf>,

    /// OCR backend: none, tesseract or leptess.
    #[arg(long, env = "PDF_EXTRACTOR_OCR_BACKEND", default_value = "none")]
    ocr_backend: String,

    /// Tesseract language codes.
    #[arg(long, default_value = "eng")]
    ocr_lang: String,

    /// Page selection like 1-3,5 or 4- (page 4 to the end).
    #[arg(long)]
    pages: Option<String>,

    /// Minimum cells required per candidate table row.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,

    /// Handling of low-confidence tables: best-effort, strict or skip-ambiguous.
    #[arg(long, default_value = "best-effort")]
    quality: String,

    /// Emit the retrieval view (page-annotated text and markdown tables) instead of pages.
    #[arg(long)]
    rag: bool,
}

#[derive(Debug, Args)]
struct SummaryArgs {
    /// Extraction result written by `extract`.
    result_file: PathBuf,
}

#[derive(Debug, Args)]
struct DumpImagesArgs {
    /// Input PDF path.
    pdf_file: PathBuf,

    /// Directory to write images into.
    #[arg(long)]
    out_dir: PathBuf,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Maximum number of images to write.
    #[arg(long, default_value_t = 4)]
    limit: usize,
}

fn parse_options(args: &ExtractArgs) -> Result<ExtractOptions> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    let quality_mode = QualityMode::from_str(&args.quality)
        .map_err(|error| anyhow!(error))
        .context("failed to parse --quality")?;

    Ok(ExtractOptions {
        pages,
        quality_mode,
        min_cols: args.min_cols,
    })
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!("  - {warning}");
        }
    }
}

fn emit(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            info!("Output saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_extract(args: &ExtractArgs, verbose: bool) -> Result<()> {
    let options = parse_options(args)?;
    let backend = OcrBackendKind::from_str(&args.ocr_backend)
        .map_err(|error| anyhow!(error))
        .context("failed to parse --ocr-backend")?;

    info!("Extracting content from: {}", args.pdf_file.display());
    info!("OCR backend: {backend}");
    let (recognizer, _) = build_recognizer(&OcrConfig {
        backend,
        language: args.ocr_lang.clone(),
    });

    let report = extract_pdf_content(&args.pdf_file, &options, recognizer.as_ref())
        .with_context(|| format!("failed to extract content from '{}'", args.pdf_file.display()))?;
    log_report(&report, verbose);

    info!("Validating output schema...");
    let pages_json = validated_pages_json(&report.pages).context("validation error")?;
    info!("Validation passed.");

    let json = if args.rag {
        let document_path = args.pdf_file.display().to_string();
        to_json_string(&build_rag_view(&report.pages, &document_path))?
    } else {
        to_json_string(&pages_json)?
    };
    emit(&json, args.output_file.as_deref())?;

    info!("Successfully processed {} page(s).", report.pages.len());
    Ok(())
}

fn run_backends() {
    println!("Available OCR backends:");
    for (backend, available) in available_backends() {
        let status = if available {
            "available"
        } else {
            "not installed"
        };
        println!("  {backend}: {status}");
    }
}

fn run_summary(args: &SummaryArgs) -> Result<()> {
    let pages = read_pages(&args.result_file)
        .with_context(|| format!("failed to read '{}'", args.result_file.display()))?;
    print!("{}", render_summary(&summarize(&pages)));
    Ok(())
}

fn run_dump_images(args: &DumpImagesArgs) -> Result<()> {
    let written = dump_images(&args.pdf_file, args.page, args.limit, &args.out_dir)
        .with_context(|| format!("failed to dump images from '{}'", args.pdf_file.display()))?;
    for path in &written {
        println!("{}", path.display());
    }
    info!(
        "{} image(s) saved to: {}",
        written.len(),
        args.out_dir.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "pdf_content_extractor=debug"
    } else {
        "pdf_content_extractor=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let result = match &cli.command {
        Commands::Extract(args) => run_extract(args, cli.verbose),
        Commands::Backends => {
            run_backends();
            Ok(())
        }
        Commands::Summary(args) => run_summary(args),
        Commands::DumpImages(args) => run_dump_images(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
