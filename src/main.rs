//! PDF Image Appender CLI
//!
//! Drives the same merge session the browser uses, with files from disk.

use anyhow::{bail, Context};
use clap::Parser;
use futures::executor::block_on;
use pdf_image_append::delivery::DirectorySink;
use pdf_image_append::input::DiskFile;
use pdf_image_append::preview::MemoryPreviews;
use pdf_image_append::{MergeOptions, MergeSession, PageSize, DEFAULT_OUTPUT_NAME};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Append images to a PDF, one centered page per image
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF file path
    #[arg(short, long)]
    pdf: PathBuf,

    /// Image file path (PNG or JPEG); repeat for more pages, order is kept
    #[arg(short, long = "image", required = true)]
    images: Vec<PathBuf>,

    /// Directory the merged PDF is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output file name
    #[arg(long, default_value = DEFAULT_OUTPUT_NAME)]
    name: String,

    /// Size of the added pages: a4, letter, or WxH in points
    #[arg(long, default_value = "a4")]
    page_size: PageSize,

    /// Leave PDF streams uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let options = MergeOptions {
        page_size: args.page_size,
        compress_streams: !args.no_compress,
        file_name: args.name.clone(),
    };

    let backend = Rc::new(MemoryPreviews::<DiskFile>::new());
    let mut session = MergeSession::with_options(backend, options);

    let pdf = DiskFile::from_path(&args.pdf);
    if let Err(e) = session.drop_pdf(vec![pdf]) {
        bail!("{}: {}", args.pdf.display(), e);
    }

    let files: Vec<DiskFile> = args.images.iter().map(DiskFile::from_path).collect();
    let accepted = session.drop_images(files);
    if accepted < args.images.len() {
        tracing::warn!(
            ignored = args.images.len() - accepted,
            "some inputs are not images and were ignored"
        );
    }

    let sink = DirectorySink::new(&args.output_dir);
    let report = block_on(session.merge(&sink)).context("Failed to append images")?;

    println!(
        "Done! Added {} pages to {} original pages ({} images skipped)",
        report.pages_added, report.original_pages, report.skipped_images
    );
    println!("Output saved to: {:?}", sink.target(&args.name));

    Ok(())
}
