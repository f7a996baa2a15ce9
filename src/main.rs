use clap::{Parser, ValueEnum};
use cardet::{DetectError, DetectorConfig, DocumentDetector};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cardet")]
#[command(about = "Locate an ID-1 card's boundary in a photo", long_about = None)]
struct Cli {
    /// Input image path
    image: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Lower Canny edge threshold (disables adaptive thresholding)
    #[arg(long)]
    edge_low: Option<f32>,

    /// Upper Canny edge threshold (disables adaptive thresholding)
    #[arg(long)]
    edge_high: Option<f32>,

    /// Minimum candidate area as a fraction of image area
    #[arg(long)]
    min_area_ratio: Option<f32>,

    /// Maximum candidate area as a fraction of image area
    #[arg(long)]
    max_area_ratio: Option<f32>,

    /// Aspect-ratio tolerance before the aspect score reaches zero
    #[arg(long)]
    aspect_tolerance: Option<f32>,

    /// Disable mean/stddev adaptive Canny thresholds
    #[arg(long)]
    no_adaptive: bool,

    /// Report corners in pixel coordinates instead of normalized [0, 1]
    #[arg(long)]
    pixels: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    /// JSON output with corners and confidence
    Json,
    /// Plain text, one corner per line
    Text,
    /// TSV format: confidence\tx1,y1,x2,y2,x3,y3,x4,y4
    Tsv,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = DetectorConfig {
        edge_low: cli.edge_low,
        edge_high: cli.edge_high,
        min_area_ratio: cli.min_area_ratio,
        max_area_ratio: cli.max_area_ratio,
        approx_epsilon_factor: None,
        aspect_tolerance: cli.aspect_tolerance,
        adaptive_thresholds: !cli.no_adaptive,
    };
    let detector = DocumentDetector::with_config(config);

    let img = match image::open(&cli.image) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("failed to open {}: {e}", cli.image.display());
            return ExitCode::from(2);
        }
    };

    let bounds = match detector.detect(&img) {
        Ok(b) => b,
        Err(DetectError::NoDocument) => {
            eprintln!("no document found");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("detection failed: {e}");
            return ExitCode::from(2);
        }
    };

    let corners = if cli.pixels {
        bounds.to_pixel_corners(img.width(), img.height())
    } else {
        bounds.corners
    };

    match cli.format {
        OutputFormat::Json => {
            let json_output = serde_json::json!({
                "corners": corners.iter()
                    .map(|(x, y)| serde_json::json!({"x": x, "y": y}))
                    .collect::<Vec<_>>(),
                "confidence": bounds.confidence,
            });
            match serde_json::to_string_pretty(&json_output) {
                Ok(s) => println!("{s}"),
                Err(e) => {
                    eprintln!("failed to serialize result: {e}");
                    return ExitCode::from(2);
                }
            }
        }
        OutputFormat::Text => {
            let labels = ["top-left", "top-right", "bottom-right", "bottom-left"];
            for (label, (x, y)) in labels.iter().zip(corners.iter()) {
                println!("{label}: {x:.4}, {y:.4}");
            }
            println!("confidence: {:.3}", bounds.confidence);
        }
        OutputFormat::Tsv => {
            let corner_str = format!(
                "{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4}",
                corners[0].0, corners[0].1,
                corners[1].0, corners[1].1,
                corners[2].0, corners[2].1,
                corners[3].0, corners[3].1,
            );
            println!("{:.3}\t{corner_str}", bounds.confidence);
        }
    }

    ExitCode::SUCCESS
}
