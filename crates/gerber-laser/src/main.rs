use clap::Parser;
use gerber_laser::error::GerberError;
use gerber_laser::{convert_with_plate, plate_from_outline, ConvertOptions};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "gerber-laser",
    about = "Convert a Gerber layer to path geometry JSON"
)]
struct Cli {
    /// Input Gerber file (.gbr, .gtl, .gbl, ...)
    input: PathBuf,

    /// Board outline Gerber used as the clearance plate
    #[arg(long)]
    outline: Option<PathBuf>,

    /// Emit clearance geometry (plate minus copper)
    #[arg(long)]
    invert: bool,

    /// Margin in mm around the copper when no outline is given
    #[arg(long)]
    padding: Option<f64>,

    /// Mirror horizontally (bottom layers)
    #[arg(long)]
    mirror: bool,

    /// JSON file with conversion options; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output JSON file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

/// Gerber is ASCII; stray non-UTF-8 bytes are replaced rather than rejected.
fn read_gerber(path: &Path) -> Result<String, GerberError> {
    let data = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn load_options(cli: &Cli) -> Result<ConvertOptions, GerberError> {
    let mut opts = match &cli.config {
        Some(path) => serde_json::from_slice(&std::fs::read(path)?)?,
        None => ConvertOptions::default(),
    };
    if cli.invert {
        opts.invert = true;
    }
    if cli.mirror {
        opts.mirror = true;
    }
    if let Some(padding) = cli.padding {
        opts.padding = padding;
    }
    Ok(opts)
}

fn run(cli: &Cli) -> Result<(), GerberError> {
    let opts = load_options(cli)?;
    let content = read_gerber(&cli.input)?;

    let plate = match &cli.outline {
        Some(path) => plate_from_outline(&read_gerber(path)?),
        None => None,
    };
    if cli.outline.is_some() && plate.is_none() {
        log::warn!("Outline gave no plate, falling back to padded bounds");
    }

    let geometry = convert_with_plate(&content, &opts, plate.as_ref());
    let json = if cli.pretty {
        serde_json::to_string_pretty(&geometry)?
    } else {
        serde_json::to_string(&geometry)?
    };

    if let Some(output_path) = &cli.output {
        std::fs::write(output_path, &json)?;
        eprintln!("Written to {}", output_path.display());
    } else {
        println!("{json}");
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
