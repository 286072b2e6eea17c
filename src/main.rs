use std::{error::Error, fs, path::PathBuf};

use clap::{Parser, Subcommand};

use barcodism::{
    BatchDecoder, CodeSet, ECLevel, EncodeOptions, ModuleGrid, ReaderOptions, RenderOptions, Speed,
    Symbology, Version,
};

#[derive(Parser)]
#[command(name = "barcodism", version, about = "Generate and read QR codes and Code 128 barcodes")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode text into a barcode image
    Encode {
        /// qr or code128
        #[arg(long, default_value = "qr")]
        symbology: Symbology,
        #[arg(long, default_value = "M")]
        ec_level: ECLevel,
        /// QR version 1-40, smallest fitting version when omitted
        #[arg(long)]
        version: Option<usize>,
        /// Force a single Code 128 code set
        #[arg(long, value_enum)]
        code_set: Option<CodeSet>,
        /// Prefix Code 128 data with FNC1
        #[arg(long)]
        gs1: bool,
        /// Convert the text to Shift JIS and use QR Kanji mode where shorter
        #[arg(long)]
        kanji: bool,
        /// QR ECI assignment number, e.g. 26 for UTF-8
        #[arg(long)]
        eci: Option<u32>,
        #[arg(long, default_value_t = 4)]
        module_size: u32,
        /// Output image, the symbol is printed to stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
        text: String,
    },
    /// Decode barcodes from one or more images
    Decode {
        /// Reader options as JSON
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum)]
        speed: Option<Speed>,
        /// Report every symbol instead of the first
        #[arg(long)]
        multiple: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Encode { symbology, ec_level, version, code_set, gs1, kanji, eci, module_size, out, text } => {
            let version = version.map(Version::new).transpose()?;
            let opts = EncodeOptions { ec_level, version, code_set, gs1, kanji, eci, ..Default::default() };
            let data = match kanji {
                true => encoding_rs::SHIFT_JIS.encode(&text).0.into_owned(),
                false => text.into_bytes(),
            };
            let barcode = symbology.codec().encode(&data, &opts)?;

            match out {
                Some(path) => {
                    let img = barcode.render(&RenderOptions::default().module_size(module_size))?;
                    img.save(&path)?;
                    log::info!("Saved {symbology} to {}", path.display());
                }
                None => println!("{}", to_text(&barcode.to_grid())),
            }
        }
        Command::Decode { config, speed, multiple, json, images } => {
            let mut opts = match config {
                Some(path) => serde_json::from_str::<ReaderOptions>(&fs::read_to_string(path)?)?,
                None => ReaderOptions::default(),
            };
            if let Some(speed) = speed {
                opts.speed = speed;
            }
            opts.expect_multiple |= multiple;

            let imgs = images
                .iter()
                .map(|p| image::open(p).map(|img| img.to_luma8()))
                .collect::<Result<Vec<_>, _>>()?;
            let report = BatchDecoder::new(opts)?.decode_all(&imgs);

            for rej in report.rejections.iter() {
                log::info!("{}: {} rejected, {}", images[rej.source_index].display(), rej.symbology, rej.reason);
            }
            for idx in report.skipped.iter() {
                log::warn!("{}: skipped", images[*idx].display());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report.results)?);
            } else {
                for res in report.results.iter() {
                    let path = images[res.source_index].display();
                    println!("{path}: [{}] {} ({:.2})", res.symbology, res.text, res.confidence);
                }
            }

            if report.results.is_empty() {
                return Err("No barcode found".into());
            }
        }
    }

    Ok(())
}

fn to_text(grid: &ModuleGrid) -> String {
    let mut res = String::with_capacity((grid.width() * 2 + 1) * grid.height());
    for r in 0..grid.height() {
        for &dark in grid.row(r) {
            res.push_str(if dark { "██" } else { "  " });
        }
        res.push('\n');
    }
    res
}
