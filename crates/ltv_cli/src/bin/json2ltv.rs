//! JSON to LiteVector converter.

use std::path::PathBuf;

use clap::Parser;

/// Convert JSON to LiteVector data.
#[derive(Parser)]
struct Args {
    /// The input file to read. Reads stdin when absent.
    #[clap(short, long)]
    input: Option<PathBuf>,

    /// The output file to write. Writes stdout when absent.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Hex-encode the binary output.
    #[clap(long)]
    hex: bool,

    /// JSON supplied directly on the command line.
    value: Option<String>,
}

fn main() -> anyhow::Result<()> {
    ltv_cli::init_logging();

    let args = Args::parse();
    let json = ltv_cli::read_input(args.input.as_deref(), args.value.as_deref())?;

    let mut data = Vec::new();
    ltv_json::json_to_ltv(json.as_slice(), &mut data)?;

    log::debug!("encoded {} bytes of LTV", data.len());

    let out = match args.hex {
        true => {
            let mut text = hex::encode(&data).into_bytes();
            text.push(b'\n');
            text
        }
        false => data,
    };

    ltv_cli::write_output(args.output.as_ref(), &out)
}
