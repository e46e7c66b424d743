//! LiteVector to JSON converter.

use std::path::PathBuf;

use clap::Parser;

/// Convert LiteVector data to JSON.
#[derive(Parser)]
struct Args {
    /// The input file to read. Reads stdin when absent.
    #[clap(short, long)]
    input: Option<PathBuf>,

    /// The output file to write. Writes stdout when absent.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Treat the input as hex-encoded text.
    #[clap(long)]
    hex: bool,

    /// Pretty-print the JSON output.
    #[clap(short, long)]
    pretty: bool,

    /// LTV data supplied directly on the command line, hex-encoded.
    value: Option<String>,
}

fn main() -> anyhow::Result<()> {
    ltv_cli::init_logging();

    let args = Args::parse();
    let raw = ltv_cli::read_input(args.input.as_deref(), args.value.as_deref())?;

    let data = match args.hex || args.value.is_some() {
        true => ltv_cli::decode_hex(&raw)?,
        false => raw,
    };

    log::debug!("transcoding {} bytes of LTV", data.len());

    let mut out = Vec::new();
    ltv_json::ltv_to_json(data.as_slice(), &mut out, args.pretty)?;
    out.push(b'\n');

    ltv_cli::write_output(args.output.as_ref(), &out)
}
