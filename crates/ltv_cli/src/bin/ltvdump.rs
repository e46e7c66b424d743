//! A diagnostic utility that dumps LiteVector data field by field.

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;

use ltv_core::{Role, StreamDecoder, TypeCode};

/// Dump LiteVector data element by element.
#[derive(Parser)]
struct DumpArgs {
    /// The input file to read. Reads stdin when absent.
    #[clap(short, long)]
    input: Option<PathBuf>,

    /// Treat the input as hex-encoded text.
    #[clap(long)]
    hex: bool,

    /// LTV data supplied directly on the command line, hex-encoded.
    value: Option<String>,
}

fn dump(data: &[u8]) -> anyhow::Result<()> {
    let mut s = StreamDecoder::new(data);
    s.return_nops = true;
    s.max_value_len = u64::MAX;

    println!("TagOffset  Tag   Type    Size   Length  ValueOffset  Value");

    loop {
        let d = match s.next() {
            Ok(Some(d)) => d,
            Ok(None) => return Ok(()),
            Err(e) => bail!("dump aborted: {e}"),
        };

        print!(
            " {:08X}   {:02X}   {:<7} {}    ",
            d.tag_offset,
            d.tag,
            d.type_code.name(),
            d.size_code,
        );
        print!("{:8}     {:08X}  ", d.length, d.value_offset);

        if d.is_nop() {
            println!("(nop)");
            continue;
        }

        match d.type_code {
            TypeCode::Nil => println!("(nil)"),
            TypeCode::Struct => println!("{{"),
            TypeCode::List => println!("["),
            TypeCode::End => match d.role {
                Role::ListEnd => println!("]"),
                _ => println!("}}"),
            },
            _ => println!("{}", s.read_value(&d)?),
        }
    }
}

fn main() -> anyhow::Result<()> {
    ltv_cli::init_logging();

    let args = DumpArgs::parse();
    let raw = ltv_cli::read_input(args.input.as_deref(), args.value.as_deref())?;

    // Positional input is always hex.
    let data = match args.hex || args.value.is_some() {
        true => ltv_cli::decode_hex(&raw)?,
        false => raw,
    };

    log::debug!("dumping {} bytes", data.len());
    dump(&data)
}
