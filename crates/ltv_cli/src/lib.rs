//! Shared plumbing for the LTV command-line tools.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Resolve tool input: a positional argument wins, then an input file,
/// then stdin.
pub fn read_input(file: Option<&Path>, direct: Option<&str>) -> anyhow::Result<Vec<u8>> {
    if let Some(text) = direct {
        return Ok(text.as_bytes().to_vec());
    }

    match file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

/// Decode hex-encoded input, ignoring any whitespace.
pub fn decode_hex(raw: &[u8]) -> anyhow::Result<Vec<u8>> {
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    hex::decode(compact).context("decoding hex input")
}

/// Write tool output to a file, or stdout when no path is given.
pub fn write_output(file: Option<&PathBuf>, bytes: &[u8]) -> anyhow::Result<()> {
    match file {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("writing {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("writing stdout")?;
            stdout.flush().context("flushing stdout")
        }
    }
}

/// Initialize logging the same way for every tool: RUST_LOG with a default
/// when unset.
pub fn init_logging() {
    match std::env::var("RUST_LOG") {
        Ok(_) => (),
        Err(_) => std::env::set_var("RUST_LOG", "INFO"),
    }

    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_default())
        .init();
}
