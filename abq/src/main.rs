mod parser;

use abif::*;
use anyhow::{Context, Result};
use structopt::StructOpt;
use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;
use std::str::from_utf8;
use tracing_subscriber::EnvFilter;

/// Decode and print ABIF files
#[derive(StructOpt)]
#[structopt(name = "abq")]
struct Opt {
    /// parse a textual representation and encode it into a binary ABIF file instead
    #[structopt(short, long)]
    encode: bool,
    /// print the decoded file as JSON
    #[structopt(short, long, conflicts_with = "encode")]
    json: bool,
    /// write to this file instead of stdout
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
    /// read from this file instead of stdin
    #[structopt(parse(from_os_str))]
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let opt = Opt::from_args();
    let buffer = read(opt.input.as_ref())?;
    let output = if opt.encode {
        encode(&buffer)?
    } else if opt.json {
        json(&buffer)?
    } else {
        print(&buffer)?
    };
    match opt.output {
        Some(path) => std::fs::write(&path, output).with_context(|| format!("Failed to write {}", path.display())),
        None       => io::stdout().write_all(&output).context("Failed to write stdout"),
    }
}

fn read(input: Option<&PathBuf>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match input {
        Some(path) => File::open(path)
            .and_then(|mut f| f.read_to_end(&mut buffer))
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => io::stdin().read_to_end(&mut buffer).context("Failed to read stdin")?,
    };
    Ok(buffer)
}

fn decode(buffer: &[u8]) -> Result<Container> {
    Decoder::decode(&mut Cursor::new(buffer)).context("Decoding error")
}

fn print(buffer: &[u8]) -> Result<Vec<u8>> {
    Ok(format!("{}\n", decode(buffer)?).into_bytes())
}

fn json(buffer: &[u8]) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(&decode(buffer)?).context("Serialization error")?;
    out.push(b'\n');
    Ok(out)
}

fn encode(buffer: &[u8]) -> Result<Vec<u8>> {
    let string = from_utf8(buffer).context("input is not utf-8")?;
    let container = parser::parse(string)?;
    to_bytes(&container).context("Encoding error")
}
