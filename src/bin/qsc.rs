//! qsc CLI - code quantized sample streams
//!
//! Reads whitespace- or comma-separated numbers from stdin and writes the
//! coded bytes to stdout, or the reverse.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use qsc::{CoderConfig, Error, HuffmanTable, PredictorConfig, Result, Scheme, SequenceCoder};

#[derive(Parser, Debug)]
#[command(name = "qsc")]
#[command(author, version, about = "Predictive Huffman coding of quantized samples", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read numbers from stdin, write coded bytes to stdout
    Encode {
        #[command(flatten)]
        codec: CodecArgs,
    },
    /// Read coded bytes from stdin, print the values one per line
    Decode {
        /// Number of values in the stream
        #[arg(short = 'n', long)]
        count: usize,

        #[command(flatten)]
        codec: CodecArgs,
    },
    /// Read numbers from stdin, print a Huffman table tuned to them as JSON
    Table {
        #[command(flatten)]
        codec: CodecArgs,
    },
}

#[derive(Args, Debug)]
struct CodecArgs {
    /// Coder configuration as JSON; the options below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Predictor order (0, 1 or 2)
    #[arg(long)]
    order: Option<u8>,

    /// Initial predictor value, 0 if omitted; needs --order
    #[arg(long, requires = "order", allow_negative_numbers = true)]
    initial: Option<i32>,

    /// Second initial predictor value for order 2, 0 if omitted
    #[arg(long, requires = "order", allow_negative_numbers = true)]
    initial2: Option<i32>,

    /// Quantization step
    #[arg(long)]
    step: Option<f64>,

    /// Fold zero runs into joint symbols
    #[arg(long)]
    run_length: bool,
}

impl CodecArgs {
    fn resolve(&self) -> Result<CoderConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                serde_json::from_str(&text).map_err(io::Error::from)?
            }
            None => CoderConfig::default(),
        };
        if let Some(order) = self.order {
            config.predictor = PredictorConfig::from_order(
                order,
                self.initial.unwrap_or(0),
                self.initial2.unwrap_or(0),
            )?;
        }
        if let Some(step) = self.step {
            config.q_step = step;
        }
        if self.run_length {
            config.scheme = Scheme::RunLength;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parse whitespace/comma separated numbers
fn parse_values(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>().map_err(|e| {
                Error::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid number '{t}': {e}"),
                ))
            })
        })
        .collect()
}

fn read_stdin() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    io::stdin().lock().read_to_end(&mut buf)?;
    Ok(buf)
}

fn read_values() -> Result<Vec<f64>> {
    let bytes = read_stdin()?;
    let text = String::from_utf8(bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    parse_values(&text)
}

/// Huffman table fitted to every symbol `values` codes to, flush included.
fn tune_table(config: &CoderConfig, values: &[f64]) -> Result<HuffmanTable> {
    let mut coder = SequenceCoder::new(config, Vec::new())?;
    coder.push_all(values)?;
    let (baseline, counts) = coder.finish_with_counts()?;
    let table = HuffmanTable::from_counts(&counts)?;
    info!(
        symbols = table.symbols().len(),
        baseline_bytes = baseline.len(),
        "built table"
    );
    Ok(table)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Encode { codec } => {
            let config = codec.resolve()?;
            let values = read_values()?;
            let bytes = qsc::encode(&config, &values)?;
            info!(values = values.len(), bytes = bytes.len(), "encoded");
            io::stdout().lock().write_all(&bytes)?;
        }
        Command::Decode { count, codec } => {
            let config = codec.resolve()?;
            let bytes = read_stdin()?;
            let values = qsc::decode(&config, &bytes, count)?;
            info!(values = values.len(), bytes = bytes.len(), "decoded");
            let mut out = io::BufWriter::new(io::stdout().lock());
            for v in values {
                writeln!(out, "{v}")?;
            }
            out.flush()?;
        }
        Command::Table { codec } => {
            let config = codec.resolve()?;
            let values = read_values()?;
            let table = tune_table(&config, &values)?;
            let json = serde_json::to_string_pretty(&table).map_err(io::Error::from)?;
            println!("{json}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = ?e.kind(), "{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_initial_requires_order() {
        assert!(Cli::try_parse_from(["qsc", "encode", "--initial", "5"]).is_err());
        assert!(Cli::try_parse_from(["qsc", "encode", "--initial2", "-5"]).is_err());

        let cli = Cli::try_parse_from(["qsc", "encode", "--order", "2", "--initial", "-5"]).unwrap();
        let Command::Encode { codec } = cli.command else {
            panic!("expected encode");
        };
        let config = codec.resolve().unwrap();
        assert_eq!(config.predictor, PredictorConfig::from_order(2, -5, 0).unwrap());
    }

    #[test]
    fn test_tuned_table_codes_trailing_zeros() {
        let config = CoderConfig {
            predictor: PredictorConfig::from_order(0, 0, 0).unwrap(),
            scheme: Scheme::RunLength,
            ..CoderConfig::default()
        };
        let values = [1.0, 0.0];
        let tuned = CoderConfig {
            table: tune_table(&config, &values).unwrap(),
            ..config
        };
        let bytes = qsc::encode(&tuned, &values).unwrap();
        assert_eq!(qsc::decode(&tuned, &bytes, 2).unwrap(), values);
    }
}
