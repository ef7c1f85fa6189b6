//! zbncp-dump - decode ZBNCP host/NCP captures.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use zbncp_link::telemetry::describe_metrics;

use zbncp_dump::{init_logging, run, CaptureMode, DumpConfig, InputFormat, OutputFormat, Result};

/// Decode ZBNCP host/NCP link captures
#[derive(Parser, Debug)]
#[command(name = "zbncp-dump", author, version, about)]
struct Cli {
    /// Capture file ("-" for stdin)
    input: PathBuf,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How records are fed to the decoder
    #[arg(short, long)]
    mode: Option<CaptureMode>,

    /// Capture file encoding
    #[arg(short, long)]
    input_format: Option<InputFormat>,

    /// Output format
    #[arg(short, long)]
    output: Option<OutputFormat>,

    /// Host endpoint name
    #[arg(long)]
    host: Option<String>,

    /// NCP endpoint name
    #[arg(long)]
    ncp: Option<String>,

    /// Treat messages with a bad body CRC as undecodable
    #[arg(long)]
    strict: bool,

    /// Skip header CRC verification
    #[arg(long)]
    no_header_crc: bool,

    /// Largest frame body accepted in stream mode
    #[arg(long)]
    max_frame_body: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut DumpConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(input) = self.input_format {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(ncp) = &self.ncp {
            config.ncp = ncp.clone();
        }
        if self.strict {
            config.decoder.strict_body_crc = true;
        }
        if self.no_header_crc {
            config.decoder.verify_header_crc = false;
        }
        if let Some(max) = self.max_frame_body {
            config.decoder.max_frame_body = max;
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => DumpConfig::load(path)?,
        None => DumpConfig::default(),
    };
    cli.apply(&mut config);

    let mut input = Vec::new();
    if cli.input.as_os_str() == "-" {
        io::stdin().read_to_end(&mut input)?;
    } else {
        input = std::fs::read(&cli.input)?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = run(input, &config, &mut out)?;
    out.flush()?;
    eprintln!("{}", summary);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.verbose) {
        eprintln!("warning: {}", err);
    }
    describe_metrics();

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
