use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use log::{LevelFilter, info};
use minicc::{CompileError, CompileOptions, FrameSize, PointerStride, codegen, dump, parser, tokenizer};
use simple_logger::SimpleLogger;
use snafu::{ResultExt, Snafu};

/// Compile a small C subset into x86-64 Intel-syntax assembly.
#[derive(Parser, Debug)]
#[command(name = "minicc", version)]
struct Cli {
  /// Source text, or a path to read when --file is given
  input: String,

  /// Treat INPUT as a path and read the whole file
  #[arg(short, long)]
  file: bool,

  /// Write the assembly here instead of stdout
  #[arg(short, long, value_name = "PATH")]
  output: Option<PathBuf>,

  /// Print the token stream to stderr
  #[arg(long)]
  dump_tokens: bool,

  /// Print the syntax tree to stderr
  #[arg(long)]
  dump_ast: bool,

  /// Scale pointer arithmetic by a fixed number of bytes instead of the element width
  #[arg(long, value_name = "BYTES")]
  stride: Option<usize>,

  /// Reserve a fixed frame in every function instead of sizing it to the locals
  #[arg(long, value_name = "BYTES")]
  frame_size: Option<usize>,

  /// More log output on stderr; repeat for more detail
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,
}

impl Cli {
  fn options(&self) -> CompileOptions {
    CompileOptions {
      pointer_stride: self.stride.map_or(PointerStride::Element, PointerStride::Fixed),
      frame: self.frame_size.map_or(FrameSize::Exact, FrameSize::Fixed),
    }
  }

  fn log_level(&self) -> LevelFilter {
    match self.verbose {
      0 => LevelFilter::Warn,
      1 => LevelFilter::Info,
      2 => LevelFilter::Debug,
      _ => LevelFilter::Trace,
    }
  }
}

#[derive(Debug, Snafu)]
enum DriverError {
  #[snafu(display("cannot read {}: {source}", path.display()))]
  ReadSource { path: PathBuf, source: io::Error },

  #[snafu(display("cannot write {}: {source}", path.display()))]
  WriteOutput { path: PathBuf, source: io::Error },

  #[snafu(display("{source}"))]
  Compile { source: CompileError },

  #[snafu(display("cannot initialise logging: {source}"))]
  Logger { source: log::SetLoggerError },
}

fn run(cli: &Cli) -> Result<(), DriverError> {
  SimpleLogger::new()
    .with_level(cli.log_level())
    .without_timestamps()
    .init()
    .context(LoggerSnafu)?;

  let source = if cli.file {
    let path = PathBuf::from(&cli.input);
    info!("reading {}", path.display());
    fs::read_to_string(&path).context(ReadSourceSnafu { path })?
  } else {
    cli.input.clone()
  };
  let options = cli.options();

  let tokens = tokenizer::tokenize(&source).context(CompileSnafu)?;
  if cli.dump_tokens {
    eprint!("{}", dump::dump_tokens(&tokens, &source));
  }
  let program = parser::parse(tokens, &source, &options).context(CompileSnafu)?;
  if cli.dump_ast {
    eprint!("{}", dump::dump_ast(&program));
  }
  let asm = codegen::generate(&program, &options).context(CompileSnafu)?;

  match &cli.output {
    Some(path) => {
      fs::write(path, &asm).context(WriteOutputSnafu { path: path.clone() })?;
      info!("wrote {}", path.display());
    }
    None => io::stdout()
      .lock()
      .write_all(asm.as_bytes())
      .context(WriteOutputSnafu {
        path: PathBuf::from("<stdout>"),
      })?,
  }
  Ok(())
}

fn main() {
  let cli = Cli::parse();
  if let Err(err) = run(&cli) {
    eprintln!("{err}");
    process::exit(1);
  }
}
