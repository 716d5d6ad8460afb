//! mudc command-line interface
//!
//! Compiles mud world-definition files to machine memory images and
//! prints class layout listings.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use mudc_engine::{
    ClassKinds, CompilerOptions, ErrorPolicy, MemoryMap, RedefinePolicy, Session, SessionError,
};
use std::path::{Path, PathBuf};
use termcolor::{ColorChoice, StandardStream};

#[derive(Parser)]
#[command(name = "mudc")]
#[command(about = "mud world-definition compiler", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a world file to a memory image
    Build {
        /// Input file
        file: PathBuf,

        /// Output path (default: input with extension .img)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write raw passthrough lines to this sidecar file
        #[arg(long)]
        raw: Option<PathBuf>,

        /// Base address of the packed object area
        #[arg(long, value_parser = parse_address, default_value = "0x1000")]
        base: u16,

        /// Entry point to record in the stream
        #[arg(long, value_parser = parse_address)]
        entry: Option<u16>,

        /// Report every error instead of stopping at the first
        #[arg(short, long)]
        keep_going: bool,

        /// Allow class and object names to be redefined
        #[arg(long)]
        allow_redefine: bool,

        /// Print class layout listings after compiling
        #[arg(long)]
        listings: bool,
    },

    /// Print class layout listings without emitting an image
    ListClasses {
        /// Input file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Build {
            file,
            output,
            raw,
            base,
            entry,
            keep_going,
            allow_redefine,
            listings,
        } => {
            let options = CompilerOptions {
                error_policy: if keep_going {
                    ErrorPolicy::Continue
                } else {
                    ErrorPolicy::Abort
                },
                redefine_policy: if allow_redefine {
                    RedefinePolicy::Shadow
                } else {
                    RedefinePolicy::Error
                },
                memory_map: MemoryMap {
                    object_base: base,
                    entry_point: entry,
                },
                kinds: ClassKinds::default(),
                include_limit: CompilerOptions::DEFAULT_INCLUDE_LIMIT,
            };
            build(&file, output, raw, options, listings)
        }
        Commands::ListClasses { file } => list_classes(&file),
    }
}

fn build(
    file: &Path,
    output: Option<PathBuf>,
    raw: Option<PathBuf>,
    options: CompilerOptions,
    listings: bool,
) -> Result<()> {
    let mut session = Session::new(options);
    let compiled = session.compile_file(file);
    let finished = compiled.and_then(|()| session.finish());
    let output_data = match finished {
        Ok(output_data) => output_data,
        Err(error) => return fail(&session, error),
    };

    for asymmetry in &output_data.asymmetries {
        eprintln!("warning: {}", asymmetry);
    }

    let target = output.unwrap_or_else(|| file.with_extension("img"));
    std::fs::write(&target, &output_data.stream)
        .with_context(|| format!("cannot write {}", target.display()))?;
    println!(
        "wrote {} ({} segment(s), {} bytes)",
        target.display(),
        output_data.image.segments.len(),
        output_data.stream.len()
    );

    if let Some(raw_path) = raw {
        let mut text = output_data.raw_output.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        std::fs::write(&raw_path, text)
            .with_context(|| format!("cannot write {}", raw_path.display()))?;
    }

    if listings {
        print!("{}", session.compiler().listings());
    }
    Ok(())
}

fn list_classes(file: &Path) -> Result<()> {
    let mut session = Session::new(CompilerOptions::default());
    if let Err(error) = session.compile_file(file) {
        return fail(&session, error);
    }
    print!("{}", session.compiler().listings());
    Ok(())
}

/// Render collected diagnostics with source labels, then bail.
fn fail(session: &Session, error: SessionError) -> Result<()> {
    let mut files = SimpleFiles::new();
    for source in session.files() {
        files.add(source.name.clone(), source.text.clone());
    }
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();
    for diagnostic in session.diagnostics() {
        let span = diagnostic.span();
        let rendered = Diagnostic::error()
            .with_message(diagnostic.message())
            .with_labels(vec![Label::primary(
                diagnostic.file,
                span.start..span.end,
            )]);
        term::emit(&mut writer.lock(), &config, &files, &rendered)?;
    }
    bail!("{}", error)
}

fn parse_address(text: &str) -> Result<u16, String> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|_| format!("'{}' is not a 16-bit address", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn addresses_parse_in_hex_and_decimal() {
        assert_eq!(parse_address("0x1000"), Ok(0x1000));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert!(parse_address("0x10000").is_err());
        assert!(parse_address("lots").is_err());
    }

    #[test]
    fn build_writes_a_decodable_image_and_raw_sidecar() {
        let dir = TempDir::new().unwrap();
        let world = dir.path().join("world.mud");
        std::fs::write(
            &world,
            ">PATCH 1\ndefine 2 \"cell\"\n  v : words = 7\nenddefine\nuse cell { }\n",
        )
        .unwrap();
        let image = dir.path().join("world.img");
        let raw = dir.path().join("world.raw");

        let options = CompilerOptions {
            memory_map: MemoryMap {
                object_base: 0x2000,
                entry_point: Some(0x2000),
            },
            ..CompilerOptions::default()
        };
        build(&world, Some(image.clone()), Some(raw.clone()), options, false).unwrap();

        let decoded = mudc_engine::decode(&std::fs::read(&image).unwrap()).unwrap();
        assert_eq!(decoded.entry_point, Some(0x2000));
        assert_eq!(decoded.segments[0].start, 0x2000);
        assert_eq!(decoded.segments[0].data, vec![7, 0]);
        assert_eq!(std::fs::read_to_string(&raw).unwrap(), "PATCH 1\n");
    }

    #[test]
    fn build_failure_reports_instead_of_writing() {
        let dir = TempDir::new().unwrap();
        let world = dir.path().join("broken.mud");
        std::fs::write(&world, "use missing { }\n").unwrap();
        assert!(build(&world, None, None, CompilerOptions::default(), false).is_err());
        assert!(!dir.path().join("broken.img").exists());
    }
}
