use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser as ClapParser};
use std::path::PathBuf;

/// Write the final image size into the header of an assembled eir image
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Assembled image to read
    #[arg(allow_hyphen_values = true)]
    input: PathBuf,

    /// Where to write the patched image, may be the input itself
    #[arg(allow_hyphen_values = true)]
    output: PathBuf,
}

fn usage() -> String {
    Args::command().render_usage().to_string()
}

fn run(args: &Args) -> Result<()> {
    let report = eir_patch_core::patch(&args.input, &args.output)?;
    if report.was_stale() {
        log::info!(
            "{}: image size {:#x} (was {:#x})",
            args.output.display(),
            report.image_len,
            report.previous_size
        );
    } else {
        log::info!(
            "{}: image size {:#x} already up to date",
            args.output.display(),
            report.image_len
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            log::debug!("{}", e);
            println!("{}", usage());
            std::process::exit(1);
        }
    };

    run(&args)
}
