use std::path::PathBuf;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::info;
use symphonia::core::codecs::FinalizeResult;
use symphonia::core::errors::{Error, Result};

mod decode;
mod encode;
mod geometry;
mod wav;

fn cmd() -> Command {
    Command::new("lc3-replay")
        .version("1.0")
        .about("Encode, decode and inspect LC3 streams")
        .subcommand_required(true)
        .subcommand(
            Command::new("encode")
                .about("encode the first channel of an audio file into an .lc3 stream")
                .arg(path_arg("input", "input audio file"))
                .arg(path_arg("output", "output .lc3 file"))
                .arg(
                    Arg::new("frame-us")
                        .long("frame-us")
                        .help("frame duration in microseconds (7500 or 10000)")
                        .num_args(1)
                        .value_parser(value_parser!(u32))
                        .default_value("10000"),
                )
                .arg(
                    Arg::new("bitrate")
                        .long("bitrate")
                        .help("target bitrate in bits per second")
                        .num_args(1)
                        .value_parser(value_parser!(u32))
                        .default_value("64000"),
                )
                .arg(
                    Arg::new("verify")
                        .long("verify")
                        .help("verify the decoded input if its codec supports it")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("decode")
                .about("decode an .lc3 stream into a 16-bit mono wav file")
                .arg(path_arg("input", "input .lc3 file"))
                .arg(path_arg("output", "output wav file"))
                .arg(
                    Arg::new("loss")
                        .long("loss")
                        .help("simulate packet loss, in percent (0-100)")
                        .value_name("perc")
                        .num_args(1)
                        .value_parser(value_parser!(u8).range(0..=100))
                        .default_value("0"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("seed of the packet loss pattern")
                        .num_args(1)
                        .value_parser(value_parser!(u64))
                        .default_value("0"),
                ),
        )
        .subcommand(Command::new("geometry").about("print the supported frame geometries"))
}

fn path_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .help(help)
        .num_args(1)
        .value_parser(value_parser!(PathBuf))
        .required(true)
}

pub(crate) fn get<'a, T: Clone + Send + Sync + 'static>(
    args: &'a ArgMatches,
    name: &str,
) -> anyhow::Result<&'a T> {
    args.get_one::<T>(name)
        .with_context(|| format!("missing argument `{name}`"))
}

pub(crate) fn ignore_end_of_stream_error(result: Result<()>) -> Result<()> {
    match result {
        Err(Error::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            // Do not treat "end of stream" as a fatal error. It's the currently only way a
            // format reader can indicate the media is complete.
            Ok(())
        }
        _ => result,
    }
}

pub(crate) fn do_verification(finalization: FinalizeResult) -> Result<i32> {
    match finalization.verify_ok {
        Some(is_ok) => {
            // Got a verification result.
            info!("verification: {}", if is_ok { "passed" } else { "failed" });

            Ok(i32::from(!is_ok))
        }
        // Verification not enabled by user, or unsupported by the codec.
        _ => Ok(0),
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args = cmd().get_matches();
    match args.subcommand() {
        Some(("encode", args)) => encode::run(args),
        Some(("decode", args)) => decode::run(args),
        Some(("geometry", _)) => {
            geometry::print(&mut std::io::stdout().lock())?;
            Ok(())
        }
        _ => anyhow::bail!("missing subcommand"),
    }
}
