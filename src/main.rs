//! Deparanoid CLI: recovers Paranoid-obfuscated strings in smali.

use anyhow::Result;
use clap::{Parser, Subcommand};
use deparanoid::deobfuscator::{self, DeobfuscatorConfig};
use deparanoid::utils::helpers::parse_identifier;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "deparanoid",
    version,
    about = "Recovers Paranoid-obfuscated string literals in smali disassembly"
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite every recovered call site under a smali directory in place.
    Deobfuscate {
        /// Directory produced by apktool/baksmali.
        #[arg(value_name = "DIR")]
        target: PathBuf,

        /// Keep the original calls; only replace their results.
        #[arg(long)]
        preserve_calls: bool,

        /// Report what would change without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Constant the recovery method must load (repeatable).
        #[arg(long = "signature-const", value_name = "N", value_parser = identifier, allow_hyphen_values = true)]
        signature_consts: Vec<i64>,
    },

    /// List every recoverable string as `[<hex-id>]:<text>`.
    ExtractStrings {
        #[arg(value_name = "DIR")]
        target: PathBuf,

        /// Print a JSON report instead of the listing.
        #[arg(long)]
        json: bool,

        /// Constant the recovery method must load (repeatable).
        #[arg(long = "signature-const", value_name = "N", value_parser = identifier, allow_hyphen_values = true)]
        signature_consts: Vec<i64>,
    },

    /// Save the chunk literals as a JSON array.
    ExtractChunks {
        #[arg(value_name = "DIR")]
        target: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Decode a single identifier against a saved chunk file.
    DeobfuscateString {
        #[arg(value_name = "CHUNK_FILE")]
        chunk_file: PathBuf,

        /// Decimal or hex (`0x...`, `-0x...L`) identifier.
        #[arg(value_name = "ID", value_parser = identifier, allow_hyphen_values = true)]
        id: i64,
    },
}

fn identifier(text: &str) -> Result<i64, String> {
    parse_identifier(text).ok_or_else(|| format!("not a 64-bit identifier: {text}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Command::Deobfuscate {
            target,
            preserve_calls,
            dry_run,
            signature_consts,
        } => {
            let config = DeobfuscatorConfig {
                preserve_calls,
                signature_consts,
                dry_run,
            };
            let summary = deobfuscator::deobfuscate_directory(&target, &config)?;
            println!(
                "{} of {} unit(s) {}, {} string(s) recovered, {} failed",
                summary.rewritten,
                summary.units,
                if dry_run { "would be rewritten" } else { "rewritten" },
                summary.strings,
                summary.failed()
            );
            if summary.failed() > 0 {
                anyhow::bail!("{} unit(s) could not be rewritten", summary.failed());
            }
        }
        Command::ExtractStrings {
            target,
            json,
            signature_consts,
        } => {
            let config = DeobfuscatorConfig {
                signature_consts,
                ..DeobfuscatorConfig::default()
            };
            let report = deobfuscator::extract_strings(&target, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                for line in report.listing() {
                    println!("{line}");
                }
            }
        }
        Command::ExtractChunks { target, output } => {
            let found = deobfuscator::discover(&target, &DeobfuscatorConfig::default())?;
            deobfuscator::save_chunks(&found, &output)?;
            println!("{} chunk(s) written to {}", found.chunk_literals.len(), output.display());
        }
        Command::DeobfuscateString { chunk_file, id } => {
            let string = deobfuscator::deobfuscate_string(&chunk_file, id)?;
            println!("{}", string.listing());
        }
    }

    Ok(())
}
