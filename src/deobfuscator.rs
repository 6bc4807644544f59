//! Directory-level orchestration.
//!
//! Pass one parses every `*.smali` unit to find the recovery method and its
//! chunks; pass two rewrites each unit independently. A failing unit is
//! reported and left untouched; a failed discovery stops the run before any
//! file is written.

use crate::core::recovery::{self, ChunkSet, RecoveredString};
use crate::discovery::{self, Discovery};
use crate::parser::{parse_source, ParsedUnit};
use crate::report::{RecoveredEntry, RunSummary, StringReport};
use crate::rewriter::{rewrite_source, Rewrite, RewriteOptions};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Configuration for a run.
#[derive(Debug, Clone, Default)]
pub struct DeobfuscatorConfig {
    /// Keep the original calls; only the result moves are rewritten.
    pub preserve_calls: bool,
    /// Constants the recovery method must load, to tell it apart from
    /// unrelated `(J)Ljava/lang/String;` helpers.
    pub signature_consts: Vec<i64>,
    /// Compute everything but never write.
    pub dry_run: bool,
}

impl DeobfuscatorConfig {
    fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            preserve_calls: self.preserve_calls,
        }
    }
}

/// Every `*.smali` file under `root`, in a stable order.
pub fn find_units(root: &Path) -> Result<Vec<PathBuf>> {
    let mut units = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "smali") {
            units.push(path.to_path_buf());
        }
    }
    units.sort();
    Ok(units)
}

fn read_unit(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn units_under(root: &Path) -> Result<Vec<PathBuf>> {
    let units = find_units(root)?;
    if units.is_empty() {
        anyhow::bail!("no .smali files under {}", root.display());
    }
    log::info!("{} unit(s) under {}", units.len(), root.display());
    Ok(units)
}

/// First pass over `units`: locate the recovery method and its chunks.
fn discover_in(units: &[PathBuf], config: &DeobfuscatorConfig) -> Result<Discovery> {
    let mut parsed: Vec<ParsedUnit> = Vec::with_capacity(units.len());
    for path in units {
        let origin = path.display().to_string();
        let result = read_unit(path).and_then(|source| Ok(parse_source(&source, None, &origin)?));
        match result {
            Ok(unit) => parsed.push(unit),
            Err(e) => log::warn!("{origin}: skipped during discovery: {e:#}"),
        }
    }

    let found = discovery::resolve(&parsed, &config.signature_consts)
        .context("locating the string recovery method")?;
    log::info!(
        "recovery method {} reads {} ({} chunk(s))",
        found.target,
        found.chunk_field,
        found.chunks.len()
    );
    Ok(found)
}

/// Locate the recovery method and its chunks under `root`.
pub fn discover(root: &Path, config: &DeobfuscatorConfig) -> Result<Discovery> {
    discover_in(&units_under(root)?, config)
}

/// Recover every call site under `root` without touching any file.
pub fn extract_strings(root: &Path, config: &DeobfuscatorConfig) -> Result<StringReport> {
    let units = units_under(root)?;
    let found = discover_in(&units, config)?;

    let mut report = StringReport {
        target: found.target.to_reference(),
        chunk_field: found.chunk_field.to_string(),
        ..StringReport::default()
    };

    for path in &units {
        let origin = path.display().to_string();
        match collect_unit_strings(path, &found) {
            Ok(entries) => report.strings.extend(entries),
            Err(e) => {
                log::warn!("{origin}: {e:#}");
                report.problems.push((origin, format!("{e:#}")));
            }
        }
    }

    Ok(report)
}

fn collect_unit_strings(path: &Path, found: &Discovery) -> Result<Vec<RecoveredEntry>> {
    let origin = path.display().to_string();
    let source = read_unit(path)?;
    let unit = parse_source(&source, Some(&found.target), &origin)?;

    unit.call_sites
        .iter()
        .map(|site| -> Result<RecoveredEntry> {
            let string = recovery::get_string(site.identifier, &found.chunks)
                .with_context(|| format!("line {}", site.line))?;
            Ok(RecoveredEntry::new(&origin, site.line, &string))
        })
        .collect()
}

/// Rewrite one unit in place. Nothing is written when the unit is unchanged
/// or the run is a dry run.
pub fn rewrite_file(path: &Path, found: &Discovery, config: &DeobfuscatorConfig) -> Result<Rewrite> {
    let source = read_unit(path)?;
    let rewrite = rewrite_source(&source, &found.target, &found.chunks, config.rewrite_options())?;

    if rewrite.changed && !config.dry_run {
        write_atomically(path, &rewrite.text)?;
    }
    Ok(rewrite)
}

/// Discover, then rewrite every unit under `root`.
pub fn deobfuscate_directory(root: &Path, config: &DeobfuscatorConfig) -> Result<RunSummary> {
    let units = units_under(root)?;
    let found = discover_in(&units, config)?;

    let mut summary = RunSummary {
        units: units.len(),
        ..RunSummary::default()
    };

    for path in &units {
        match rewrite_file(path, &found, config) {
            Ok(rewrite) => {
                if rewrite.changed {
                    summary.rewritten += 1;
                    summary.strings += rewrite.replacements.len();
                    log::debug!(
                        "{}: {} string(s) recovered",
                        path.display(),
                        rewrite.replacements.len()
                    );
                }
            }
            Err(e) => {
                log::error!("{}: {e:#}", path.display());
                summary.problems.push((path.display().to_string(), format!("{e:#}")));
            }
        }
    }

    Ok(summary)
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory, so an interrupted run never leaves a half-written unit.
pub fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("writing temporary file for {}", path.display()))?;
    tmp.flush()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())
            .with_context(|| format!("copying permissions of {}", path.display()))?;
    }

    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Chunk files
// ---------------------------------------------------------------------------

/// Write the chunk literals as a JSON array of strings.
pub fn save_chunks(found: &Discovery, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&found.chunk_literals).context("serialise chunks")?;
    fs::write(output, json + "\n").with_context(|| format!("writing {}", output.display()))
}

/// Load a chunk file written by [`save_chunks`].
pub fn load_chunk_file(path: &Path) -> Result<ChunkSet> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let literals: Vec<String> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    ChunkSet::from_literals(&literals).with_context(|| format!("decoding {}", path.display()))
}

/// Decode one identifier against a chunk file.
pub fn deobfuscate_string(chunk_file: &Path, identifier: i64) -> Result<RecoveredString> {
    let chunks = load_chunk_file(chunk_file)?;
    recovery::get_string(identifier, &chunks)
        .with_context(|| format!("recovering identifier {identifier}"))
}
