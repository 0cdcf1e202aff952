//! Standalone helpers: glob matching, size parsing, capability names.

use crate::ops::output::{print_json, OutputFormat};
use crate::ops::ui::print_kv;
use clap::ValueEnum;
use portcullis_core::{match_glob, normalize_capability, parse_byte_size, GlobMode};
use serde_json::json;

/// `--mode` values for `glob`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobArg {
    /// `*` crosses `/`
    Lexical,
    /// `*` stops at `/`
    Path,
    /// `*` stops at `/`, `**` crosses it
    Globstar,
}

impl From<GlobArg> for GlobMode {
    fn from(arg: GlobArg) -> Self {
        match arg {
            GlobArg::Lexical => GlobMode::Lexical,
            GlobArg::Path => GlobMode::Path,
            GlobArg::Globstar => GlobMode::PathDoubleStar,
        }
    }
}

/// Returns whether `name` matched, for the exit status.
pub fn glob(
    pattern: &str,
    name: &str,
    mode: GlobArg,
    output: OutputFormat,
) -> anyhow::Result<bool> {
    let matched = match_glob(pattern, name, mode.into());
    match output {
        OutputFormat::Json => print_json(&json!({
            "pattern": pattern,
            "name": name,
            "mode": GlobMode::from(mode),
            "matched": matched,
        }))?,
        OutputFormat::Table => {
            let verdict = if matched { "match" } else { "no match" };
            print_kv("result", verdict);
        }
    }
    Ok(matched)
}

pub fn size(text: &str, output: OutputFormat) -> anyhow::Result<()> {
    let bytes = parse_byte_size(text)?;
    match output {
        OutputFormat::Json => print_json(&json!({ "input": text, "bytes": bytes }))?,
        OutputFormat::Table => print_kv("bytes", &bytes.to_string()),
    }
    Ok(())
}

pub fn cap(text: &str, output: OutputFormat) -> anyhow::Result<()> {
    let name = normalize_capability(text);
    match output {
        OutputFormat::Json => print_json(&json!({ "input": text, "capability": name }))?,
        OutputFormat::Table => print_kv("capability", &name),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_modes_map_onto_core_modes() {
        assert_eq!(GlobMode::from(GlobArg::Globstar), GlobMode::PathDoubleStar);
        assert!(glob("/srv/**", "/srv/a/b", GlobArg::Globstar, OutputFormat::Json).unwrap());
        assert!(!glob("/srv/*", "/srv/a/b", GlobArg::Path, OutputFormat::Json).unwrap());
        assert!(glob("/srv/*", "/srv/a/b", GlobArg::Lexical, OutputFormat::Table).unwrap());
    }
}
