// Commandline argument parser using clap for bssid-locator

use anyhow::{bail, Context, Result};
use bssid_locator::config::DEFAULT_CONCURRENCY;
use bssid_locator::Bssid;
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Select};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(name = "bssid-locator", version, about)]
/// Geolocate WiFi access points and track them between runs
pub struct LocatorArgs {
    /// Single BSSID to geolocate
    #[arg(short = 'b', long = "bssid", conflicts_with = "infile")]
    pub bssid: Option<String>,

    /// File with one BSSID per line
    #[arg(short = 'f', long = "infile")]
    pub infile: Option<PathBuf>,

    /// Write a KML file (independent of the other outputs)
    #[arg(short = 'k', long = "kml")]
    pub kml: Option<PathBuf>,

    /// Write a TSV file (ignored when --json-out is given)
    #[arg(short = 'o', long = "outfile")]
    pub outfile: Option<PathBuf>,

    /// Write the JSON results document, usable later with --compare
    #[arg(short = 'j', long = "json-out")]
    pub json_out: Option<PathBuf>,

    /// Requests in flight at once
    #[arg(short = 'c', long = "concurrency", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Previous JSON results to detect movements against
    #[arg(long = "compare")]
    pub compare: Option<PathBuf>,

    /// Per-request diagnostics
    #[arg(long = "debug")]
    pub debug: bool,

    /// Only output access points that moved
    #[arg(long = "movement-only")]
    pub movement_only: bool,

    /// Margin in meters on top of both accuracies
    #[arg(long = "min-distance", default_value_t = 10.0)]
    pub min_distance: f64,

    /// Drop results with unknown accuracy or above this many meters (-1 disables)
    #[arg(long = "max-hacc", default_value_t = -1, allow_negative_numbers = true)]
    pub max_hacc: i32,

    /// Ask for the options instead of reading flags
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,
}

/// Where the BSSIDs come from
#[derive(Debug, Clone, PartialEq)]
pub enum BssidSource {
    Single(Bssid),
    File(PathBuf),
}

impl LocatorArgs {
    /// Check flag combinations before any network call
    pub fn source(&self) -> Result<BssidSource> {
        match (&self.bssid, &self.infile) {
            (Some(raw), _) => {
                let bssid = Bssid::parse(raw).with_context(|| format!("Invalid --bssid value '{raw}'"))?;
                Ok(BssidSource::Single(bssid))
            }
            (None, Some(path)) => Ok(BssidSource::File(path.clone())),
            (None, None) => bail!("Either --bssid or --infile is required (or use --interactive)"),
        }
    }

    /// Console output only when no file output was asked for
    pub fn to_stdout(&self) -> bool {
        self.kml.is_none() && self.json_out.is_none() && self.outfile.is_none()
    }

    /// JSON wins over TSV
    pub fn tsv_out(&self) -> Option<&PathBuf> {
        if self.json_out.is_some() {
            None
        } else {
            self.outfile.as_ref()
        }
    }
}

// ============================================================================
// INTERACTIVE MODE
// ============================================================================

const OUTPUT_CHOICES: [&str; 4] = ["Console", "KML file", "JSON file", "TSV file"];

/// Fill in the options through prompts, starting from whatever flags were given
pub fn prompt_interactive(mut args: LocatorArgs) -> Result<LocatorArgs> {
    let theme = ColorfulTheme::default();
    println!("\n--- Interactive configuration ---");

    let mode = Select::with_theme(&theme)
        .with_prompt("Input mode")
        .items(&["Single BSSID", "File of BSSIDs"])
        .default(0)
        .interact()
        .context("Failed to read input")?;

    if mode == 0 {
        let bssid: String = Input::with_theme(&theme)
            .with_prompt("BSSID (aa:bb:cc:dd:ee:ff)")
            .validate_with(|v: &String| Bssid::parse(v).map(|_| ()).map_err(|e| e.to_string()))
            .interact_text()
            .context("Failed to read input")?;
        args.bssid = Some(bssid);
        args.infile = None;
    } else {
        let infile: String = Input::with_theme(&theme)
            .with_prompt("Input file")
            .validate_with(|v: &String| {
                if PathBuf::from(v).is_file() {
                    Ok(())
                } else {
                    Err("File not found")
                }
            })
            .interact_text()
            .context("Failed to read input")?;
        args.infile = Some(PathBuf::from(infile));
        args.bssid = None;
    }

    let outputs = MultiSelect::with_theme(&theme)
        .with_prompt("Outputs (space to toggle)")
        .items(&OUTPUT_CHOICES)
        .defaults(&[true, false, false, false])
        .interact()
        .context("Failed to read input")?;

    args.kml = None;
    args.json_out = None;
    args.outfile = None;
    if outputs.contains(&1) {
        args.kml = Some(prompt_path(&theme, "KML output file", "output.kml")?);
    }
    if outputs.contains(&2) {
        args.json_out = Some(prompt_path(&theme, "JSON output file", "output.json")?);
    }
    if outputs.contains(&3) && args.json_out.is_none() {
        args.outfile = Some(prompt_path(&theme, "TSV output file", "output.tsv")?);
    }

    let compare = Confirm::with_theme(&theme)
        .with_prompt("Compare with a previous JSON results file?")
        .default(false)
        .interact()
        .context("Failed to read input")?;

    args.compare = None;
    if compare {
        let previous: String = Input::with_theme(&theme)
            .with_prompt("Previous JSON file")
            .validate_with(|v: &String| {
                if PathBuf::from(v).is_file() {
                    Ok(())
                } else {
                    Err("File not found")
                }
            })
            .interact_text()
            .context("Failed to read input")?;
        args.compare = Some(PathBuf::from(previous));

        args.min_distance = Input::with_theme(&theme)
            .with_prompt("Minimum movement distance (meters)")
            .default(args.min_distance)
            .validate_with(|v: &f64| if *v >= 0.0 { Ok(()) } else { Err("Must be >= 0") })
            .interact_text()
            .context("Failed to read input")?;

        args.movement_only = Confirm::with_theme(&theme)
            .with_prompt("Only output access points that moved?")
            .default(args.movement_only)
            .interact()
            .context("Failed to read input")?;
    }

    args.max_hacc = Input::with_theme(&theme)
        .with_prompt("Maximum accuracy in meters (-1 disables)")
        .default(args.max_hacc)
        .interact_text()
        .context("Failed to read input")?;

    args.concurrency = Input::with_theme(&theme)
        .with_prompt("Concurrent requests")
        .default(args.concurrency)
        .validate_with(|v: &usize| if *v >= 1 { Ok(()) } else { Err("Must be at least 1") })
        .interact_text()
        .context("Failed to read input")?;

    args.debug = Confirm::with_theme(&theme)
        .with_prompt("Enable debug output?")
        .default(args.debug)
        .interact()
        .context("Failed to read input")?;

    println!("\nConfiguration complete.");
    Ok(args)
}

fn prompt_path(theme: &ColorfulTheme, prompt: &str, default: &str) -> Result<PathBuf> {
    let path: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()
        .context("Failed to read input")?;
    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> LocatorArgs {
        LocatorArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["bssid-locator", "-b", "aa:bb:cc:dd:ee:ff"]);

        assert_eq!(args.concurrency, 5);
        assert_eq!(args.min_distance, 10.0);
        assert_eq!(args.max_hacc, -1);
        assert!(!args.debug);
        assert!(args.to_stdout());
        assert_eq!(
            args.source().unwrap(),
            BssidSource::Single(Bssid::parse("aa:bb:cc:dd:ee:ff").unwrap())
        );
    }

    #[test]
    fn test_bssid_conflicts_with_infile() {
        let result = LocatorArgs::try_parse_from(["bssid-locator", "-b", "aa:bb:cc:dd:ee:ff", "-f", "list.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_required_and_validated() {
        assert!(parse(&["bssid-locator"]).source().is_err());
        assert!(parse(&["bssid-locator", "-b", "zz:zz"]).source().is_err());
        assert_eq!(
            parse(&["bssid-locator", "-f", "list.txt"]).source().unwrap(),
            BssidSource::File(PathBuf::from("list.txt"))
        );
    }

    #[test]
    fn test_output_precedence() {
        let args = parse(&["bssid-locator", "-b", "aa:bb:cc:dd:ee:ff", "-o", "out.tsv", "-j", "out.json"]);
        assert!(args.tsv_out().is_none());
        assert!(!args.to_stdout());

        let args = parse(&["bssid-locator", "-b", "aa:bb:cc:dd:ee:ff", "-o", "out.tsv"]);
        assert_eq!(args.tsv_out(), Some(&PathBuf::from("out.tsv")));

        let args = parse(&["bssid-locator", "-b", "aa:bb:cc:dd:ee:ff", "-k", "out.kml"]);
        assert!(!args.to_stdout());
    }

    #[test]
    fn test_movement_flags() {
        let args = parse(&[
            "bssid-locator",
            "-f",
            "list.txt",
            "--compare",
            "prev.json",
            "--movement-only",
            "--min-distance",
            "25.5",
            "--max-hacc",
            "100",
            "-c",
            "8",
            "--debug",
        ]);

        assert_eq!(args.compare, Some(PathBuf::from("prev.json")));
        assert!(args.movement_only);
        assert_eq!(args.min_distance, 25.5);
        assert_eq!(args.max_hacc, 100);
        assert_eq!(args.concurrency, 8);
        assert!(args.debug);
    }

    #[test]
    fn test_negative_max_hacc() {
        let args = parse(&["bssid-locator", "-b", "aa:bb:cc:dd:ee:ff", "--max-hacc", "-1"]);
        assert_eq!(args.max_hacc, -1);
    }
}
