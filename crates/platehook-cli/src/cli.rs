//! Command-line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use platehook_core::LearnableField;

#[derive(Parser, Debug)]
#[command(
    name = "platehook",
    version,
    about = "Collect slicer output into production jobs",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Configuration file (.toml, .json, .yaml)
    #[arg(long, global = true, env = "PLATEHOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Slicer output files; shorthand for `open`
    pub files: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add files to the running session, or start one
    Open {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Extract one file and print the record
    Parse { file: PathBuf },
    /// List candidate lines per field for calibration
    Scan { file: PathBuf },
    /// Teach a pattern for a field from one example line
    Learn {
        /// time, mass, filament_type, printer_model, total_layers or filament_length
        field: LearnableField,
        /// Line copied from the file, e.g. "; Druckzeit: 01:20:45"
        line: String,
    },
    /// Drop every learned pattern
    ResetPatterns,
    /// List catalog products
    Products,
    /// Aggregate files and submit them as one job
    Submit {
        /// Job name
        #[arg(long)]
        name: String,
        /// Catalog product id to link
        #[arg(long)]
        product: Option<String>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    /// The subcommand to run; bare paths mean `open`.
    pub fn into_command(self) -> Option<Command> {
        match self.command {
            Some(command) => Some(command),
            None if !self.files.is_empty() => Some(Command::Open { files: self.files }),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_paths_mean_open() {
        let cli = Cli::try_parse_from(["platehook", "a.gcode", "b.gcode"]).unwrap();
        match cli.into_command() {
            Some(Command::Open { files }) => assert_eq!(files.len(), 2),
            other => panic!("expected open, got {:?}", other),
        }
    }

    #[test]
    fn test_learn_parses_field() {
        let cli =
            Cli::try_parse_from(["platehook", "learn", "total_layers", "; capas: 12"]).unwrap();
        match cli.into_command() {
            Some(Command::Learn { field, line }) => {
                assert_eq!(field, LearnableField::TotalLayers);
                assert_eq!(line, "; capas: 12");
            }
            other => panic!("expected learn, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(Cli::try_parse_from(["platehook", "learn", "speed", "; v: 1"]).is_err());
    }

    #[test]
    fn test_submit_requires_name() {
        assert!(Cli::try_parse_from(["platehook", "submit", "a.gcode"]).is_err());
        let cli =
            Cli::try_parse_from(["platehook", "submit", "--name", "Vase", "a.gcode"]).unwrap();
        assert!(matches!(cli.into_command(), Some(Command::Submit { .. })));
    }

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["platehook"]).unwrap();
        assert!(cli.into_command().is_none());
    }
}
