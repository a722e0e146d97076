//! CLI argument definitions using clap derive

use crate::demo::EYE_OF_ENDER_LOCATED;
use crate::world::{BlockPos, SearchTargets, TagKey};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Async Locator - off-thread structure search
///
/// Runs structure searches on a worker pool and applies the result on a
/// single home thread, against a built-in sample world.
#[derive(Parser, Debug)]
#[command(name = "async-locator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ASYNC_LOCATOR_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Throw an eye of ender and wait for it to find a structure
    Locate(LocateArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the locate command
#[derive(Parser, Debug)]
pub struct LocateArgs {
    /// Origin X coordinate
    #[arg(long, allow_hyphen_values = true)]
    pub x: i32,

    /// Origin Y coordinate
    #[arg(long, allow_hyphen_values = true, default_value_t = 64)]
    pub y: i32,

    /// Origin Z coordinate
    #[arg(long, allow_hyphen_values = true)]
    pub z: i32,

    /// Structure tag to search for
    #[arg(long, conflicts_with = "structure")]
    pub tag: Option<String>,

    /// Structure kinds to search for (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub structure: Vec<String>,

    /// Search radius in chunks (overrides locate.search_radius)
    #[arg(long)]
    pub radius: Option<u32>,

    /// Timeout in seconds, 0 to wait forever (overrides locate.timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Simulated search cost per chunk ring, in milliseconds
    #[arg(long, default_value_t = 2)]
    pub delay_ms: u64,

    /// Skip chunks that were already generated
    #[arg(long)]
    pub skip_existing: bool,

    /// Make registry tag lookups fail, exercising the slow fallback
    #[arg(long)]
    pub broken_registry: bool,

    /// Unload the eye before the result arrives
    #[arg(long)]
    pub remove_eye: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl LocateArgs {
    pub fn origin(&self) -> BlockPos {
        BlockPos::new(self.x, self.y, self.z)
    }

    /// Explicit structures win; otherwise search a tag, the eye's by default
    pub fn targets(&self) -> SearchTargets<String> {
        if !self.structure.is_empty() {
            return SearchTargets::Set(Arc::new(self.structure.clone()));
        }
        let tag = self.tag.as_deref().unwrap_or(EYE_OF_ENDER_LOCATED);
        SearchTargets::Tag(TagKey::new(tag))
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., locate.timeout_secs)
        key: String,
        /// Value to set
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_locate_with_negative_coordinates() {
        let cli = Cli::parse_from([
            "async-locator",
            "locate",
            "--x",
            "-120",
            "--z",
            "88",
            "--structure",
            "village_plains,village_desert",
        ]);

        match cli.command {
            Commands::Locate(args) => {
                assert_eq!(args.origin(), BlockPos::new(-120, 64, 88));
                assert_eq!(args.targets().describe(), "2 targets");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn locate_defaults_to_eye_tag() {
        let cli = Cli::parse_from(["async-locator", "locate", "--x", "0", "--z", "0"]);
        match cli.command {
            Commands::Locate(args) => {
                assert_eq!(args.targets().describe(), "tag eye_of_ender_located")
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn tag_conflicts_with_structure() {
        let result = Cli::try_parse_from([
            "async-locator",
            "locate",
            "--x",
            "0",
            "--z",
            "0",
            "--tag",
            "village",
            "--structure",
            "stronghold",
        ]);
        assert!(result.is_err());
    }
}
