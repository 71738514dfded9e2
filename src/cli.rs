//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Feedboard - quotes, weather and news in your terminal
///
/// Fetches live data from third-party APIs and renders it as Markdown
/// or JSON. Requests that fail are shown as placeholders instead of
/// aborting the whole view.
///
/// Examples:
///   feedboard weather
///   feedboard weather --city Kampala --city Gulu --format json
///   feedboard quotes --index 5 --count 3
///   feedboard news --page 2 --search rust
///   feedboard post 12 hello-world
///   feedboard init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .feedboard.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT", global = true)]
    pub format: OutputFormat,

    /// Write the rendered output to a file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Per-request timeout in seconds
    ///
    /// A request that exceeds it is treated as failed. Default: from config or 10s.
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Exit with code 2 when requests fell back to placeholders
    ///
    /// any: at least one request failed; all: every request failed.
    #[arg(long, value_name = "WHEN", global = true)]
    pub fail_on: Option<FailOn>,

    /// WeatherAPI.com key
    #[arg(
        long,
        value_name = "KEY",
        env = "FEEDBOARD_WEATHER_KEY",
        hide_env_values = true,
        global = true
    )]
    pub weather_key: Option<String>,

    /// Strapi API token, sent as a bearer token
    #[arg(
        long,
        value_name = "TOKEN",
        env = "FEEDBOARD_NEWS_TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub news_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Current weather for several cities, fetched concurrently
    Weather {
        /// City to include (repeatable). Defaults to the configured list.
        #[arg(long = "city", value_name = "NAME")]
        cities: Vec<String>,

        /// Country appended to every city query
        #[arg(long, value_name = "NAME")]
        country: Option<String>,
    },

    /// Browse quotes
    Quotes {
        /// Position of the first quote (wraps around)
        #[arg(long, default_value = "0", value_name = "N")]
        index: usize,

        /// Number of quotes to show
        #[arg(long, default_value = "1", value_name = "K")]
        count: usize,

        /// Walk backwards from the first quote
        #[arg(long)]
        reverse: bool,
    },

    /// One page of the news feed
    News {
        /// Page number, starting at 1
        #[arg(long, default_value = "1", value_name = "N")]
        page: u32,

        /// Filter by title, category or author
        #[arg(short, long, value_name = "TERM")]
        search: Option<String>,
    },

    /// Full posts by numeric id or slug
    Post {
        /// Post ids or slugs, fetched concurrently
        #[arg(required = true, value_name = "REF")]
        references: Vec<String>,
    },

    /// Generate a default .feedboard.toml configuration file
    InitConfig,
}

/// Output format for rendered views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailOn {
    Any,
    All,
}

impl FailOn {
    /// Whether `failed` out of `total` requests crosses this threshold.
    pub fn is_met(self, failed: usize, total: usize) -> bool {
        match self {
            FailOn::Any => failed > 0,
            FailOn::All => total > 0 && failed == total,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match &self.command {
            Command::Weather { cities, .. } => {
                if cities.iter().any(|c| c.trim().is_empty()) {
                    return Err("City names cannot be empty".to_string());
                }
            }
            Command::Quotes { count, .. } => {
                if *count == 0 {
                    return Err("Count must be at least 1".to_string());
                }
            }
            Command::News { page, .. } => {
                if *page == 0 {
                    return Err("Page numbers start at 1".to_string());
                }
            }
            Command::Post { references } => {
                if references.iter().any(|r| r.trim().is_empty()) {
                    return Err("Post references cannot be empty".to_string());
                }
            }
            Command::InitConfig => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            config: None,
            verbose: false,
            quiet: false,
            format: OutputFormat::Markdown,
            output: None,
            timeout: None,
            fail_on: None,
            weather_key: None,
            news_token: None,
            command,
        }
    }

    #[test]
    fn test_parse_weather_cities() {
        let args = Args::try_parse_from([
            "feedboard", "weather", "--city", "Gulu", "--city", "Fort Portal", "--format", "json",
        ])
        .unwrap();

        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(
            args.command,
            Command::Weather {
                cities: vec!["Gulu".to_string(), "Fort Portal".to_string()],
                country: None,
            }
        );
    }

    #[test]
    fn test_parse_post_requires_reference() {
        assert!(Args::try_parse_from(["feedboard", "post"]).is_err());

        let args = Args::try_parse_from(["feedboard", "post", "3", "hello-world"]).unwrap();
        assert_eq!(
            args.command,
            Command::Post {
                references: vec!["3".to_string(), "hello-world".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_fail_on() {
        let args = Args::try_parse_from(["feedboard", "--fail-on", "all", "weather"]).unwrap();
        assert_eq!(args.fail_on, Some(FailOn::All));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::InitConfig);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let args = make_args(Command::News {
            page: 0,
            search: None,
        });
        assert!(args.validate().is_err());

        let args = make_args(Command::Quotes {
            index: 0,
            count: 0,
            reverse: false,
        });
        assert!(args.validate().is_err());

        let mut args = make_args(Command::InitConfig);
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_blank_city() {
        let args = make_args(Command::Weather {
            cities: vec!["  ".to_string()],
            country: None,
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_fail_on_thresholds() {
        assert!(FailOn::Any.is_met(1, 10));
        assert!(!FailOn::Any.is_met(0, 10));
        assert!(FailOn::All.is_met(10, 10));
        assert!(!FailOn::All.is_met(9, 10));
        assert!(!FailOn::All.is_met(0, 0));
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::InitConfig);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
