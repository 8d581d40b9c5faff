//! Command-line interface definitions for hot_topics.
//!
//! Every option is optional: a bare invocation fetches the built-in sources
//! and writes `public/hot.json`.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Built-in sources, default output
/// hot_topics
///
/// # Custom sources and output path
/// hot_topics --config sources.yaml --output site/public/hot.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file (sources, limits, output path)
    #[arg(short, long, env = "HOT_TOPICS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output file; overrides `output_path` from the config
    #[arg(short, long, env = "HOT_TOPICS_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Exit non-zero when no items could be collected
    #[arg(long)]
    pub fail_when_empty: bool,
}
