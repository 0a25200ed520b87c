use crate::config::SearchConfig;
use crate::error::ConfigError;
use crate::index::MANIFEST_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "symbol-search")]
#[command(about = "Incremental symbol search over generated HTML documentation", long_about = None)]
pub struct Cli {
    /// HTML output directory, or its `search/` directory
    #[arg(short, long, global = true, default_value = ".")]
    pub docs: PathBuf,
    /// Section to search (see `sections`)
    #[arg(short, long, global = true)]
    pub section: Option<String>,
    /// Maximum number of result rows
    #[arg(short = 'n', long, global = true)]
    pub limit: Option<usize>,
    /// Config file; defaults to the user config directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Print result sets as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one query and print the ranked rows
    Search { query: String },
    /// List the search sections of the index
    Sections,
    /// Read queries from stdin as keystrokes and print each result set
    Interactive,
}

impl Cli {
    /// The directory holding `searchdata.js` and the shard files.
    pub fn search_dir(&self) -> PathBuf {
        let nested = self.docs.join("search");
        if nested.join(MANIFEST_FILE).is_file() {
            nested
        } else {
            self.docs.clone()
        }
    }

    /// The config file (explicit or discovered) with flag overrides applied.
    pub fn load_config(&self) -> Result<SearchConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SearchConfig::load(path)?,
            None => SearchConfig::discover()?,
        };
        if let Some(section) = &self.section {
            config.section.clone_from(section);
        }
        if let Some(limit) = self.limit {
            config.max_results = limit;
        }
        Ok(config)
    }
}
