use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "asinopt")]
#[command(author, version, about = "Scrape an Amazon product page and rewrite its listing copy", long_about = None)]
#[command(after_help = r#"Examples:
  asinopt optimize B08N5WRWNW                 Scrape, rewrite and save a listing
  asinopt optimize B08N5WRWNW --degraded      Use placeholder data if scraping fails
  asinopt extract B08N5WRWNW --file page.html Extract fields from a saved page
  asinopt normalize response.txt              Shape raw model output into a listing
  asinopt history B08N5WRWNW                  Past optimizations of one product
  asinopt show 12                             Compare original and optimized copy

Set GEMINI_API_KEY to use the live model; without it listings come from a template.
"#)]
pub struct Cli {
    /// Log debug output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape a product, rewrite its listing and save the result
    #[command(after_help = r#"Examples:
  asinopt optimize B08N5WRWNW
  asinopt optimize B08N5WRWNW --offline       # Skip the model, use the template
  asinopt optimize B08N5WRWNW --json
"#)]
    Optimize {
        /// 10-character ASIN
        asin: String,

        /// Continue with synthetic product data when scraping fails
        #[arg(long)]
        degraded: bool,

        /// Do not call the model even if an API key is configured
        #[arg(long)]
        offline: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract product fields without calling the model
    Extract {
        /// 10-character ASIN
        asin: String,

        /// Read the product page from a saved HTML file instead of fetching it
        #[arg(long, value_name = "HTML")]
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize raw model output (from a file or stdin) into a listing
    Normalize {
        /// File holding the raw response; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// List saved optimizations, newest first
    History {
        /// Only show optimizations of this ASIN
        asin: Option<String>,

        /// Maximum number of entries
        #[arg(long, default_value = "100")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one saved optimization with a comparison of the copy
    Show {
        /// Optimization id (see `asinopt history`)
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    #[command(after_help = r#"Examples:
  asinopt completions bash > ~/.local/share/bash-completion/completions/asinopt
  asinopt completions zsh > ~/.zfunc/_asinopt
  asinopt completions fish > ~/.config/fish/completions/asinopt.fish
"#)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}
