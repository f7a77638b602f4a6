use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::info;

use feedcache::cache::QueryKey;
use feedcache::config::Config;
use feedcache::feed::{FeedFilter, FeedSort};
use feedcache::{logging, replay};

#[derive(Parser, Debug)]
#[command(name = "feedcache")]
#[command(about = "Inspect and replay the feed cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/feedcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Replay a YAML trace of cache operations and print each result
  Replay {
    /// Trace file
    trace: PathBuf,
  },
  /// Print the effective configuration
  Config,
  /// Print the cache key for a feed filter
  Key {
    #[arg(long, default_value_t = 0)]
    page: u32,
    #[arg(long, default_value_t = feedcache::feed::cache::DEFAULT_PAGE_SIZE)]
    page_size: u32,
    #[arg(long)]
    author: Option<String>,
    /// Tag filter, repeatable
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// "latest" or "popular"
    #[arg(long, default_value = "latest")]
    sort: String,
  },
}

fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  match args.command {
    Command::Replay { trace } => {
      let steps = replay::load_trace(&trace)?;
      info!(steps = steps.len(), trace = %trace.display(), "Replaying trace");
      for line in replay::replay(&steps, &config.cache)? {
        println!("{}", line);
      }
    }
    Command::Config => {
      let yaml =
        serde_yaml::to_string(&config).map_err(|e| eyre!("Failed to render config: {}", e))?;
      print!("{}", yaml);
    }
    Command::Key {
      page,
      page_size,
      author,
      tags,
      sort,
    } => {
      let sort = match sort.as_str() {
        "latest" => FeedSort::Latest,
        "popular" => FeedSort::Popular,
        other => return Err(eyre!("Unknown sort '{}', expected latest or popular", other)),
      };
      let filter = FeedFilter {
        page,
        page_size,
        author_id: author,
        tags,
        sort,
      };
      println!("{}", filter.cache_key());
    }
  }

  Ok(())
}
