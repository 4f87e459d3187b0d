// Command-line surface. Everything string-shaped on the command line is
// turned into typed values here (filters, input source, action flags) so
// the protocols never look at raw selectors.

use crate::error::Result;
use crate::ingest::{InputSource, ParsePolicy};
use crate::mutate::ActionFlags;
use crate::retrieve::{parse_since, ContentType, Filters, Sort, State, TagFilter};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pockyt", version)]
#[command(about = "Automate and manage your Pocket collection", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Format template for rendering and parsing items, e.g. "{id} - {title}".
    /// Known keys: id, title, link, excerpt, tags, time_added, time_updated, domain
    #[arg(short, long, global = true, default_value = "{link}")]
    pub format: String,

    /// Debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Retrieve items
    Get(GetArgs),
    /// Add items by link
    Put(PutArgs),
    /// Archive, favorite or delete items by id
    Mod(ModArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[arg(short, long, value_enum, default_value_t = State::Unread)]
    pub state: State,

    #[arg(short = 'r', long, value_enum, default_value_t = Sort::Newest)]
    pub sort: Sort,

    #[arg(short, long, value_enum, default_value_t = ContentType::All)]
    pub content: ContentType,

    /// Only items whose title or URL contains this text
    #[arg(short, long)]
    pub query: Option<String>,

    /// Tag name; "0" for untagged items only, "-1" for any
    #[arg(short, long, default_value = "-1", allow_hyphen_values = true)]
    pub tag: String,

    /// 1 for favorites only, 0 for non-favorites only
    #[arg(short = 'v', long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub favorite: Option<u8>,

    #[arg(short, long)]
    pub domain: Option<String>,

    /// Only items changed since this date (YYYY-MM-DD)
    #[arg(short = 'e', long)]
    pub since: Option<String>,

    /// Maximum number of items
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Also write output to this file, or "browser" to open each link
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output JSON instead of the format template
    #[arg(short, long)]
    pub json: bool,

    /// Save each item's page into this directory
    #[arg(short, long)]
    pub archive: Option<PathBuf>,
}

impl GetArgs {
    pub fn filters(&self) -> Result<Filters> {
        let since = self.since.as_deref().map(parse_since).transpose()?;
        Ok(Filters {
            state: self.state,
            sort: self.sort,
            content: self.content,
            query: self.query.clone().filter(|q| !q.is_empty()),
            tag: TagFilter::from_arg(&self.tag),
            favorite: self.favorite.map(|f| f == 1),
            domain: self.domain.clone().filter(|d| !d.is_empty()),
            since,
        })
    }
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// "redirect" (stdin), "console" (prompt), a URL, or a file path
    #[arg(short, long, default_value = "redirect")]
    pub input: String,

    /// Skip input lines that do not match the format instead of aborting
    #[arg(long)]
    pub skip_invalid: bool,
}

impl InputArgs {
    pub fn source(&self) -> InputSource {
        InputSource::from_selector(&self.input)
    }

    pub fn policy(&self) -> ParsePolicy {
        if self.skip_invalid {
            ParsePolicy::Skip
        } else {
            ParsePolicy::Abort
        }
    }
}

#[derive(Args, Debug)]
pub struct PutArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct ModArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Delete the items
    #[arg(short, long)]
    pub delete: bool,

    /// 1 to archive, 0 to move back to the reading list
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub archive: Option<u8>,

    /// 1 to favorite, 0 to unfavorite
    #[arg(short = 'v', long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub favorite: Option<u8>,
}

impl ModArgs {
    pub fn flags(&self) -> ActionFlags {
        ActionFlags {
            delete: self.delete,
            archive: self.archive.map(|a| a == 1),
            favorite: self.favorite.map(|f| f == 1),
        }
    }
}
