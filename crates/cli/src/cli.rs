use clap::Parser;
use std::path::PathBuf;

use audiodrop_core::{CollectionOptions, ConversionOptions, IdFilter};

#[derive(Debug, Parser)]
#[command(
    name = "audiodrop",
    version,
    about = "Download online media and convert it into audio files"
)]
pub struct Cli {
    /// Item or collection URL.
    pub url: String,

    /// Split items into one file per chapter.
    #[arg(long)]
    pub split: bool,

    /// Merge a collection into a single file.
    #[arg(long)]
    pub concatenate: bool,

    /// Skip a collection member by ID. Repeatable.
    #[arg(long, value_name = "ID")]
    pub exclude: Vec<String>,

    /// Output directory. Overrides `output_dir` from the configuration.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the collection report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print Prometheus metrics to stderr when done.
    #[arg(long)]
    pub metrics: bool,
}

impl Cli {
    /// Collection options described by the flags.
    pub fn collection_options(&self) -> CollectionOptions {
        let mut options = CollectionOptions::new().with_default_options(self.conversion_options());
        if !self.exclude.is_empty() {
            options = options.with_filter(IdFilter::new(self.exclude.iter().cloned()));
        }
        if self.concatenate {
            options = options.concatenated();
        }
        options
    }

    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions { split: self.split }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collection_flags() {
        let cli = Cli::parse_from([
            "audiodrop",
            "https://www.youtube.com/playlist?list=PL1",
            "--split",
            "--exclude",
            "a",
            "--exclude",
            "b",
            "-o",
            "/music",
        ]);

        assert_eq!(cli.exclude, vec!["a", "b"]);
        assert_eq!(cli.output, Some(PathBuf::from("/music")));

        let options = cli.collection_options();
        assert!(options.filters.excludes("a"));
        assert!(options.filters.excludes("b"));
        assert!(!options.filters.excludes("c"));
        assert!(options.options_for("c").split);
        assert!(!options.concatenate);
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["audiodrop", "https://youtu.be/abc"]);
        assert!(!cli.split);
        assert!(!cli.concatenate);
        assert!(cli.config.is_none());
        assert!(cli.collection_options().filters.is_empty());
    }

    #[test]
    fn test_url_is_required() {
        assert!(Cli::try_parse_from(["audiodrop"]).is_err());
    }
}
