use clap::{Args, Parser, Subcommand};

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "flickr-curate",
    version,
    about = "Collect your most interesting Flickr photos into an album"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Flickr API key
    #[arg(long, env = "FLICKR_API_KEY", global = true)]
    pub api_key: Option<String>,

    /// Flickr API secret.
    /// WARNING: passing via --api-secret is visible in process listings.
    /// Prefer the FLICKR_API_SECRET environment variable instead.
    #[arg(long, env = "FLICKR_API_SECRET", global = true, hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Directory for the token cache and saved settings
    #[arg(long, default_value = "~/.flickr-curate", global = true)]
    pub config_dir: String,

    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or update the album of most interesting photos
    Run(RunArgs),
    /// List the account's albums
    Albums,
    /// Authorize this application with Flickr (interactive)
    Auth,
    /// Print the cached token as environment variables
    ExportToken,
    /// Serve the web interface
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Album title
    #[arg(long)]
    pub title: Option<String>,

    /// Album description
    #[arg(long)]
    pub description: Option<String>,

    /// Number of photos to collect
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: Option<u32>,

    /// Update the album with this ID instead of creating one
    #[arg(long, conflicts_with = "photoset_name")]
    pub photoset_id: Option<String>,

    /// Update the album with this exact title instead of creating one
    #[arg(long)]
    pub photoset_name: Option<String>,

    /// Show what would be written without touching any album
    #[arg(long)]
    pub dry_run: bool,

    /// Attempts per remote call, including the first
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Base delay in seconds for exponential backoff between attempts
    #[arg(long, default_value_t = 1)]
    pub retry_delay: u64,

    /// Run continuously, waiting N seconds between runs
    #[arg(long)]
    pub watch_with_interval: Option<u64>,

    /// Persist title, description, count and album name as new defaults
    #[arg(long)]
    pub save_settings: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub bind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("flickr-curate").chain(args.iter().copied()))
    }

    #[test]
    fn test_run_defaults() {
        let cli = parse(&["run"]).unwrap();
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(run.count, None);
        assert_eq!(run.max_attempts, 3);
        assert_eq!(run.retry_delay, 1);
        assert!(!run.dry_run);
        assert_eq!(cli.global.config_dir, "~/.flickr-curate");
        assert_eq!(cli.global.log_level, LogLevel::Info);
    }

    #[test]
    fn test_run_all_flags() {
        let cli = parse(&[
            "run",
            "--title",
            "Best",
            "--count",
            "250",
            "--photoset-name",
            "Best",
            "--dry-run",
            "--watch-with-interval",
            "3600",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(run.title.as_deref(), Some("Best"));
        assert_eq!(run.count, Some(250));
        assert_eq!(run.photoset_name.as_deref(), Some("Best"));
        assert!(run.dry_run);
        assert_eq!(run.watch_with_interval, Some(3600));
        assert_eq!(cli.global.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_count_must_be_positive() {
        assert!(parse(&["run", "--count", "0"]).is_err());
    }

    #[test]
    fn test_photoset_id_and_name_conflict() {
        assert!(parse(&["run", "--photoset-id", "1", "--photoset-name", "x"]).is_err());
    }

    #[test]
    fn test_serve_default_bind() {
        let cli = parse(&["serve"]).unwrap();
        let Command::Serve(serve) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_subcommand_required() {
        assert!(parse(&[]).is_err());
    }
}
