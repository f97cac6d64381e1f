use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "plume",
    about = "Plume: social profiles over peer-replicated archives",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding one subdirectory per site
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// URL of the site to act as (overrides the config file)
    #[arg(long, global = true)]
    pub site: Option<String>,

    /// Config file to use instead of <root>/plume.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Timeout for remote reads in milliseconds; 0 disables it
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the site's profile
    Profile,
    /// Update one profile field
    Set(SetArgs),
    /// Follow a site
    Follow(UrlArgs),
    /// Stop following a site
    Unfollow(UrlArgs),
    /// List followed sites with their profiles
    Following,
    /// List followed sites that follow back
    Friends,
    /// Check whether the site follows a URL
    IsFollowing(UrlArgs),
    /// Check whether a URL is a mutual follow
    IsFriend(UrlArgs),
    /// Publish a broadcast
    Post(PostArgs),
    /// List the site's own broadcasts
    Broadcasts(FeedArgs),
    /// List broadcasts of the site and everyone it follows
    Feed(FeedArgs),
    /// Show one broadcast by path or full reference
    Show(ShowArgs),
}

#[derive(Args)]
pub struct SetArgs {
    pub key: String,
    /// Parsed as JSON when possible, otherwise stored as a string
    #[arg(required = true, num_args = 1..)]
    pub value: Vec<String>,
}

#[derive(Args)]
pub struct UrlArgs {
    pub url: String,
}

#[derive(Args)]
pub struct PostArgs {
    /// Text of the broadcast; also accepted as a positional argument
    #[arg(short, long)]
    pub text: Option<String>,
    #[arg(long)]
    pub image: Option<String>,
    #[arg(long)]
    pub video: Option<String>,
    #[arg(long)]
    pub audio: Option<String>,
    #[arg(conflicts_with = "text")]
    pub message: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct FeedArgs {
    /// Only broadcasts published after this time (ms since epoch)
    #[arg(long)]
    pub after: Option<u64>,
    /// Only broadcasts published before this time (ms since epoch)
    #[arg(long)]
    pub before: Option<u64>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    /// Newest first
    #[arg(long)]
    pub reverse: bool,
    /// Skip reading broadcast content
    #[arg(long)]
    pub meta_only: bool,
    /// Only broadcasts of this @type
    #[arg(long = "type")]
    pub type_filter: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_profile() {
        let cli = Cli::try_parse_from(["plume", "profile"]).unwrap();
        assert!(matches!(cli.command, Command::Profile));
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parse_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "plume", "following", "--site", "dat://alice", "--root", "/tmp/sites", "--timeout-ms", "250",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Following));
        assert_eq!(cli.site.as_deref(), Some("dat://alice"));
        assert_eq!(cli.root, PathBuf::from("/tmp/sites"));
        assert_eq!(cli.timeout_ms, Some(250));
    }

    #[test]
    fn parse_set_multi_word_value() {
        let cli = Cli::try_parse_from(["plume", "set", "bio", "hello", "world"]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.key, "bio");
            assert_eq!(args.value, vec!["hello", "world"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set_requires_value() {
        assert!(Cli::try_parse_from(["plume", "set", "bio"]).is_err());
    }

    #[test]
    fn parse_follow() {
        let cli = Cli::try_parse_from(["plume", "follow", "dat://bob"]).unwrap();
        if let Command::Follow(args) = cli.command {
            assert_eq!(args.url, "dat://bob");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_is_friend() {
        let cli = Cli::try_parse_from(["plume", "is-friend", "dat://bob"]).unwrap();
        assert!(matches!(cli.command, Command::IsFriend(_)));
    }

    #[test]
    fn parse_post() {
        let cli = Cli::try_parse_from(["plume", "post", "--text", "hi", "--image", "/a.png"]).unwrap();
        if let Command::Post(args) = cli.command {
            assert_eq!(args.text, Some("hi".into()));
            assert_eq!(args.image, Some("/a.png".into()));
            assert!(args.message.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_post_positional_conflicts_with_text() {
        assert!(Cli::try_parse_from(["plume", "post", "--text", "a", "b"]).is_err());
        let cli = Cli::try_parse_from(["plume", "post", "hello"]).unwrap();
        if let Command::Post(args) = cli.command {
            assert_eq!(args.message, Some("hello".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_feed_flags() {
        let cli = Cli::try_parse_from([
            "plume", "feed", "--after", "10", "--before", "20", "-n", "5", "--reverse", "--meta-only", "--type", "comment",
        ])
        .unwrap();
        if let Command::Feed(args) = cli.command {
            assert_eq!(args.after, Some(10));
            assert_eq!(args.before, Some(20));
            assert_eq!(args.limit, Some(5));
            assert!(args.reverse);
            assert!(args.meta_only);
            assert_eq!(args.type_filter, Some("comment".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_show() {
        let cli = Cli::try_parse_from(["plume", "show", "/broadcasts/1.json"]).unwrap();
        if let Command::Show(args) = cli.command {
            assert_eq!(args.target, "/broadcasts/1.json");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["plume", "--verbose", "profile"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["plume", "--format", "json", "feed"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
