use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use colored::Colorize;
use plume_archive::{ArchiveResolver, FsNetwork};
use plume_feed::FeedOptions;
use plume_profile::{BroadcastDraft, Document, ProfileSite};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;
use crate::config::{CliConfig, Settings};
use crate::render::{
    entry_json, parse_field_value, write_entry, write_fields, write_json, write_remote,
};

/// The site a command acts as, plus output settings.
pub struct Context {
    pub site: Arc<ProfileSite>,
    pub settings: Settings,
    pub format: OutputFormat,
}

impl Context {
    /// Open the configured site from a directory of sites.
    pub fn open(root: &Path, settings: Settings, format: OutputFormat) -> anyhow::Result<Self> {
        let network: Arc<dyn ArchiveResolver> = Arc::new(FsNetwork::new(root));
        let site = ProfileSite::open(&settings.site, network)
            .with_context(|| format!("cannot open site {}", settings.site))?;
        debug!(site = %settings.site, root = %root.display(), "site opened");
        Ok(Self {
            site: Arc::new(site),
            settings,
            format,
        })
    }

    fn feed_options(&self, args: FeedArgs) -> FeedOptions {
        FeedOptions {
            after: args.after,
            before: args.before,
            limit: args.limit.or(self.settings.feed_limit),
            meta_only: args.meta_only,
            type_filter: args.type_filter,
            reverse: args.reverse,
            timeout: self.settings.timeout,
        }
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(&cli.root, cli.config.as_deref())?;
    let settings = config.resolve(cli.site.as_deref(), cli.timeout_ms)?;
    let ctx = Context::open(&cli.root, settings, cli.format)?;
    let mut out = std::io::stdout();
    execute(&ctx, cli.command, &mut out).await
}

pub async fn execute(ctx: &Context, command: Command, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Command::Profile => cmd_profile(ctx, out).await,
        Command::Set(args) => cmd_set(ctx, args, out).await,
        Command::Follow(args) => cmd_follow(ctx, args, out).await,
        Command::Unfollow(args) => cmd_unfollow(ctx, args, out).await,
        Command::Following => cmd_following(ctx, false, out).await,
        Command::Friends => cmd_following(ctx, true, out).await,
        Command::IsFollowing(args) => cmd_is_following(ctx, args, out).await,
        Command::IsFriend(args) => cmd_is_friend(ctx, args, out).await,
        Command::Post(args) => cmd_post(ctx, args, out).await,
        Command::Broadcasts(args) => cmd_feed(ctx, args, false, out).await,
        Command::Feed(args) => cmd_feed(ctx, args, true, out).await,
        Command::Show(args) => cmd_show(ctx, args, out).await,
    }
}

async fn cmd_profile(ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let profile = ctx.site.get_profile().await;
    if ctx.json() {
        return write_json(out, &profile);
    }
    writeln!(out, "Profile of {}", ctx.site.url().cyan().bold())?;
    if profile.is_empty() {
        writeln!(out, "  (empty)")?;
    }
    write_fields(out, &profile, "  ")
}

async fn cmd_set(ctx: &Context, args: SetArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let value = parse_field_value(&args.value);
    let mut updates = Document::new();
    updates.insert(args.key.clone(), value.clone());
    ctx.site.set_profile(updates).await?;
    if ctx.json() {
        return write_json(out, &json!({ "key": args.key, "value": value }));
    }
    writeln!(out, "{} Set {} = {}", "✓".green().bold(), args.key.bold(), value)?;
    Ok(())
}

async fn cmd_follow(ctx: &Context, args: UrlArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    ctx.site.follow(&args.url).await?;
    if ctx.json() {
        return write_json(out, &json!({ "url": args.url, "following": true }));
    }
    writeln!(out, "{} Following {}", "✓".green().bold(), args.url.cyan())?;
    Ok(())
}

async fn cmd_unfollow(ctx: &Context, args: UrlArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    ctx.site.unfollow(&args.url).await?;
    if ctx.json() {
        return write_json(out, &json!({ "url": args.url, "following": false }));
    }
    writeln!(out, "{} Unfollowed {}", "✓".green().bold(), args.url.cyan())?;
    Ok(())
}

async fn cmd_following(ctx: &Context, friends_only: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    let timeout = ctx.settings.timeout;
    let profiles = if friends_only {
        ctx.site.list_friends(timeout).await
    } else {
        ctx.site.list_following(timeout).await
    };
    if ctx.json() {
        return write_json(out, &profiles);
    }
    if profiles.is_empty() {
        let message = if friends_only { "No mutual follows." } else { "Not following anyone." };
        writeln!(out, "{message}")?;
    }
    for profile in &profiles {
        write_remote(out, profile)?;
    }
    Ok(())
}

async fn cmd_is_following(ctx: &Context, args: UrlArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let following = ctx.site.is_following(&args.url).await;
    if ctx.json() {
        return write_json(out, &json!({ "url": args.url, "following": following }));
    }
    writeln!(out, "{}", yes_no(following))?;
    Ok(())
}

async fn cmd_is_friend(ctx: &Context, args: UrlArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let friend = ctx.site.is_friends_with(&args.url, ctx.settings.timeout).await;
    if ctx.json() {
        return write_json(out, &json!({ "url": args.url, "friend": friend }));
    }
    writeln!(out, "{}", yes_no(friend))?;
    Ok(())
}

fn yes_no(answer: bool) -> colored::ColoredString {
    if answer {
        "yes".green()
    } else {
        "no".red()
    }
}

async fn cmd_post(ctx: &Context, args: PostArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let draft = BroadcastDraft {
        text: args.text.or(args.message),
        image: args.image,
        video: args.video,
        audio: args.audio,
    };
    let is_blank = |field: &Option<String>| field.as_deref().map_or(true, str::is_empty);
    if [&draft.text, &draft.image, &draft.video, &draft.audio]
        .into_iter()
        .all(is_blank)
    {
        bail!("nothing to post: give a message or a media link");
    }
    let reference = ctx.site.broadcast(&draft).await?;
    if ctx.json() {
        return write_json(out, &json!({ "url": reference }));
    }
    writeln!(out, "{} Published {}", "✓".green().bold(), reference.cyan())?;
    Ok(())
}

async fn cmd_feed(
    ctx: &Context,
    args: FeedArgs,
    include_followed: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let opts = ctx.feed_options(args);
    let feed = if include_followed {
        ctx.site.list_feed(&opts).await
    } else {
        ctx.site.list_broadcasts(&opts).await
    };
    if ctx.json() {
        let entries: Vec<Value> = feed.iter().map(entry_json).collect();
        return write_json(out, &entries);
    }
    if feed.is_empty() {
        writeln!(out, "No broadcasts.")?;
    }
    for entry in &feed {
        write_entry(out, entry)?;
    }
    Ok(())
}

async fn cmd_show(ctx: &Context, args: ShowArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let entry = ctx
        .site
        .get_broadcast(args.target.as_str())
        .await
        .with_context(|| format!("cannot load broadcast {}", args.target))?;
    if ctx.json() {
        return write_json(out, &entry_json(&entry));
    }
    write_entry(out, &entry)?;
    if let Some(content) = &entry.content {
        write_fields(out, content, "    ")?;
    }
    Ok(())
}
