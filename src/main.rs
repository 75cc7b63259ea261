//! Shareloader - Share-Link Media Resolver
//!
//! Resolves a short-video/social share link (or a platform-native content
//! id) into a normalized media descriptor: a direct video URL or an
//! ordered image gallery, plus title/author/cover metadata.

use anyhow::Result;
use clap::Parser;
use shareloader::{ResolverConfig, ResolverRegistry};

#[derive(Parser)]
#[command(about = "Resolve a share link into playable media")]
struct Args {
    /// Share link, or pasted text containing one
    share_text: Option<String>,

    /// Platform selector for id-based resolution (slug or name)
    #[arg(long, requires = "id")]
    platform: Option<String>,

    /// Platform-native content id
    #[arg(long, requires = "platform")]
    id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Operator settings (REDBOOK_COOKIE etc.) may live in a .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let registry = ResolverRegistry::new(&ResolverConfig::from_env())?;

    let info = match (&args.share_text, &args.platform, &args.id) {
        (Some(text), _, _) => registry.resolve_share_url(text).await?,
        (None, Some(platform), Some(id)) => registry.resolve_by_id(platform, id).await?,
        _ => {
            anyhow::bail!("pass a share link, or --platform with --id");
        }
    };

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
