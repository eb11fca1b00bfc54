use std::path::PathBuf;

use anyhow::{Context, Result};

use livefetch::{Platform, Resolver, Settings};

use super::output::{print_json, Envelope};

pub struct ResolveArgs {
    pub platform: String,
    pub room: String,
    pub quality: Option<String>,
    pub proxy: Option<String>,
    pub full: bool,
    pub config: Option<PathBuf>,
}

pub async fn cmd_resolve(args: ResolveArgs) -> Result<()> {
    let platform: Platform = args.platform.parse()?;

    let settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("failed to load settings")?;

    let result = Resolver::new(settings)
        .resolve(
            platform.id(),
            &args.room,
            args.quality.as_deref(),
            args.proxy.as_deref(),
        )
        .await
        .with_context(|| format!("{platform} room {}", args.room))?;

    if args.full {
        print_json(&result)
    } else {
        print_json(&Envelope::new(platform, &args.room, &result))
    }
}
