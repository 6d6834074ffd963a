use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gpg_html_sign::{
    AppState, GpgSettings, HtmlSigner, OnFailure, PathFilter, PathLocator,
    logging::setup_logging, run,
};

/// Serve a directory, PGP-signing every HTML page on the way out.
#[derive(Parser)]
#[command(name = "gpg-html-sign-server", version, about, long_about = None)]
struct Args {
    #[clap(long, default_value = "127.0.0.1")]
    host: String,
    #[clap(long, default_value = "3000")]
    port: u16,

    /// Directory of pages to serve
    #[clap(long, env = "GPG_HTML_SIGN_ROOT", default_value = ".")]
    root: PathBuf,

    /// Only sign paths under these prefixes (default: all paths)
    #[clap(long)]
    include_prefix: Vec<String>,
    /// Never sign paths under these prefixes
    #[clap(long)]
    exclude_prefix: Vec<String>,

    /// Response policy when a page cannot be signed
    #[clap(long, value_enum, default_value = "reject")]
    on_failure: OnFailure,

    /// Largest HTML body that will be buffered for signing. Larger pages of
    /// known length follow --on-failure; streamed pages that outgrow it
    /// always fail with 500
    #[clap(long, default_value = "16777216")]
    max_body_bytes: usize,

    #[command(flatten)]
    gpg: GpgSettings,

    /// Log level (trace, debug, info, warn, error)
    #[clap(long, env = "GPG_HTML_SIGN_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level)?;

    let config = args.gpg.resolve(&PathLocator::from_env())?;
    let state = AppState {
        include: PathFilter::new(args.include_prefix, args.exclude_prefix).into_predicate(),
        on_failure: args.on_failure,
        max_body_bytes: args.max_body_bytes,
        ..AppState::new(HtmlSigner::from_config(config))
    };

    run(args.host, args.port, state, args.root).await
}
