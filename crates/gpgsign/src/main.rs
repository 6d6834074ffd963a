use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use gpg_html_sign::{ExecutableLocator, GpgSettings, HtmlSigner, PathLocator, logging::setup_logging};

/// Add a PGP clearsign signature to a static HTML page. Writes to stdout.
#[derive(Parser)]
#[command(name = "gpg-html-sign", version, about, long_about = None)]
struct Args {
    /// Path to an HTML file
    filename: PathBuf,

    /// Content type the page is served with; selects its charset
    #[arg(long)]
    content_type: Option<String>,

    #[command(flatten)]
    gpg: GpgSettings,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GPG_HTML_SIGN_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let result = setup_logging(&args.log_level).and_then(|()| {
        let mut stdout = std::io::stdout().lock();
        sign_file(&args, &PathLocator::from_env(), &mut stdout)
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn sign_file(args: &Args, locator: &dyn ExecutableLocator, out: &mut dyn Write) -> Result<()> {
    let config = args.gpg.resolve(locator)?;
    let signer = HtmlSigner::from_config(config);

    let document = std::fs::read(&args.filename)
        .with_context(|| format!("reading {}", args.filename.display()))?;
    let signed = signer.sign_html(&document, args.content_type.as_deref())?;

    out.write_all(&signed).context("writing signed page")?;
    out.write_all(b"\n").context("writing signed page")?;
    out.flush().context("writing signed page")?;

    Ok(())
}
