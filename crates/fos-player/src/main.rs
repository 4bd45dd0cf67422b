//! fOS Player - headless entry point
//!
//! Converts a subtitle file, plays a synthetic video of the given length
//! and prints every caption change.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use fos_devtools::{Console, ConsoleHandle, ConsoleLayer};
use fos_media::{Blob, File, MediaResource};
use fos_player::{PlayerConfig, PlayerPage};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const STEP_MS: u64 = 100;

struct Args {
    subtitles: PathBuf,
    config: Option<PathBuf>,
    duration: f64,
    debug: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut subtitles = None;
    let mut config = None;
    let mut duration = 60.0;
    let mut debug = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--duration" => {
                let value = args.next().context("--duration needs seconds")?;
                duration = value
                    .parse()
                    .with_context(|| format!("invalid duration '{}'", value))?;
                if !(duration > 0.0 && f64::is_finite(duration)) {
                    bail!("duration must be a positive number of seconds");
                }
            }
            "--debug" => debug = true,
            _ if subtitles.is_none() => subtitles = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument '{}'", arg),
        }
    }

    let Some(subtitles) = subtitles else {
        bail!("usage: fos-player <subtitles> [--config <path>] [--duration <secs>] [--debug]");
    };
    Ok(Args {
        subtitles,
        config,
        duration,
        debug,
    })
}

fn read_file(path: &Path) -> anyhow::Result<File> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(File::new(Blob::new(bytes, ""), &name))
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    // Initialize logging; the console feeds the debug panel
    let console = ConsoleHandle::new(Console::new());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(ConsoleLayer::new(console.clone()))
        .init();

    let config = match &args.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };

    let mut page = PlayerPage::new(config).with_console(console);
    page.open_video(File::video("synthetic.mp4", MediaResource::new(args.duration)));

    let subtitles = read_file(&args.subtitles)?;
    smol::block_on(page.upload_subtitle(subtitles))?;
    if args.debug {
        page.toggle_debug_panel();
    }

    let mut shown: Option<String> = None;
    while !page.video().base.ended {
        page.tick(STEP_MS);
        let current = page.overlay().displayed_text().map(str::to_string);
        if current != shown {
            let time = page.video().base.current_time;
            match &current {
                Some(text) => println!("[{:>8.3}] {}", time, text.replace('\n', " / ")),
                None => println!("[{:>8.3}] --", time),
            }
            shown = current;
        }
    }

    if args.debug {
        println!("{}", page.debug_panel().render());
    }
    Ok(())
}
