//! Plate events read from stdin.
//!
//! One event per line: `entry <image> [fallback]` or `exit <image>
//! [fallback]`. Blank lines and `#` comments are ignored.
//!
//! Stdin is read on its own OS thread: a blocking read on the runtime
//! would keep it from shutting down after Ctrl-C.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use tracing::warn;

use autopark_controller::PlateEvent;
use autopark_core::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLine {
    pub direction: Direction,
    pub image: PathBuf,
    pub fallback: Option<PathBuf>,
}

/// Parse one feed line; `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<FeedLine>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let direction: Direction = fields
        .next()
        .context("empty line")?
        .parse()
        .context("expected `entry` or `exit`")?;
    let image = fields.next().context("missing image path")?;
    let fallback = fields.next();
    if fields.next().is_some() {
        bail!("too many fields");
    }

    Ok(Some(FeedLine {
        direction,
        image: PathBuf::from(image),
        fallback: fallback.map(PathBuf::from),
    }))
}

/// Lines buffered between the stdin thread and the feed loop.
const LINE_BUFFER: usize = 16;

/// Start a thread forwarding stdin lines; the channel closes at EOF.
pub fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::Builder::new()
        .name("stdin-feed".to_string())
        .spawn(move || {
            if let Err(e) = forward_lines(std::io::stdin().lock(), &tx) {
                warn!(error = %e, "reading stdin failed");
            }
        })
        .context("spawning stdin reader")?;
    Ok(rx)
}

/// Send each line of `reader` to `tx` until EOF or the receiver is gone.
///
/// Blocks; call from a non-runtime thread.
pub fn forward_lines<R: BufRead>(reader: R, tx: &mpsc::Sender<String>) -> std::io::Result<()> {
    for line in reader.lines() {
        if tx.blocking_send(line?).is_err() {
            break;
        }
    }
    Ok(())
}

impl FeedLine {
    /// Read the image files into a [`PlateEvent`].
    pub async fn load(&self) -> Result<PlateEvent> {
        let image = tokio::fs::read(&self.image)
            .await
            .with_context(|| format!("reading {}", self.image.display()))?;
        let mut event = PlateEvent::new(self.direction, image);

        if let Some(path) = &self.fallback {
            let fallback = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            event = event.with_fallback(fallback);
        }
        Ok(event)
    }
}
