//! Write a small archive, then read it back both ways.
//!
//! ```text
//!   hello                       ──▶ root  R = cidv1(raw, sha2-256("hello"))
//!   random meaningless bytes    ──▶ block C = cidv1(raw, sha2-256(...))
//!
//!   CarWriter ──▶ <tmp>/example.car ──▶ CarReader        (get C by CID)
//!                                   └─▶ StreamingDecoder (walk frames)
//! ```
//!
//! The root is deliberately absent from the body: roots are only
//! references. Set `RUST_LOG=debug` (or `trace`) to see the codec's own
//! events.

use anyhow::{Context, Result, ensure};
use car_decoder::{CarReader, StreamingDecoder};
use car_encoder::CarWriter;
use car_types::{Block, Sha2_256Hasher, codec};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let root = Block::encode(codec::RAW, &Sha2_256Hasher, &b"hello"[..]);
    let block = Block::encode(codec::RAW, &Sha2_256Hasher, &b"random meaningless bytes"[..]);

    let dir = tempfile::tempdir().context("creating scratch directory")?;
    let path = dir.path().join("example.car");

    // ── Write ────────────────────────────────────────────────────────────
    let file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = CarWriter::new(file, vec![root.cid.clone()])?;
    writer.put_block(&block).await?;
    writer.close().await?;
    info!(path = %path.display(), bytes = writer.bytes_written(), "archive written");

    // ── Indexed read ─────────────────────────────────────────────────────
    let reader = CarReader::open(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    for cid in reader.roots() {
        info!(root = %cid, present = reader.has(cid), "root");
    }
    let found = reader
        .get(&block.cid)
        .context("block missing from archive")?;
    info!(
        cid = %found.cid,
        data = %String::from_utf8_lossy(&found.data),
        "block"
    );
    ensure!(found.data == block.data, "payload changed on the way through");

    // ── Streaming read ───────────────────────────────────────────────────
    let file = tokio::fs::File::open(&path).await?;
    let mut stream = StreamingDecoder::new(tokio::io::BufReader::new(file));
    let mut frames = 0;
    while let Some(next) = stream.next().await {
        let block = next.context("streaming decode")?;
        frames += 1;
        info!(cid = %block.cid, len = block.data.len(), "frame");
    }
    ensure!(
        stream.roots() == Some(reader.roots()),
        "streaming and indexed readers disagree on roots"
    );
    info!(frames, "done");

    Ok(())
}
