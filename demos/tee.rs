//! Fan one file out to two independent consumers
//!
//! Run with: cargo run --example tee -- [PATH]
//!
//! The file is read exactly once. One reader counts its bytes, the other
//! computes a running checksum, each at its own pace, while the main task
//! follows the caster's progress channel.

use std::time::Duration;

use readcast::{CasterConfig, ReadCaster};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Cargo.toml".to_string());
    let file = tokio::fs::File::open(&path).await?;

    let caster = ReadCaster::with_config(
        file,
        CasterConfig::default()
            .chunk_size(8192)
            .reader_timeout(Duration::from_secs(2)),
    )?;

    let mut progress = caster.progress();
    let mut counter = caster.new_reader()?;
    let mut summer = caster.new_reader()?;

    let count_task = tokio::spawn(async move {
        let mut total = 0usize;
        let mut buf = vec![0u8; 8192];
        loop {
            let n = counter.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok::<_, std::io::Error>(total)
    });

    let sum_task = tokio::spawn(async move {
        let mut sum = 0u64;
        let mut buf = vec![0u8; 1024];
        loop {
            let n = summer.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            sum = buf[..n].iter().fold(sum, |acc, b| acc.wrapping_add(*b as u64));
        }
        Ok::<_, std::io::Error>(sum)
    });

    while progress.changed().await.is_ok() {
        let bytes_read = *progress.borrow();
        tracing::debug!(bytes_read, "progress");
    }

    let bytes = count_task.await??;
    let checksum = sum_task.await??;
    tracing::info!(path = %path, bytes, checksum, "done");

    Ok(())
}
