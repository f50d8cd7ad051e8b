use std::path::Path;

use vforge_media::{check_ffmpeg, check_ffprobe};
use vforge_storage::{R2Client, StorageConfig};
use vforge_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;

    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    println!("worker-selfcheck: ffmpeg at {}", ffmpeg.display());
    let ffprobe = check_ffprobe().map_err(|e| anyhow::anyhow!("ffprobe not available: {}", e))?;
    println!("worker-selfcheck: ffprobe at {}", ffprobe.display());

    match StorageConfig::from_env()? {
        StorageConfig::R2(r2) => {
            let bucket = r2.bucket_name.clone();
            R2Client::new(r2).check_connectivity().await?;
            println!("worker-selfcheck: R2 bucket {} reachable", bucket);
        }
        StorageConfig::Local(local) => {
            ensure_workdir(&local.root).await?;
            println!("worker-selfcheck: local store at {}", local.root.display());
        }
    }

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}
