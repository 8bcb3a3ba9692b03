use crate::error::Up42Error;
use crate::up42::Up42Ops;
use anyhow::Result;
use futures_util::TryStreamExt;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Local directory receiving the raw result archives of one run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

pub fn archive_name(polygon_num: usize, interval_num: usize, task_num: usize) -> String {
    format!("polygon_{polygon_num}_timestamp_{interval_num}_task_{task_num}.tar.gz")
}

impl ArtifactStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Downloads every task archive of a finished job. Local write failures
    /// and per-task API errors are logged and skipped; the returned error is
    /// for the task listing itself or anything fatal.
    pub async fn persist_job(
        &self,
        api: &impl Up42Ops,
        job_id: &str,
        polygon_num: usize,
        interval_num: usize,
    ) -> Result<usize, Up42Error> {
        let tasks = api.get_job_tasks(job_id).await?;
        let mut saved = 0;

        for (i, task) in tasks.iter().enumerate() {
            let output = self.dir.join(archive_name(polygon_num, interval_num, i + 1));
            match self.persist_task(api, job_id, &task.id, &output).await {
                Ok(bytes) => {
                    debug!("Wrote {bytes} bytes to {}", output.display());
                    saved += 1;
                }
                Err(e) => match e.downcast::<Up42Error>() {
                    Ok(e) if e.is_fatal() => return Err(e),
                    Ok(e) => warn!("Unable to fetch task {} of job {job_id}: {e}", task.id),
                    Err(e) => warn!("Unable to write {}: {e}", output.display()),
                },
            }
        }
        Ok(saved)
    }

    async fn persist_task(
        &self,
        api: &impl Up42Ops,
        job_id: &str,
        task_id: &str,
        output: &Path,
    ) -> Result<u64> {
        let url = api.get_task_signed_url(job_id, task_id).await?;
        try_download(api, &url, output).await
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let mut partial = output.as_os_str().to_owned();
    partial.push(".partial");
    PathBuf::from(partial)
}

/// Streams `url` into `output` through a `.partial` file that is renamed
/// once the body is complete. Missing parent directories are created; the
/// partial file is removed if the download fails.
pub async fn try_download(api: &impl Up42Ops, url: &str, output: &Path) -> Result<u64> {
    if let Some(parent_dir) = output.parent() {
        fs::create_dir_all(parent_dir)?;
    }

    let partial = partial_path(output);
    match write_partial(api, url, &partial).await {
        Ok(byte_count) => {
            fs::rename(partial, output)?;
            Ok(byte_count)
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(&partial) {
                debug!("Unable to remove {}: {rm}", partial.display());
            }
            Err(e)
        }
    }
}

async fn write_partial(api: &impl Up42Ops, url: &str, partial: &Path) -> Result<u64> {
    let mut partial_file = File::create(partial)?;

    let mut body = api.download(url).await?;
    let mut byte_count = 0_u64;
    while let Some(bytes) = body.try_next().await? {
        partial_file.write_all(&bytes)?;
        byte_count += bytes.len() as u64;
    }
    partial_file.flush()?;
    Ok(byte_count)
}
