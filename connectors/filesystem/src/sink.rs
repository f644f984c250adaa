use crate::config::FilesystemOutputConfig;
use async_trait::async_trait;
use compkit_core::{
    connector::{ConnectorConfig, Sink, WriteResult},
    format,
    DataBatch, Error, Result,
};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

pub struct FilesystemSink {
    config: FilesystemOutputConfig,
    uid: String,
    target: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    header_written: bool,
    data_count: u64,
}

impl FilesystemSink {
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        Ok(Self::with_config(FilesystemOutputConfig::from_json(
            config.properties_json(),
        )?))
    }

    pub fn with_config(config: FilesystemOutputConfig) -> Self {
        Self {
            config,
            uid: String::new(),
            target: None,
            writer: None,
            header_written: false,
            data_count: 0,
        }
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// Clears whatever sits at `path`, or fails when overwriting is off.
    async fn prepare(&self, path: &Path) -> Result<()> {
        let metadata = match fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if !self.config.overwrite {
            return Err(Error::Config(format!(
                "Output {} already exists and overwrite is disabled",
                path.display()
            )));
        }
        info!("Removing existing output: {}", path.display());
        if metadata.is_dir() {
            fs::remove_dir_all(path).await?;
        } else {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for FilesystemSink {
    async fn init(&mut self, uid: &str) -> Result<()> {
        self.uid = uid.to_string();
        let target = self.config.target_file(uid);

        self.prepare(self.config.dataset.path()).await?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        info!("Opening filesystem output: {}", target.display());
        let file = File::create(&target).await?;
        self.writer = Some(BufWriter::new(file));
        self.target = Some(target);
        Ok(())
    }

    async fn write_batch(&mut self, batch: DataBatch) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Write("Filesystem output is not open".into()))?;

        let include_header = self.config.dataset.format.header && !self.header_written;
        let bytes = format::encode(&batch.records, &self.config.dataset.format, include_header)?;
        writer.write_all(&bytes).await?;

        if include_header && !batch.is_empty() {
            self.header_written = true;
        }
        self.data_count += batch.len() as u64;
        debug!(records = batch.len(), "Wrote batch to filesystem output");
        Ok(())
    }

    async fn close(&mut self) -> Result<WriteResult> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.into_inner().sync_all().await?;
            info!(records = self.data_count, "Closed filesystem output");
        }
        Ok(WriteResult::new(
            self.uid.clone(),
            self.data_count,
            self.data_count,
            0,
        ))
    }
}
