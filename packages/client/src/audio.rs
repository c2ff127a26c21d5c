//! Saving received audio and handing it to a player.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use async_trait::async_trait;
use tokio::task::JoinSet;
use vgtalk_shared::time::{Clock, timestamp_to_file_stem};

use crate::error::{ClientError, PlaybackError};

/// Writes audio payloads to timestamp-named files
#[derive(Clone)]
pub struct AudioStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for audio received now, e.g. `response_20230101_000000_123.wav`.
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "response_{}.{}",
            timestamp_to_file_stem(self.clock.now_millis()),
            extension
        )
    }

    /// Write `bytes` to a new file and return its path.
    ///
    /// Never overwrites: a numeric suffix is added when the name is taken.
    pub async fn save(&self, bytes: &[u8], extension: &str) -> Result<PathBuf, ClientError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ClientError::AudioError(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let path = self.unused_path(&self.file_name(extension)).await;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ClientError::AudioError(format!("cannot write {}: {}", path.display(), e)))?;

        tracing::info!("Saved {} bytes of audio to {}", bytes.len(), path.display());
        Ok(path)
    }

    async fn unused_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }

        let (stem, extension) = file_name.rsplit_once('.').unwrap_or((file_name, ""));
        let mut counter = 1;
        loop {
            let candidate = self.dir.join(format!("{}_{}.{}", stem, counter, extension));
            if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Plays an audio file to completion
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Runs an external program with the audio path as its last argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    /// Parse a whitespace-separated command line such as `ffplay -nodisp -autoexit`.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| PlaybackError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(PlaybackError::Exit {
                program: self.program.clone(),
                status: status.to_string(),
            })
        }
    }
}

/// Player used when no command is configured: audio is only saved
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlayer;

#[async_trait]
impl AudioPlayer for NullPlayer {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        tracing::info!("No audio player configured; skipping playback of {}", path.display());
        Ok(())
    }
}

/// Build the player for an optional command line.
pub fn player_from_config(command_line: Option<&str>) -> Arc<dyn AudioPlayer> {
    match command_line.and_then(CommandPlayer::from_command_line) {
        Some(player) => Arc::new(player),
        None => Arc::new(NullPlayer),
    }
}

/// Fire-and-forget playback tasks, kept so shutdown can cancel them
#[derive(Default)]
pub struct PlaybackTasks {
    tasks: JoinSet<()>,
}

impl PlaybackTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playing `path` in the background; returns immediately.
    pub fn spawn(&mut self, player: Arc<dyn AudioPlayer>, path: PathBuf) {
        self.reap();
        self.tasks.spawn(async move {
            tracing::debug!("Playback started: {}", path.display());
            match player.play(&path).await {
                Ok(()) => tracing::info!("Playback finished: {}", path.display()),
                Err(e) => tracing::warn!("Playback failed for {}: {}", path.display(), e),
            }
        });
    }

    /// Number of playback tasks not yet reaped.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Abort every outstanding playback and wait for the aborts to land.
    pub async fn shutdown(&mut self) {
        if !self.tasks.is_empty() {
            tracing::info!("Stopping {} playback task(s)", self.tasks.len());
        }
        self.tasks.shutdown().await;
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result
                && e.is_panic()
            {
                tracing::warn!("Playback task panicked: {}", e);
            }
        }
    }
}
