//! ffmpeg subprocess control.
//!
//! A [`Transcoder`] owns one ffmpeg child process writing the transcoded
//! stream to its stdout. The child is spawned with `kill_on_drop`, so
//! dropping the transcoder kills it whatever state the reads are in.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use bytes::Bytes;
use strum_macros::AsRefStr;
use thiserror::Error;
use tokio::{
    io::AsyncReadExt as _,
    process::{Child, ChildStdout, Command},
    runtime::Handle,
    sync::Mutex,
};
use tonearm_media::{Codec, TranscodeOutputFormat, TranscodeParameters};

static NEXT_DEBUG_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Cannot access file {path}: {reason}")]
    FileAccess { path: PathBuf, reason: String },
    #[error("Cannot execute '{path}': {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Transcoder process has no stdout")]
    MissingStdout,
    #[error("A read is already in progress")]
    ReadInProgress,
    #[error("Transcoder is not running")]
    NotRunning,
    #[error(transparent)]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, AsRefStr)]
pub enum TranscoderState {
    Idle,
    Starting,
    Running,
    Finished,
    Aborted,
}

const fn ffmpeg_container(format: TranscodeOutputFormat) -> &'static str {
    match format {
        TranscodeOutputFormat::Flac => "flac",
        TranscodeOutputFormat::OggOpus | TranscodeOutputFormat::OggVorbis => "ogg",
        TranscodeOutputFormat::Mp3 => "mp3",
    }
}

const fn ffmpeg_codec(format: TranscodeOutputFormat) -> &'static str {
    match format {
        TranscodeOutputFormat::Mp3 => "libmp3lame",
        TranscodeOutputFormat::OggOpus => "libopus",
        TranscodeOutputFormat::OggVorbis => "libvorbis",
        TranscodeOutputFormat::Flac => "flac",
    }
}

/// Command line arguments passed to ffmpeg, without the program name.
#[must_use]
pub fn ffmpeg_arguments(params: &TranscodeParameters) -> Vec<String> {
    let input = &params.input;
    let output = &params.output;

    let mut args = vec![
        "-loglevel".to_string(),
        "quiet".to_string(),
        "-nostdin".to_string(),
        "-ss".to_string(),
        format!(
            "{}.{:03}",
            input.offset.as_secs(),
            input.offset.subsec_millis()
        ),
        "-i".to_string(),
        input.file_path.to_string_lossy().into_owned(),
    ];

    if output.strip_metadata {
        args.extend(["-map_metadata".to_string(), "-1".to_string()]);
    }

    // Covers are video streams
    args.push("-vn".to_string());

    if let Some(bitrate) = output.bitrate {
        args.extend(["-b:a".to_string(), bitrate.to_string()]);
    }
    if let Some(channel_count) = output.channel_count {
        args.extend(["-ac".to_string(), channel_count.to_string()]);
    }
    if let Some(sample_rate) = output.sample_rate {
        args.extend(["-ar".to_string(), sample_rate.to_string()]);
    }

    if let Some(format) = output.format {
        if format.codec() == Codec::Flac
            && let Some(bits_per_sample) = output.bits_per_sample
        {
            let sample_format = if bits_per_sample <= 16 { "s16" } else { "s32" };
            args.extend(["-sample_fmt".to_string(), sample_format.to_string()]);
        }

        args.extend([
            "-f".to_string(),
            ffmpeg_container(format).to_string(),
            "-acodec".to_string(),
            ffmpeg_codec(format).to_string(),
        ]);
    }

    args.push("pipe:1".to_string());

    args
}

fn check_input_file(path: &Path) -> Result<(), TranscodeError> {
    let metadata = std::fs::metadata(path).map_err(|e| TranscodeError::FileAccess {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !metadata.is_file() {
        return Err(TranscodeError::FileAccess {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    Ok(())
}

pub struct Transcoder {
    debug_id: usize,
    ffmpeg_path: PathBuf,
    params: TranscodeParameters,
    state: TranscoderState,
    child: Option<Child>,
    stdout: Option<Arc<Mutex<ChildStdout>>>,
    handle: Option<Handle>,
    eof: Arc<AtomicBool>,
}

impl std::fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcoder")
            .field("debug_id", &self.debug_id)
            .field("file", &self.params.input.file_path)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Transcoder {
    #[must_use]
    pub fn new(ffmpeg_path: impl Into<PathBuf>, params: TranscodeParameters) -> Self {
        Self {
            debug_id: NEXT_DEBUG_ID.fetch_add(1, Ordering::Relaxed),
            ffmpeg_path: ffmpeg_path.into(),
            params,
            state: TranscoderState::Idle,
            child: None,
            stdout: None,
            handle: None,
            eof: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates and runs a transcoder.
    ///
    /// # Errors
    ///
    /// * If the input file does not exist or is not a regular file
    /// * If ffmpeg cannot be spawned
    /// * If called outside of a tokio runtime
    pub fn start(
        ffmpeg_path: impl Into<PathBuf>,
        params: TranscodeParameters,
    ) -> Result<Self, TranscodeError> {
        let mut transcoder = Self::new(ffmpeg_path, params);
        transcoder.run()?;
        Ok(transcoder)
    }

    /// Spawns the ffmpeg process.
    ///
    /// # Errors
    ///
    /// * If the input file does not exist or is not a regular file
    /// * If ffmpeg cannot be spawned
    /// * If called outside of a tokio runtime
    pub fn run(&mut self) -> Result<(), TranscodeError> {
        if self.state != TranscoderState::Idle {
            log::debug!("[{}] run: already {}", self.debug_id, self.state.as_ref());
            return Ok(());
        }

        let handle = Handle::try_current()?;
        self.state = TranscoderState::Starting;

        let file_path = &self.params.input.file_path;
        if let Err(e) = check_input_file(file_path) {
            self.state = TranscoderState::Idle;
            return Err(e);
        }

        log::info!("[{}] Transcoding file {}", self.debug_id, file_path.display());

        let args = ffmpeg_arguments(&self.params);
        log::debug!(
            "[{}] Running {} with {} args: {args:?}",
            self.debug_id,
            self.ffmpeg_path.display(),
            args.len()
        );

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                self.state = TranscoderState::Idle;
                TranscodeError::Spawn {
                    path: self.ffmpeg_path.clone(),
                    source,
                }
            })?;

        let Some(stdout) = child.stdout.take() else {
            self.state = TranscoderState::Idle;
            return Err(TranscodeError::MissingStdout);
        };

        self.child = Some(child);
        self.stdout = Some(Arc::new(Mutex::new(stdout)));
        self.handle = Some(handle);
        self.state = TranscoderState::Running;

        Ok(())
    }

    #[must_use]
    pub const fn debug_id(&self) -> usize {
        self.debug_id
    }

    #[must_use]
    pub const fn parameters(&self) -> &TranscodeParameters {
        &self.params
    }

    pub fn state(&mut self) -> TranscoderState {
        if self.state == TranscoderState::Running && self.finished() {
            self.state = TranscoderState::Finished;
        }
        self.state
    }

    #[must_use]
    pub fn output_mime_type(&self) -> &'static str {
        self.params.output_mime_type()
    }

    fn stdout(&self) -> Result<&Arc<Mutex<ChildStdout>>, TranscodeError> {
        match self.state {
            TranscoderState::Running | TranscoderState::Finished => {
                self.stdout.as_ref().ok_or(TranscodeError::MissingStdout)
            }
            TranscoderState::Idle | TranscoderState::Starting | TranscoderState::Aborted => {
                Err(TranscodeError::NotRunning)
            }
        }
    }

    /// Reads the next transcoded bytes into `buf`. `Ok(0)` is end of stream.
    ///
    /// # Errors
    ///
    /// * If the transcoder is not running
    /// * If an [`async_read`](Self::async_read) is still in flight
    /// * If reading from the process fails
    pub async fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, TranscodeError> {
        let stdout = self.stdout()?;
        let mut stdout = stdout
            .try_lock()
            .map_err(|_| TranscodeError::ReadInProgress)?;

        let count = stdout.read(buf).await?;
        if count == 0 && !buf.is_empty() {
            log::debug!("[{}] read_some: end of stream", self.debug_id);
            self.eof.store(true, Ordering::SeqCst);
        }

        Ok(count)
    }

    /// Blocking variant of [`read_some`](Self::read_some) for threads that
    /// are not driven by the tokio runtime.
    ///
    /// # Errors
    ///
    /// * If the transcoder is not running
    /// * If an [`async_read`](Self::async_read) is still in flight
    /// * If reading from the process fails
    ///
    /// # Panics
    ///
    /// * If called from within an async context
    pub fn read_some_blocking(&mut self, buf: &mut [u8]) -> Result<usize, TranscodeError> {
        let handle = self.handle.clone().ok_or(TranscodeError::NotRunning)?;
        handle.block_on(self.read_some(buf))
    }

    /// Posts a read of up to `max` bytes onto the runtime and hands the result
    /// to `callback`. An empty buffer means end of stream.
    ///
    /// # Errors
    ///
    /// * If the transcoder is not running
    /// * If another read is still in flight
    pub fn async_read(
        &self,
        max: usize,
        callback: impl FnOnce(Result<Bytes, TranscodeError>) + Send + 'static,
    ) -> Result<(), TranscodeError> {
        let handle = self.handle.as_ref().ok_or(TranscodeError::NotRunning)?;
        let mut stdout = self
            .stdout()?
            .clone()
            .try_lock_owned()
            .map_err(|_| TranscodeError::ReadInProgress)?;
        let eof = self.eof.clone();
        let debug_id = self.debug_id;

        handle.spawn(async move {
            let mut buf = vec![0_u8; max];
            let result = stdout.read(&mut buf).await.map(|count| {
                if count == 0 && max > 0 {
                    log::debug!("[{debug_id}] async_read: end of stream");
                    eof.store(true, Ordering::SeqCst);
                }
                buf.truncate(count);
                Bytes::from(buf)
            });
            drop(stdout);

            callback(result.map_err(TranscodeError::from));
        });

        Ok(())
    }

    /// Whether the whole output was read or the process exited.
    pub fn finished(&mut self) -> bool {
        if self.eof.load(Ordering::SeqCst) {
            return true;
        }

        self.child
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(Some(_))))
    }

    /// Kills the process. Pending reads complete with end of stream or an
    /// error.
    pub fn abort(&mut self) {
        if let Some(child) = self.child.as_mut() {
            log::debug!("[{}] abort", self.debug_id);
            if let Err(e) = child.start_kill() {
                log::warn!("[{}] Failed to kill transcoder process: {e:?}", self.debug_id);
            }
        }
        self.state = TranscoderState::Aborted;
    }
}
