//! yt-dlp based media source.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::config::SourceConfig;
use super::error::SourceError;
use super::traits::MediaSource;
use super::types::{CollectionInfo, CollectionItem, ItemInfo, UrlKind};
use crate::progress::ProgressReporter;
use crate::segment::{parse_description_markers, Marker};

static DOWNLOAD_PERCENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").expect("download progress pattern is valid")
});

/// Media source backed by the `yt-dlp` command line tool.
pub struct YtDlpSource {
    config: SourceConfig,
}

/// Item metadata as printed by `--dump-single-json`.
#[derive(Debug, Deserialize)]
struct VideoJson {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    chapters: Option<Vec<ChapterJson>>,
}

#[derive(Debug, Deserialize)]
struct ChapterJson {
    start_time: f64,
    #[serde(default)]
    title: Option<String>,
}

/// Collection metadata as printed by `--flat-playlist --dump-single-json`.
#[derive(Debug, Deserialize)]
struct PlaylistJson {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    playlist_count: Option<usize>,
}

impl VideoJson {
    fn into_item_info(self) -> ItemInfo {
        let url = self
            .webpage_url
            .or(self.url)
            .unwrap_or_else(|| self.id.clone());
        let title = self.title.unwrap_or_else(|| self.id.clone());
        let mut info = ItemInfo::new(self.id, title, url);
        info.duration = self
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(Duration::from_secs_f64);
        info.thumbnail_url = self.thumbnail;
        info
    }
}

/// Where a lazy collection enumeration stands.
enum Enumeration {
    Pending,
    Reading {
        child: Child,
        lines: Lines<BufReader<ChildStdout>>,
        position: usize,
    },
    Done,
}

impl YtDlpSource {
    /// Creates a new yt-dlp source with the given configuration.
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    /// Creates a source with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SourceConfig::default())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.ytdlp_path);
        cmd.args(&self.config.extra_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> SourceError {
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceError::ToolNotFound {
                path: self.config.ytdlp_path.clone(),
            }
        } else {
            SourceError::Io(e)
        }
    }

    /// Runs yt-dlp to completion and returns its stdout.
    async fn run_json(&self, args: &[&str], url: &str) -> Result<String, SourceError> {
        let mut cmd = self.command();
        cmd.args(args).arg(url);

        debug!(url = %url, args = ?args, "Running yt-dlp");

        let timeout_secs = self.config.metadata_timeout_secs;
        let output = timeout(Duration::from_secs(timeout_secs), cmd.output())
            .await
            .map_err(|_| SourceError::Timeout { timeout_secs })?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(classify_failure(None, output.status.code(), stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn fetch_video(&self, url: &str) -> Result<VideoJson, SourceError> {
        let stdout = self
            .run_json(&["--dump-single-json", "--no-playlist", "--no-warnings"], url)
            .await?;
        serde_json::from_str(&stdout)
            .map_err(|e| SourceError::parse(format!("Invalid item metadata: {}", e)))
    }

    fn spawn_enumeration(
        &self,
        url: &str,
    ) -> Result<(Child, Lines<BufReader<ChildStdout>>), SourceError> {
        let mut child = self
            .command()
            .args(["--flat-playlist", "--dump-json", "--no-warnings"])
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::command_failed("yt-dlp stdout not captured", None))?;

        Ok((child, BufReader::new(stdout).lines()))
    }

    async fn next_entry(
        collection: &CollectionInfo,
        mut child: Child,
        mut lines: Lines<BufReader<ChildStdout>>,
        position: usize,
    ) -> Option<(Result<CollectionItem, SourceError>, Enumeration)> {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let item = parse_entry(line).map(|info| CollectionItem {
                        info,
                        collection_id: collection.id.clone(),
                        position,
                    });
                    return match item {
                        Ok(item) => Some((
                            Ok(item),
                            Enumeration::Reading {
                                child,
                                lines,
                                position: position + 1,
                            },
                        )),
                        Err(e) => Some((Err(e), Enumeration::Done)),
                    };
                }
                Ok(None) => {
                    return match child.wait().await {
                        Ok(status) if status.success() => None,
                        Ok(status) => Some((
                            Err(SourceError::command_failed(
                                format!("Enumeration exited with code: {:?}", status.code()),
                                None,
                            )),
                            Enumeration::Done,
                        )),
                        Err(e) => Some((Err(SourceError::Io(e)), Enumeration::Done)),
                    };
                }
                Err(e) => return Some((Err(SourceError::Io(e)), Enumeration::Done)),
            }
        }
    }
}

/// Maps a failed yt-dlp run to the matching error.
fn classify_failure(item_id: Option<&str>, code: Option<i32>, stderr: String) -> SourceError {
    if stderr.contains("Requested format is not available") {
        return SourceError::NoAudioStream {
            item_id: item_id.unwrap_or("unknown").to_string(),
        };
    }

    let unavailable = [
        "Video unavailable",
        "Private video",
        "This video has been removed",
        "does not exist",
        "HTTP Error 404",
    ];
    if let Some(line) = stderr
        .lines()
        .find(|line| unavailable.iter().any(|marker| line.contains(marker)))
    {
        return SourceError::unavailable(line.trim().trim_start_matches("ERROR: ").to_string());
    }

    SourceError::command_failed(
        format!("yt-dlp exited with code: {:?}", code),
        if stderr.is_empty() { None } else { Some(stderr) },
    )
}

/// Parses one line of `--flat-playlist --dump-json` output.
fn parse_entry(line: &str) -> Result<ItemInfo, SourceError> {
    let video: VideoJson = serde_json::from_str(line)
        .map_err(|e| SourceError::parse(format!("Invalid collection entry: {}", e)))?;
    Ok(video.into_item_info())
}

/// Parses a `[download]  42.0% of ...` line into a fraction.
fn parse_download_progress(line: &str) -> Option<f64> {
    let caps = DOWNLOAD_PERCENT.captures(line.trim())?;
    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some((percent / 100.0).clamp(0.0, 1.0))
}

/// Turns chapters into markers, falling back to description timestamps.
fn markers_from_video(video: &VideoJson) -> Vec<Marker> {
    if let Some(chapters) = video.chapters.as_ref().filter(|c| !c.is_empty()) {
        return chapters
            .iter()
            .map(|c| {
                Marker::new(
                    c.title.clone().unwrap_or_default(),
                    (c.start_time.max(0.0) * 1000.0).round() as u64,
                )
            })
            .collect();
    }

    video
        .description
        .as_deref()
        .map(parse_description_markers)
        .unwrap_or_default()
}

/// Finds the file yt-dlp left in an otherwise empty download directory.
async fn find_downloaded_file(dir: &Path) -> Result<Option<PathBuf>, std::io::Error> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let partial = path
            .extension()
            .map(|ext| ext == "part" || ext == "ytdl")
            .unwrap_or(false);
        if entry.file_type().await?.is_file() && !partial {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[async_trait]
impl MediaSource for YtDlpSource {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    fn classify(&self, url: &str) -> UrlKind {
        classify_url(url)
    }

    async fn item_info(&self, url: &str) -> Result<ItemInfo, SourceError> {
        Ok(self.fetch_video(url).await?.into_item_info())
    }

    async fn collection_info(&self, url: &str) -> Result<CollectionInfo, SourceError> {
        let stdout = self
            .run_json(
                &["--flat-playlist", "--dump-single-json", "--no-warnings"],
                url,
            )
            .await?;
        let playlist: PlaylistJson = serde_json::from_str(&stdout)
            .map_err(|e| SourceError::parse(format!("Invalid collection metadata: {}", e)))?;

        let title = playlist.title.unwrap_or_else(|| playlist.id.clone());
        let mut info = CollectionInfo::new(
            playlist.id,
            title,
            playlist.webpage_url.unwrap_or_else(|| url.to_string()),
        );
        info.item_count = playlist.playlist_count;
        Ok(info)
    }

    fn collection_items<'a>(
        &'a self,
        collection: &'a CollectionInfo,
    ) -> BoxStream<'a, Result<CollectionItem, SourceError>> {
        stream::unfold(Enumeration::Pending, move |state| async move {
            match state {
                Enumeration::Pending => match self.spawn_enumeration(&collection.url) {
                    Ok((child, lines)) => Self::next_entry(collection, child, lines, 1).await,
                    Err(e) => Some((Err(e), Enumeration::Done)),
                },
                Enumeration::Reading {
                    child,
                    lines,
                    position,
                } => Self::next_entry(collection, child, lines, position).await,
                Enumeration::Done => None,
            }
        })
        .boxed()
    }

    async fn download(
        &self,
        item: &ItemInfo,
        dest_dir: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, SourceError> {
        let template = dest_dir.join(format!("{}.%(ext)s", item.id));

        let mut child = self
            .command()
            .args([
                "-f",
                self.config.format_selector.as_str(),
                "--no-playlist",
                "--no-part",
                "--newline",
                "--no-warnings",
                "-o",
            ])
            .arg(&template)
            .arg(&item.url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::command_failed("yt-dlp stdout not captured", None))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SourceError::command_failed("yt-dlp stderr not captured", None))?;

        debug!(item_id = %item.id, dest = %dest_dir.display(), "Starting download");

        let timeout_secs = self.config.download_timeout_secs;
        let result = timeout(Duration::from_secs(timeout_secs), async {
            let read_progress = async {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    if let Some(fraction) = parse_download_progress(&line) {
                        progress.report(fraction);
                    }
                }
                Ok::<(), std::io::Error>(())
            };
            let read_errors = async {
                let mut buf = String::new();
                stderr.read_to_string(&mut buf).await?;
                Ok::<String, std::io::Error>(buf)
            };

            let (progress_result, stderr_result) = tokio::join!(read_progress, read_errors);
            progress_result?;
            let error_output = stderr_result?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, error_output))
        })
        .await;

        let (status, error_output) = match result {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => return Err(SourceError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(SourceError::Timeout { timeout_secs });
            }
        };

        if !status.success() {
            return Err(classify_failure(Some(&item.id), status.code(), error_output));
        }

        match find_downloaded_file(dest_dir).await? {
            Some(path) => {
                progress.report(1.0);
                Ok(path)
            }
            None => {
                warn!(item_id = %item.id, "yt-dlp succeeded but produced no file");
                Err(SourceError::NoAudioStream {
                    item_id: item.id.clone(),
                })
            }
        }
    }

    async fn markers(&self, item: &ItemInfo) -> Result<Vec<Marker>, SourceError> {
        let video = self
            .fetch_video(&item.url)
            .await
            .map_err(|e| SourceError::MarkersUnavailable {
                reason: e.to_string(),
            })?;
        Ok(markers_from_video(&video))
    }

    async fn validate(&self) -> Result<(), SourceError> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(SourceError::command_failed(
                "yt-dlp --version failed",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }
        Ok(())
    }
}

/// Classifies video-site URLs by their shape.
///
/// A `list=` parameter marks a collection; a `v=` parameter, a short link or
/// a shorts path marks an item.
pub fn classify_url(url: &str) -> UrlKind {
    let url = url.trim();
    let rest = match url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return UrlKind::Unsupported,
    };

    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    let host = host.trim_start_matches("www.").trim_start_matches("m.");
    let query = path.split_once('?').map(|(_, q)| q).unwrap_or("");
    let has_param = |name: &str| {
        query.split('&').any(|pair| match pair.split_once('=') {
            Some((key, value)) => key == name && !value.is_empty(),
            None => false,
        })
    };

    match host {
        "youtube.com" | "music.youtube.com" => {
            if path.starts_with("playlist") && has_param("list") {
                UrlKind::Collection
            } else if path.starts_with("watch") && has_param("v") {
                UrlKind::Item
            } else if path.starts_with("watch") && has_param("list") {
                UrlKind::Collection
            } else if path.starts_with("shorts/") && path.len() > "shorts/".len() {
                UrlKind::Item
            } else {
                UrlKind::Unsupported
            }
        }
        "youtu.be" if !path.is_empty() => UrlKind::Item,
        _ => UrlKind::Unsupported,
    }
}
