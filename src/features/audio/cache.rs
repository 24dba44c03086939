//! # Feature: Audio Clip Cache
//!
//! Pre-loads DCA encoded clips into memory at startup. Clips are loaded into an
//! [`AudioCacheLoader`] and then published as an immutable [`AudioCache`]
//! snapshot that any number of command tasks can read without locking.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Publish clips as an immutable snapshot instead of a mutex-guarded map
//! - 1.0.0: Initial release with DCA frame loading

use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to read audio file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed DCA frame at byte {offset} in {path}")]
    MalformedFrame { path: PathBuf, offset: usize },

    #[error("no audio clip named '{0}'")]
    NotFound(String),
}

/// An in-memory clip: ordered opus frames exactly as stored in the DCA file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    frames: Vec<Vec<u8>>,
}

impl AudioClip {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }
}

/// Split a DCA stream into frames.
///
/// Each frame is a little-endian `i16` length followed by that many bytes.
/// End of input, including a dangling half header, ends the clip.
pub fn parse_dca(data: &[u8], path: &Path) -> Result<AudioClip, AudioError> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while data.len() - offset >= 2 {
        let len = i16::from_le_bytes([data[offset], data[offset + 1]]);
        if len < 0 {
            return Err(AudioError::MalformedFrame {
                path: path.to_path_buf(),
                offset,
            });
        }

        let start = offset + 2;
        let end = start + len as usize;
        if end > data.len() {
            return Err(AudioError::MalformedFrame {
                path: path.to_path_buf(),
                offset,
            });
        }

        frames.push(data[start..end].to_vec());
        offset = end;
    }

    Ok(AudioClip::new(frames))
}

/// Mutable staging area used only during startup
#[derive(Debug, Default)]
pub struct AudioCacheLoader {
    clips: HashMap<String, Arc<AudioClip>>,
}

impl AudioCacheLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `name -> file` entry from `directory`, in name order.
    ///
    /// Stops at the first failure; clips loaded before it stay in the loader.
    pub async fn load_all(
        &mut self,
        directory: &Path,
        files: &BTreeMap<String, String>,
    ) -> Result<(), AudioError> {
        for (name, file) in files {
            let path = directory.join(file);
            debug!("Loading audio file {} as '{name}' into memory", path.display());

            let data = fs::read(&path).await.map_err(|source| AudioError::Io {
                path: path.clone(),
                source,
            })?;
            let clip = parse_dca(&data, &path)?;
            debug!("Loaded '{name}': {} frames, {} bytes", clip.frame_count(), clip.total_bytes());

            self.clips.insert(name.clone(), Arc::new(clip));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Freeze the loaded clips into a shareable read-only cache
    pub fn publish(self) -> AudioCache {
        info!("🔊 Audio cache ready with {} clips", self.clips.len());
        AudioCache {
            clips: Arc::new(self.clips),
        }
    }
}

/// Read-only clip cache, cheap to clone into every command task.
///
/// There is no mutation path; [`with_clip`](Self::with_clip) builds a new
/// snapshot and leaves existing readers untouched.
#[derive(Debug, Clone, Default)]
pub struct AudioCache {
    clips: Arc<HashMap<String, Arc<AudioClip>>>,
}

impl AudioCache {
    pub fn get(&self, name: &str) -> Result<Arc<AudioClip>, AudioError> {
        self.clips
            .get(name)
            .cloned()
            .ok_or_else(|| AudioError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    /// Clip names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clips.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Copy-on-write insert returning a new snapshot
    pub fn with_clip(&self, name: &str, clip: AudioClip) -> AudioCache {
        let mut clips = (*self.clips).clone();
        clips.insert(name.to_string(), Arc::new(clip));
        AudioCache {
            clips: Arc::new(clips),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dca(frames: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for frame in frames {
            out.extend_from_slice(&(frame.len() as i16).to_le_bytes());
            out.extend_from_slice(frame);
        }
        out
    }

    fn mapping(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(n, f)| (n.to_string(), f.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_dca_frames() {
        let data = dca(&[b"abc", b"", b"defgh"]);
        let clip = parse_dca(&data, Path::new("x.dca")).unwrap();
        assert_eq!(clip.frames(), &[b"abc".to_vec(), vec![], b"defgh".to_vec()]);
        assert_eq!(clip.total_bytes(), 8);
    }

    #[test]
    fn test_parse_dca_ignores_dangling_header_byte() {
        let mut data = dca(&[b"abc"]);
        data.push(0x05);
        let clip = parse_dca(&data, Path::new("x.dca")).unwrap();
        assert_eq!(clip.frame_count(), 1);
    }

    #[test]
    fn test_parse_dca_rejects_truncated_frame() {
        let mut data = dca(&[b"abc"]);
        data.extend_from_slice(&10i16.to_le_bytes());
        data.extend_from_slice(b"short");
        assert!(matches!(
            parse_dca(&data, Path::new("x.dca")),
            Err(AudioError::MalformedFrame { offset: 5, .. })
        ));
    }

    #[test]
    fn test_parse_dca_rejects_negative_length() {
        let data = (-1i16).to_le_bytes().to_vec();
        assert!(matches!(
            parse_dca(&data, Path::new("x.dca")),
            Err(AudioError::MalformedFrame { offset: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_load_all_then_get_exactly_loaded_names() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("horn.dca"), dca(&[b"toot", b"toot"])).unwrap();
        std::fs::write(dir.path().join("bell.dca"), dca(&[b"ding"])).unwrap();

        let mut loader = AudioCacheLoader::new();
        loader
            .load_all(dir.path(), &mapping(&[("horn", "horn.dca"), ("bell", "bell.dca")]))
            .await
            .unwrap();
        let cache = loader.publish();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("horn").unwrap().frame_count(), 2);
        assert_eq!(cache.get("bell").unwrap().frames(), &[b"ding".to_vec()]);
        assert!(matches!(cache.get("horn.dca"), Err(AudioError::NotFound(_))));
        assert!(matches!(cache.get("missing"), Err(AudioError::NotFound(_))));
        assert_eq!(cache.names(), vec!["bell", "horn"]);
    }

    #[tokio::test]
    async fn test_load_all_stops_at_first_failure_keeping_loaded() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.dca"), dca(&[b"a"])).unwrap();
        std::fs::write(dir.path().join("c.dca"), dca(&[b"c"])).unwrap();

        let mut loader = AudioCacheLoader::new();
        let err = loader
            .load_all(
                dir.path(),
                &mapping(&[("a", "a.dca"), ("b", "missing.dca"), ("c", "c.dca")]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AudioError::Io { .. }));
        assert_eq!(loader.len(), 1);
        let cache = loader.publish();
        assert!(cache.contains("a"));
        assert!(!cache.contains("c"));
    }

    #[tokio::test]
    async fn test_concurrent_reads_see_same_content() {
        let frames: Vec<Vec<u8>> = (0..64u8).map(|i| vec![i; 32]).collect();
        let cache = AudioCache::default().with_clip("horn", AudioClip::new(frames.clone()));

        let mut handles = Vec::new();
        for _ in 0..64 {
            let cache = cache.clone();
            let expected = frames.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    let clip = cache.get("horn").unwrap();
                    assert_eq!(clip.frames(), expected.as_slice());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[test]
    fn test_with_clip_leaves_old_snapshot_untouched() {
        let old = AudioCache::default();
        let new = old.with_clip("horn", AudioClip::new(vec![vec![1]]));
        assert!(old.is_empty());
        assert!(new.contains("horn"));
    }
}
