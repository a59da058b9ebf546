use std::fs;
use std::path::{Path, PathBuf};

/// Extensions the external player is expected to handle.
const VIDEO_EXTS: [&str; 5] = ["mp4", "m4v", "mov", "avi", "mkv"];

/// Scan `video_dir` for playable files, sorted by file name so the pairing
/// with switch pins is stable across runs.
pub fn scan_video_files(video_dir: &Path) -> Result<Vec<PathBuf>, String> {
    if !video_dir.exists() {
        return Err(format!(
            "Video directory does not exist: {}",
            video_dir.display()
        ));
    }

    let mut files = Vec::new();

    for entry in fs::read_dir(video_dir).map_err(|e| e.to_string())? {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if VIDEO_EXTS.iter().any(|v| ext.eq_ignore_ascii_case(v)) {
                files.push(path);
            }
        }
    }

    files.sort();

    Ok(files)
}
