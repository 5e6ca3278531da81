use std::fs;
use std::path::Path;

pub fn count_segment_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "db")
                .unwrap_or(false)
        })
        .count()
}

/// Total bytes across every segment file in `dir`.
pub fn total_segment_bytes(dir: &Path) -> u64 {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "db")
                .unwrap_or(false)
        })
        .map(|e| e.metadata().unwrap().len())
        .sum()
}
