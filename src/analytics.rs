//! File-type breakdown of a mounted drive or directory.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Images",
        &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp", ".ico", ".svg", ".raw", ".heic", ".psd"],
    ),
    (
        "Documents",
        &[
            ".pdf", ".doc", ".docx", ".txt", ".xls", ".xlsx", ".ppt", ".pptx", ".odt", ".rtf", ".csv", ".md",
            ".epub", ".log", ".tex",
        ],
    ),
    ("Audio", &[".mp3", ".wav", ".aac", ".flac", ".ogg", ".wma", ".m4a", ".midi", ".aiff"]),
    (
        "Video",
        &[".mp4", ".mkv", ".avi", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".3gp", ".mpeg", ".mpg"],
    ),
    (
        "Archives",
        &[".zip", ".rar", ".7z", ".tar", ".gz", ".iso", ".dmg", ".pkg", ".deb", ".rpm", ".cab"],
    ),
    (
        "Executables",
        &[".exe", ".msi", ".bat", ".sh", ".dll", ".bin", ".cmd", ".com", ".apk", ".jar"],
    ),
    (
        "Code",
        &[
            ".py", ".java", ".c", ".cpp", ".h", ".cs", ".js", ".ts", ".html", ".css", ".php", ".rb", ".go", ".rs",
            ".swift", ".json", ".xml", ".yaml", ".yml", ".sql", ".vbs",
        ],
    ),
    ("Fonts", &[".ttf", ".otf", ".woff", ".woff2", ".eot"]),
    ("Disk Images", &[".img", ".vhd", ".vhdx", ".vmdk"]),
    ("Database", &[".db", ".sqlite", ".sqlite3", ".mdb", ".accdb"]),
];

pub const OTHERS: &str = "Others";

pub fn category_for(extension: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(_, exts)| exts.contains(&extension))
        .map(|(name, _)| *name)
        .unwrap_or(OTHERS)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionCount {
    pub extension: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    pub category: String,
    pub total_count: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub file_types: Vec<ExtensionCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub total_size_gb: f64,
    pub details: Vec<CategoryReport>,
}

#[derive(Default)]
struct Bucket {
    count: usize,
    size: u64,
    extensions: HashMap<String, usize>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Lower-cased extension with its dot, or empty for none.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Walks `root` and buckets every readable file by extension. Entries that
/// can't be read are skipped.
pub fn analyze_path(root: &Path) -> Result<AnalysisReport> {
    if !root.exists() {
        return Err(Error::NotFound(format!("path '{}'", root.display())));
    }
    tracing::info!(path = %root.display(), "starting drive analysis");

    let mut buckets: HashMap<&'static str, Bucket> = HashMap::new();
    let mut total_files = 0usize;
    let mut total_size = 0u64;

    for entry in WalkDir::new(root).into_iter() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let size = meta.len();
        let ext = extension_of(entry.path());

        total_files += 1;
        total_size += size;

        let bucket = buckets.entry(category_for(&ext)).or_default();
        bucket.count += 1;
        bucket.size += size;
        *bucket.extensions.entry(ext).or_insert(0) += 1;
    }

    let mut details: Vec<CategoryReport> = buckets
        .into_iter()
        .map(|(name, b)| {
            let mut file_types: Vec<ExtensionCount> = b
                .extensions
                .into_iter()
                .map(|(extension, count)| ExtensionCount { extension, count })
                .collect();
            file_types.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.extension.cmp(&b.extension)));
            CategoryReport {
                category: name.to_string(),
                total_count: b.count,
                total_size_bytes: b.size,
                total_size_mb: round2(b.size as f64 / (1024.0 * 1024.0)),
                file_types,
            }
        })
        .collect();
    details.sort_by(|a, b| b.total_count.cmp(&a.total_count).then_with(|| a.category.cmp(&b.category)));

    tracing::info!(files = total_files, bytes = total_size, "drive analysis complete");
    Ok(AnalysisReport {
        total_files,
        total_size_bytes: total_size,
        total_size_gb: round2(total_size as f64 / (1024.0 * 1024.0 * 1024.0)),
        details,
    })
}
