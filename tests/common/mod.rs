use std::path::Path;

/// Counts regular files in a folder tree.
#[allow(dead_code)]
pub fn file_count(folder: &Path) -> usize {
    let Ok(read_dir) = std::fs::read_dir(folder) else {
        return 0;
    };

    read_dir
        .filter_map(Result::ok)
        .map(|entry| {
            if entry.path().is_dir() {
                file_count(&entry.path())
            } else {
                1
            }
        })
        .sum()
}
