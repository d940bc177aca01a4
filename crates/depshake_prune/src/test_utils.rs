use std::{
    fs,
    path::{Path, PathBuf},
};

pub(crate) fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
    let file_path = dir.join(path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&file_path, content).expect("Failed to write test file");
    file_path
}
