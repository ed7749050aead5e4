use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub fn create_test_project_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let file_path = dir.path().join(name);
    fs::write(&file_path, content).expect("Failed to write test file");
    file_path
}
