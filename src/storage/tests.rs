use super::*;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_parent_dirs() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("snap.rkyv");

    write_atomic(&path, b"payload").unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"payload");
    assert!(!temp_path(&path).exists(), "temp file should be renamed away");
}

#[test]
fn test_write_atomic_overwrites_previous_contents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snap.rkyv");

    write_atomic(&path, b"first").unwrap();
    write_atomic(&path, b"second").unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"second");
}

#[test]
fn test_stale_temp_file_does_not_affect_target() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snap.rkyv");
    write_atomic(&path, b"good").unwrap();

    // A crash between create and rename leaves only the temp file behind.
    fs::write(temp_path(&path), b"half-writ").unwrap();

    let read = read_aligned(&path).unwrap().unwrap();
    assert_eq!(read.as_slice(), b"good");
}

#[test]
fn test_read_aligned_missing_is_none() {
    let temp = TempDir::new().unwrap();
    assert!(read_aligned(&temp.path().join("absent.rkyv")).unwrap().is_none());
}

#[test]
fn test_read_aligned_is_aligned() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("snap.rkyv");
    write_atomic(&path, &[7u8; 33]).unwrap();

    let read = read_aligned(&path).unwrap().unwrap();
    assert_eq!(read.as_ptr() as usize % RKYV_ALIGNMENT, 0);
    assert_eq!(read.len(), 33);
}

#[test]
fn test_temp_path_appends_suffix() {
    assert_eq!(
        temp_path(Path::new("/a/b/scores.rkyv")),
        PathBuf::from("/a/b/scores.rkyv.tmp")
    );
}
