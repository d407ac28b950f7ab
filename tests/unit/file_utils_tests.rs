/*!
 * Tests for clip inventory and file utilities
 */

use anyhow::Result;
use dubwai::errors::{CountMismatchWarning, InventoryError};
use dubwai::file_utils::{ClipInventory, FileManager};
use crate::common;

#[test]
fn test_scan_withUnsortedFiles_shouldSortNumerically() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_clips(dir.path(), &[10, 2, 1])?;
    common::create_test_file(dir.path(), "notes.txt", "ignore me")?;
    common::create_test_file(dir.path(), "translated_audio_3.mp3", "wrong extension")?;

    let inventory = ClipInventory::new("translated_audio_", "wav")?;
    let clips = inventory.scan(dir.path())?;

    let numbers: Vec<u64> = clips.iter().map(|c| c.index).collect();
    assert_eq!(numbers, vec![1, 2, 10]);
    assert!(clips.iter().all(|c| c.loudness().is_none()));
    Ok(())
}

#[test]
fn test_scan_withMissingDirectory_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let inventory = ClipInventory::new("translated_audio_", "wav")?;
    let err = inventory.scan(dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, InventoryError::MissingDirectory(_)));
    Ok(())
}

#[test]
fn test_scan_for_cues_withFewerClips_shouldReportMismatch() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_clips(dir.path(), &[1, 2])?;

    let inventory = ClipInventory::new("translated_audio_", "wav")?;
    let report = inventory.scan_for_cues(dir.path(), 3)?;

    assert_eq!(report.clips.len(), 2);
    let mismatch = report.mismatch.expect("mismatch should be reported");
    assert_eq!(mismatch, CountMismatchWarning { clips: 2, cues: 3 });
    assert_eq!(mismatch.overlap(), 2);
    Ok(())
}

#[test]
fn test_scan_for_cues_withMatchingCounts_shouldNotWarn() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_clips(dir.path(), &[1, 2, 3])?;

    let inventory = ClipInventory::new("translated_audio_", "wav")?;
    assert!(inventory.scan_for_cues(dir.path(), 3)?.mismatch.is_none());
    Ok(())
}

#[test]
fn test_scan_withEmptyDirectory_shouldReturnNoClips() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let inventory = ClipInventory::new("translated_audio_", "wav")?;
    assert!(inventory.scan(dir.path())?.is_empty());
    Ok(())
}

#[test]
fn test_ensure_dir_withNestedPath_shouldCreateIt() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let nested = dir.path().join("a").join("b");
    FileManager::ensure_dir(&nested)?;
    assert!(FileManager::dir_exists(&nested));
    assert!(!FileManager::file_exists(&nested));
    Ok(())
}
