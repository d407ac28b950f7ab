/*!
 * Tests for cue parsing
 */

use anyhow::Result;
use dubwai::errors::SubtitleError;
use dubwai::subtitle_processor::{CueList, SubtitleCue};
use crate::common;

/// The reference cue list has a total duration of its latest end
#[test]
fn test_parse_withThreeCues_shouldComputeTotalDuration() -> Result<()> {
    let list = CueList::parse(common::THREE_CUES_SRT)?;

    assert_eq!(list.len(), 3);
    assert_eq!(list.total_duration(), 8.2);
    let starts: Vec<f64> = list.iter().map(|c| c.start).collect();
    assert_eq!(starts, vec![0.0, 2.5, 6.0]);
    Ok(())
}

/// Total duration is the maximum end even when the last cue ends earlier
#[test]
fn test_total_duration_withOverlappingCues_shouldUseMaximumEnd() -> Result<()> {
    let content = "1\n00:00:00,000 --> 00:00:09,000\nLong\n\n2\n00:00:01,000 --> 00:00:02,000\nShort\n";
    let list = CueList::parse(content)?;
    assert_eq!(list.total_duration(), 9.0);
    Ok(())
}

/// File order is kept even when cues are out of order
#[test]
fn test_parse_withOutOfOrderCues_shouldKeepFileOrder() -> Result<()> {
    let content = "2\n00:00:05,000 --> 00:00:06,000\nB\n\n1\n00:00:01,000 --> 00:00:02,000\nA\n";
    let list = CueList::parse(content)?;
    let indices: Vec<u64> = list.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![2, 1]);
    Ok(())
}

/// Any run of blank lines separates two entries
#[test]
fn test_parse_withSeveralBlankLinesBetweenEntries_shouldKeepEveryCue() -> Result<()> {
    for gap in ["\n\n", "\n\n\n", "\n\n\n\n", "\n \n\t\n\n"] {
        let content = format!(
            "1\n00:00:00,000 --> 00:00:02,000\nA{}2\n00:00:02,500 --> 00:00:05,000\nB\n",
            gap
        );
        let list = CueList::parse(&content)?;
        assert_eq!(list.len(), 2);
        assert_eq!(list.total_duration(), 5.0);
    }
    Ok(())
}

#[test]
fn test_parse_withMissingArrow_shouldFail() {
    let err = CueList::parse("1\n00:00:01,000 00:00:02,000\nText\n").unwrap_err();
    assert!(matches!(err, SubtitleError::MissingRangeSeparator { entry: 1, .. }));
}

#[test]
fn test_parse_withBadTimestamp_shouldFail() {
    let err = CueList::parse("1\n00:00:01 --> 00:00:02,000\nText\n").unwrap_err();
    assert!(matches!(err, SubtitleError::InvalidTimestamp { entry: 1, .. }));
}

#[test]
fn test_parse_withEndBeforeStart_shouldFail() {
    let err = CueList::parse("1\n00:00:03,000 --> 00:00:02,000\nText\n").unwrap_err();
    assert!(matches!(err, SubtitleError::InvalidRange { entry: 1, .. }));
}

#[test]
fn test_parse_withDuplicateIndex_shouldFail() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\nA\n\n1\n00:00:03,000 --> 00:00:04,000\nB\n";
    assert_eq!(CueList::parse(content).unwrap_err(), SubtitleError::DuplicateIndex { index: 1 });
}

#[test]
fn test_parse_withMissingText_shouldFail() {
    let err = CueList::parse("1\n00:00:01,000 --> 00:00:02,000\n").unwrap_err();
    assert!(matches!(err, SubtitleError::TooFewLines { entry: 1, lines: 2 }));
}

#[test]
fn test_parse_withEmptyInput_shouldFail() {
    assert_eq!(CueList::parse("  \n\n").unwrap_err(), SubtitleError::Empty);
}

/// Formatting a cue list and parsing it again gives the same timings
#[test]
fn test_display_withParsedList_shouldReparse() -> Result<()> {
    let list = CueList::parse(common::THREE_CUES_SRT)?;
    let again = CueList::parse(&list.to_string())?;
    assert_eq!(list.cues, again.cues);
    Ok(())
}

#[test]
fn test_from_file_withMissingFile_shouldFail() {
    assert!(CueList::from_file("/definitely/not/here.srt").is_err());
}

#[test]
fn test_start_ms_withReferenceCue_shouldRound() {
    let cue = SubtitleCue::new(2, 2.5, 5.0, "x");
    assert_eq!(cue.start_ms(), 2500);
    assert_eq!(cue.duration(), 2.5);
}
