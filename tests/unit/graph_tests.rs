/*!
 * Tests for timeline assembly and mix graph construction
 */

use anyhow::Result;
use dubwai::app_config::MixingConfig;
use dubwai::mixing::background::BED_WEIGHT;
use dubwai::mixing::gain::{GainAdjustment, GainCalculator};
use dubwai::mixing::graph::MixGraph;
use dubwai::mixing::loudness::{AudioClip, Loudness, LoudnessSource};
use dubwai::mixing::timeline::TimelineAssembler;
use dubwai::subtitle_processor::CueList;
use crate::common;

fn reference_inputs() -> Result<(CueList, Vec<AudioClip>, Vec<GainAdjustment>)> {
    let cues = CueList::parse(common::THREE_CUES_SRT)?;
    let clips: Vec<AudioClip> = (1..=3)
        .map(|n| AudioClip::new(n, format!("translated_audio_{}.wav", n)))
        .collect();
    let calc = GainCalculator::new(-12.0);
    let gains = [-20.0, -40.0, -60.1]
        .iter()
        .zip(&clips)
        .map(|(db, clip)| calc.adjustment(clip.index, Loudness::new(*db, LoudnessSource::Rms)))
        .collect();
    Ok((cues, clips, gains))
}

#[test]
fn test_graph_withReferenceTimeline_shouldDescribeEveryStage() -> Result<()> {
    let (cues, clips, gains) = reference_inputs()?;
    let plan = TimelineAssembler::from_config(&MixingConfig::default()).assemble(&cues, &clips, &gains)?;
    let graph = MixGraph::from_plan(&plan);
    let text = graph.filter_complex();

    assert!(text.starts_with("aevalsrc=0:duration=8.2:sample_rate=44100:channel_layout=stereo[base];"));
    assert!(text.contains("[0:a]volume=2.511886,acompressor="));
    assert!(text.contains("[1:a]volume=10.000000,"));
    assert!(text.contains("[2:a]volume=1.000000,"));
    assert!(text.contains("adelay=2500|2500[clip1]"));
    assert!(text.contains("adelay=6000|6000[clip2]"));
    assert!(text.contains("[mix1][clip2]amix=inputs=2:duration=longest:normalize=0[mix2]"));
    assert_eq!(graph.output_label, "mix2");
    assert_eq!(graph.codec, "pcm_s16le");
    Ok(())
}

/// Merges happen one clip at a time in index order
#[test]
fn test_graph_withThreeClips_shouldMergeSequentially() -> Result<()> {
    let (cues, clips, gains) = reference_inputs()?;
    let plan = TimelineAssembler::from_config(&MixingConfig::default()).assemble(&cues, &clips, &gains)?;
    let text = MixGraph::from_plan(&plan).filter_complex();

    let base = text.find("[base][clip0]").expect("first merge");
    let second = text.find("[mix0][clip1]").expect("second merge");
    let third = text.find("[mix1][clip2]").expect("third merge");
    assert!(base < second && second < third);
    Ok(())
}

#[test]
fn test_graph_withSameInputs_shouldBeByteIdentical() -> Result<()> {
    let assembler = TimelineAssembler::from_config(&MixingConfig::default());

    let (cues, clips, gains) = reference_inputs()?;
    let first = MixGraph::from_plan(&assembler.assemble(&cues, &clips, &gains)?.with_background("bed.wav"));
    let (cues, clips, gains) = reference_inputs()?;
    let second = MixGraph::from_plan(&assembler.assemble(&cues, &clips, &gains)?.with_background("bed.wav"));

    assert_eq!(first.filter_complex(), second.filter_complex());
    assert_eq!(first.fingerprint(), second.fingerprint());
    Ok(())
}

/// The bed is trimmed to exactly the base track length
#[test]
fn test_background_withReferenceTimeline_shouldMatchBaseDuration() -> Result<()> {
    let (cues, clips, gains) = reference_inputs()?;
    let plan = TimelineAssembler::from_config(&MixingConfig::default())
        .assemble(&cues, &clips, &gains)?
        .with_background("bed.wav");

    let bed = plan.background.as_ref().expect("background attached");
    assert_eq!(bed.trim_duration, plan.base_duration);
    assert_eq!(bed.weights, (1.0, BED_WEIGHT));

    let text = MixGraph::from_plan(&plan).filter_complex();
    assert!(text.contains("[3:a]aloop=loop=-1:size=2e+09,atrim=duration=8.2,asetpts=PTS-STARTPTS,volume=0.5[bed]"));
    assert!(text.ends_with("[mix2][bed]amix=inputs=2:duration=longest:weights=1 0.3:normalize=0[out]"));
    Ok(())
}

#[test]
fn test_graph_withCompressionDisabled_shouldOmitCompressor() -> Result<()> {
    let (cues, clips, gains) = reference_inputs()?;
    let mixing = MixingConfig { compression: false, ..MixingConfig::default() };
    let plan = TimelineAssembler::from_config(&mixing).assemble(&cues, &clips, &gains)?;
    assert!(!MixGraph::from_plan(&plan).filter_complex().contains("acompressor"));
    Ok(())
}

#[test]
fn test_graph_withMonoLayout_shouldDelaySingleChannel() -> Result<()> {
    let (cues, clips, gains) = reference_inputs()?;
    let mixing = MixingConfig { channels: 1, ..MixingConfig::default() };
    let plan = TimelineAssembler::from_config(&mixing).assemble(&cues, &clips, &gains)?;
    let text = MixGraph::from_plan(&plan).filter_complex();
    assert!(text.contains("channel_layout=mono"));
    assert!(text.contains("adelay=2500[clip1]"));
    Ok(())
}
