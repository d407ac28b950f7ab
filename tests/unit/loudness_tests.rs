/*!
 * Tests for loudness analysis and gain calculation
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use dubwai::app_config::NormalizationMode;
use dubwai::engines::mock::StubStatistics;
use dubwai::mixing::gain::{GainCalculator, MAX_BOOST_DB};
use dubwai::mixing::loudness::{AudioClip, Loudness, LoudnessAnalyzer, LoudnessSource};

fn clips(names: &[&str]) -> Vec<AudioClip> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| AudioClip::new(i as u64 + 1, *name))
        .collect()
}

#[tokio::test]
async fn test_resolve_withRmsAvailable_shouldUseRms() {
    let stats = Arc::new(StubStatistics::new().with_rms("a.wav", vec![-20.0, -20.0]).with_peak("a.wav", -1.0));
    let analyzer = LoudnessAnalyzer::new(stats.clone(), NormalizationMode::Rms, 1);

    let loudness = analyzer.resolve("a.wav".as_ref()).await;
    assert_eq!(loudness, Loudness::new(-20.0, LoudnessSource::Rms));
    assert_eq!(stats.peak_calls(), 0);
}

#[tokio::test]
async fn test_resolve_withoutRms_shouldEstimateFromPeak() {
    let stats = Arc::new(StubStatistics::new().with_peak("a.wav", -10.0));
    let analyzer = LoudnessAnalyzer::new(stats, NormalizationMode::Rms, 1);

    let loudness = analyzer.resolve("a.wav".as_ref()).await;
    assert_eq!(loudness, Loudness::new(-16.0, LoudnessSource::PeakEstimate));
}

#[tokio::test]
async fn test_resolve_withNoStatistics_shouldFallBackToDefault() {
    let analyzer = LoudnessAnalyzer::new(Arc::new(StubStatistics::new()), NormalizationMode::Rms, 1);

    let loudness = analyzer.resolve("missing.wav".as_ref()).await;
    assert_eq!(loudness, Loudness::new(-20.0, LoudnessSource::Default));
}

#[tokio::test]
async fn test_resolve_withEmptyRmsReport_shouldTryPeak() {
    let stats = Arc::new(StubStatistics::new().with_rms("a.wav", Vec::new()).with_peak("a.wav", -3.0));
    let analyzer = LoudnessAnalyzer::new(stats, NormalizationMode::Rms, 1);

    assert_eq!(analyzer.resolve("a.wav".as_ref()).await.db, -9.0);
}

#[tokio::test]
async fn test_resolve_withPeakMode_shouldUsePeakWithoutOffset() {
    let stats = Arc::new(StubStatistics::new().with_rms("a.wav", vec![-30.0]).with_peak("a.wav", -4.0));
    let analyzer = LoudnessAnalyzer::new(stats.clone(), NormalizationMode::Peak, 1);

    assert_eq!(analyzer.resolve("a.wav".as_ref()).await, Loudness::new(-4.0, LoudnessSource::Peak));
    assert_eq!(stats.rms_calls(), 0);
}

/// Slow early clips must not change the order of the results
#[tokio::test]
async fn test_analyze_all_withUnevenDelays_shouldKeepClipOrder() {
    let stats = StubStatistics::new()
        .with_rms("1.wav", vec![-10.0])
        .with_rms("2.wav", vec![-20.0])
        .with_rms("3.wav", vec![-30.0])
        .with_rms("4.wav", vec![-40.0])
        .with_delay("1.wav", Duration::from_millis(60))
        .with_delay("2.wav", Duration::from_millis(30));
    let analyzer = LoudnessAnalyzer::new(Arc::new(stats), NormalizationMode::Rms, 4);
    let clips = clips(&["1.wav", "2.wav", "3.wav", "4.wav"]);

    let calls = AtomicUsize::new(0);
    let levels = analyzer
        .analyze_all(&clips, |done, total| {
            assert!(done <= total);
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    let dbs: Vec<f64> = levels.iter().map(|l| l.db).collect();
    assert_eq!(dbs, vec![-10.0, -20.0, -30.0, -40.0]);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_analyze_all_withPreMeasuredClip_shouldNotQueryAgain() {
    let stats = Arc::new(StubStatistics::new().with_rms("b.wav", vec![-15.0]));
    let analyzer = LoudnessAnalyzer::new(stats.clone(), NormalizationMode::Rms, 2);
    let clips = vec![
        AudioClip::with_loudness(1, "a.wav", Loudness::new(-25.0, LoudnessSource::Rms)),
        AudioClip::new(2, "b.wav"),
    ];

    let levels = analyzer.analyze_all(&clips, |_, _| {}).await;
    assert_eq!(levels[0].db, -25.0);
    assert_eq!(levels[1].db, -15.0);
    assert_eq!(stats.rms_calls(), 1);
}

/// Reference figures: -20 dB → 2.512, -40 dB → capped at 10.0, -60.1 dB → silent
#[test]
fn test_gain_withReferenceLoudness_shouldMatchExpectedMultipliers() {
    let calc = GainCalculator::new(-12.0);

    let first = calc.adjustment(1, Loudness::new(-20.0, LoudnessSource::Rms));
    assert!((first.multiplier - 2.512).abs() < 1e-3);

    let second = calc.adjustment(2, Loudness::new(-40.0, LoudnessSource::Rms));
    assert!((second.multiplier - 10.0).abs() < 1e-9);

    let third = calc.adjustment(3, Loudness::new(-60.1, LoudnessSource::Rms));
    assert_eq!(third.multiplier, 1.0);
    assert!(third.silent);
}

#[test]
fn test_gain_withDecreasingLoudness_shouldNeverDecrease() {
    let calc = GainCalculator::new(-12.0);
    let mut previous = 0.0;
    let mut db = 0.0;
    while db >= -60.0 {
        let multiplier = calc.multiplier_for_db(db);
        assert!(multiplier >= previous, "multiplier dropped at {} dB", db);
        previous = multiplier;
        db -= 0.5;
    }
    assert!((previous - 10f64.powf(MAX_BOOST_DB / 20.0)).abs() < 1e-9);
}

#[test]
fn test_gain_withSilentClip_shouldIgnoreTarget() {
    for target in [-6.0, -12.0, -24.0] {
        assert_eq!(GainCalculator::new(target).multiplier_for_db(-75.0), 1.0);
    }
}
