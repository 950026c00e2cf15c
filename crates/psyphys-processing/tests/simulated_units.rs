use approx::assert_relative_eq;
use psyphys_core::ParticipantCondition;
use psyphys_processing::{EcgPipeline, EdaPipeline, ProcessingConfig, UnitMetrics};
use psyphys_simulation::{EcgSimConfig, EcgSimulator, EdaSimConfig, EdaSimulator};

fn tag() -> ParticipantCondition {
    ParticipantCondition::with_session("p01", "rest", "s1")
}

#[test]
fn test_ecg_rate_matches_simulated_heart_rate() {
    let pipeline = EcgPipeline::from_config(&ProcessingConfig::reference().ecg).unwrap();

    for (seed, bpm) in [(1, 60.0), (2, 75.0), (3, 90.0)] {
        let config = EcgSimConfig { heart_rate_bpm: bpm, seed: Some(seed), ..EcgSimConfig::default() };
        let signal = EcgSimulator::new(config).unwrap().generate(60.0, tag()).unwrap();
        let analysis = pipeline.run(&signal).unwrap();

        assert!(
            (analysis.detection.bpm - bpm).abs() <= 1.0,
            "simulated {} bpm, measured {}",
            bpm,
            analysis.detection.bpm
        );

        let peaks = analysis.detection.peaks.peaks();
        for pair in peaks.windows(2) {
            assert!(pair[1].index - pair[0].index >= 600);
        }
        assert!(peaks.iter().all(|p| p.amplitude >= analysis.detection.peaks.threshold()));
    }
}

#[test]
fn test_r_peaks_follow_simulated_beats() {
    let simulator_config = EcgSimConfig { seed: Some(11), ..EcgSimConfig::default() };
    let mut simulator = EcgSimulator::new(simulator_config).unwrap();
    let beats = simulator.beat_times(30.0);
    let signal = simulator.generate(30.0, tag()).unwrap();

    let pipeline = EcgPipeline::from_config(&ProcessingConfig::reference().ecg).unwrap();
    let analysis = pipeline.run(&signal).unwrap();
    let times = analysis.detection.peaks.times();

    assert_eq!(times.len(), beats.len());
    for (found, beat) in times.iter().zip(&beats) {
        // The steepest slope sits within one QRS width of the R wave
        assert!((found - beat).abs() < 0.03, "peak at {} for beat at {}", found, beat);
    }
}

#[test]
fn test_scrs_found_after_each_simulated_onset() {
    let pipeline = EdaPipeline::from_config(&ProcessingConfig::reference().eda).unwrap();

    for seed in [1, 2, 3] {
        let sim_config = EdaSimConfig { seed: Some(seed), ..EdaSimConfig::default() };
        let onsets = sim_config.scr_onsets.clone();
        let signal = EdaSimulator::new(sim_config).unwrap().generate(300.0, tag()).unwrap();
        let analysis = pipeline.run(&signal).unwrap();

        assert_eq!(analysis.trimmed_samples, 9);
        let rate = analysis.components.phasic.sampling_rate();

        let large: Vec<f64> = analysis
            .scrs
            .peaks()
            .iter()
            .filter(|p| p.amplitude > 0.1)
            .map(|p| (p.index + analysis.trimmed_samples) as f64 / rate)
            .collect();

        assert_eq!(large.len(), onsets.len(), "seed {}: {:?}", seed, large);
        for (time, onset) in large.iter().zip(&onsets) {
            assert!(*time >= *onset && *time <= onset + 4.0, "SCR at {} s for onset {} s", time, onset);
        }
    }
}

#[test]
fn test_eda_components_sum_to_smoothed_input() {
    let sim_config = EdaSimConfig { seed: Some(5), ..EdaSimConfig::default() };
    let signal = EdaSimulator::new(sim_config).unwrap().generate(120.0, tag()).unwrap();

    let config = ProcessingConfig::reference().eda;
    let smoothed = config.resampler().unwrap().resample(&signal).unwrap().trim_leading_missing();
    let components = config
        .decomposer()
        .unwrap()
        .decompose(&smoothed, config.analysis_rate())
        .unwrap();

    let input = smoothed.to_signal().unwrap();
    assert_eq!(components.tonic.len(), input.len());
    assert_eq!(components.phasic.len(), input.len());
    for ((x, t), p) in input
        .samples()
        .iter()
        .zip(components.tonic.samples())
        .zip(components.phasic.samples())
    {
        assert_relative_eq!(t + p, *x, epsilon = 1e-9);
    }
}

#[test]
fn test_unit_results_carry_tag_and_duration() {
    let config = ProcessingConfig::reference();

    let ecg = EcgSimulator::new(EcgSimConfig { seed: Some(3), ..EcgSimConfig::default() })
        .unwrap()
        .generate(20.0, tag())
        .unwrap();
    let result = EcgPipeline::from_config(&config.ecg).unwrap().run(&ecg).unwrap().to_unit_result();
    assert_eq!(result.tag, tag());
    assert_relative_eq!(result.duration_seconds, 20.0);
    match result.metrics {
        UnitMetrics::Ecg { r_peaks, mean_rr_rate, .. } => {
            assert_eq!(r_peaks, 20);
            assert!((mean_rr_rate.unwrap() - 60.0).abs() < 1.0);
        }
        other => panic!("unexpected metrics {:?}", other),
    }

    let eda = EdaSimulator::new(EdaSimConfig { seed: Some(3), ..EdaSimConfig::default() })
        .unwrap()
        .generate(100.0, tag())
        .unwrap();
    let result = EdaPipeline::from_config(&config.eda).unwrap().run(&eda).unwrap().to_unit_result();
    match result.metrics {
        UnitMetrics::Eda { scr_peaks, mean_scr_amplitude, mean_tonic } => {
            assert!(scr_peaks >= 3);
            assert!(mean_scr_amplitude.is_some());
            assert!((mean_tonic - 5.2).abs() < 0.5, "mean tonic {}", mean_tonic);
        }
        other => panic!("unexpected metrics {:?}", other),
    }
}
