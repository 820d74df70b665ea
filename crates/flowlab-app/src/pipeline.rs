//! The two batch pipeline drivers.
//!
//! Both run strictly sequentially over the decoded frame stream.
//! Startup resource acquisition (probe, decoder, writer) is fatal;
//! per-frame anomalies are logged and skipped, never aborting a run.

use crate::config::{DeflectionConfig, VelocityConfig};
use anyhow::{Context, Result};
use flowlab_core::{FlowLabError, FrameRate, PixelPoint};
use flowlab_deflect::{CalibrationSession, GapExtractor, PointerEvent, ScriptedInput};
use flowlab_media::{overlay, AnnotatedWriter, FrameSink, FrameSource, MediaProbe};
use flowlab_signal::{
    savgol_filter, write_csv, AlignedSeries, CsvColumns, ExternalSeries,
};
use flowlab_tracking::{PeakSummary, VelocitySample, VelocityTracker};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{info, warn};

fn resolve_frame_rate(probe: &MediaProbe, fps_override: Option<f64>) -> FrameRate {
    match fps_override {
        Some(fps) => {
            info!("Frame rate pinned to {fps} fps by configuration");
            FrameRate::from_fps_f64(fps)
        }
        None => probe.frame_rate,
    }
}

/// Measure the membrane gap on every frame, smooth it, align it with
/// the electrical log, and export the windowed table.
pub fn run_deflection(config: &DeflectionConfig) -> Result<()> {
    let probe = MediaProbe::probe(&config.video)?;
    let frame_rate = resolve_frame_rate(&probe, config.fps);

    let sensor = ExternalSeries::load(&config.sensor, config.sensor_rate_hz)?;
    let sensor = if config.sensor_is_resistance {
        sensor.resistance_to_conductance_ms()
    } else {
        sensor
    };

    // Replay the configured reference points through the calibration
    // state machine. Too few points leaves it incomplete: the run
    // still succeeds, with an empty (header-only) table.
    let mut input = ScriptedInput::new(
        config
            .calibration_points
            .iter()
            .map(|&[x, y]| PointerEvent::Confirm(PixelPoint { x, y })),
    );
    let mut session = CalibrationSession::new();
    let geometry = match session.run(&mut input) {
        Ok(geometry) => geometry,
        Err(FlowLabError::CalibrationIncomplete { confirmed }) => {
            warn!("Calibration incomplete ({confirmed}/4 points), exporting empty table");
            let empty = AlignedSeries { rows: vec![] };
            write_csv(&config.output_csv, &empty, &deflection_columns(config))?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!("Calibration complete, scan axis {:?}", geometry.scan_axis());

    let mut source = FrameSource::open(&config.video, frame_rate)?;
    let extractor = GapExtractor::new(geometry, frame_rate).with_threshold(config.threshold);

    let mut times = Vec::new();
    let mut gaps = Vec::new();
    while let Some(frame) = source.next_frame()? {
        let m = extractor.measure(&frame.buffer, frame.frame_number);
        times.push(m.timestamp.to_seconds_f64());
        gaps.push(m.gap_px as f64);
    }
    info!("Measured {} frames", gaps.len());

    let smoothed = savgol_filter(&gaps, config.smoothing);
    let aligned = AlignedSeries::align(&times, &smoothed, &sensor);
    let aligned = match config.window_s {
        Some([t_start, t_end]) => aligned.window(t_start, t_end),
        None => aligned,
    };
    write_csv(&config.output_csv, &aligned, &deflection_columns(config))?;
    Ok(())
}

fn deflection_columns(config: &DeflectionConfig) -> CsvColumns {
    CsvColumns {
        external: if config.sensor_is_resistance {
            "conductance_ms".into()
        } else {
            "sensor".into()
        },
        measurement: "deflection_px".into(),
    }
}

/// Track tracer beads, export the velocity sequence and its peak
/// summary, and optionally render an annotated clip.
pub fn run_velocity(config: &VelocityConfig) -> Result<()> {
    let probe = MediaProbe::probe(&config.video)?;
    let frame_rate = resolve_frame_rate(&probe, config.fps);

    let mut writer = match &config.annotated_video {
        Some(path) => Some(AnnotatedWriter::create(
            path,
            probe.width,
            probe.height,
            frame_rate,
        )?),
        None => None,
    };

    let mut source = FrameSource::open(&config.video, frame_rate)?;
    let mut tracker = VelocityTracker::new(
        probe.width,
        probe.height,
        config.um_per_px,
        frame_rate,
    )
    .with_min_area(config.min_area);

    let mut samples: Vec<VelocitySample> = Vec::new();
    while let Some(frame) = source.next_frame()? {
        let tracked = tracker.process(&frame.buffer, frame.frame_number);

        if let Some(writer) = writer.as_mut() {
            let mut annotated = frame.buffer;
            for c in &tracked.matches {
                let from = (c.from.x.round() as i32, c.from.y.round() as i32);
                let to = (c.to.x.round() as i32, c.to.y.round() as i32);
                overlay::draw_segment(&mut annotated, from, to, overlay::TRACK_COLOR);
                overlay::draw_disc(&mut annotated, to, 2, overlay::MARKER_COLOR);
            }
            writer.write_frame(&annotated)?;
        }

        if let Some(sample) = tracked.sample {
            samples.push(sample);
        }
    }
    info!(
        "Tracked {} frames, {} velocity samples",
        source.frames_decoded(),
        samples.len()
    );

    if let Some(writer) = writer {
        writer.finish()?;
    }

    write_velocity_csv(config, &samples)?;

    let summary = PeakSummary::extract(&samples, config.top_k);
    info!(
        "{} peaks, signature velocity {:.3} um/s",
        summary.peaks.len(),
        summary.signature_velocity
    );
    if let Some(path) = &config.report_json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Cannot write report {}", path.display()))?;
    }
    Ok(())
}

fn write_velocity_csv(config: &VelocityConfig, samples: &[VelocitySample]) -> Result<()> {
    let mut out = BufWriter::new(
        File::create(&config.output_csv)
            .with_context(|| format!("Cannot create {}", config.output_csv.display()))?,
    );
    writeln!(out, "time_s,frame,speed_um_s")?;
    for s in samples {
        writeln!(
            out,
            "{:.6},{},{:.6}",
            s.timestamp.to_seconds_f64(),
            s.frame_index,
            s.speed
        )?;
    }
    out.flush()?;
    info!(
        "Wrote {} samples to {}",
        samples.len(),
        config.output_csv.display()
    );
    Ok(())
}
