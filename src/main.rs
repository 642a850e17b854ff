mod cli;
mod encode;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use cli::{AnalysisArgs, AnalyzeArgs, Cli, Command, ExportArgs, RenderArgs, VideoArgs, ViewArgs};
use encode::ffmpeg::{FfmpegEncoder, VideoOptions};
use sonolabel::annotate::AnnotationEngine;
use sonolabel::audio::{self, AnalysisJob, AnalysisParams, Progress, SampleBuffer};
use sonolabel::config::{self, Config};
use sonolabel::export::{self, ExportFormat};
use sonolabel::render::{ColorMap, FrameRenderer, TextOverlay, Viewport};
use sonolabel::view::{FieldState, ViewController};

const TEXT_SIZE: f32 = 12.0;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let config = match config::discover(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    match &mut cli.command {
        Command::Render(args) => {
            merge_view_args(&mut args.view, &config);
            run_render(args, &config)
        }
        Command::Video(args) => {
            merge_view_args(&mut args.view, &config);
            // Config values apply only when the flag is at its default
            if args.fps == 30 { args.fps = config.output.fps; }
            if args.crf == 18 { args.crf = config.output.crf; }
            if args.codec == "libx264" { args.codec = config.output.codec.clone(); }
            run_video(args, &config)
        }
        Command::Analyze(args) => {
            merge_analysis_args(&mut args.analysis, &config);
            run_analyze(args)
        }
        Command::Export(args) => run_export(args, &config),
    }
}

fn merge_analysis_args(args: &mut AnalysisArgs, config: &Config) {
    if args.fft_size == 1024 { args.fft_size = config.analysis.fft_size; }
    if args.hop_size == 512 { args.hop_size = config.analysis.hop_size; }
}

fn merge_view_args(args: &mut ViewArgs, config: &Config) {
    if args.width == 1280 { args.width = config.output.width; }
    if args.height == 480 { args.height = config.output.height; }
    if args.font.is_none() {
        args.font = config.output.font.clone();
    }
    merge_analysis_args(&mut args.analysis, config);
}

fn check_input(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(())
}

/// Decode, analyze in the background with a progress bar, and load labels.
fn open_session(input: &Path, args: &ViewArgs, config: &Config, fps: u32) -> Result<ViewController> {
    check_input(input)?;
    log::info!("Input: {}", input.display());

    log::info!("Decoding audio...");
    let buffer = audio::decode::decode_audio(input)?;

    let mut settings = config.view.settings.clone();
    if let Some(w) = args.window { settings.window_seconds = w; }
    if let Some(s) = args.scale { settings.frequency_scale = s; }
    if let Some(f) = args.min_freq { settings.min_freq = f; }
    if let Some(f) = args.max_freq { settings.max_freq = Some(f); }
    if let Some(i) = args.intensity { settings.intensity = i; }
    if let Some(c) = args.contrast { settings.contrast = c; }
    let colormap = args.colormap.unwrap_or(config.view.colormap);

    let text = TextOverlay::discover(args.font.as_deref(), TEXT_SIZE);
    if text.is_none() {
        log::warn!("No usable font found; axis ticks are drawn without text");
    }
    let renderer = FrameRenderer::new(ColorMap::preset(colormap), text);
    let engine = AnnotationEngine::new(buffer.duration(), config.categories());
    let mut controller = ViewController::new(
        settings,
        buffer.nyquist(),
        Viewport::new(args.width, args.height),
        engine,
        renderer,
        fps,
    );

    let params = AnalysisParams::new(args.analysis.fft_size, args.analysis.hop_size);
    log::info!(
        "Analyzing {:.1}s of audio (fft={}, hop={})...",
        buffer.duration(),
        params.fft_size,
        params.hop_size
    );
    controller.load(buffer, params)?;
    wait_with_progress(&mut controller)?;

    if let Some(path) = &args.labels {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read labels: {}", path.display()))?;
        let format = ExportFormat::from_path(path).unwrap_or(ExportFormat::Json);
        let records = export::read_labels(&content, format)
            .with_context(|| format!("Failed to parse labels: {}", path.display()))?;
        export::import_records(controller.engine_mut(), &records);
        controller.invalidate();
    }

    Ok(controller)
}

fn wait_with_progress(controller: &mut ViewController) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} columns ({eta} remaining)")?
            .progress_chars("=>-"),
    );
    loop {
        controller.poll();
        match controller.field_state() {
            FieldState::Pending { done, total } => {
                pb.set_length(*total as u64);
                pb.set_position(*done as u64);
                std::thread::sleep(Duration::from_millis(20));
            }
            FieldState::Ready(field) => {
                pb.finish_with_message("Analysis complete");
                log::info!("Spectrogram: {} columns x {} bins", field.width(), field.height());
                return Ok(());
            }
            FieldState::Unavailable(reason) => {
                pb.abandon();
                log::warn!("Rendering placeholder: {}", reason);
                return Ok(());
            }
            FieldState::Empty => {
                pb.abandon();
                return Ok(());
            }
        }
    }
}

fn run_render(args: &RenderArgs, config: &Config) -> Result<()> {
    let mut controller = open_session(&args.input, &args.view, config, config.output.fps)?;
    controller.scroll_to_time(args.start);
    if args.playhead.is_some() {
        controller.set_playhead(args.playhead, false);
    }

    let frame = controller.render();
    let mut encoder = FfmpegEncoder::still(&args.output, frame.width, frame.height)?;
    encoder.write_frame(&frame.pixels)?;
    encoder.finish()?;

    log::info!(
        "Done! {} label(s) drawn. Output: {}",
        controller.engine().labels().len(),
        args.output.display()
    );
    Ok(())
}

fn run_video(args: &VideoArgs, config: &Config) -> Result<()> {
    let mut controller = open_session(&args.input, &args.view, config, args.fps)?;
    let fps = args.fps.max(1);
    let total_frames = (controller.duration() * fps as f64).ceil() as usize;
    log::info!(
        "Resolution: {}x{} @ {}fps, {} frames",
        args.view.width, args.view.height, fps, total_frames
    );

    log::info!("Starting FFmpeg encoder...");
    let options = VideoOptions {
        fps,
        codec: &args.codec,
        pix_fmt: &args.pix_fmt,
        crf: args.crf,
        bitrate: args.bitrate.as_deref(),
    };
    let mut encoder = FfmpegEncoder::video(&args.output, &args.input, args.view.width, args.view.height, &options)?;

    let pb = ProgressBar::new(total_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    for frame_idx in 0..total_frames {
        let t = frame_idx as f64 / fps as f64;
        controller.set_playhead(Some(t), true);
        let frame = controller.render();
        encoder.write_frame(&frame.pixels)?;
        pb.set_position(frame_idx as u64 + 1);
    }
    pb.finish_with_message("Rendering complete");

    log::info!("Finishing encoding...");
    encoder.finish()?;
    log::info!("Done! Output: {}", args.output.display());
    Ok(())
}

fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    check_input(&args.input)?;
    let buffer: SampleBuffer = audio::decode::decode_audio(&args.input)?;
    let params = AnalysisParams::new(args.analysis.fft_size, args.analysis.hop_size);

    let mut job = AnalysisJob::new(&buffer, params)?;
    let pb = ProgressBar::new(job.total_columns() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} columns")?
            .progress_chars("=>-"),
    );
    let field = loop {
        match job.step() {
            Progress::Pending { done, .. } => pb.set_position(done as u64),
            Progress::Ready(field) => break field,
        }
    };
    pb.finish_and_clear();

    println!("file:        {}", args.input.display());
    println!("sample rate: {} Hz", buffer.sample_rate);
    println!("duration:    {:.3} s", buffer.duration());
    println!("fft / hop:   {} / {}", field.fft_size(), field.hop_size());
    println!("columns:     {}", field.width());
    println!("bins:        {}", field.height());
    println!("bin width:   {:.2} Hz", field.bin_hz());
    println!("column step: {:.4} s", field.seconds_per_column());
    if let Some(stats) = field.stats() {
        println!(
            "intensity:   min {} / max {} / mean {:.1}",
            stats.min, stats.max, stats.mean
        );
    }
    Ok(())
}

fn run_export(args: &ExportArgs, config: &Config) -> Result<()> {
    check_input(&args.input)?;
    let from = args
        .from
        .or_else(|| ExportFormat::from_path(&args.input))
        .context("Cannot tell the label format from the extension; pass --from")?;
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read labels: {}", args.input.display()))?;
    let records = export::read_labels(&content, from)?;

    let duration = args
        .duration
        .unwrap_or_else(|| records.iter().map(|r| r.end).fold(0.0, f64::max));
    let mut engine = AnnotationEngine::new(duration, config.categories());
    let report = export::import_records(&mut engine, &records);
    if report.discarded > 0 {
        log::warn!("{} label(s) were outside [0, {:.3}] and dropped", report.discarded, duration);
    }

    let out = export::write_labels(&export::records(&engine), args.format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, out)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!(
                "Wrote {} label(s) as {} to {}",
                report.imported,
                args.format.extension(),
                path.display()
            );
        }
        None => print!("{}", out),
    }
    Ok(())
}
