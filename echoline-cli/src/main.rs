//! echoline-cli — real-time auditioning player for the delay engine.
//!
//! Generates a test source (click train or noise bursts), runs it through
//! [`DelayEngine`], and plays the result on an output device. Handy for
//! hearing what the knobs do without loading the engine into a host.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use echoline_engine::{DelayEngine, ParamStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Engine block size used inside the audio callback. Device callbacks hand
/// us arbitrary frame counts; we process them in chunks of at most this.
const BLOCK: usize = 512;

#[derive(Debug, Default)]
struct Args {
    list_devices: bool,
    device_name: Option<String>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    duration_sec: Option<u64>,
    source: Option<String>,
    delay_ms: Option<f32>,
    feedback: Option<f32>,
    mix: Option<f32>,
    level: Option<f32>,
    wobble_rate: Option<f32>,
    wobble_depth: Option<f32>,
    gain: Option<f32>,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if let Some(rest) = s.strip_prefix("--device=")       { a.device_name  = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=")  { a.sample_rate  = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--channels=")     { a.channels     = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--duration=")     { a.duration_sec = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--source=")       { a.source       = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--delay-ms=")     { a.delay_ms     = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--feedback=")     { a.feedback     = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--mix=")          { a.mix          = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--level=")        { a.level        = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--wobble-rate=")  { a.wobble_rate  = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--wobble-depth=") { a.wobble_depth = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--gain=")         { a.gain         = rest.parse().ok();      continue; }
        eprintln!("[warn] unknown arg: {s}");
    }
    a
}

fn list_output_devices() -> Result<(), Box<dyn Error>> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_device(args: &Args) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    if let Some(name) = &args.device_name {
        for d in host.output_devices()? {
            if d.name()? == *name { return Ok(d); }
        }
        return Err(format!("requested device not found: {name}").into());
    }
    host.default_output_device()
        .ok_or_else(|| "no default output device".into())
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig, Box<dyn Error>> {
    // If nothing requested, default is already concrete.
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // Pick a SupportedStreamConfigRange first.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch     = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = match req_ch { Some(c) => (i64::from(ch) - i64::from(c)).unsigned_abs(), None => 0 };
        let sr_pen = match req_sr {
            Some(sr) => if (sr_min..=sr_max).contains(&sr) { 0 } else { u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))) },
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map(|(s, _)| *s).map_or(true, |s| score < s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| "no supported output configs".to_string())?;

    let pick_sr = match req_sr {
        Some(sr) => {
            let lo = range.min_sample_rate().0;
            let hi = range.max_sample_rate().0;
            cpal::SampleRate(sr.clamp(lo, hi))
        }
        None => range.max_sample_rate(),
    };

    Ok(range.with_sample_rate(pick_sr))
}

/// Mono test sources fed into the delay so you can hear the echoes.
enum Source {
    /// One unit click every `period` samples.
    Clicks { period: usize, t: usize },
    /// Short white-noise bursts with silence between them.
    Noise { period: usize, burst: usize, t: usize, rng: StdRng },
}

impl Source {
    fn from_args(name: Option<&str>, sr: f32) -> Self {
        let period = sr as usize; // one event per second
        match name.unwrap_or("clicks").to_ascii_lowercase().as_str() {
            "noise" => Source::Noise {
                period,
                burst: (sr * 0.05) as usize,
                t: 0,
                rng: StdRng::seed_from_u64(0x1eaf),
            },
            _ => Source::Clicks { period, t: 0 },
        }
    }

    fn fill(&mut self, buf: &mut [f32]) {
        match self {
            Source::Clicks { period, t } => {
                for s in buf.iter_mut() {
                    *s = if *t == 0 { 1.0 } else { 0.0 };
                    *t += 1;
                    if *t >= *period { *t = 0; }
                }
            }
            Source::Noise { period, burst, t, rng } => {
                for s in buf.iter_mut() {
                    *s = if *t < *burst { rng.gen_range(-0.8..0.8) } else { 0.0 };
                    *t += 1;
                    if *t >= *period { *t = 0; }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: DelayEngine,
    mut source: Source,
    gain: f32,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = cfg.channels as usize;

    // Planar scratch, sized once here. The engine never allocates per block;
    // the small ref-vecs below are this demo player's only callback churn.
    let mut mono = vec![0.0f32; BLOCK];
    let mut in_bufs: Vec<Vec<f32>> = vec![vec![0.0f32; BLOCK]; channels];
    let mut out_bufs: Vec<Vec<f32>> = vec![vec![0.0f32; BLOCK]; channels];

    // ~1 second meter at requested rate
    let meter_interval = (cfg.sample_rate.0).max(1) as usize;
    let mut meter_count: usize = 0;
    let mut meter_peak: f32 = 0.0;

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            let mut frames = output.chunks_mut(channels).peekable();
            while frames.peek().is_some() {
                let chunk: Vec<_> = frames.by_ref().take(BLOCK).collect();
                let n = chunk.len();

                // Same mono source on every channel.
                source.fill(&mut mono[..n]);
                for ch in in_bufs.iter_mut() {
                    ch[..n].copy_from_slice(&mono[..n]);
                }

                {
                    let ins: Vec<&[f32]> = in_bufs.iter().map(|c| &c[..n]).collect();
                    let mut outs: Vec<&mut [f32]> =
                        out_bufs.iter_mut().map(|c| &mut c[..n]).collect();
                    engine.process_block(&ins, &mut outs);
                }

                for (i, frame) in chunk.into_iter().enumerate() {
                    for (ch, slot) in frame.iter_mut().enumerate() {
                        let mut s = out_bufs[ch][i] * gain;
                        if s >  1.0 { s =  1.0; }
                        if s < -1.0 { s = -1.0; }
                        *slot = T::from_sample(s);

                        // naive peak meter on channel 0
                        if ch == 0 {
                            let a = if s >= 0.0 { s } else { -s };
                            if a > meter_peak { meter_peak = a; }
                            meter_count += 1;
                            if meter_count >= meter_interval {
                                eprintln!("[meter] peak ~ {:.3}", meter_peak);
                                meter_peak = 0.0;
                                meter_count = 0;
                            }
                        }
                    }
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();

    if args.list_devices {
        list_output_devices()?;
        return Ok(());
    }

    println!("echoline-cli — real-time delay auditioner\n");

    let device  = pick_device(&args)?;
    let sup_cfg = choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let mut cfg = sup_cfg.config();

    if let Some(sr) = args.sample_rate { cfg.sample_rate = cpal::SampleRate(sr); }
    if let Some(ch) = args.channels    { cfg.channels    = ch; }

    let sr_f32 = cfg.sample_rate.0 as f32;
    let channels = cfg.channels as usize;

    let params = Arc::new(ParamStore::new(
        args.delay_ms.unwrap_or(500.0),
        args.feedback.unwrap_or(0.35),
        args.level.unwrap_or(0.8),
        args.mix.unwrap_or(0.5),
    ));

    let mut engine = DelayEngine::new(params.clone());
    engine.configure(sr_f32, BLOCK, channels)?;
    engine.set_wobble(
        args.wobble_rate.unwrap_or(0.0),
        args.wobble_depth.unwrap_or(0.0),
    );

    let source = Source::from_args(args.source.as_deref(), sr_f32);
    let gain = args.gain.unwrap_or(0.7);

    println!("Using device: {}", device.name()?);
    println!("Stream config: {:?} (sample_format: {:?})", cfg, sample_format);
    println!(
        "delay {:.0} ms | feedback {:.2} | mix {:.2} | level {:.2} | gain {:.2}",
        args.delay_ms.unwrap_or(500.0),
        args.feedback.unwrap_or(0.35),
        args.mix.unwrap_or(0.5),
        args.level.unwrap_or(0.8),
        gain,
    );
    if let Some(d) = args.duration_sec { println!("Auto-stop after {d} seconds"); }
    println!("Press Ctrl+C to stop…\n");

    let err_fn = |e: cpal::StreamError| eprintln!("[cpal] stream error: {e}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, engine, source, gain, err_fn)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, engine, source, gain, err_fn)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, engine, source, gain, err_fn)?,
        other => return Err(format!("unsupported device sample format: {other:?}").into()),
    };

    stream.play()?;

    if let Some(d) = args.duration_sec {
        std::thread::sleep(Duration::from_secs(d));
        return Ok(());
    }

    loop { std::thread::sleep(Duration::from_millis(500)); }
}
