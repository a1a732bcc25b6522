//! Phase-context feature CLI
//!
//! Prepares feature sets from audio files, resynthesizes audio through the
//! analysis/reconstruction path and renders feature maps.

use std::process;

use clap::{Arg, ArgAction, ArgMatches, Command};
use phasecontext_lib::{
    audio_io::{read_track, write_track},
    config::presets,
    utils, window::WindowType,
    AudioReconstructor, FeatureAssembler, PipelineConfig, SpectralAnalyzer, Track,
};

#[cfg(feature = "image")]
use phasecontext_lib::visualization::{save_feature_image, FeatureImageOptions, FeatureMap};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn build_cli() -> Command {
    let cli = Command::new("phasecontext")
        .version(phasecontext_lib::VERSION)
        .about("Phase-context spectral features and resynthesis")
        .arg(
            Arg::new("preset")
                .long("preset")
                .global(true)
                .help("Start from a named preset (see `presets`)"),
        )
        .arg(
            Arg::new("n-fft")
                .long("n-fft")
                .global(true)
                .value_parser(clap::value_parser!(usize))
                .help("FFT size in samples"),
        )
        .arg(
            Arg::new("n-overlap")
                .long("n-overlap")
                .global(true)
                .value_parser(clap::value_parser!(usize))
                .help("Overlap between frames in samples"),
        )
        .arg(
            Arg::new("context-size")
                .long("context-size")
                .global(true)
                .value_parser(clap::value_parser!(usize))
                .help("Frames on each side of the centre frame"),
        )
        .arg(
            Arg::new("window")
                .long("window")
                .global(true)
                .help("Window type (hann, hamming, rectangular, bartlett)"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("features")
                .about("Prepare feature windows for one or more tracks")
                .arg(
                    Arg::new("files")
                        .required(true)
                        .num_args(1..)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("resynth")
                .about("Analyze a file, reconstruct it and write a WAV file")
                .arg(Arg::new("input").required(true))
                .arg(Arg::new("output").required(true)),
        )
        .subcommand(Command::new("presets").about("List configuration presets"));

    #[cfg(feature = "image")]
    let cli = cli.subcommand(
        Command::new("render")
            .about("Render a feature map of a file to an image")
            .arg(Arg::new("input").required(true))
            .arg(Arg::new("output").required(true))
            .arg(
                Arg::new("map")
                    .long("map")
                    .default_value("dt")
                    .help("Feature to draw: amplitude, dt or df"),
            )
            .arg(
                Arg::new("channel")
                    .long("channel")
                    .default_value("0")
                    .value_parser(clap::value_parser!(usize)),
            ),
    );

    cli
}

/// Build the configuration from the global options and the input sample rate
fn build_config(matches: &ArgMatches, sample_rate: u32) -> CliResult<PipelineConfig> {
    let mut config = match matches.get_one::<String>("preset") {
        Some(name) => presets::get_preset(name).ok_or_else(|| format!("Unknown preset: {}", name))?,
        None => PipelineConfig::default(),
    };

    if let Some(&n_fft) = matches.get_one::<usize>("n-fft") {
        config.n_fft = n_fft;
        if matches.get_one::<usize>("n-overlap").is_none() {
            config.n_overlap = n_fft / 2;
        }
    }
    if let Some(&n_overlap) = matches.get_one::<usize>("n-overlap") {
        config.n_overlap = n_overlap;
    }
    if let Some(&context_size) = matches.get_one::<usize>("context-size") {
        config.context_size = context_size;
    }
    if let Some(window) = matches.get_one::<String>("window") {
        config.window_type = window.parse::<WindowType>()?;
    }
    config.sample_rate = sample_rate;
    config.validate()?;
    Ok(config)
}

fn load(path: &str) -> CliResult<Track> {
    read_track(path).map_err(|e| format!("Failed to load {}: {}", path, e).into())
}

fn run_features(sub: &ArgMatches) -> CliResult<()> {
    let files: Vec<&String> = sub.get_many::<String>("files").into_iter().flatten().collect();
    let tracks = files
        .iter()
        .map(|path| load(path))
        .collect::<CliResult<Vec<Track>>>()?;

    let sample_rate = tracks[0].sample_rate();
    if let Some((path, track)) = files
        .iter()
        .zip(tracks.iter())
        .find(|(_, t)| t.sample_rate() != sample_rate)
    {
        return Err(format!(
            "{} has sample rate {} Hz, expected {} Hz",
            path,
            track.sample_rate(),
            sample_rate
        )
        .into());
    }

    let config = build_config(sub, sample_rate)?;
    log::debug!("Preparing features for {} tracks", tracks.len());
    println!("{}", utils::config_summary(&config));

    let assembler = FeatureAssembler::new(config)?;
    let features = assembler.process_all(&tracks)?;
    print!("{}", utils::feature_summary(&features));

    if let Some(pair) = features.iter().next() {
        println!(
            "Amplitude context shape {:?}, phase context shape {:?}",
            pair.amplitude.shape(),
            pair.phase.shape()
        );
    }
    Ok(())
}

fn run_resynth(sub: &ArgMatches) -> CliResult<()> {
    let input = sub.get_one::<String>("input").ok_or("Missing input")?;
    let output = sub.get_one::<String>("output").ok_or("Missing output")?;

    let track = load(input)?;
    let config = build_config(sub, track.sample_rate())?;
    let analyzer = SpectralAnalyzer::new(config)?;
    let reconstructor = AudioReconstructor::new(config)?;

    let spectrogram = analyzer.analyze(&track)?;
    let reconstructed =
        reconstructor.reconstruct_to_length(&spectrogram.amplitude, &spectrogram.phase, track.len())?;

    let squared_error: f64 = track
        .channels()
        .iter()
        .zip(reconstructed.channels())
        .flat_map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)))
        .sum();
    let mse = squared_error / (track.len() * track.num_channels()).max(1) as f64;

    write_track(output, &reconstructed)?;
    println!(
        "Resynthesized {} ({}, {} frames) to {}, MSE {:.3e}",
        input,
        utils::format_time(track.duration_seconds()),
        spectrogram.num_frames(),
        output,
        mse
    );
    Ok(())
}

#[cfg(feature = "image")]
fn run_render(sub: &ArgMatches) -> CliResult<()> {
    let input = sub.get_one::<String>("input").ok_or("Missing input")?;
    let output = sub.get_one::<String>("output").ok_or("Missing output")?;
    let map = sub
        .get_one::<String>("map")
        .map(|m| m.parse::<FeatureMap>())
        .transpose()?
        .unwrap_or(FeatureMap::TimeDerivative);
    let channel = sub.get_one::<usize>("channel").copied().unwrap_or(0);

    let track = load(input)?;
    let config = build_config(sub, track.sample_rate())?;
    let features = FeatureAssembler::new(config)?.process_track(&track)?;

    let options = FeatureImageOptions {
        channel,
        ..Default::default()
    };
    save_feature_image(&features, map, &options, output)?;
    println!("Rendered {:?} of {} to {}", map, input, output);
    Ok(())
}

fn list_presets() {
    println!("Available presets:");
    for preset in presets::all_presets() {
        println!("  {:<22} {}", preset.name, preset.description);
    }
}

fn run(matches: &ArgMatches) -> CliResult<()> {
    match matches.subcommand() {
        Some(("features", sub)) => run_features(sub),
        Some(("resynth", sub)) => run_resynth(sub),
        #[cfg(feature = "image")]
        Some(("render", sub)) => run_render(sub),
        Some(("presets", _)) => {
            list_presets();
            Ok(())
        }
        _ => Err("Unknown command".into()),
    }
}

fn main() {
    env_logger::init();

    let matches = build_cli().get_matches();
    if let Err(e) = run(&matches) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
