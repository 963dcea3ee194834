//! Command-line SID tune player: inspect, export and (with the `streaming`
//! feature) play PSID/RSID files.

use std::env;
use std::fs;

use anyhow::{bail, Context};
use sid6581::replayer::{SidPlayer, VOLUME_STEPS};
use sid6581::streaming::DEFAULT_SAMPLE_RATE;

struct Options {
    file: Option<String>,
    song: Option<u16>,
    sample_rate: u32,
    volume: Option<u8>,
    line_level: bool,
    mutes: Vec<(usize, usize)>,
    seconds: u64,
    wav_out: Option<String>,
    info_only: bool,
    json: bool,
    show_help: bool,
}

impl Options {
    fn parse() -> anyhow::Result<Options> {
        let mut opts = Options {
            file: None,
            song: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            volume: None,
            line_level: false,
            mutes: Vec::new(),
            seconds: 60,
            wav_out: None,
            info_only: false,
            json: false,
            show_help: false,
        };

        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" | "-h" => opts.show_help = true,
                "--info" => opts.info_only = true,
                "--json" => opts.json = true,
                "--line-level" => opts.line_level = true,
                "--song" => {
                    let value = args.next().context("--song requires a number")?;
                    opts.song = Some(value.parse().context("invalid --song value")?);
                }
                "--rate" => {
                    let value = args.next().context("--rate requires a value in Hz")?;
                    opts.sample_rate = value.parse().context("invalid --rate value")?;
                }
                "--volume" => {
                    let value = args.next().context("--volume requires a value")?;
                    opts.volume = Some(value.parse().context("invalid --volume value")?);
                }
                "--seconds" => {
                    let value = args.next().context("--seconds requires a value")?;
                    opts.seconds = value.parse().context("invalid --seconds value")?;
                }
                "--wav" => {
                    opts.wav_out = Some(args.next().context("--wav requires an output path")?);
                }
                "--mute" => {
                    let value = args.next().context("--mute requires chip:voice")?;
                    let (chip, voice) = value
                        .split_once(':')
                        .context("--mute expects chip:voice, e.g. 0:2")?;
                    opts.mutes.push((
                        chip.parse().context("invalid chip index")?,
                        voice.parse().context("invalid voice index")?,
                    ));
                }
                _ if arg.starts_with('-') => bail!("unknown flag: {arg}"),
                _ => opts.file = Some(arg),
            }
        }
        Ok(opts)
    }
}

fn usage() {
    eprintln!(
        "Usage:\n  sid6581 [flags] <file.sid>\n\nFlags:\n  --info               Print tune metadata and exit\n  --json               Print tune metadata as JSON and exit\n  --song <n>           Song to play (default: the tune's start song)\n  --seconds <n>        Playback/export length in seconds (default 60)\n  --wav <path>         Render to a WAV file instead of playing\n  --rate <hz>          Output sample rate (default {DEFAULT_SAMPLE_RATE})\n  --volume <0-{VOLUME_STEPS}>      Host volume\n  --line-level         Use the quieter line-out volume preset\n  --mute <chip:voice>  Mute one voice (repeatable)\n  -h, --help           Show this help"
    );
}

fn print_info(info: &sid6581::TuneInfo) {
    println!("Title    : {}", info.name);
    println!("Author   : {}", info.author);
    println!("Released : {}", info.released);
    println!(
        "Format   : version {} ({:?})",
        info.version, info.compatibility
    );
    println!("Songs    : {} (start {})", info.songs, info.start_song);
    println!("Clock    : {:?}", info.clock);
    println!("Model    : {:?}", info.models[0]);
    println!(
        "Memory   : load {:#06x}{} init {:#06x} play {:#06x}",
        info.load_addr,
        if info.load_addr_embedded { "*" } else { "" },
        info.init_addr,
        info.play_addr
    );
    if let Some(addr) = info.chip2_addr {
        println!("Chip 2   : {addr:#06x} ({:?})", info.models[1]);
    }
    if let Some(addr) = info.chip3_addr {
        println!("Chip 3   : {addr:#06x} ({:?})", info.models[2]);
    }
}

fn export_wav(player: &mut SidPlayer, path: &str, seconds: u64) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: player.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("creating {path}"))?;

    let total_samples = player.sample_rate() as u64 * seconds;
    let mut written = 0u64;
    let mut frame = vec![0i16; player.samples_per_frame()];
    while written < total_samples {
        player
            .render_frame(&mut frame)
            .context("rendering failed")?;
        for &sample in &frame {
            writer.write_sample(sample)?;
        }
        written += frame.len() as u64;
    }
    writer.finalize()?;
    println!(
        "Wrote {path}: {:.1} seconds at {} Hz",
        written as f64 / player.sample_rate() as f64,
        player.sample_rate()
    );
    Ok(())
}

#[cfg(feature = "streaming")]
fn play_live(player: SidPlayer, seconds: u64) -> anyhow::Result<()> {
    use sid6581::streaming::{AudioDevice, PlaybackEngine, StreamConfig};

    let sample_rate = player.sample_rate();
    let engine = PlaybackEngine::spawn(player, StreamConfig::low_latency(sample_rate))?;
    let device = AudioDevice::new(sample_rate, engine.buffer())?;
    device.play();

    std::thread::sleep(std::time::Duration::from_secs(seconds));

    let player = engine.join();
    device.finish();
    println!(
        "Played {} frames ({:.1} seconds)",
        player.frames_rendered(),
        player.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(not(feature = "streaming"))]
fn play_live(_player: SidPlayer, _seconds: u64) -> anyhow::Result<()> {
    bail!("live playback requires the \"streaming\" feature; use --wav to render to a file")
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Options::parse()?;
    if opts.show_help || opts.file.is_none() {
        usage();
        return Ok(());
    }
    let path = opts.file.unwrap();

    let data = fs::read(&path).with_context(|| format!("reading {path}"))?;
    let mut player = SidPlayer::new(opts.sample_rate);
    let info = player.load_tune(&data)?.clone();

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    if opts.info_only {
        print_info(&info);
        return Ok(());
    }

    print_info(&info);
    println!();

    if let Some(volume) = opts.volume {
        player.set_volume(volume);
    }
    if opts.line_level {
        player.line_level();
    }

    let song = opts.song.unwrap_or(info.start_song);
    player.play_song(song)?;
    for &(chip, voice) in &opts.mutes {
        player.set_voice_muted(chip, voice, true);
    }
    println!("Playing song {song} of {}", info.songs);

    match opts.wav_out {
        Some(path) => export_wav(&mut player, &path, opts.seconds),
        None => play_live(player, opts.seconds),
    }
}
