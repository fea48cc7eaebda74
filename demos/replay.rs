use anyhow::Context;
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use linecount::{
    Config, CountingSession, Detection, DetectionFilter, Frame, SpeedEstimator, Tracking,
};

/// Replays recorded detections through the line counter and speed estimator.
///
/// Each input line is `<timestamp_ms>:<json array of detections>`.
#[derive(Parser, Debug)]
#[command(name = "replay")]
struct Args {
    detections: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 1280)]
    width: u32,
    #[arg(long, default_value_t = 720)]
    height: u32,
}

fn parse_line(line: &str, dims: (u32, u32)) -> Option<Frame> {
    let idx = match line.find(':') {
        Some(idx) => idx,
        None => {
            warn!("wrong file format: expected `:`");
            return None;
        }
    };

    let (ts, vector) = line.split_at(idx);

    match (ts.parse::<u64>(), serde_json::from_str::<Vec<Detection>>(&vector[1..])) {
        (Ok(ts), Ok(dets)) => Some(Frame::new(dims, ts as f64 / 1000.0, dets)),
        (Ok(_), Err(err)) => {
            warn!(%err, "wrong file format: parse json failed");
            None
        }
        (Err(err), _) => {
            warn!(%err, "wrong file format: parse timestamp failed");
            None
        }
    }
}

fn feed(stages: &mut [&mut dyn Tracking], frame: &Frame) {
    for stage in stages.iter_mut() {
        stage.update(frame);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("linecount=info,replay=info")
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {:?}", path))?,
        None => Config::default(),
    };

    let file = std::fs::File::open(&args.detections)
        .with_context(|| format!("opening {:?}", args.detections))?;

    let filter = DetectionFilter::new(&config.filter);
    let session = Arc::new(Mutex::new(CountingSession::new(&config)?));
    let mut speed = SpeedEstimator::new(config.speed.clone())?;

    let (tx, rx) = crossbeam_channel::bounded::<Frame>(16);
    let dims = (args.width, args.height);

    let producer = std::thread::spawn(move || -> anyhow::Result<()> {
        for line in std::io::BufReader::new(file).lines() {
            let line = line?;

            if let Some(frame) = parse_line(&line, dims) {
                let dets = filter.apply(frame.detections);
                let frame = Frame::new(frame.dims, frame.timestamp, dets);

                if tx.send(frame).is_err() {
                    break;
                }
            }
        }

        Ok(())
    });

    let shared = Arc::clone(&session);
    let consumer = std::thread::spawn(move || -> anyhow::Result<SpeedEstimator> {
        for frame in rx {
            let mut session = shared
                .lock()
                .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;

            let before = session.total();
            let mut stages: [&mut dyn Tracking; 2] = [&mut *session, &mut speed];
            feed(&mut stages, &frame);

            if session.total() > before {
                info!(
                    ts = frame.timestamp,
                    total = session.total(),
                    speed_kmh = speed.current_speed(),
                    band = ?speed.band(),
                    "line crossed"
                );
            }
        }

        Ok(speed)
    });

    producer
        .join()
        .map_err(|_| anyhow::anyhow!("producer panicked"))??;
    let speed = consumer
        .join()
        .map_err(|_| anyhow::anyhow!("consumer panicked"))??;

    let session = session
        .lock()
        .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;

    for track in session.tracks() {
        println!("{}", serde_json::to_string(&track)?);
    }

    println!("total: {}", session.total());
    println!("speed: {} km/h", speed.current_speed());

    Ok(())
}
