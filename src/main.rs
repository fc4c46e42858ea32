use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use log::info;
use std::{sync::mpsc, thread, time::Duration};

mod api;
mod bridge;
mod buttons;
mod controller;
mod dispatch;
mod pipeline;
mod state;

#[cfg(test)]
mod testing;

use api::{HttpBackend, NavTarget, SnapshotLabel};
use buttons::DirectionButton;
use state::{ControlEvent, ControllerState};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of the rover's web server
    #[arg(long, default_value = "http://localhost:5000")]
    url: String,

    /// Initial power setting, in percent
    #[arg(long, default_value_t = ControllerState::DEFAULT_POWER, value_parser = clap::value_parser!(u8).range(0..=100))]
    power: u8,

    /// Constrain stick motion to its dominant axis
    #[arg(long)]
    lock_xy: bool,

    /// Folder that snapshots are recorded into
    #[arg(long, default_value = "ternary")]
    snapshot_folder: String,

    /// HTTP request timeout, in seconds
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive the rover with a game controller
    Drive {
        /// The name of the controller to use; the first one found if empty
        #[arg(long, default_value = "")]
        controller: String,

        /// Stick travel, as a fraction, that reads as centred
        #[arg(long, default_value_t = 0.0)]
        deadzone: f32,

        /// Minimum time between samples from one stick, in milliseconds
        #[arg(long, default_value_t = 50)]
        throttle_ms: u64,
    },
    /// Halt the rover
    Stop,
    /// Press one of the direction buttons
    Button {
        /// forward-left, forward, forward-right, left, stop, right,
        /// back-left, backward or back-right
        button: DirectionButton,
    },
    /// Send a navigation target picked on the camera image
    Navigate {
        x: f64,
        y: f64,
        /// Width of the image the target was picked on
        w: f64,
        /// Height of the image the target was picked on
        h: f64,
        /// Record the target as a training sample
        #[arg(long)]
        capture: bool,
        /// Drive towards the target
        #[arg(long)]
        drive: bool,
    },
    /// Record a camera snapshot with the given label
    Snapshot { label: SnapshotLabel },
    /// Show snapshot counts
    Snapshots,
    /// Toggle the rover's autonomous driving
    Autodrive,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter(None, log::LevelFilter::Debug);
    } else {
        builder.filter(None, log::LevelFilter::Info);
    }
    builder.init();

    let backend = HttpBackend::new(&args.url, Duration::from_secs(args.timeout_secs));
    let dispatcher = dispatch::Dispatcher::new(backend)?;
    let state = ControllerState::new(args.power, args.lock_xy);
    let mut bridge = bridge::RoverBridge::new(state, dispatcher, &args.snapshot_folder);

    let command = args.command.unwrap_or(Command::Drive {
        controller: String::new(),
        deadzone: 0.0,
        throttle_ms: 50,
    });

    let events = match command {
        Command::Drive {
            controller,
            deadzone,
            throttle_ms,
        } => {
            info!("Driving rover at {}", args.url);
            let (sender, receiver) = mpsc::channel();
            let mut controller_monitor = controller::ControllerMonitor::new(
                &controller,
                deadzone.clamp(0.0, 0.99),
                Duration::from_millis(throttle_ms.max(1)),
                sender,
            )?;
            controller_monitor.select_gamepad();

            let bridge_thread = thread::spawn(move || bridge.run(receiver));
            let result = controller_monitor.run();

            // Hanging up the channel makes the bridge stop the rover and exit.
            drop(controller_monitor);
            dispatch::join_logged(bridge_thread, "bridge");
            return result;
        }
        Command::Stop => vec![ControlEvent::Stop],
        Command::Button { button } => vec![ControlEvent::Button(button)],
        Command::Navigate {
            x,
            y,
            w,
            h,
            capture,
            drive,
        } => {
            let mut events = Vec::new();
            if capture {
                events.push(ControlEvent::ToggleCaptureMode);
            }
            if drive {
                events.push(ControlEvent::ToggleDriveMode);
            }
            events.push(ControlEvent::Navigate(NavTarget { x, y, w, h }));
            events
        }
        Command::Snapshot { label } => vec![ControlEvent::Snapshot(label)],
        Command::Snapshots => vec![ControlEvent::RefreshSnapshots],
        Command::Autodrive => vec![ControlEvent::ToggleAutodrive],
    };

    for event in events {
        bridge.handle_event(event);
    }

    // Dropping the bridge waits for queued requests to finish.
    drop(bridge);
    Ok(())
}
