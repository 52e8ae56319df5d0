//! Demo CLI (§6 "CLI surface"): a collaborator around the core driver, not part of
//! it. `-B <file>` dumps the bitstream flash; `-t <level>` sets the trigger level.

use std::fs::File;
use std::io::Write;

use clap::Parser;
use hantek6000::{
    CaptureMode, Coupling, Device, Error, Session, TimePerDivision, TriggerMode, TriggerSlope, Vpd,
};

#[derive(Parser, Debug)]
#[command(name = "hantek6000", about = "Demo CLI for the Hantek 6000-series USB oscilloscope")]
struct Args {
    /// Dump the bitstream flash to this file instead of capturing.
    #[arg(short = 'B', long = "dump-flash", value_name = "FILE")]
    dump_flash: Option<String>,

    /// Trigger level, 0..255.
    #[arg(short = 't', long = "trigger-level", default_value_t = 128)]
    trigger_level: u8,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("hantek6000: {}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> hantek6000::Result<()> {
    let transport = hantek6000::RusbTransport::open()?;
    let mut device: Device = Session::open(transport, 4096)?;

    if let Some(path) = args.dump_flash {
        let flash = device.read_flash()?;
        let mut file = File::create(&path).map_err(io_err)?;
        file.write_all(&flash).map_err(io_err)?;
        return Ok(());
    }

    for ch in 0..4 {
        device.configure_channel_frontend(ch, Vpd::Mv50, Coupling::DC, false, true, 128)?;
    }
    device.configure_adc_routing()?;
    device.set_timebase(TimePerDivision::Us500)?;
    device.configure_trigger(
        0,
        TriggerMode::Edge,
        TriggerSlope::Rise,
        Coupling::DC,
        args.trigger_level,
        4,
        50,
    )?;
    device.start_capture(CaptureMode::Single)?;

    while !device.get_status()? {}
    let buffers = device.retrieve_buffer()?;
    for (i, channel) in buffers.channels.iter().enumerate() {
        println!("channel {}: {} bytes", i, channel.len());
    }
    Ok(())
}

fn io_err(_: std::io::Error) -> Error {
    Error::BadArgs
}
