//! Minimal smoke-test binary (§6, demo collaborator): opens the device, configures a
//! single channel and a free-running capture, and prints the identity and the first
//! bytes retrieved.

use hantek6000::{Coupling, Device, TimePerDivision, TriggerMode, TriggerSlope, Vpd};

fn main() -> hantek6000::Result<()> {
    env_logger::init();

    let transport = hantek6000::RusbTransport::open()?;
    let mut device: Device = hantek6000::Session::open(transport, 4096)?;

    println!(
        "fpga version {:#06x}, pcb revision {}, serial {:?}",
        device.fpga_version,
        device.identity.pcb_revision,
        std::str::from_utf8(&device.identity.serial_number).unwrap_or("<non-utf8>"),
    );

    device.configure_channel_frontend(0, Vpd::Mv50, Coupling::DC, false, true, 128)?;
    device.configure_adc_routing()?;
    device.set_timebase(TimePerDivision::Us500)?;
    device.configure_trigger(0, TriggerMode::Edge, TriggerSlope::Rise, Coupling::DC, 128, 4, 50)?;
    device.start_capture(hantek6000::CaptureMode::Single)?;

    while !device.get_status()? {}
    let buffers = device.retrieve_buffer()?;
    println!("channel 0: {} bytes, first 32: {:02x?}", buffers.channels[0].len(), &buffers.channels[0][..32.min(buffers.channels[0].len())]);

    device.close();
    Ok(())
}
