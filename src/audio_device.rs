// src/audio_device.rs
use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, HostId};

fn get_host_from_id(host_id: HostId) -> Result<Host> {
    cpal::host_from_id(host_id).map_err(|e| anyhow::anyhow!("Failed to get audio host: {}", e))
}

pub fn get_input_devices(host_id: HostId) -> Result<Vec<(String, Device)>> {
    let host = get_host_from_id(host_id)?;
    let devices = host.input_devices()?;
    Ok(devices
        .filter_map(|device| device.name().ok().map(|name| (name, device)))
        .collect())
}

pub fn get_output_devices(host_id: HostId) -> Result<Vec<(String, Device)>> {
    let host = get_host_from_id(host_id)?;
    let devices = host.output_devices()?;
    Ok(devices
        .filter_map(|device| device.name().ok().map(|name| (name, device)))
        .collect())
}

/// One line per host and device, for `--list-devices`.
pub fn describe_devices() -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for host_id in cpal::available_hosts() {
        lines.push(format!("host: {}", host_id.name()));
        for (name, _) in get_input_devices(host_id)? {
            lines.push(format!("  input:  {}", name));
        }
        for (name, _) in get_output_devices(host_id)? {
            lines.push(format!("  output: {}", name));
        }
    }
    Ok(lines)
}
