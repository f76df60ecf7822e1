use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use viva_core::AudioError;

/// Resolve an input device by name, or the system default for `"default"`.
pub fn input_device(name: &str) -> Result<Device, AudioError> {
    let host = cpal::default_host();
    if name == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceNotFound("no default input device".to_string()));
    }
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?;
    for device in devices {
        if device.name().ok().as_deref() == Some(name) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(format!(
        "input device not found: {}",
        name
    )))
}

/// Resolve an output device by name, or the system default for `"default"`.
pub fn output_device(name: &str) -> Result<Device, AudioError> {
    let host = cpal::default_host();
    if name == "default" {
        return host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceNotFound("no default output device".to_string()));
    }
    let devices = host
        .output_devices()
        .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?;
    for device in devices {
        if device.name().ok().as_deref() == Some(name) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(format!(
        "output device not found: {}",
        name
    )))
}

/// Names of all input and output devices, for `--list-devices`.
pub fn list_device_names() -> Result<(Vec<String>, Vec<String>), AudioError> {
    let host = cpal::default_host();
    let inputs = host
        .input_devices()
        .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?
        .map(|d| d.name().unwrap_or_else(|_| "unknown".to_string()))
        .collect();
    let outputs = host
        .output_devices()
        .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?
        .map(|d| d.name().unwrap_or_else(|_| "unknown".to_string()))
        .collect();
    Ok((inputs, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires audio hardware
    fn test_device_enumeration() {
        let (inputs, outputs) = list_device_names().unwrap();
        println!("Input devices: {}", inputs.len());
        for name in &inputs {
            println!("  - {}", name);
        }
        println!("Output devices: {}", outputs.len());
        for name in &outputs {
            println!("  - {}", name);
        }
    }
}
