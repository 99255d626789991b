use anyhow::Result;
use serialport::{SerialPortInfo, SerialPortType};

/// Print the serial ports an upload could target.
pub fn list(current: &str) -> Result<()> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    println!("Available serial ports:");
    for p in &ports {
        for line in describe_port(p, current) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Indented listing lines for one port; the configured upload port is marked.
pub fn describe_port(port: &SerialPortInfo, current: &str) -> Vec<String> {
    let marker = if port.port_name == current {
        " (upload port)"
    } else {
        ""
    };
    let mut lines = vec![format!("  {}{}", port.port_name, marker)];
    match &port.port_type {
        SerialPortType::UsbPort(info) => {
            lines.push(format!("    USB {:04x}:{:04x}", info.vid, info.pid));
            if let Some(product) = &info.product {
                lines.push(format!("    Product: {}", product));
            }
            if let Some(manufacturer) = &info.manufacturer {
                lines.push(format!("    Manufacturer: {}", manufacturer));
            }
        }
        SerialPortType::PciPort => lines.push("    Type: PCI".to_string()),
        SerialPortType::BluetoothPort => lines.push("    Type: Bluetooth".to_string()),
        SerialPortType::Unknown => lines.push("    Type: Unknown".to_string()),
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb_port(name: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x303a,
                pid: 0x1001,
                serial_number: None,
                manufacturer: Some("Espressif".to_string()),
                product: Some("USB JTAG/serial debug unit".to_string()),
            }),
        }
    }

    #[test]
    fn marks_the_upload_port() {
        let lines = describe_port(&usb_port("/dev/ttyACM0"), "/dev/ttyACM0");
        assert_eq!(
            lines,
            [
                "  /dev/ttyACM0 (upload port)",
                "    USB 303a:1001",
                "    Product: USB JTAG/serial debug unit",
                "    Manufacturer: Espressif",
            ]
        );
    }

    #[test]
    fn other_ports_are_unmarked() {
        let port = SerialPortInfo {
            port_name: "COM7".to_string(),
            port_type: SerialPortType::PciPort,
        };
        assert_eq!(describe_port(&port, "COM3"), ["  COM7", "    Type: PCI"]);
    }
}
