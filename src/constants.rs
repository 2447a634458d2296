// VENDOR_ID is the USB vendor id of the Holtek controller used by the monitor.
pub const VENDOR_ID: u16 = 0x04d9;

// PRODUCT_ID is the USB product id reported as "USB-zyTemp".
pub const PRODUCT_ID: u16 = 0xa052;

// SUPPORTED_SERIAL is the serial string of the hardware revision that sends
// plain frames. Revision 1.40 devices obfuscate their payload and are refused.
pub const SUPPORTED_SERIAL: &str = "2.00";

// TEMPERATURE_ID is the first byte of a frame carrying the ambient temperature.
pub const TEMPERATURE_ID: u8 = 0x42;

// CO2_ID is the first byte of a frame carrying the CO2 concentration.
pub const CO2_ID: u8 = 0x50;

// TERMINATOR is the byte that ends every frame sent by the device.
pub const TERMINATOR: u8 = 0x0d;

// FRAME_LEN is the size of one report read from the device.
pub const FRAME_LEN: usize = 5;

// HANDSHAKE is the feature report that makes the device start transmitting.
// Release 2 devices still require it although they no longer use it as a key.
pub const HANDSHAKE: [u8; 8] = [0u8; 8];

// READ_TIMEOUT_MS bounds a single frame read. The device emits several frames
// per second, so an expired read means it is gone or hung.
pub const READ_TIMEOUT_MS: i32 = 5000;

// KELVIN_OFFSET converts the device's 1/16 Kelvin readings to Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

// HELPER_BIN is the external daemon used for older hardware revisions.
pub const HELPER_BIN: &str = "co2mond";
