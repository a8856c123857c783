/// Reads a big-endian 16-bit field (SFF-8636 `union sff_8636_u16`: msb, lsb).
pub fn be16(hi: u8, lo: u8) -> u16 {
    u16::from_be_bytes([hi, lo])
}

/// Decodes an `sff_8636_f8` byte: 5-bit mantissa, 3-bit exponent, value =
/// `mantissa * 2^exponent`.
pub fn f8(raw: u8) -> f64 {
    let mantissa = (raw & 0x1f) as f64;
    let exponent = (raw >> 5) as i32;
    mantissa * 2f64.powi(exponent)
}

/// Internal temperature monitor: signed, 1/256 degC per LSB.
pub fn temp_celsius(raw: u16) -> f64 {
    raw as i16 as f64 / 256.0
}

/// Supply voltage monitor: 100 uV per LSB.
pub fn vcc_volts(raw: u16) -> f64 {
    raw as f64 * 0.0001
}

/// Optical receive power monitor: 0.1 uW per LSB.
pub fn rx_power_mw(raw: u16) -> f64 {
    raw as f64 * 0.0001
}

/// Laser bias current monitor: 2 uA per LSB.
pub fn tx_bias_ma(raw: u16) -> f64 {
    raw as f64 * 0.002
}

/// Optical transmit power monitor: 0.1 uW per LSB.
pub fn tx_power_mw(raw: u16) -> f64 {
    raw as f64 * 0.0001
}

pub fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}
