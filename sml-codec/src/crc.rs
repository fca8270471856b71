//! CRC-16/X.25 as used by SML for message and transmission checksums

/// Reflected CCITT polynomial 0x1021
const POLYNOMIAL: u16 = 0x8408;
const PRESET: u16 = 0xFFFF;

static TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    std::array::from_fn(|index| {
        (0..8).fold(index as u16, |reg, _| {
            if reg & 1 == 1 {
                (reg >> 1) ^ POLYNOMIAL
            } else {
                reg >> 1
            }
        })
    })
});

/// Running CRC-16/X.25 calculator
#[derive(Debug, Clone)]
pub struct Crc16 {
    register: u16,
}

impl Crc16 {
    pub fn new() -> Self {
        Self { register: PRESET }
    }

    /// Checksum of a complete byte slice in wire order
    pub fn checksum(data: &[u8]) -> u16 {
        let mut calc = Self::new();
        calc.update_bytes(data);
        calc.wire_value()
    }

    pub fn update(&mut self, byte: u8) {
        let index = usize::from((self.register ^ u16::from(byte)) as u8);
        self.register = (self.register >> 8) ^ TABLE[index];
    }

    pub fn update_bytes(&mut self, data: &[u8]) {
        data.iter().for_each(|&byte| self.update(byte));
    }

    /// The checksum as transmitted: complemented register, low byte first
    pub fn crc_bytes(&self) -> [u8; 2] {
        (!self.register).to_le_bytes()
    }

    /// The transmitted bytes read as a big-endian u16
    ///
    /// This is the value an SML `crc16` Unsigned16 field carries.
    pub fn wire_value(&self) -> u16 {
        u16::from_be_bytes(self.crc_bytes())
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        let mut calc = Crc16::new();
        calc.update_bytes(b"123456789");
        assert_eq!(calc.crc_bytes(), [0x6E, 0x90]);
        assert_eq!(Crc16::checksum(b"123456789"), 0x6E90);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = [0x1B, 0x1B, 0x1B, 0x1B, 0x01, 0x01, 0x01, 0x01, 0x76, 0x05];
        let mut calc = Crc16::new();
        for &byte in &data {
            calc.update(byte);
        }
        assert_eq!(calc.wire_value(), Crc16::checksum(&data));
    }
}
