//! Device registry - identifiers used to recognise Bentham instruments
//!
//! Bentham instruments enumerate under the Microchip vendor ID, so the
//! manufacturer string is what tells them apart from other devices built
//! on the same USB stack.

/// Vendor ID reported by Bentham Instruments devices (1240)
pub const VENDOR_ID: u16 = 0x04D8;

/// Manufacturer string substring used to select Bentham devices
pub const MANUFACTURER: &str = "Bentham";

/// Check if a vendor ID belongs to a Bentham instrument
#[inline]
pub fn is_bentham_vid(vid: u16) -> bool {
    vid == VENDOR_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_id_is_decimal_1240() {
        assert_eq!(VENDOR_ID, 1240);
        assert!(is_bentham_vid(1240));
    }

    #[test]
    fn test_other_vendors() {
        assert!(!is_bentham_vid(0x3151));
        assert!(!is_bentham_vid(0x0000));
    }
}
