//! Combined-plane layout for controllers that take black/white/red in a
//! single stream.
//!
//! The BW and red planes are merged bit by bit into 2 bits per pixel, so each
//! nibble carries a pixel pair and each output byte four pixels, MSB-first.
//! One plane byte (8 pixels) becomes two output bytes.

/// 2-bit code for a black pixel.
pub const CODE_BLACK: u8 = 0b00;
/// 2-bit code for a white pixel.
pub const CODE_WHITE: u8 = 0b01;
/// 2-bit code for a red pixel.
pub const CODE_RED: u8 = 0b11;

/// Merge a BW plane (1 = white) and a red plane (0 = red) into the combined
/// layout. Red wins over the BW bit.
///
/// Both planes must have the same length.
pub fn combine_planes(bw: &[u8], red: &[u8]) -> Vec<u8> {
    debug_assert_eq!(bw.len(), red.len(), "plane length mismatch");
    let mut out = Vec::with_capacity(bw.len() * 2);
    for (&bw_byte, &red_byte) in bw.iter().zip(red) {
        for half in 0..2 {
            let mut byte = 0u8;
            for k in 0..4 {
                let mask = 0x80 >> (half * 4 + k);
                let code = if red_byte & mask == 0 {
                    CODE_RED
                } else if bw_byte & mask != 0 {
                    CODE_WHITE
                } else {
                    CODE_BLACK
                };
                byte |= code << (6 - k * 2);
            }
            out.push(byte);
        }
    }
    out
}

/// Split a combined stream back into `(bw, red)` planes.
pub fn split_combined(data: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut bw = Vec::with_capacity(data.len() / 2);
    let mut red = Vec::with_capacity(data.len() / 2);
    for pair in data.chunks(2) {
        let mut bw_byte = 0u8;
        let mut red_byte = 0u8;
        for (half, &byte) in pair.iter().enumerate() {
            for k in 0..4 {
                let mask = 0x80 >> (half * 4 + k);
                match (byte >> (6 - k * 2)) & 0b11 {
                    CODE_RED => {}
                    CODE_WHITE => {
                        bw_byte |= mask;
                        red_byte |= mask;
                    }
                    _ => red_byte |= mask,
                }
            }
        }
        bw.push(bw_byte);
        red.push(red_byte);
    }
    (bw, red)
}
