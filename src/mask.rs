//! WebSocket frame masking
//!
//! Client frames are XORed byte-by-byte with a 4-byte key, indexed by the
//! byte's position in the frame payload. Payloads are processed in chunks,
//! so [`apply_mask_offset`] can resume masking mid-payload by rotating the
//! key to the chunk's starting position.

use rand::RngCore;

/// Generate a fresh 4-byte masking key
///
/// The key hides payloads from misbehaving intermediaries, so production
/// callers hand in a CSPRNG (`rand::rngs::OsRng`); tests inject a
/// deterministic one.
#[inline]
pub fn generate_mask(rng: &mut dyn RngCore) -> [u8; 4] {
    let mut mask = [0u8; 4];
    rng.fill_bytes(&mut mask);
    mask
}

/// Mask or unmask a buffer in place (XOR is its own inverse)
#[inline]
pub fn apply_mask(buf: &mut [u8], mask: [u8; 4]) {
    apply_mask_fast32(buf, mask);
}

/// Mask a buffer that starts `offset` bytes into the frame payload
#[inline]
pub fn apply_mask_offset(buf: &mut [u8], mask: [u8; 4], offset: usize) {
    let offset = offset & 3;
    if offset == 0 {
        return apply_mask(buf, mask);
    }
    let rotated = [
        mask[offset],
        mask[(offset + 1) & 3],
        mask[(offset + 2) & 3],
        mask[(offset + 3) & 3],
    ];
    apply_mask(buf, rotated);
}

/// Byte-at-a-time masking, used for the unaligned edges
#[inline]
fn apply_mask_fallback(buf: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= mask[i & 3];
    }
}

/// Word-at-a-time masking: XOR whole `u32`s across the aligned middle of the
/// buffer, with the key rotated to match the alignment prefix.
fn apply_mask_fast32(buf: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);

    let (prefix, words, suffix) = unsafe { buf.align_to_mut::<u32>() };
    apply_mask_fallback(prefix, mask);
    let head = prefix.len() & 3;
    let body_mask = if head > 0 {
        if cfg!(target_endian = "big") {
            mask_u32.rotate_left(8 * head as u32)
        } else {
            mask_u32.rotate_right(8 * head as u32)
        }
    } else {
        mask_u32
    };
    for word in words.iter_mut() {
        *word ^= body_mask;
    }
    apply_mask_fallback(suffix, body_mask.to_ne_bytes());
}
