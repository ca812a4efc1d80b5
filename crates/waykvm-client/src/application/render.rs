//! Placeholder render pass.
//!
//! Picks a uniformly random split point in the frame, zeroes everything
//! before it and fills everything after with bytes in `[0, 100)`.  Any
//! renderer producing bytes of the declared pixel format satisfies the
//! buffer contract; this one just makes the committed frames visibly
//! change.

use rand::Rng;

/// Fills `frame` in place using the thread-local generator.
pub fn fill_frame(frame: &mut [u8]) {
    fill_frame_with(&mut rand::thread_rng(), frame);
}

/// Deterministic variant used by tests.
pub fn fill_frame_with<R: Rng>(rng: &mut R, frame: &mut [u8]) {
    if frame.is_empty() {
        return;
    }
    let split = rng.gen_range(0..frame.len());
    for byte in &mut frame[..split] {
        *byte = 0;
    }
    for byte in &mut frame[split..] {
        *byte = rng.gen_range(0u8..100);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fill_zeroes_before_split_and_bounds_after() {
        let mut frame = vec![0xFFu8; 4096];
        let mut rng = StdRng::seed_from_u64(7);
        // A twin generator with the same seed reveals the split point.
        let split = StdRng::seed_from_u64(7).gen_range(0..frame.len());

        fill_frame_with(&mut rng, &mut frame);

        assert!(frame[..split].iter().all(|&b| b == 0));
        assert!(frame[split..].iter().all(|&b| b < 100));
    }

    #[test]
    fn test_fill_tolerates_empty_frame() {
        let mut frame: Vec<u8> = Vec::new();
        fill_frame(&mut frame);
    }

    #[test]
    fn test_fill_covers_whole_frame() {
        let mut frame = vec![0xFFu8; 512];

        fill_frame(&mut frame);

        assert!(frame.iter().all(|&b| b < 100), "every byte must be rewritten");
    }
}
