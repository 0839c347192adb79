//! Render path: per-bus sample production.
//!
//! The hardware mixer pulls one render quantum per connected bus through
//! [`render_bus`]. This code runs on the audio clock and therefore never
//! blocks, allocates, or frees: it reads the bound buffer, advances the
//! playhead, and at end-of-buffer either wraps (looping) or flags the
//! instance Finished for the control path to reap on its next tick.

use std::sync::Arc;

use crate::voice::VoicePool;

/// Fill one render quantum for `bus` into `left`/`right`.
///
/// A disconnected or empty bus renders silence. Mono buffers are mixed
/// to both output channels. The effective bus gain is applied here; the
/// external mixer performs the final summation across buses.
///
/// When a looping instance runs past the end of its buffer the remainder
/// of the quantum continues from sample 0. A non-looping instance is
/// flagged Finished and the rest of the quantum is silence.
pub fn render_bus(pool: &mut VoicePool, bus: usize, left: &mut [f32], right: &mut [f32]) {
    left.fill(0.0);
    right.fill(0.0);

    if !pool.is_connected(bus) {
        return;
    }
    let gain = pool.gain(bus);
    let frames = left.len().min(right.len());

    let Some(instance) = pool.instance_mut(bus) else {
        return;
    };
    // Refcount bump only; the buffer data itself is shared, not copied
    let buffer = Arc::clone(instance.buffer());
    let frame_count = buffer.frame_count();
    let looping = instance.looping();

    if frame_count == 0 {
        // Degenerate asset; retire it instead of spinning on the wrap
        pool.mark_finished(bus);
        return;
    }

    let mut playhead = instance.playhead();
    let mut finished = false;

    for i in 0..frames {
        if playhead >= frame_count {
            if looping {
                playhead = 0;
            } else {
                finished = true;
                break;
            }
        }
        let (l, r) = buffer.frame(playhead);
        left[i] = l * gain;
        right[i] = r * gain;
        playhead += 1;
    }
    if playhead >= frame_count && !looping {
        finished = true;
    }

    // Re-borrow to publish the advanced playhead
    if let Some(instance) = pool.instance_mut(bus) {
        instance.playhead = playhead;
    }
    if finished {
        pool.mark_finished(bus);
    }
}
