//! Sample types and audio buffer definitions

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// Audio buffer trait for generic buffer operations
pub trait AudioBuffer {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn clear(&mut self);
}

/// Stereo audio buffer (split channels)
#[derive(Debug, Clone)]
pub struct StereoBuffer {
    left: Vec<Sample>,
    right: Vec<Sample>,
}

impl StereoBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            left: vec![0.0; size],
            right: vec![0.0; size],
        }
    }

    /// Deinterleave `frames` of `channels`-wide audio. Mono input is
    /// duplicated to both sides, extra channels are dropped.
    pub fn from_interleaved(interleaved: &[Sample], channels: usize) -> Self {
        let channels = channels.max(1);
        let frames = interleaved.len() / channels;
        let mut buffer = Self::new(frames);
        for (frame, chunk) in interleaved.chunks_exact(channels).enumerate() {
            buffer.left[frame] = chunk[0];
            buffer.right[frame] = if channels > 1 { chunk[1] } else { chunk[0] };
        }
        buffer
    }

    /// Write back over `channels`-wide interleaved frames. Only the stereo
    /// pair is replaced; further channels are left as they are. Mono output
    /// takes the mid signal.
    pub fn write_interleaved(&self, channels: usize, out: &mut [Sample]) {
        let channels = channels.max(1);
        let frames = self.left.iter().zip(self.right.iter());
        for (chunk, (l, r)) in out.chunks_exact_mut(channels).zip(frames) {
            if channels == 1 {
                chunk[0] = (l + r) * 0.5;
            } else {
                chunk[0] = *l;
                chunk[1] = *r;
            }
        }
    }

    #[inline]
    pub fn left(&self) -> &[Sample] {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &[Sample] {
        &self.right
    }

    #[inline]
    pub fn channels_mut(&mut self) -> (&mut [Sample], &mut [Sample]) {
        (&mut self.left, &mut self.right)
    }
}

impl AudioBuffer for StereoBuffer {
    fn len(&self) -> usize {
        self.left.len()
    }

    fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_stereo() {
        let data = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let buffer = StereoBuffer::from_interleaved(&data, 2);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.left(), &[0.1, 0.3, 0.5]);
        assert_eq!(buffer.right(), &[0.2, 0.4, 0.6]);

        let mut out = vec![0.0; data.len()];
        buffer.write_interleaved(2, &mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn test_mono_is_duplicated() {
        let buffer = StereoBuffer::from_interleaved(&[0.5, -0.5], 1);
        assert_eq!(buffer.left(), buffer.right());

        let mut out = vec![0.0; 2];
        buffer.write_interleaved(1, &mut out);
        assert_eq!(out, vec![0.5, -0.5]);
    }

    #[test]
    fn test_extra_channels_untouched() {
        let mut data = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
        let mut buffer = StereoBuffer::from_interleaved(&data, 4);
        assert_eq!(buffer.left(), &[0.1, 0.5]);
        assert_eq!(buffer.right(), &[0.2, 0.6]);

        buffer.clear();
        buffer.write_interleaved(4, &mut data);
        assert_eq!(data, vec![0.0, 0.0, 0.3, 0.4, 0.0, 0.0, 0.7, 0.8]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = StereoBuffer::from_interleaved(&[1.0, 1.0], 2);
        buffer.clear();
        assert!(buffer.left().iter().chain(buffer.right()).all(|&s| s == 0.0));
        assert!(!buffer.is_empty());
    }
}
