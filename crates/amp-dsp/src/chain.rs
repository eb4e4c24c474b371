//! Effect interface and ordered effect chain

use amp_core::{frame_count, validate_block_size, AmpError, AmpResult, Sample};

/// A stateful block effect over interleaved samples
pub trait Effect: Send {
    /// Process one interleaved block. `output` is cleared and refilled with
    /// `frames * output_channels()` samples.
    fn apply(&mut self, input: &[Sample], output: &mut Vec<Sample>) -> AmpResult<()>;

    /// Channels expected in the input block
    fn input_channels(&self) -> usize;

    /// Channels produced in the output block
    fn output_channels(&self) -> usize {
        self.input_channels()
    }

    /// Clear all state carried between blocks
    fn reset(&mut self);

    /// Effect name, used for output organization
    fn name(&self) -> &'static str;

    /// Parameter-derived path segment
    fn params_tag(&self) -> String {
        "default-params".to_string()
    }

    /// Frames of output that keep sounding after the input goes silent
    fn tail_frames(&self) -> usize {
        0
    }
}

/// Ordered effect chain with a fixed block size
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
    block_frames: usize,
    input_channels: usize,
    /// Output of the most recent stage
    front: Vec<Sample>,
    /// Scratch for the next stage
    back: Vec<Sample>,
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("effects", &self.names())
            .field("block_frames", &self.block_frames)
            .field("input_channels", &self.input_channels)
            .finish()
    }
}

impl EffectChain {
    /// Create an empty chain for `channels`-channel blocks of at most
    /// `block_frames` frames
    pub fn new(block_frames: usize, channels: usize) -> AmpResult<Self> {
        let block_frames = validate_block_size(block_frames)?;
        if channels == 0 {
            return Err(AmpError::InvalidParam(
                "chain needs at least one channel".to_string(),
            ));
        }
        Ok(Self {
            effects: Vec::new(),
            block_frames,
            input_channels: channels,
            front: Vec::with_capacity(block_frames * channels),
            back: Vec::with_capacity(block_frames * channels),
        })
    }

    /// Append an effect. Its input must match the chain's current output.
    pub fn push<E: Effect + 'static>(&mut self, effect: E) -> AmpResult<()> {
        self.push_boxed(Box::new(effect))
    }

    pub fn push_boxed(&mut self, effect: Box<dyn Effect>) -> AmpResult<()> {
        let expected = self.output_channels();
        if effect.input_channels() != expected {
            return Err(AmpError::ChannelMismatch {
                expected,
                got: effect.input_channels(),
            });
        }
        log::debug!(
            "chain stage {}: {} ({} -> {} ch)",
            self.effects.len(),
            effect.name(),
            effect.input_channels(),
            effect.output_channels()
        );
        self.effects.push(effect);
        Ok(())
    }

    /// Builder-style [`push`](Self::push)
    pub fn with<E: Effect + 'static>(mut self, effect: E) -> AmpResult<Self> {
        self.push(effect)?;
        Ok(self)
    }

    /// Run one interleaved block through every effect in order
    pub fn process(&mut self, input: &[Sample]) -> AmpResult<&[Sample]> {
        let frames = frame_count(input.len(), self.input_channels)?;
        if frames > self.block_frames {
            return Err(AmpError::BlockTooLarge {
                max: self.block_frames * self.input_channels,
                got: input.len(),
            });
        }

        let Self {
            effects,
            front,
            back,
            ..
        } = self;

        let mut stages = effects.iter_mut();
        match stages.next() {
            Some(first) => {
                first.apply(input, front)?;
                check_output(&**first, frames, front)?;
            }
            None => {
                front.clear();
                front.extend_from_slice(input);
            }
        }
        for effect in stages {
            effect.apply(front.as_slice(), back)?;
            check_output(&**effect, frames, back)?;
            std::mem::swap(front, back);
        }

        Ok(&self.front)
    }

    pub fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
        self.front.clear();
        self.back.clear();
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.effects.iter().map(|e| e.name()).collect()
    }

    pub fn effects(&self) -> impl Iterator<Item = &dyn Effect> {
        self.effects.iter().map(|e| e.as_ref())
    }

    /// Longest tail of any stage
    pub fn tail_frames(&self) -> usize {
        self.effects
            .iter()
            .map(|e| e.tail_frames())
            .max()
            .unwrap_or(0)
    }

    pub fn block_frames(&self) -> usize {
        self.block_frames
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    pub fn output_channels(&self) -> usize {
        self.effects
            .last()
            .map(|e| e.output_channels())
            .unwrap_or(self.input_channels)
    }
}

/// Every stage keeps the frame count and emits its declared channels
fn check_output(effect: &dyn Effect, frames: usize, output: &[Sample]) -> AmpResult<()> {
    let expected = frames * effect.output_channels();
    if output.len() == expected {
        Ok(())
    } else {
        Err(AmpError::OutputLength {
            effect: effect.name(),
            expected,
            got: output.len(),
        })
    }
}
