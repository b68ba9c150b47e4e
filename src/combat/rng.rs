//! Dice sources for the resolution pipeline.
//!
//! [Rng] is a SplitMix64 generator: fast, good statistical quality, and
//! deterministic (the same seed produces the same roll sequence). It is not
//! cryptographically secure. [ScriptedDice] replays a fixed list of faces and
//! exists so pipeline stages can be driven roll by roll.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

/// Anything that can produce die faces. Every stage of the pipeline takes one of
/// these by `&mut` instead of reaching for ambient randomness.
pub trait DiceSource {
    /// Uniform face in `1..=sides`. `sides == 0` yields 0.
    fn roll(&mut self, sides: u32) -> u32;

    #[inline]
    fn d6(&mut self) -> u32 {
        self.roll(6)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }
}

impl DiceSource for Rng {
    #[inline]
    fn roll(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        // Multiply-high maps the full 64-bit range onto 0..sides without modulo bias.
        let scaled = (u128::from(self.next_u64()) * u128::from(sides)) >> 64;
        scaled as u32 + 1
    }
}

/// Replays `faces` in order and wraps around when exhausted.
///
/// Faces larger than the requested die are reduced into range so a script
/// written for d6 rolls still behaves when a D3 is asked for.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    faces: Vec<u32>,
    cursor: usize,
}

impl ScriptedDice {
    pub fn new(faces: impl Into<Vec<u32>>) -> Self {
        Self {
            faces: faces.into(),
            cursor: 0,
        }
    }

    /// Number of faces consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl DiceSource for ScriptedDice {
    fn roll(&mut self, sides: u32) -> u32 {
        if sides == 0 || self.faces.is_empty() {
            return 0;
        }
        let face = self.faces[self.cursor % self.faces.len()];
        self.cursor += 1;
        if face == 0 {
            1
        } else {
            (face - 1) % sides + 1
        }
    }
}
