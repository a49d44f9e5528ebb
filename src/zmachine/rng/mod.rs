//! Random numbers for the RANDOM opcode
pub mod chacha_rng;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Uniformly distributed values from a seeded generator
    Random,
    /// Values count up from 1 and wrap at the predictable range
    Predictable,
}

/// Random number source owned by the Z-Machine
pub trait ZRng {
    /// Reseed and return to [Mode::Random]; a seed of 0 draws from system entropy
    fn seed(&mut self, seed: u16);

    /// Switch to [Mode::Predictable], cycling through 1..=`seed`
    fn predictable(&mut self, seed: u16);

    /// Next value in 1..=`range`, or 0 if `range` is 0
    fn random(&mut self, range: u16) -> u16;
}
