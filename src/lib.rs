#[macro_use]
extern crate log;

pub mod config;
pub mod dictionary;
pub mod error;
pub mod instruction;
pub mod object;
pub mod text;
pub mod zmachine;

#[cfg(test)]
pub mod test_util;
