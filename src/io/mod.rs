//! Text, binary and JSON representations.

pub mod mfjson;
pub mod text;
pub mod wkb;
