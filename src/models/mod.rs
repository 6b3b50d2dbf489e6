/// Sequence models built from the layer primitives.

pub mod sequence;
