mod semiring;

pub use semiring::Weight;
