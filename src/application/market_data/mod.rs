// Signal generation modules
pub mod crossover;
pub mod signal_generator;
