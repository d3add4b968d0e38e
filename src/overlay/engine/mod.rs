mod adjust;
mod fit;
mod place;
#[cfg(test)]
pub(crate) mod testing;
mod wrap;

pub use adjust::grow_to_fit;
pub use fit::{FitConfig, FitOutcome, FitResult, Line, fit_text, initial_font_size};
pub use place::{PlacedLine, place_lines};
