pub mod block;
pub mod formatting;
pub mod units;

pub use block::{Block, BlockStyle, BlockStylePatch, BlockType};
pub use formatting::{FormattingModel, FormattingPatch, TextAlign};
pub use units::Length;
