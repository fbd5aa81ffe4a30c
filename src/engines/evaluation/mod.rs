pub mod io;
pub mod machine;
pub mod tape;

pub use io::{Input, InputCursor};
pub use machine::{Machine, RunOutcome};
pub use tape::{Direction, HeadMove, Tape};
