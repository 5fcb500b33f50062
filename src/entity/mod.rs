mod step;
mod test_case;

pub use step::{renumber_steps, TestStep};
pub use test_case::{Priority, Status, TestCase};
