mod commands;
mod handlers;

pub use commands::{Cli, Commands};
pub use handlers::{
    handle_delete, handle_edit, handle_generate, handle_get, handle_init, handle_list,
    handle_push, handle_search,
};
