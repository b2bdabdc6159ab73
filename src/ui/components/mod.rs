mod cache_inspector;
mod command_input;
mod dialog;
mod input;
mod key_result;
mod toast;

pub use cache_inspector::CacheInspector;
pub use command_input::{CommandEvent, CommandInput};
pub use dialog::{DialogEvent, TodoDialog};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use toast::{Toast, ToastKind, Toasts};
