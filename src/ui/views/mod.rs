mod crash;
mod not_found;
mod recovery;
mod todo_detail;
mod todo_list;

pub use crash::CrashView;
pub use not_found::NotFoundView;
pub use recovery::RecoveryView;
pub use todo_detail::TodoDetailView;
pub use todo_list::TodoListView;

use crate::app::AppContext;
use crate::routes::Route;
use crate::ui::view::View;

/// Build the view that shows `route`
pub fn open(route: Route, ctx: &AppContext) -> Box<dyn View> {
  match route {
    Route::List => Box::new(TodoListView::new(ctx.clone())),
    Route::Detail(id) => Box::new(TodoDetailView::new(ctx.clone(), id)),
    Route::CrashTest => Box::new(CrashView),
    Route::NotFound => Box::new(NotFoundView),
  }
}
