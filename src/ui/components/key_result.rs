/// What a component did with a key.
///
/// Components that sit on top of a view (palette, dialogs) return this so
/// the view knows whether to keep routing the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing further to do
  Handled,
  /// Consumed, and the owner has to act on `T`
  Event(T),
  /// Not for this component
  NotHandled,
}
