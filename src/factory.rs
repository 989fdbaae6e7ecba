use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

/// The type of future a pool factory produces.
/// It must be `Send` and `'static`, and resolve to a new instance or the factory's error.
pub type CreateFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// A shareable, type-erased asynchronous factory.
///
/// Each call is independent: the pool makes no assumption about state shared between
/// invocations and may call it concurrently from several acquirers.
pub(crate) type BoxedFactory<T, E> = Arc<dyn Fn() -> CreateFuture<T, E> + Send + Sync + 'static>;

pub(crate) fn boxed_factory<T, E, F, Fut>(factory: F) -> BoxedFactory<T, E>
where
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, E>> + Send + 'static,
{
  Arc::new(move || factory().boxed())
}
