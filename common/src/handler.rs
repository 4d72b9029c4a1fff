//! [`Handler`] abstractions.

use std::{future::Future, sync::Arc};

/// Executable handler.
///
/// Every operation in the system (a [`Command`], a [`Query`], a database or a
/// payment gateway call) is expressed as a [`Handler`] of its arguments, so
/// the infrastructure is swappable at the type level.
///
/// [`Command`]: https://en.wikipedia.org/wiki/Command_pattern
/// [`Query`]: https://en.wikipedia.org/wiki/Command%E2%80%93query_separation
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}

impl<H, Args> Handler<Args> for Arc<H>
where
    H: Handler<Args> + ?Sized,
{
    type Ok = H::Ok;
    type Err = H::Err;

    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>> {
        (**self).execute(args)
    }
}
