//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
    iter,
};

use derive_more::Display;
use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Background environment for running [`Task`]s.
///
/// Resolves once all the spawned [`Task`]s complete, or with the first
/// [`Failed`] one.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set of tasks.
    set: task::LocalSet,

    /// Handles of spawned tasks.
    handles: Vec<task::JoinHandle<Result<(), Failed>>>,
}

impl Background {
    /// Spawns a new named [`Task`] inside the [`Background`] environment.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        log::debug!("spawning `{name}` background task");
        self.handles.push(self.set.spawn_local(future.map_err(move |e| {
            Failed {
                task: name,
                source: Box::new(e),
            }
        })));
    }

    /// Returns the number of spawned [`Task`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Indicates whether no [`Task`] has been spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Failed>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        future::try_join_all(iter::once(set.map(Ok).boxed_local()).chain(
            handles.into_iter().map(|h| {
                h.map(|r| match r {
                    Ok(res) => res,
                    Err(e) => Err(Failed {
                        task: "<unknown>",
                        source: Box::new(e),
                    }),
                })
                .boxed_local()
            }),
        ))
        .map_ok(drop)
        .boxed_local()
    }
}

/// Error of a [`Task`] failed in [`Background`].
#[derive(Debug, Display)]
#[display("`{task}` background task failed: {source}")]
pub struct Failed {
    /// Name of the failed [`Task`].
    pub task: &'static str,

    /// Cause of the failure.
    pub source: Box<dyn Error + 'static>,
}

impl Error for Failed {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

#[cfg(test)]
mod spec {
    use derive_more::{Display, Error};

    use super::Background;

    #[derive(Debug, Display, Error)]
    #[display("boom")]
    struct Boom;

    #[tokio::test]
    async fn reports_failed_task_name() {
        let mut bg = Background::default();
        bg.spawn("quiet", async { Ok::<_, Boom>(()) });
        bg.spawn("noisy", async { Err(Boom) });
        assert_eq!(bg.len(), 2);

        let err = bg.await.unwrap_err();

        assert_eq!(err.task, "noisy");
        assert_eq!(err.to_string(), "`noisy` background task failed: boom");
    }
}
