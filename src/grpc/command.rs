//! Commands that can be invoked directly from the CLI in run mode.

use std::fmt::Debug;
use std::future::Future;

use clap::ArgMatches;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::errors::BoxError;

type FlagsFn = Box<dyn Fn(clap::Command) -> clap::Command + Send + Sync>;
type RunFn<T> = Box<dyn Fn(ArgMatches) -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync>;
type ErasedRunFn = Box<dyn Fn(ArgMatches) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// How a gRPC method is exposed under `run`.
///
/// `run` receives the parsed flags and calls the same handler the gRPC
/// service uses, without going through the transport.
pub struct Listener<T> {
    flags: Option<FlagsFn>,
    run: RunFn<T>,
}

impl<T: Send + 'static> Listener<T> {
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: Fn(ArgMatches) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        Self {
            flags: None,
            run: Box::new(move |matches| run(matches).boxed()),
        }
    }

    /// Declare the flags this command reads.
    pub fn with_flags<F>(mut self, flags: F) -> Self
    where
        F: Fn(clap::Command) -> clap::Command + Send + Sync + 'static,
    {
        self.flags = Some(Box::new(flags));
        self
    }
}

/// A registered command with its response type erased.
pub(crate) struct RunCommand {
    pub(crate) name: String,
    flags: Option<FlagsFn>,
    run: ErasedRunFn,
}

impl RunCommand {
    pub(crate) fn new<T>(name: impl Into<String>, listener: Listener<T>) -> Self
    where
        T: Debug + Send + 'static,
    {
        let Listener { flags, run } = listener;
        Self {
            name: name.into(),
            flags,
            run: Box::new(move |matches| {
                let pending = run(matches);
                async move {
                    let response = pending.await?;
                    tracing::info!(response = ?response, "Command resolved successfully");
                    Ok(())
                }
                .boxed()
            }),
        }
    }

    /// The clap sub-command for this entry, with its flags declared.
    pub(crate) fn cli(&self) -> clap::Command {
        let cmd = clap::Command::new(self.name.clone())
            .about(format!("Run the \"{}\" gRPC command", self.name));
        match &self.flags {
            Some(flags) => flags(cmd),
            None => cmd,
        }
    }

    pub(crate) async fn invoke(&self, matches: ArgMatches) -> Result<(), BoxError> {
        (self.run)(matches).await
    }
}
