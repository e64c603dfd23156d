use crate::core::error_signup::SignupError;
use crate::core::event::{InvocationContext, SignupEvent};
use crate::core::loader::ModuleSet;
use crate::core::settings::SiblingPolicy;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use tokio::task::AbortHandle;

/// Aborts the spawned units when dropped, if the policy asks for it. Covers the
/// first-failure return as well as the caller dropping the join on a deadline.
struct SiblingGuard {
    handles: Vec<AbortHandle>,
    policy: SiblingPolicy,
}

impl Drop for SiblingGuard {
    fn drop(&mut self) {
        if self.policy == SiblingPolicy::Abort {
            for handle in &self.handles {
                handle.abort();
            }
        }
    }
}

/// Runs every loaded handler as its own task and waits for all of them.
///
/// Returns on the first failure. With [`SiblingPolicy::Detach`] the remaining tasks
/// keep running after this returns; with [`SiblingPolicy::Abort`] they are aborted,
/// also when this future is dropped before it completes.
/// A panicking handler counts as a failure.
pub(crate) async fn run_all(
    modules: &ModuleSet,
    event: Arc<SignupEvent>,
    context: Arc<InvocationContext>,
    policy: SiblingPolicy,
) -> Result<(), SignupError> {
    let mut futures = FuturesUnordered::new();
    let mut guard = SiblingGuard {
        handles: Vec::with_capacity(modules.len()),
        policy,
    };

    for unit in modules.iter() {
        let handler = Arc::clone(&unit.handler);
        let event = Arc::clone(&event);
        let context = Arc::clone(&context);

        let task = tokio::spawn(async move { handler.handle_async(event, context).await });
        guard.handles.push(task.abort_handle());

        let name = unit.name.clone();
        futures.push(async move { (name, task.await) });
    }

    while let Some((name, result)) = futures.next().await {
        let failure = match result {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => SignupError::SubHandlerFailed(name, err.to_string()),
            Err(join_err) => SignupError::SubHandlerFailed(name, join_err.to_string()),
        };

        #[cfg(feature = "logging")]
        log::error!(
            "SignupHook. {} ({} sibling task(s) {})",
            failure,
            futures.len(),
            match policy {
                SiblingPolicy::Detach => "left running",
                SiblingPolicy::Abort => "aborted",
            }
        );

        drop(guard);
        return Err(failure);
    }

    Ok(())
}
