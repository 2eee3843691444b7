//! Bridge between the presentation layer and the command router.
//!
//! The router runs on its own thread and owns the store. Callers post JSON
//! requests over a channel and get one JSON reply back per call, so only
//! serializable data ever crosses the boundary.

pub mod contract;

use std::thread::{self, JoinHandle};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use self::contract::{open_envelope, Command, Request};
use crate::error::{BridgeError, Failure, StoreError};
use crate::router::Router;

const WORKER_NAME: &str = "command-router";

/// A single request in flight, paired with the slot its reply goes to.
struct Call {
    request: Value,
    reply: oneshot::Sender<Value>,
}

pub struct Bridge {
    calls: mpsc::UnboundedSender<Call>,
    worker: JoinHandle<Result<(), StoreError>>,
}

impl Bridge {
    /// Move the router onto a dedicated thread and return a handle to it.
    pub fn spawn(mut router: Router) -> Result<Self, BridgeError> {
        let (calls, mut inbox) = mpsc::unbounded_channel::<Call>();

        let worker = thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || {
                info!("command router started");
                while let Some(call) = inbox.blocking_recv() {
                    let response = router.dispatch_value(call.request);
                    // The caller may have given up on the reply; nothing to do then.
                    let _ = call.reply.send(response);
                }
                info!("command router stopping");
                router.shutdown()
            })
            .map_err(BridgeError::Spawn)?;

        Ok(Self { calls, worker })
    }

    /// Invoke a typed operation and wait for its output.
    pub async fn call<C: Command>(&self, command: C) -> Result<C::Output, Failure> {
        let pending = self.post(encode(command.into())?)?;
        let response = pending.await.map_err(|_| disconnected())?;
        open_envelope(response)
    }

    /// Blocking variant of [`Bridge::call`] for synchronous callers such as
    /// the terminal UI loop. Must not be used from within an async runtime.
    pub fn call_blocking<C: Command>(&self, command: C) -> Result<C::Output, Failure> {
        let pending = self.post(encode(command.into())?)?;
        let response = pending.blocking_recv().map_err(|_| disconnected())?;
        open_envelope(response)
    }

    /// Invoke an operation by name with raw JSON arguments. Resolves to the
    /// full success envelope, or the failure it carried.
    pub async fn invoke(&self, operation: &str, args: Value) -> Result<Value, Failure> {
        let mut request = serde_json::Map::new();
        request.insert("operation".into(), Value::String(operation.to_string()));
        if !args.is_null() {
            request.insert("args".into(), args);
        }

        let response = self
            .post(Value::Object(request))?
            .await
            .map_err(|_| disconnected())?;
        open_envelope(response)
    }

    /// Stop accepting calls, let the router finish, and close the store.
    pub fn shutdown(self) -> Result<(), BridgeError> {
        let Bridge { calls, worker } = self;
        drop(calls);
        let closed = worker.join().map_err(|_| BridgeError::WorkerPanicked)?;
        debug!("bridge shut down");
        closed.map_err(BridgeError::from)
    }

    fn post(&self, request: Value) -> Result<oneshot::Receiver<Value>, Failure> {
        let (reply, pending) = oneshot::channel();
        self.calls
            .send(Call { request, reply })
            .map_err(|_| disconnected())?;
        Ok(pending)
    }
}

fn encode(request: Request) -> Result<Value, Failure> {
    serde_json::to_value(&request).map_err(|err| Failure::new(format!("invalid request: {err}")))
}

fn disconnected() -> Failure {
    Failure::new("the command router is not running")
}
