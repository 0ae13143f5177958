//! State-change notification hook.
//!
//! A `StateObserver` is called synchronously right before a node's state is
//! updated. Returning an error vetoes the change: the state stays as it was
//! and the advance that attempted it fails.

use std::sync::Arc;

use procflow_types::error::HookError;
use procflow_types::event::ProcessEvent;
use procflow_types::node::{Node, State};
use procflow_types::process::Process;

use crate::event::EventBus;

pub trait StateObserver: Send + Sync {
    fn on_state_changing(&self, process: &Process, node: &Node, to: State) -> Result<(), HookError>;
}

/// Accepts every transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StateObserver for NoopObserver {
    fn on_state_changing(&self, _: &Process, _: &Node, _: State) -> Result<(), HookError> {
        Ok(())
    }
}

/// Publishes every transition as [`ProcessEvent::NodeStateChanging`].
#[derive(Debug, Clone)]
pub struct EventBusObserver {
    bus: EventBus,
}

impl EventBusObserver {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl StateObserver for EventBusObserver {
    fn on_state_changing(&self, process: &Process, node: &Node, to: State) -> Result<(), HookError> {
        self.bus.publish(ProcessEvent::NodeStateChanging {
            process_id: process.id,
            node_id: node.id.clone(),
            uid: node.uid.clone(),
            tag: node.tag.clone(),
            from: node.state,
            to,
        });
        Ok(())
    }
}

/// Runs several observers in order; the first rejection wins.
#[derive(Clone, Default)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn StateObserver>>,
}

impl ObserverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl StateObserver for ObserverChain {
    fn on_state_changing(&self, process: &Process, node: &Node, to: State) -> Result<(), HookError> {
        for observer in &self.observers {
            observer.on_state_changing(process, node, to)?;
        }
        Ok(())
    }
}
