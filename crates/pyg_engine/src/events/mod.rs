//! Cross-thread engine control
//!
//! Component callbacks run on the scheduler thread only. Other threads (an
//! editor, a signal handler, a test harness) steer the engine by sending
//! [`EngineCommand`]s through a cloneable [`EngineHandle`]. The scheduler
//! drains its [`EngineMailbox`] at the start of every frame, so commands are
//! applied in send order and never in the middle of a pass.

use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};

/// A request sent to the running scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCommand {
    /// Stop the loop and tear the scene down
    Stop,
    /// Pause simulation time
    Pause,
    /// Resume simulation time
    Resume,
    /// Change the time scale; non-positive values are rejected by the engine
    SetTimeScale(f64),
}

/// Sending side, handed out by [`crate::Engine::handle`]
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: Sender<EngineCommand>,
}

impl EngineHandle {
    /// Queue a command; returns false when the engine is gone
    pub fn send(&self, command: EngineCommand) -> bool {
        self.sender.send(command).is_ok()
    }

    /// Request a stop
    pub fn stop(&self) -> bool {
        self.send(EngineCommand::Stop)
    }

    /// Request a pause
    pub fn pause(&self) -> bool {
        self.send(EngineCommand::Pause)
    }

    /// Request a resume
    pub fn resume(&self) -> bool {
        self.send(EngineCommand::Resume)
    }

    /// Request a new time scale
    pub fn set_time_scale(&self, scale: f64) -> bool {
        self.send(EngineCommand::SetTimeScale(scale))
    }
}

/// Receiving side, owned by the scheduler
#[derive(Debug)]
pub struct EngineMailbox {
    sender: Sender<EngineCommand>,
    receiver: Receiver<EngineCommand>,
}

impl EngineMailbox {
    /// Create an empty mailbox
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// New handle feeding this mailbox
    pub fn handle(&self) -> EngineHandle {
        EngineHandle { sender: self.sender.clone() }
    }

    /// Take every command queued so far, in send order
    pub fn drain(&self) -> Vec<EngineCommand> {
        let mut commands = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(command) => commands.push(command),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        commands
    }
}

impl Default for EngineMailbox {
    fn default() -> Self {
        Self::new()
    }
}
