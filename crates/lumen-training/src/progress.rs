use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { run_uid: String },
    Message { run_uid: String, message: String },
    Epoch { run_uid: String, epoch: u32, total: u32, train_loss: f64, val_loss: f64 },
    Finished { run_uid: String },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { run_uid } => println!("[finetune:{run_uid}] started"),
            ProgressEvent::Message { run_uid, message } => {
                println!("[finetune:{run_uid}] {message}");
            }
            ProgressEvent::Epoch { run_uid, epoch, total, train_loss, val_loss } => {
                println!(
                    "[finetune:{run_uid}] epoch {epoch}/{total} train_loss={train_loss:.6} val_loss={val_loss:.6}"
                );
            }
            ProgressEvent::Finished { run_uid } => println!("[finetune:{run_uid}] finished"),
        }
    }
}

/// Sink that drops every event. Useful in tests.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}
