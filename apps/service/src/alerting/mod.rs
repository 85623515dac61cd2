//! Alert fan-out: contact resolution, per-channel dispatch and push.

pub mod contacts;
pub mod dispatcher;
pub mod push;
pub mod senders;

pub use contacts::{ContactResolver, ContactSet};
pub use dispatcher::{AlertDispatcher, DispatchReport};
pub use push::PushNotifier;
pub use senders::{EmailSender, PushOutcome, PushSender, SenderError, VoiceCallSender, WebhookSender};
