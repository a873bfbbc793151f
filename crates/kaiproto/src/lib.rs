//! kaiproto - Wire types for the Kai hub protocol
//!
//! The hub speaks JSON text frames over a WebSocket. Every inbound frame is an
//! envelope with a `success` flag; successful envelopes carry a `type`
//! discriminator, failed ones an `errorCode`/`error`/`message` triple.
//!
//! ## Layout
//!
//! - [`identity`] - device slots ([`KaiId`]), [`Hand`], the re-pointable
//!   [`Alias`]es and the [`KaiTarget`]s callers address
//! - [`capability`] - the nine data streams a device can be asked for, as a
//!   bit set with delta computation
//! - [`event`] - decoded payloads ([`KaiEvent`]) and their listener keys
//! - [`codec`] - inbound frame decoding
//! - [`outbound`] - requests the SDK sends
//! - [`wire`] - field and message-type names
//!
//! ```
//! use kaiproto::{decode_frame, Inbound};
//!
//! let inbound = decode_frame(r#"{"success":true,"type":"Authentication"}"#).unwrap();
//! assert_eq!(inbound, Inbound::Authentication);
//! ```

pub mod capability;
pub mod codec;
pub mod event;
pub mod identity;
pub mod outbound;
pub mod wire;

pub use capability::{Capabilities, Capability, CapabilityDelta};
pub use codec::{
    decode_frame, decode_item, decode_value, CodecError, DefaultFlags, Inbound, IncomingData,
    KaiAnnouncement,
};
pub use event::{
    EventKind, Gesture, HubError, KaiEvent, Pyr, Quaternion, UnknownGestureName, Vector3,
};
pub use identity::{Alias, Hand, KaiId, KaiIdError, KaiTarget, WireKaiId, MAX_KAIS};
pub use outbound::Outbound;
