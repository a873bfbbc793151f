//! Field names and message types of the hub's JSON protocol.

// Envelope
pub const SUCCESS: &str = "success";
pub const TYPE: &str = "type";
pub const ERROR_CODE: &str = "errorCode";
pub const ERROR: &str = "error";
pub const MESSAGE: &str = "message";

// Message types
pub const AUTHENTICATION: &str = "Authentication";
pub const INCOMING_DATA: &str = "IncomingData";
pub const LIST_CONNECTED_KAIS: &str = "ListConnectedKais";
pub const KAI_CONNECTED: &str = "KaiConnected";
pub const SET_CAPABILITIES: &str = "SetCapabilities";

// Device identity
pub const KAI_ID: &str = "kaiId";
pub const KAIS: &str = "kais";
pub const HAND: &str = "hand";
pub const DEFAULT_KAI: &str = "defaultKai";
pub const DEFAULT_LEFT_KAI: &str = "defaultLeftKai";
pub const DEFAULT_RIGHT_KAI: &str = "defaultRightKai";
pub const KAI_SERIAL_NUMBER: &str = "kaiSerialNumber";

// IncomingData
pub const FOREGROUND_PROCESS: &str = "foregroundProcess";
pub const DATA: &str = "data";
