//! Device status code classification

use taglink_types::{StatusOutcome, TagStatus};
use tracing::debug;

use crate::reply::CommandReply;

/// Classifies a raw device code into an outcome band.
///
/// The outcome is [`StatusOutcome::Success`] exactly for code 0.
/// Codes above 1000 are communication-class and worth retrying;
/// codes 1..=1000 and codes at or below -50 are firmware-reported
/// hard faults; the remaining small negative band belongs to the
/// host/transport layer.
pub fn classify(code: i32) -> StatusOutcome {
    if code == 0 {
        StatusOutcome::Success
    } else if code > 1000 {
        StatusOutcome::SoftError
    } else if code > 0 {
        StatusOutcome::HardError
    } else if code > -50 {
        StatusOutcome::LocalError
    } else {
        StatusOutcome::HardError
    }
}

/// Decodes a command reply status into a classified [`TagStatus`].
///
/// `block` is the error-specific block index and is appended to the
/// message when non-negative; `first_block` and `last_block` delimit
/// the affected range when the device reports one.
pub fn decode(tag_id: &str, code: i32, block: i32, first_block: i32, last_block: i32) -> TagStatus {
    let outcome = classify(code);
    let mut message = match known_message(code) {
        Some(text) => text.to_owned(),
        None => {
            debug!(code, "unmapped reader status code");
            generic_message(code, outcome)
        }
    };
    if block >= 0 {
        message.push_str(&format!(" (block {block})"));
    }
    TagStatus {
        tag_id: tag_id.to_owned(),
        code,
        outcome,
        message,
        block,
        first_block,
        last_block,
    }
}

/// Decodes the status fields of an already parsed reply.
pub fn from_reply(tag_id: &str, reply: &CommandReply) -> TagStatus {
    decode(tag_id, reply.err, reply.err_blk, reply.fab, reply.lab)
}

fn generic_message(code: i32, outcome: StatusOutcome) -> String {
    match outcome {
        StatusOutcome::Success => "Success (no error)".to_owned(),
        StatusOutcome::SoftError => format!("Communication error (code {code})"),
        StatusOutcome::HardError if code < 0 => {
            format!("Non-recoverable reader error (code {code})")
        }
        StatusOutcome::HardError => format!("Non-recoverable tag error (code {code})"),
        StatusOutcome::LocalError => format!("Transport-level error (code {code})"),
    }
}

/// Message table for the firmware status codes this library knows.
///
/// Classification never depends on this table; adding a firmware code
/// means adding one row here.
fn known_message(code: i32) -> Option<&'static str> {
    let message = match code {
        0 => "Success (no error)",

        // Host-side errors (local band)
        -1 => "Library not initialized",
        -2 => "Invalid argument",
        -3 => "Operation not supported",
        -4 => "Device not found",
        -5 => "Device busy",
        -6 => "Input/output error",
        -7 => "No more data available",
        -8 => "Resource exhausted",
        -9 => "Concurrent access collision",
        -10 => "Unauthorized access",
        -11 => "Device clock not ready",
        -12 => "File not found on device",
        -13 => "Secure connection error",

        // Deep firmware faults
        -50 => "Firmware fault",
        -51 => "Invalid firmware state",
        -52 => "Unsupported firmware revision",
        -60 => "Radio hardware failure",
        -61 => "Antenna fault",
        -100 => "Internal reader error",

        // Command-level errors
        1 => "Command not supported",
        2 => "Command not recognized",
        3 => "Command option not recognized",
        4 => "Command cannot be processed in time",
        5 => "Command rejected by reader",
        15 => "Undocumented error",

        // Block addressing and locking
        16 => "Block is not available",
        17 => "Block is already locked and cannot be modified",
        18 => "Block is locked and its content cannot be changed",
        19 => "Block was not successfully programmed",
        20 => "Block was not successfully locked",
        21 => "Block is protected",
        22 => "Block is reserved by the manufacturer",
        23 => "Block index is out of range",
        24 => "Block range crosses a sector boundary",
        25 => "Block does not exist on this tag",
        26 => "Block is a special block",
        27 => "Block count is too large",
        28 => "Block zero is reserved",
        29 => "Invalid block mode combination",
        30 => "Block might be protected",
        31 => "Reading beyond the announced tag size",

        // Security and authentication
        64 => "Cryptographic error",
        65 => "Authentication required",
        66 => "Authentication failed",
        67 => "Access key is not changeable",
        68 => "Key B is readable and cannot authenticate",
        69 => "Use key A for this operation",
        70 => "Use key B for this operation",
        71 => "Bad password format",
        72 => "Tag memory is password protected",

        // MIFARE Classic specific
        100 => "MIFARE authentication required",
        101 => "MIFARE sector trailer is not a data block",
        102 => "MIFARE access bits forbid this operation",
        103 => "MIFARE value block has bad format",
        104 => "Feature restricted to MIFARE Classic tags",
        105 => "Blocks do not belong to the same sector",

        // ISO 15693 specific
        120 => "Feature restricted to ISO 15693 tags",
        121 => "AFI is not available on this tag",
        122 => "DSFID is not available on this tag",
        123 => "Unexpected VICC identifier in response",
        124 => "Multi-block access not supported by this tag",

        // ISO 14443 and NTAG specific
        140 => "Feature restricted to ISO 14443 tags",
        141 => "NTAG counter is not enabled",
        142 => "Dynamic lock bytes are unreachable",

        // Request format errors
        200 => "Decimal value expected",
        201 => "Hexadecimal value expected",
        202 => "Invalid hexadecimal payload",
        203 => "Payload size is invalid",
        204 => "Payload exceeds tag capacity",
        205 => "Read count must be positive",
        206 => "Invalid access mode combination",
        207 => "Unknown tag memory layout",
        208 => "Lock command not supported by this tag",
        209 => "Radio is switched off",

        // Communication-class errors (retryable)
        1001 => "Reader is busy",
        1002 => "Tag was not found",
        1003 => "Tag has left the reader field",
        1004 => "Tag left the reader field during the operation",
        1005 => "Tag communication error",
        1006 => "Tag is not responding",
        1007 => "Response timeout",
        1008 => "Collision with another tag detected",
        1009 => "Corrupted response received",
        1010 => "Data acquisition error",
        1011 => "CRC error in tag response",
        1012 => "Reader service unavailable",
        1013 => "Reader runtime error",
        1014 => "Driver wakeup timeout",
        1015 => "Unexpected tag identifier in response",
        1016 => "Unexpected tag index in response",
        1017 => "Read data missing from response",
        1018 => "Write data was not accepted",
        1019 => "Transfer closed unexpectedly",
        1020 => "Request could not be built",
        1021 => "Invalid request options",
        1022 => "Unexpected response from reader",
        1023 => "Tag response too short",
        1024 => "Tag moved during read",
        1025 => "Tag moved during write",
        1026 => "Field strength too low",
        1027 => "Too many tags in the field",
        1028 => "Tag type mismatch during operation",
        1029 => "Operation interrupted by reader reset",
        1030 => "Tag memory fault",

        _ => return None,
    };
    Some(message)
}
