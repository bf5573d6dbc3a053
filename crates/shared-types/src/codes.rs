//! # Error Code Catalogue
//!
//! Stable numeric codes shared by the worker, the processors and the clients.
//!
//! | Range | Origin |
//! |-------|--------|
//! | 500-599 | Persistence layer |
//! | 800-849 | Worker validation and internal checks |
//! | 199, 24xxx | Worker start-up, provider lifecycle, finally processors |
//! | 21xxx | MLE client side |

/// A code paired with its default message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    /// Numeric code.
    pub id: u32,
    /// Default message.
    pub msg: &'static str,
}

macro_rules! codes {
    ($($(#[$doc:meta])* $name:ident = $id:expr, $msg:expr;)*) => {
        $(
            $(#[$doc])*
            pub const $name: ErrorCode = ErrorCode { id: $id, msg: $msg };
        )*
    };
}

codes! {
    ERR_PL_USER_NOT_FOUND = 503, "User not found";
    ERR_PL_SESSION_NOT_CREATED = 504, "Session not created";
    ERR_PL_ENC_SESSION_NOT_CREATED = 505, "Encrypted session not created";
    ERR_PL_SESSION_NOT_FOUND = 514, "Session not found";
    ERR_PL_SESSION_TOKEN = 523, "This session is not valid for this token";
    ERR_SESSION_MLE_LOOKUP = 528, "Error in getting the all the sessions of this user.";

    ERR_CIPHER_SUITE = 802, "Cipher_suite not valid";
    ERR_LEN_KEY = 803, "Length of key not valid";
    ERR_EVENT_NOT_FOUND = 810, "Event not found";
    ERR_CIPHER_SUITE_QUERY = 815, "Error in processing cipher_suite_query";
    ERR_SERVER = 816, "Server error";
    ERR_SESSION_EXPIRED = 817, "Session expired";
    ERR_REQ_PROCESSING = 818, "An error occurred while processing your request";
    ERR_REQ_PROCESSING_GENERIC = 819, "An error occurred while processing a request";
    ERR_GENERIC = 820, "An error has occurred";
    /// Not returned to the client, only logged.
    ERR_JSON = 821, "Error in converting the received event to JSON";
    ERR_SESSION_REQ = 822, "Event missing 'session' field";
    ERR_EVENT_REQ = 823, "Event missing 'event' field";
    ERR_UNRECOGNIZED_EVENT = 824, "Unrecognized input event";
    ERR_AUTHENTICATION_REQUIRED = 825, "Authentication required";
    ERR_SESSION_REQUIRED = 826, "Session required";
    ERR_TOKEN_HEX = 827, "The token can contain only hex chars";
    ERR_SESSION_HEX = 828, "The session can contain only hex chars";
    ERR_PARAMS_REQUIRED = 829, "Event missing 'params' field.";
    ERR_SESSION_FORMAT = 840, "The session format is not valid";

    ERR_INVALID_MACROS = 199, "Invalid macros for pipeline. Please check that there is no circular dependency.";

    ERR_CONFIG_PARSE = 24102, "Error in parsing the configuration file";
    ERR_CONFIG_INPUT = 24110, "Missing 'inputProvider' in configuration";
    ERR_CONFIG_OUTPUT = 24111, "Missing 'outputProvider' in configuration";
    ERR_CONFIG_INTEGRITY = 24112, "Missing 'integrityProvider' in configuration";
    ERR_CONFIG_ENCODING = 24113, "Missing 'encodingProvider' in configuration";
    ERR_CONFIG_DATABASE = 24114, "Missing 'databaseProvider' in configuration";
    ERR_CONFIG_BLOCKCHAIN = 24115, "Missing 'blockchainWorkerProvider' in configuration";
    ERR_CONFIG_PIPELINES = 24116, "Missing 'pipelines' in configuration";
    ERR_CONFIG_LOGGING = 24117, "Missing 'loggingProvider' in configuration";
    ERR_CONFIG_CRYPTO = 24118, "Missing 'cryptoProviders' in configuration";

    ERR_LOAD_INPUT = 24201, "Error in loading the input provider.";
    ERR_LOAD_OUTPUT = 24202, "Error in loading the output provider.";
    ERR_INIT_INPUT = 24203, "Error in initializing the input provider.";
    ERR_INIT_OUTPUT = 24204, "Error in initializing the output provider.";
    ERR_LOAD_PERSISTENCE = 24205, "Error in loading the persistence provider.";
    ERR_INIT_PERSISTENCE = 24206, "Error in initializing the persistence provider.";
    ERR_LOAD_INTEGRITY = 24207, "Error in loading the integrity provider.";
    ERR_LOAD_ENCODING = 24208, "Error in loading the encoding provider.";
    ERR_LOAD_BLOCKCHAIN = 24209, "Error in loading the blockchain provider.";
    ERR_INIT_BLOCKCHAIN = 24210, "Error in initializing the blockchain provider.";
    ERR_LOAD_LOGGER = 24211, "Error in loading Logger provider";
    ERR_INIT_LOGGER = 24212, "Error in initializing Logger provider.";
    ERR_LOAD_CRYPTO = 24213, "Error in loading the encryption provider.";
    ERR_INIT_CRYPTO = 24214, "Error in initializing the encryption provider.";
    ERR_LOAD_PROCESSOR = 24215, "Error in loading processor.";
    ERR_INIT_PROCESSOR = 24216, "Error in initializing processor.";

    ERR_OPEN_OUTPUT = 24301, "Error in opening the output provider.";
    ERR_OPEN_INPUT = 24302, "Error in opening the input provider.";
    ERR_OPEN_LOGGER = 24304, "Error in opening Logger provider.";
    ERR_OPEN_PERSISTENCE = 24305, "Error in opening the persistence provider.";
    ERR_OPEN_BLOCKCHAIN = 24306, "Error in opening the blockchain provider.";
    ERR_OPEN_PROCESSOR = 24307, "Error in opening processor.";
    ERR_OPEN_CRYPTO = 24308, "Error in opening the encryption provider.";

    ERR_CLOSE_INPUT = 24501, "Error in closing the input provider.";
    ERR_CLOSE_OUTPUT = 24502, "Error in closing the output provider.";
    ERR_CLOSE_PERSISTENCE = 24503, "Error in closing the persistence provider.";
    ERR_CLOSE_PROCESSOR = 24504, "Error in closing processor.";
    ERR_CLOSE_BLOCKCHAIN = 24505, "Error in closing the blockchain provider.";

    ERR_MLE_INTEGRITY_FUN = 24765, "MLE Error: integrity function not available";
    ERR_MLE_ENCAPSULATION = 24766, "An exception occurred while encapsulating DOP Event in MLE";

    ERR_MLE_INTEGRITY = 21268, "MLE Error: the recovered checksum does not match the one received.";
}

/// Informational message codes carried in replies.
pub mod messages {
    use super::ErrorCode;

    /// Reply to a successful `start_session`.
    pub const MSG_NEW_SESSION: ErrorCode = ErrorCode {
        id: 14,
        msg: "New session created",
    };
}

/// Log codes emitted by the dispatcher.
pub mod log {
    /// A new inbound event was received.
    pub const NEW_EVENT: u32 = 24601;
    /// The pipeline lookup succeeded.
    pub const LOOKUP_OK: u32 = 24604;
    /// A processor handled the event.
    pub const PROCESSOR_HANDLED: u32 = 24605;
    /// An event is about to be written to the output transport.
    pub const EVENT_TO_SEND: u32 = 24606;
}
