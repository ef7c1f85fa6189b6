//! Response status categories and code tables.
//!
//! A RESPONSE envelope carries a status as two bytes: a category and a
//! code. The category selects which table the code is read against. Code
//! zero means success in every category.

use std::fmt;

use crate::constants::*;

/// Declares a status code table: an enum with an `Unknown(u8)` fallback,
/// `From<u8>`, `From<Enum> for u8`, `as_str` and `Display`.
macro_rules! status_table {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident = $value:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[doc = $label]
                $variant,
            )+
            /// Code not in the table.
            Unknown(u8),
        }

        impl $name {
            /// Table name of the code.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Unknown(_) => "UNKNOWN",
                }
            }
        }

        impl From<u8> for $name {
            fn from(code: u8) -> Self {
                match code {
                    $($value => $name::$variant,)+
                    other => $name::Unknown(other),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(code: $name) -> Self {
                match code {
                    $($name::$variant => $value,)+
                    $name::Unknown(other) => other,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $name::Unknown(code) => write!(f, "UNKNOWN (0x{:02X})", code),
                    known => f.write_str(known.as_str()),
                }
            }
        }
    };
}

status_table! {
    /// Generic return codes.
    GenericStatus {
        Ok = 0 => "OK",
        Error = 1 => "ERROR",
        Blocked = 2 => "BLOCKED",
        Exit = 3 => "EXIT",
        Busy = 4 => "BUSY",
        Eof = 5 => "EOF",
        OutOfRange = 6 => "OUT_OF_RANGE",
        Empty = 7 => "EMPTY",
        Cancelled = 8 => "CANCELLED",
        InvalidParameter1 = 10 => "INVALID_PARAMETER_1",
        InvalidParameter2 = 11 => "INVALID_PARAMETER_2",
        InvalidParameter3 = 12 => "INVALID_PARAMETER_3",
        InvalidParameter4 = 13 => "INVALID_PARAMETER_4",
        InvalidParameter5 = 14 => "INVALID_PARAMETER_5",
        InvalidParameter6 = 15 => "INVALID_PARAMETER_6",
        InvalidParameter7 = 16 => "INVALID_PARAMETER_7",
        InvalidParameter8 = 17 => "INVALID_PARAMETER_8",
        InvalidParameter9 = 18 => "INVALID_PARAMETER_9",
        InvalidParameter10 = 19 => "INVALID_PARAMETER_10",
        InvalidParameter11OrMore = 20 => "INVALID_PARAMETER_11_OR_MORE",
        Pending = 21 => "PENDING",
        NoMemory = 22 => "NO_MEMORY",
        InvalidParameter = 23 => "INVALID_PARAMETER",
        OperationFailed = 24 => "OPERATION_FAILED",
        BufferTooSmall = 25 => "BUFFER_TOO_SMALL",
        EndOfList = 26 => "END_OF_LIST",
        AlreadyExists = 27 => "ALREADY_EXISTS",
        NotFound = 28 => "NOT_FOUND",
        Overflow = 29 => "OVERFLOW",
        Timeout = 30 => "TIMEOUT",
        NotImplemented = 31 => "NOT_IMPLEMENTED",
        NoResources = 32 => "NO_RESOURCES",
        Uninitialized = 33 => "UNINITIALIZED",
        NoServer = 34 => "NO_SERVER",
        InvalidState = 35 => "INVALID_STATE",
        ConnectionFailed = 37 => "CONNECTION_FAILED",
        ConnectionLost = 38 => "CONNECTION_LOST",
        Unauthorized = 40 => "UNAUTHORIZED",
        Conflict = 41 => "CONFLICT",
        InvalidFormat = 42 => "INVALID_FORMAT",
        NoMatch = 43 => "NO_MATCH",
        ProtocolError = 44 => "PROTOCOL_ERROR",
        Version = 45 => "VERSION",
        MalformedAddress = 46 => "MALFORMED_ADDRESS",
        IllegalRequest = 62 => "ILLEGAL_REQUEST",
        InvalidGroup = 64 => "INVALID_GROUP",
        TableFull = 65 => "TABLE_FULL",
        Ignore = 69 => "IGNORE",
        Again = 70 => "AGAIN",
        DeviceNotFound = 71 => "DEVICE_NOT_FOUND",
        Obsolete = 72 => "OBSOLETE",
    }
}

status_table! {
    /// IEEE 802.15.4 MAC status codes.
    MacStatus {
        Success = 0x00 => "SUCCESS",
        CounterError = 0xDB => "COUNTER_ERROR",
        ImproperKeyType = 0xDC => "IMPROPER_KEY_TYPE",
        ImproperSecurityLevel = 0xDD => "IMPROPER_SECURITY_LEVEL",
        UnsupportedLegacy = 0xDE => "UNSUPPORTED_LEGACY",
        UnsupportedSecurity = 0xDF => "UNSUPPORTED_SECURITY",
        BeaconLoss = 0xE0 => "BEACON_LOSS",
        ChannelAccessFailure = 0xE1 => "CHANNEL_ACCESS_FAILURE",
        Denied = 0xE2 => "DENIED",
        DisableTrxFailure = 0xE3 => "DISABLE_TRX_FAILURE",
        SecurityError = 0xE4 => "SECURITY_ERROR",
        FrameTooLong = 0xE5 => "FRAME_TOO_LONG",
        InvalidGts = 0xE6 => "INVALID_GTS",
        InvalidHandle = 0xE7 => "INVALID_HANDLE",
        InvalidParameter = 0xE8 => "INVALID_PARAMETER",
        NoAck = 0xE9 => "NO_ACK",
        NoBeacon = 0xEA => "NO_BEACON",
        NoData = 0xEB => "NO_DATA",
        NoShortAddress = 0xEC => "NO_SHORT_ADDRESS",
        OutOfCap = 0xED => "OUT_OF_CAP",
        PanIdConflict = 0xEE => "PAN_ID_CONFLICT",
        Realignment = 0xEF => "REALIGNMENT",
        TransactionExpired = 0xF0 => "TRANSACTION_EXPIRED",
        TransactionOverflow = 0xF1 => "TRANSACTION_OVERFLOW",
        TxActive = 0xF2 => "TX_ACTIVE",
        UnavailableKey = 0xF3 => "UNAVAILABLE_KEY",
        UnsupportedAttribute = 0xF4 => "UNSUPPORTED_ATTRIBUTE",
        InvalidAddress = 0xF5 => "INVALID_ADDRESS",
        OnTimeTooLong = 0xF6 => "ON_TIME_TOO_LONG",
        PastTime = 0xF7 => "PAST_TIME",
        TrackingOff = 0xF8 => "TRACKING_OFF",
        InvalidIndex = 0xF9 => "INVALID_INDEX",
        LimitReached = 0xFA => "LIMIT_REACHED",
        ReadOnly = 0xFB => "READ_ONLY",
        ScanInProgress = 0xFC => "SCAN_IN_PROGRESS",
        SuperframeOverlap = 0xFD => "SUPERFRAME_OVERLAP",
    }
}

status_table! {
    /// Network layer status codes.
    NwkStatus {
        Success = 0x00 => "SUCCESS",
        InvalidParameter = 0xC1 => "INVALID_PARAMETER",
        InvalidRequest = 0xC2 => "INVALID_REQUEST",
        NotPermitted = 0xC3 => "NOT_PERMITTED",
        StartupFailure = 0xC4 => "STARTUP_FAILURE",
        AlreadyPresent = 0xC5 => "ALREADY_PRESENT",
        SyncFailure = 0xC6 => "SYNC_FAILURE",
        NeighborTableFull = 0xC7 => "NEIGHBOR_TABLE_FULL",
        UnknownDevice = 0xC8 => "UNKNOWN_DEVICE",
        UnsupportedAttribute = 0xC9 => "UNSUPPORTED_ATTRIBUTE",
        NoNetworks = 0xCA => "NO_NETWORKS",
        MaxFrmCounter = 0xCC => "MAX_FRM_COUNTER",
        NoKey = 0xCD => "NO_KEY",
        BadCcmOutput = 0xCE => "BAD_CCM_OUTPUT",
        RouteDiscoveryFailed = 0xD0 => "ROUTE_DISCOVERY_FAILED",
        RouteError = 0xD1 => "ROUTE_ERROR",
        BtTableFull = 0xD2 => "BT_TABLE_FULL",
        FrameNotBuffered = 0xD3 => "FRAME_NOT_BUFFERED",
    }
}

status_table! {
    /// Application support sub-layer status codes.
    ApsStatus {
        Success = 0x00 => "SUCCESS",
        AsduTooLong = 0xA0 => "ASDU_TOO_LONG",
        DefragDeferred = 0xA1 => "DEFRAG_DEFERRED",
        DefragUnsupported = 0xA2 => "DEFRAG_UNSUPPORTED",
        IllegalRequest = 0xA3 => "ILLEGAL_REQUEST",
        InvalidBinding = 0xA4 => "INVALID_BINDING",
        InvalidGroup = 0xA5 => "INVALID_GROUP",
        InvalidParameter = 0xA6 => "INVALID_PARAMETER",
        NoAck = 0xA7 => "NO_ACK",
        NoBoundDevice = 0xA8 => "NO_BOUND_DEVICE",
        NoShortAddress = 0xA9 => "NO_SHORT_ADDRESS",
        NotSupported = 0xAA => "NOT_SUPPORTED",
        SecuredLinkKey = 0xAB => "SECURED_LINK_KEY",
        SecuredNwkKey = 0xAC => "SECURED_NWK_KEY",
        SecurityFail = 0xAD => "SECURITY_FAIL",
        TableFull = 0xAE => "TABLE_FULL",
        Unsecured = 0xAF => "UNSECURED",
        UnsupportedAttribute = 0xB0 => "UNSUPPORTED_ATTRIBUTE",
    }
}

status_table! {
    /// Device object (coordination) status codes.
    ZdoStatus {
        Success = 0x00 => "SUCCESS",
        InvalidRequestType = 0x80 => "INV_REQUESTTYPE",
        DeviceNotFound = 0x81 => "DEVICE_NOT_FOUND",
        InvalidEndpoint = 0x82 => "INVALID_EP",
        NotActive = 0x83 => "NOT_ACTIVE",
        NotSupported = 0x84 => "NOT_SUPPORTED",
        Timeout = 0x85 => "TIMEOUT",
        NoMatch = 0x86 => "NO_MATCH",
        NoEntry = 0x88 => "NO_ENTRY",
        NoDescriptor = 0x89 => "NO_DESCRIPTOR",
        InsufficientSpace = 0x8A => "INSUFFICIENT_SPACE",
        NotPermitted = 0x8B => "NOT_PERMITTED",
        TableFull = 0x8C => "TABLE_FULL",
        NotAuthorized = 0x8D => "NOT_AUTHORIZED",
        BindingTableFull = 0x8E => "DEVICE_BINDING_TABLE_FULL",
    }
}

status_table! {
    /// Certificate-based key exchange status codes.
    CbkeStatus {
        Success = 0 => "SUCCESS",
        UnknownIssuer = 1 => "UNKNOWN_ISSUER",
        BadKeyConfirm = 2 => "BAD_KEY_CONFIRM",
        BadMessage = 3 => "BAD_MESSAGE",
        NoResources = 4 => "NO_RESOURCES",
        UnsupportedSuite = 5 => "UNSUPPORTED_SUITE",
        InvalidCertificate = 6 => "INVALID_CERTIFICATE",
    }
}

/// Which table a status code is read against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
    /// Generic return codes.
    Generic,
    /// Operating-system style error numbers.
    System,
    /// IEEE 802.15.4 MAC.
    Mac,
    /// Network layer.
    Network,
    /// Application support sub-layer.
    ApplicationSupport,
    /// Device object (coordination).
    Coordination,
    /// Certificate-based key exchange.
    KeyExchange,
    /// Category not known to this crate.
    Unknown(u8),
}

impl StatusCategory {
    /// Short category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::Generic => "GENERIC",
            StatusCategory::System => "SYSTEM",
            StatusCategory::Mac => "MAC",
            StatusCategory::Network => "NWK",
            StatusCategory::ApplicationSupport => "APS",
            StatusCategory::Coordination => "ZDO",
            StatusCategory::KeyExchange => "CBKE",
            StatusCategory::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<u8> for StatusCategory {
    fn from(value: u8) -> Self {
        match value {
            STATUS_CAT_GENERIC => StatusCategory::Generic,
            STATUS_CAT_SYSTEM => StatusCategory::System,
            STATUS_CAT_MAC => StatusCategory::Mac,
            STATUS_CAT_NWK => StatusCategory::Network,
            STATUS_CAT_APS => StatusCategory::ApplicationSupport,
            STATUS_CAT_ZDO => StatusCategory::Coordination,
            STATUS_CAT_CBKE => StatusCategory::KeyExchange,
            other => StatusCategory::Unknown(other),
        }
    }
}

impl From<StatusCategory> for u8 {
    fn from(category: StatusCategory) -> Self {
        match category {
            StatusCategory::Generic => STATUS_CAT_GENERIC,
            StatusCategory::System => STATUS_CAT_SYSTEM,
            StatusCategory::Mac => STATUS_CAT_MAC,
            StatusCategory::Network => STATUS_CAT_NWK,
            StatusCategory::ApplicationSupport => STATUS_CAT_APS,
            StatusCategory::Coordination => STATUS_CAT_ZDO,
            StatusCategory::KeyExchange => STATUS_CAT_CBKE,
            StatusCategory::Unknown(other) => other,
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCategory::Unknown(raw) => write!(f, "UNKNOWN ({})", raw),
            known => f.write_str(known.as_str()),
        }
    }
}

/// A status code interpreted against its category's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Generic return code.
    Generic(GenericStatus),
    /// Raw system error number.
    System(u8),
    /// MAC status.
    Mac(MacStatus),
    /// Network layer status.
    Network(NwkStatus),
    /// Application support status.
    ApplicationSupport(ApsStatus),
    /// Device object status.
    Coordination(ZdoStatus),
    /// Key exchange status.
    KeyExchange(CbkeStatus),
    /// Code under an unknown category.
    Raw(u8),
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Generic(code) => write!(f, "{}", code),
            StatusCode::System(0) => f.write_str("OK"),
            StatusCode::System(errno) => write!(f, "errno {}", errno),
            StatusCode::Mac(code) => write!(f, "{}", code),
            StatusCode::Network(code) => write!(f, "{}", code),
            StatusCode::ApplicationSupport(code) => write!(f, "{}", code),
            StatusCode::Coordination(code) => write!(f, "{}", code),
            StatusCode::KeyExchange(code) => write!(f, "{}", code),
            StatusCode::Raw(code) => write!(f, "0x{:02X}", code),
        }
    }
}

/// Status carried by a RESPONSE envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status {
    /// Table selector.
    pub category: StatusCategory,
    /// Raw code byte.
    pub code: u8,
}

impl Status {
    /// A generic success status.
    pub const OK: Status = Status {
        category: StatusCategory::Generic,
        code: 0,
    };

    /// Build from the two wire bytes.
    pub fn from_bytes(category: u8, code: u8) -> Self {
        Status {
            category: StatusCategory::from(category),
            code,
        }
    }

    /// Encode as the two wire bytes.
    pub fn to_bytes(&self) -> [u8; 2] {
        [u8::from(self.category), self.code]
    }

    /// Read the code against its category's table.
    pub fn decode(&self) -> StatusCode {
        match self.category {
            StatusCategory::Generic => StatusCode::Generic(GenericStatus::from(self.code)),
            StatusCategory::System => StatusCode::System(self.code),
            StatusCategory::Mac => StatusCode::Mac(MacStatus::from(self.code)),
            StatusCategory::Network => StatusCode::Network(NwkStatus::from(self.code)),
            StatusCategory::ApplicationSupport => {
                StatusCode::ApplicationSupport(ApsStatus::from(self.code))
            }
            StatusCategory::Coordination => StatusCode::Coordination(ZdoStatus::from(self.code)),
            StatusCategory::KeyExchange => StatusCode::KeyExchange(CbkeStatus::from(self.code)),
            StatusCategory::Unknown(_) => StatusCode::Raw(self.code),
        }
    }

    /// Whether the status reports success.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.decode())
    }
}
