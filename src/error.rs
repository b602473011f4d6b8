//! Domain error type.
//!
//! Every failure that the runtime can report back to a BACnet peer is a
//! [`BacnetError`]: a human readable message paired with the protocol error
//! class and error code that end up in the Error-PDU.

use thiserror::Error;

use crate::generate_custom_enum;

/// Result type for operations that fail with a protocol level error
pub type Result<T> = std::result::Result<T, BacnetError>;

generate_custom_enum! {
    /// BACnet error class (clause 18)
    ErrorClass {
        Device = 0,
        Object = 1,
        Property = 2,
        Resources = 3,
        Security = 4,
        Services = 5,
        Vt = 6,
        Communication = 7,
    },
    u16,
    64..=65535
}

generate_custom_enum! {
    /// BACnet error code (clause 18)
    ErrorCode {
        Other = 0,
        ConfigurationInProgress = 2,
        DeviceBusy = 3,
        DynamicCreationNotSupported = 4,
        FileAccessDenied = 5,
        InconsistentParameters = 7,
        InconsistentSelectionCriterion = 8,
        InvalidDataType = 9,
        InvalidFileAccessMethod = 10,
        InvalidFileStartPosition = 11,
        InvalidParameterDataType = 13,
        InvalidTimeStamp = 14,
        MissingRequiredParameter = 16,
        NoObjectsOfSpecifiedType = 17,
        NoSpaceForObject = 18,
        NoSpaceToAddListElement = 19,
        NoSpaceToWriteProperty = 20,
        PropertyIsNotAList = 22,
        ObjectDeletionNotPermitted = 23,
        ObjectIdentifierAlreadyExists = 24,
        OperationalProblem = 25,
        ReadAccessDenied = 27,
        ServiceRequestDenied = 29,
        Timeout = 30,
        UnknownObject = 31,
        UnknownProperty = 32,
        UnsupportedObjectType = 36,
        ValueOutOfRange = 37,
        WriteAccessDenied = 40,
        CharacterSetNotSupported = 41,
        InvalidArrayIndex = 42,
        CovSubscriptionFailed = 43,
        NotCovProperty = 44,
        OptionalFunctionalityNotSupported = 45,
        InvalidConfigurationData = 46,
        DatatypeNotSupported = 47,
        DuplicateName = 48,
        DuplicateObjectId = 49,
        PropertyIsNotAnArray = 50,
        CommunicationDisabled = 83,
        InternalError = 131,
        NotConfigured = 132,
        OutOfMemory = 133,
        ValueTooLong = 134,
    },
    u16,
    256..=65535
}

/// Protocol level error: message, error class and error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({class}: {code})")]
pub struct BacnetError {
    message: String,
    class: ErrorClass,
    code: ErrorCode,
}

impl BacnetError {
    pub fn new(message: impl Into<String>, class: ErrorClass, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            class,
            code,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn unknown_object() -> Self {
        Self::new("unknown object", ErrorClass::Object, ErrorCode::UnknownObject)
    }

    pub fn unknown_property() -> Self {
        Self::new(
            "unknown property",
            ErrorClass::Property,
            ErrorCode::UnknownProperty,
        )
    }

    pub fn write_access_denied(message: impl Into<String>) -> Self {
        Self::new(message, ErrorClass::Property, ErrorCode::WriteAccessDenied)
    }

    pub fn invalid_array_index() -> Self {
        Self::new(
            "index out of range",
            ErrorClass::Property,
            ErrorCode::InvalidArrayIndex,
        )
    }

    pub fn not_an_array() -> Self {
        Self::new(
            "property is not an array",
            ErrorClass::Property,
            ErrorCode::PropertyIsNotAnArray,
        )
    }

    pub fn invalid_data_type(message: impl Into<String>) -> Self {
        Self::new(message, ErrorClass::Property, ErrorCode::InvalidDataType)
    }

    pub fn inconsistent_parameters(message: impl Into<String>) -> Self {
        Self::new(
            message,
            ErrorClass::Services,
            ErrorCode::InconsistentParameters,
        )
    }

    pub fn value_out_of_range(message: impl Into<String>) -> Self {
        Self::new(message, ErrorClass::Property, ErrorCode::ValueOutOfRange)
    }

    pub fn service_request_denied() -> Self {
        Self::new(
            "service not supported",
            ErrorClass::Services,
            ErrorCode::ServiceRequestDenied,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, ErrorClass::Device, ErrorCode::InternalError)
    }

    pub fn already_attached(message: impl Into<String>) -> Self {
        Self::new(
            message,
            ErrorClass::Object,
            ErrorCode::ObjectIdentifierAlreadyExists,
        )
    }
}
