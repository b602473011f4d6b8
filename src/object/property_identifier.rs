use crate::generate_custom_enum;

generate_custom_enum! {
    /// BACnet property identifiers (clause 21, BACnetPropertyIdentifier)
    PropertyIdentifier {
        AckedTransitions = 0,
        AckRequired = 1,
        Action = 2,
        ActionText = 3,
        ActiveText = 4,
        ActiveVtSessions = 5,
        AlarmValue = 6,
        AlarmValues = 7,
        /// Special identifier: every property of the object.
        All = 8,
        AllWritesSuccessful = 9,
        ApduSegmentTimeout = 10,
        ApduTimeout = 11,
        ApplicationSoftwareVersion = 12,
        Archive = 13,
        Bias = 14,
        ChangeOfStateCount = 15,
        ChangeOfStateTime = 16,
        NotificationClass = 17,
        ControlledVariableReference = 19,
        ControlledVariableUnits = 20,
        ControlledVariableValue = 21,
        CovIncrement = 22,
        DateList = 23,
        DaylightSavingsStatus = 24,
        Deadband = 25,
        DerivativeConstant = 26,
        DerivativeConstantUnits = 27,
        Description = 28,
        DescriptionOfHalt = 29,
        DeviceAddressBinding = 30,
        DeviceType = 31,
        EffectivePeriod = 32,
        ElapsedActiveTime = 33,
        ErrorLimit = 34,
        EventEnable = 35,
        EventState = 36,
        EventType = 37,
        ExceptionSchedule = 38,
        FaultValues = 39,
        FeedbackValue = 40,
        FileAccessMethod = 41,
        FileSize = 42,
        FileType = 43,
        FirmwareRevision = 44,
        HighLimit = 45,
        InactiveText = 46,
        InProcess = 47,
        InstanceOf = 48,
        IntegralConstant = 49,
        IntegralConstantUnits = 50,
        LimitEnable = 52,
        ListOfGroupMembers = 53,
        ListOfObjectPropertyReferences = 54,
        LocalDate = 56,
        LocalTime = 57,
        Location = 58,
        LowLimit = 59,
        ManipulatedVariableReference = 60,
        MaximumOutput = 61,
        MaxApduLengthAccepted = 62,
        MaxInfoFrames = 63,
        MaxMaster = 64,
        MaxPresValue = 65,
        MinimumOffTime = 66,
        MinimumOnTime = 67,
        MinimumOutput = 68,
        MinPresValue = 69,
        ModelName = 70,
        ModificationDate = 71,
        NotifyType = 72,
        NumberOfApduRetries = 73,
        NumberOfStates = 74,
        ObjectIdentifier = 75,
        ObjectList = 76,
        ObjectName = 77,
        ObjectPropertyReference = 78,
        ObjectType = 79,
        /// Special identifier: the optional properties of the object.
        Optional = 80,
        OutOfService = 81,
        OutputUnits = 82,
        EventParameters = 83,
        Polarity = 84,
        PresentValue = 85,
        Priority = 86,
        PriorityArray = 87,
        PriorityForWriting = 88,
        ProcessIdentifier = 89,
        ProgramChange = 90,
        ProgramLocation = 91,
        ProgramState = 92,
        ProportionalConstant = 93,
        ProportionalConstantUnits = 94,
        ProtocolObjectTypesSupported = 96,
        ProtocolServicesSupported = 97,
        ProtocolVersion = 98,
        ReadOnly = 99,
        ReasonForHalt = 100,
        RecipientList = 102,
        Reliability = 103,
        RelinquishDefault = 104,
        /// Special identifier: the required properties of the object.
        Required = 105,
        Resolution = 106,
        SegmentationSupported = 107,
        Setpoint = 108,
        SetpointReference = 109,
        StateText = 110,
        StatusFlags = 111,
        SystemStatus = 112,
        TimeDelay = 113,
        TimeOfActiveTimeReset = 114,
        TimeOfStateCountReset = 115,
        TimeSynchronizationRecipients = 116,
        Units = 117,
        UpdateInterval = 118,
        UtcOffset = 119,
        VendorIdentifier = 120,
        VendorName = 121,
        VtClassesSupported = 122,
        WeeklySchedule = 123,
        ProtocolRevision = 139,
        ActiveCovSubscriptions = 152,
        DatabaseRevision = 155,
        MaxSegmentsAccepted = 167,
        LastRestartReason = 196,
        NodeSubtype = 207,
        NodeType = 208,
        StructuredObjectList = 209,
        SubordinateAnnotations = 210,
        SubordinateList = 211,
        PropertyList = 371,
        SerialNumber = 372,
        CurrentCommandPriority = 431,
    },
    u32,
    512..=4194303
}

impl PropertyIdentifier {
    /// Whether this identifier selects a group of properties (`All`,
    /// `Required` or `Optional`) rather than a single one.
    pub fn is_special(&self) -> bool {
        matches!(
            self,
            PropertyIdentifier::All | PropertyIdentifier::Required | PropertyIdentifier::Optional
        )
    }
}
