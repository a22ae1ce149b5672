//! PIMA 15740 / MTP wire code tables
//!
//! The tables carry the full standard code spaces even though the engine
//! dispatches only a handful of operations; unrecognized codes still need
//! names when they show up in logs and traces.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Operation codes carried in Command containers
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperationCode {
    GetDeviceInfo = 0x1001,
    OpenSession = 0x1002,
    CloseSession = 0x1003,
    GetStorageIds = 0x1004,
    GetStorageInfo = 0x1005,
    GetNumObjects = 0x1006,
    GetObjectHandles = 0x1007,
    GetObjectInfo = 0x1008,
    GetObject = 0x1009,
    GetThumb = 0x100A,
    DeleteObject = 0x100B,
    SendObjectInfo = 0x100C,
    SendObject = 0x100D,
    InitiateCapture = 0x100E,
    FormatStore = 0x100F,
    ResetDevice = 0x1010,
    SelfTest = 0x1011,
    SetObjectProtection = 0x1012,
    PowerDown = 0x1013,
    GetDevicePropDesc = 0x1014,
    GetDevicePropValue = 0x1015,
    SetDevicePropValue = 0x1016,
    ResetDevicePropValue = 0x1017,
    TerminateOpenCapture = 0x1018,
    MoveObject = 0x1019,
    CopyObject = 0x101A,
    GetPartialObject = 0x101B,
    InitiateOpenCapture = 0x101C,
    GetObjectPropsSupported = 0x9801,
    GetObjectPropDesc = 0x9802,
    GetObjectPropValue = 0x9803,
    SetObjectPropValue = 0x9804,
    GetObjectReferences = 0x9805,
    SetObjectReferences = 0x9806,
    Skip = 0x9820,
}

/// Response codes carried in Response containers
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseCode {
    Undefined = 0x2000,
    Ok = 0x2001,
    GeneralError = 0x2002,
    SessionNotOpen = 0x2003,
    InvalidTransactionId = 0x2004,
    OperationNotSupported = 0x2005,
    ParameterNotSupported = 0x2006,
    IncompleteTransfer = 0x2007,
    InvalidStorageId = 0x2008,
    InvalidObjectHandle = 0x2009,
    DevicePropNotSupported = 0x200A,
    InvalidObjectFormatCode = 0x200B,
    StoreFull = 0x200C,
    ObjectWriteProtected = 0x200D,
    StoreReadOnly = 0x200E,
    AccessDenied = 0x200F,
    NoThumbnailPresent = 0x2010,
    SelfTestFailed = 0x2011,
    PartialDeletion = 0x2012,
    StoreNotAvailable = 0x2013,
    SpecificationByFormatUnsupported = 0x2014,
    NoValidObjectInfo = 0x2015,
    InvalidCodeFormat = 0x2016,
    UnknownVendorCode = 0x2017,
    CaptureAlreadyTerminated = 0x2018,
    DeviceBusy = 0x2019,
    InvalidParentObject = 0x201A,
    InvalidDevicePropFormat = 0x201B,
    InvalidDevicePropValue = 0x201C,
    InvalidParameter = 0x201D,
    SessionAlreadyOpen = 0x201E,
    TransactionCancelled = 0x201F,
    SpecificationOfDestinationUnsupported = 0x2020,
    InvalidObjectPropCode = 0xA801,
    InvalidObjectPropFormat = 0xA802,
    InvalidObjectPropValue = 0xA803,
    InvalidObjectReference = 0xA804,
    GroupNotSupported = 0xA805,
    InvalidDataset = 0xA806,
    SpecificationByGroupUnsupported = 0xA807,
    SpecificationByDepthUnsupported = 0xA808,
    ObjectTooLarge = 0xA809,
    ObjectPropNotSupported = 0xA80A,
}

/// Event codes; the interrupt pipe never carries any here, the table exists
/// for the device-info report and for completeness.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventCode {
    Undefined = 0x4000,
    CancelTransaction = 0x4001,
    ObjectAdded = 0x4002,
    ObjectRemoved = 0x4003,
    StoreAdded = 0x4004,
    StoreRemoved = 0x4005,
    DevicePropChanged = 0x4006,
    ObjectInfoChanged = 0x4007,
    DeviceInfoChanged = 0x4008,
    RequestObjectTransfer = 0x4009,
    StoreFull = 0x400A,
    DeviceReset = 0x400B,
    StorageInfoChanged = 0x400C,
    CaptureComplete = 0x400D,
    UnreportedStatus = 0x400E,
    ObjectPropChanged = 0xC801,
    ObjectPropDescChanged = 0xC802,
    ObjectReferencesChanged = 0xC803,
}

/// Device property codes
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DevicePropCode {
    Undefined = 0x5000,
    BatteryLevel = 0x5001,
    FunctionalMode = 0x5002,
    ImageSize = 0x5003,
    CompressionSetting = 0x5004,
    WhiteBalance = 0x5005,
    RgbGain = 0x5006,
    FNumber = 0x5007,
    FocalLength = 0x5008,
    FocusDistance = 0x5009,
    FocusMode = 0x500A,
    ExposureMeteringMode = 0x500B,
    FlashMode = 0x500C,
    ExposureTime = 0x500D,
    ExposureProgramMode = 0x500E,
    ExposureIndex = 0x500F,
    ExposureBiasCompensation = 0x5010,
    DateTime = 0x5011,
    CaptureDelay = 0x5012,
    StillCaptureMode = 0x5013,
    Contrast = 0x5014,
    Sharpness = 0x5015,
    DigitalZoom = 0x5016,
    EffectMode = 0x5017,
    BurstNumber = 0x5018,
    BurstInterval = 0x5019,
    TimelapseNumber = 0x501A,
    TimelapseInterval = 0x501B,
    FocusMeteringMode = 0x501C,
    UploadUrl = 0x501D,
    Artist = 0x501E,
    CopyrightInfo = 0x501F,
    SynchronizationPartner = 0xD401,
    DeviceFriendlyName = 0xD402,
    Volume = 0xD403,
    SupportedFormatsOrdered = 0xD404,
    DeviceIcon = 0xD405,
    SessionInitiatorVersionInfo = 0xD406,
    PerceivedDeviceType = 0xD407,
    PlaybackRate = 0xD410,
    PlaybackObject = 0xD411,
    PlaybackContainerIndex = 0xD412,
}

/// Object format codes the responder reports
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ObjectFormat {
    Undefined = 0x3000,
    Association = 0x3001,
}

/* GetStorageInfo field constants */

pub const STORAGE_TYPE_FIXED_MEDIA: u16 = 0x0001;
pub const STORAGE_TYPE_REMOVABLE_MEDIA: u16 = 0x0002;
pub const FILESYSTEM_GENERIC_HIERARCHICAL: u16 = 0x0002;
pub const ACCESS_READ_ONLY: u16 = 0x0001;
pub const ACCESS_READ_ONLY_WITH_DELETE: u16 = 0x0002;

/// Parent handle value an initiator passes to enumerate a storage root
pub const PARENT_ROOT: u32 = 0xFFFF_FFFF;
