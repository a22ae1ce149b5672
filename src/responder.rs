//! MTP transaction engine and operation handlers
//!
//! One [MtpResponder::poll] call serves one transaction: read a Command
//! container, dispatch, stream the Data phase when the operation has one,
//! and answer with a Response carrying the command's transaction id.

use crate::buffer::BUF_SIZE;
use crate::codes::{
    DevicePropCode, ObjectFormat, OperationCode, ResponseCode, ACCESS_READ_ONLY,
    FILESYSTEM_GENERIC_HIERARCHICAL, PARENT_ROOT, STORAGE_TYPE_FIXED_MEDIA,
    STORAGE_TYPE_REMOVABLE_MEDIA,
};
use crate::container::{Container, ContainerType, Response, HEADER_LEN};
use crate::fmt::{debug, info, trace};
use crate::registry::{HandleRegistry, StorageRegistry};
use crate::transport::bulk::BulkPipe;
use crate::transport::BulkTransport;
use crate::volume::{ObjectRead, VolumeProvider};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use chrono::DateTime;
use core::cmp::min;

/// Path of the homebrew loader binary, hidden from enumeration.
const LOADER_PATH: &str = "sdmc:/hbmenu.nro";

/// Mount prefix of the removable SD card volume.
const REMOVABLE_PREFIX: &str = "sdmc";

/// The operations the engine dispatches. `GetDeviceInfo` advertises exactly
/// this set; anything else draws `OperationNotSupported`.
const SUPPORTED_OPERATIONS: [u16; 9] = [
    OperationCode::GetDeviceInfo as u16,
    OperationCode::OpenSession as u16,
    OperationCode::CloseSession as u16,
    OperationCode::GetStorageIds as u16,
    OperationCode::GetStorageInfo as u16,
    OperationCode::GetObjectHandles as u16,
    OperationCode::GetObjectInfo as u16,
    OperationCode::GetObject as u16,
    OperationCode::GetDevicePropValue as u16,
];

const MTP_STANDARD_VERSION: u16 = 100;
const VENDOR_EXTENSION_ID: u32 = 0xFFFF_FFFF;
const VENDOR_EXTENSIONS: &str = "microsoft.com: 1.0;";
const MANUFACTURER: &str = "Nintendo";
const MODEL: &str = "Nintendo Switch";
const DEVICE_VERSION: &str = "1.0";
const SERIAL_NUMBER: &str = "SerialNumber";
const FRIENDLY_NAME: &str = "Nintendo Switch";

/// A decoded Command container.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MtpCommand {
    Unknown,
    GetDeviceInfo,
    OpenSession { session_id: u32 },
    CloseSession,
    GetStorageIds,
    GetStorageInfo { storage_id: u32 },
    GetObjectHandles { storage_id: u32, parent: u32 },
    GetObjectInfo { handle: u32 },
    GetObject { handle: u32 },
    GetDevicePropValue { prop: u32 },
}

impl MtpCommand {
    /// Decode a container into the operation it requests. Anything that is
    /// not a Command container, or that carries a code outside the
    /// dispatched set, decodes as [MtpCommand::Unknown].
    pub fn decode(cont: &mut Container) -> MtpCommand {
        if cont.header.kind != u16::from(ContainerType::Command) {
            return MtpCommand::Unknown;
        }
        let params = cont.params();
        match OperationCode::try_from(cont.header.code) {
            Ok(OperationCode::GetDeviceInfo) => MtpCommand::GetDeviceInfo,
            Ok(OperationCode::OpenSession) => MtpCommand::OpenSession {
                session_id: params[0],
            },
            Ok(OperationCode::CloseSession) => MtpCommand::CloseSession,
            Ok(OperationCode::GetStorageIds) => MtpCommand::GetStorageIds,
            Ok(OperationCode::GetStorageInfo) => MtpCommand::GetStorageInfo {
                storage_id: params[0],
            },
            // params[1] is the format filter, which the engine ignores
            Ok(OperationCode::GetObjectHandles) => MtpCommand::GetObjectHandles {
                storage_id: params[0],
                parent: params[2],
            },
            Ok(OperationCode::GetObjectInfo) => MtpCommand::GetObjectInfo { handle: params[0] },
            Ok(OperationCode::GetObject) => MtpCommand::GetObject { handle: params[0] },
            Ok(OperationCode::GetDevicePropValue) => {
                MtpCommand::GetDevicePropValue { prop: params[0] }
            }
            _ => MtpCommand::Unknown,
        }
    }
}

/// The MTP responder: transaction engine, registries and session state.
pub struct MtpResponder<T: BulkTransport, V: VolumeProvider> {
    pipe: BulkPipe<T>,
    volumes: V,
    storages: StorageRegistry,
    handles: HandleRegistry,
    session_id: u32,
}

impl<T, V> MtpResponder<T, V>
where
    T: BulkTransport,
    V: VolumeProvider,
{
    pub fn new(transport: T, volumes: V) -> Self {
        MtpResponder {
            pipe: BulkPipe::new(transport),
            volumes,
            storages: StorageRegistry::new(),
            handles: HandleRegistry::new(),
            session_id: 0,
        }
    }

    /// Register a volume under `id`. The host sees `label`; the volume
    /// provider is asked about `mount_prefix`.
    pub fn insert_storage(&mut self, id: u32, mount_prefix: &str, label: &str) {
        self.storages.insert(id, mount_prefix, label);
    }

    /// Serve one transaction, blocking until the initiator sends a Command.
    ///
    /// Transport failures abort the iteration; a failed receive leaves the
    /// transaction unanswered, a failed send abandons it mid-flight and the
    /// host times out on its own.
    pub fn poll(&mut self) -> Result<(), T::Error> {
        let mut cont = self.pipe.read_container()?;
        let transaction_id = cont.header.transaction_id;
        let command = MtpCommand::decode(&mut cont);
        debug!(
            "mtp: command {} tid {}",
            cont.header.code, transaction_id
        );

        let mut resp = Response::new(ResponseCode::OperationNotSupported, transaction_id);
        self.dispatch(command, transaction_id, &mut resp)?;

        debug!(
            "mtp: response {} tid {}",
            u16::from(resp.code),
            transaction_id
        );
        self.pipe.write_container(&Container::make_response(&resp))
    }

    fn dispatch(
        &mut self,
        command: MtpCommand,
        tid: u32,
        resp: &mut Response,
    ) -> Result<(), T::Error> {
        match command {
            MtpCommand::GetDeviceInfo => self.get_device_info(tid, resp),
            MtpCommand::OpenSession { session_id } => {
                self.open_session(session_id, resp);
                Ok(())
            }
            MtpCommand::CloseSession => {
                self.close_session(resp);
                Ok(())
            }
            MtpCommand::GetStorageIds => self.get_storage_ids(tid, resp),
            MtpCommand::GetStorageInfo { storage_id } => {
                self.get_storage_info(storage_id, tid, resp)
            }
            MtpCommand::GetObjectHandles { storage_id, parent } => {
                self.get_object_handles(storage_id, parent, tid, resp)
            }
            MtpCommand::GetObjectInfo { handle } => self.get_object_info(handle, tid, resp),
            MtpCommand::GetObject { handle } => self.get_object(handle, tid, resp),
            MtpCommand::GetDevicePropValue { prop } => {
                self.get_device_prop_value(prop, tid, resp)
            }
            MtpCommand::Unknown => Ok(()),
        }
    }

    fn get_device_info(&mut self, tid: u32, resp: &mut Response) -> Result<(), T::Error> {
        let mut cont = Container::make_data(OperationCode::GetDeviceInfo, tid);
        cont.put_u16(MTP_STANDARD_VERSION);
        cont.put_u32(VENDOR_EXTENSION_ID);
        cont.put_u16(MTP_STANDARD_VERSION); // vendor extension version
        cont.put_string(VENDOR_EXTENSIONS);
        cont.put_u16(0); // functional mode: standard
        cont.put_u16_array(&SUPPORTED_OPERATIONS);
        cont.put_u16_array(&[]); // no events on the interrupt pipe
        cont.put_u16_array(&[DevicePropCode::DeviceFriendlyName as u16]);
        cont.put_u16_array(&[]); // no capture formats
        cont.put_u16_array(&[
            ObjectFormat::Undefined as u16,
            ObjectFormat::Association as u16,
        ]);
        cont.put_string(MANUFACTURER);
        cont.put_string(MODEL);
        cont.put_string(DEVICE_VERSION);
        cont.put_string(SERIAL_NUMBER);
        self.pipe.write_container(&cont)?;

        resp.code = ResponseCode::Ok;
        Ok(())
    }

    fn open_session(&mut self, session_id: u32, resp: &mut Response) {
        if self.session_id == 0 {
            info!("mtp: session {} opened", session_id);
            self.session_id = session_id;
            resp.code = ResponseCode::Ok;
        } else {
            resp.code = ResponseCode::SessionAlreadyOpen;
        }
    }

    fn close_session(&mut self, resp: &mut Response) {
        if self.session_id == 0 {
            resp.code = ResponseCode::SessionNotOpen;
        } else {
            info!("mtp: session {} closed", self.session_id);
            self.session_id = 0;
            resp.code = ResponseCode::Ok;
        }
    }

    fn get_storage_ids(&mut self, tid: u32, resp: &mut Response) -> Result<(), T::Error> {
        let ids: Vec<u32> = self.storages.iter().map(|e| e.id).collect();

        let mut cont = Container::make_data(OperationCode::GetStorageIds, tid);
        cont.put_u32_array(&ids);
        self.pipe.write_container(&cont)?;

        resp.code = ResponseCode::Ok;
        Ok(())
    }

    fn get_storage_info(
        &mut self,
        storage_id: u32,
        tid: u32,
        resp: &mut Response,
    ) -> Result<(), T::Error> {
        let Some(entry) = self.storages.get(storage_id) else {
            resp.code = ResponseCode::InvalidStorageId;
            return Ok(());
        };
        let Some(stat) = self.volumes.stat_volume(&entry.mount_prefix) else {
            resp.code = ResponseCode::StoreNotAvailable;
            return Ok(());
        };

        let storage_type = if entry.mount_prefix == REMOVABLE_PREFIX {
            STORAGE_TYPE_REMOVABLE_MEDIA
        } else {
            STORAGE_TYPE_FIXED_MEDIA
        };

        let mut cont = Container::make_data(OperationCode::GetStorageInfo, tid);
        cont.put_u16(storage_type);
        cont.put_u16(FILESYSTEM_GENERIC_HIERARCHICAL);
        cont.put_u16(ACCESS_READ_ONLY);
        cont.put_u64(stat.total_bytes);
        cont.put_u64(stat.free_bytes);
        cont.put_u32(0xFFFF_FFFF); // free space in objects: not tracked
        cont.put_string(&entry.label); // storage description
        cont.put_string(&entry.label); // volume identifier
        self.pipe.write_container(&cont)?;

        resp.code = ResponseCode::Ok;
        Ok(())
    }

    fn get_object_handles(
        &mut self,
        storage_id: u32,
        parent: u32,
        tid: u32,
        resp: &mut Response,
    ) -> Result<(), T::Error> {
        let Some(entry) = self.storages.get(storage_id) else {
            resp.code = ResponseCode::InvalidStorageId;
            return Ok(());
        };

        let dir = if parent == PARENT_ROOT {
            entry.root()
        } else {
            match self.handles.lookup(parent) {
                Some(path) => String::from(path),
                None => {
                    resp.code = ResponseCode::InvalidObjectHandle;
                    return Ok(());
                }
            }
        };

        let Some(listing) = self.volumes.list_directory(&dir) else {
            resp.code = ResponseCode::InvalidParentObject;
            return Ok(());
        };

        let mut object_handles = Vec::new();
        for path in listing {
            if path == LOADER_PATH {
                continue;
            }
            let handle = self.handles.get_or_insert(&path);
            trace!("mtp: object {} in {}", handle, dir.as_str());
            object_handles.push(handle);
        }

        let mut cont = Container::make_data(OperationCode::GetObjectHandles, tid);
        cont.put_u32_array(&object_handles);
        self.pipe.write_container(&cont)?;

        resp.code = ResponseCode::Ok;
        Ok(())
    }

    fn get_object_info(
        &mut self,
        handle: u32,
        tid: u32,
        resp: &mut Response,
    ) -> Result<(), T::Error> {
        let Some(path) = self.handles.lookup(handle) else {
            resp.code = ResponseCode::InvalidObjectHandle;
            return Ok(());
        };
        let path = String::from(path);

        // the drive prefix decides which storage owns the object
        let drive = path.split(':').next().unwrap_or("");
        let storage_id = self.storages.by_prefix(drive).map(|e| e.id).unwrap_or(0);

        let format = if self.volumes.is_directory(&path) {
            ObjectFormat::Association
        } else {
            ObjectFormat::Undefined
        };
        let size = self.volumes.file_size(&path);
        let times = self.volumes.stat_times(&path);

        let (parent_dir, filename) = match path.rfind('/') {
            Some(cut) => (&path[..cut], &path[cut + 1..]),
            None => ("", path.as_str()),
        };
        let parent_handle = if parent_dir == format!("{}:", drive) {
            0 // direct child of the storage root
        } else {
            self.handles.get_or_insert(parent_dir)
        };

        let mut cont = Container::make_data(OperationCode::GetObjectInfo, tid);
        cont.put_u32(storage_id);
        cont.put_u16(format as u16);
        cont.put_u16(0); // protection status
        cont.put_u32(size as u32); // compressed size, truncated past 4 GiB
        cont.put_u16(ObjectFormat::Undefined as u16); // thumb format
        cont.put_u32(0); // thumb compressed size
        cont.put_u32(0); // thumb pix width
        cont.put_u32(0); // thumb pix height
        cont.put_u32(0); // image pix width
        cont.put_u32(0); // image pix height
        cont.put_u32(0); // image bit depth
        cont.put_u32(parent_handle);
        cont.put_u16(1); // association type: generic folder
        cont.put_u32(1); // association description
        cont.put_u32(0); // sequence number
        cont.put_string(filename);
        cont.put_string(&mtp_datetime(times.created));
        cont.put_string(&mtp_datetime(times.modified));
        cont.put_string(""); // keywords
        self.pipe.write_container(&cont)?;

        resp.code = ResponseCode::Ok;
        Ok(())
    }

    fn get_object(&mut self, handle: u32, tid: u32, resp: &mut Response) -> Result<(), T::Error> {
        let Some(path) = self.handles.lookup(handle) else {
            resp.code = ResponseCode::InvalidObjectHandle;
            return Ok(());
        };
        let path = String::from(path);

        let Some(mut stream) = self.volumes.open_read(&path) else {
            resp.code = ResponseCode::AccessDenied;
            return Ok(());
        };
        let size = self.volumes.file_size(&path);
        trace!("mtp: streaming {} bytes", size);

        // The leading packet carries the header and as much of the object
        // as fits; the container is scoped to it so peak memory stays at
        // one packet.
        let first = min(size, (BUF_SIZE - HEADER_LEN) as u64) as usize;
        let mut sent: u64;
        {
            let mut cont = Container::make_data(OperationCode::GetObject, tid);
            cont.header.length =
                HEADER_LEN as u32 + min(size, u32::MAX as u64 - HEADER_LEN as u64) as u32;
            cont.payload.resize(first, 0);
            let got = read_full(&mut stream, &mut cont.payload);
            cont.payload.truncate(got);
            sent = got as u64;
            self.pipe.write_container(&cont)?;
        }

        let mut chunk = [0u8; BUF_SIZE];
        while sent < size {
            let want = min(size - sent, BUF_SIZE as u64) as usize;
            let got = read_full(&mut stream, &mut chunk[..want]);
            if got == 0 {
                break; // the object shrank under us; stop pumping
            }
            self.pipe.write(&chunk[..got])?;
            sent += got as u64;
        }

        resp.code = ResponseCode::Ok;
        Ok(())
    }

    fn get_device_prop_value(
        &mut self,
        prop: u32,
        tid: u32,
        resp: &mut Response,
    ) -> Result<(), T::Error> {
        resp.code = ResponseCode::DevicePropNotSupported;

        if prop == DevicePropCode::DeviceFriendlyName as u32 {
            let mut cont = Container::make_data(OperationCode::GetDevicePropValue, tid);
            cont.put_string(FRIENDLY_NAME);
            self.pipe.write_container(&cont)?;
            resp.code = ResponseCode::Ok;
        }
        Ok(())
    }
}

/// `"YYYYMMDDTHHMMSS"` from wall-clock seconds; empty when out of range.
fn mtp_datetime(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(stamp) => stamp.format("%Y%m%dT%H%M%S").to_string(),
        None => String::new(),
    }
}

/// Fill as much of `dst` as the stream can deliver.
fn read_full(stream: &mut impl ObjectRead, dst: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < dst.len() {
        let got = stream.read(&mut dst[filled..]);
        if got == 0 {
            break;
        }
        filled += got;
    }
    filled
}
