//! System Description Table walking.
//!
//! Every table the root descriptor reaches starts with the same 36-byte
//! header. The root table itself (RSDT or XSDT) is a header followed by an
//! array of physical addresses, 4 bytes wide in the RSDT and 8 in the XSDT.

use core::fmt;

use bootcore_lib::{klog_debug, klog_info, klog_warn};

use crate::error::{AcpiError, AcpiResult};
use crate::memory::{ByteReader, PhysMemory};
use crate::rsdp::RootDescriptor;

pub const SDT_HEADER_LEN: usize = 36;
/// Declared lengths above this are treated as corrupt before anything is mapped.
pub const SDT_MAX_LEN: usize = 16 << 20;

pub const RSDT_SIGNATURE: &[u8; 4] = b"RSDT";
pub const XSDT_SIGNATURE: &[u8; 4] = b"XSDT";

/// Byte sum modulo 256. A well-formed table sums to zero.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    /// Whole-table length, header included.
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

impl SdtHeader {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Some(Self {
            signature: bytes.read_array(0)?,
            length: bytes.read32(4)?,
            revision: bytes.read8(8)?,
            checksum: bytes.read8(9)?,
            oem_id: bytes.read_array(10)?,
            oem_table_id: bytes.read_array(16)?,
            oem_revision: bytes.read32(24)?,
            creator_id: bytes.read32(28)?,
            creator_revision: bytes.read32(32)?,
        })
    }

    pub fn signature_str(&self) -> Signature<'_> {
        Signature(&self.signature)
    }
}

/// Prints a 4-byte signature, substituting `?` for non-printable bytes.
pub struct Signature<'a>(pub &'a [u8; 4]);

impl fmt::Display for Signature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        for &b in self.0 {
            let c = if b.is_ascii_graphic() { b as char } else { '?' };
            f.write_char(c)?;
        }
        Ok(())
    }
}

/// A checksum-validated table in firmware memory.
#[derive(Clone, Copy, Debug)]
pub struct AcpiTable<'m> {
    header: SdtHeader,
    address: u64,
    bytes: &'m [u8],
}

impl<'m> AcpiTable<'m> {
    pub fn header(&self) -> &SdtHeader {
        &self.header
    }

    pub fn signature(&self) -> &[u8; 4] {
        &self.header.signature
    }

    pub fn revision(&self) -> u8 {
        self.header.revision
    }

    /// Physical address of the header.
    pub fn address(&self) -> u64 {
        self.address
    }

    /// The whole table, exactly `header.length` bytes.
    pub fn bytes(&self) -> &'m [u8] {
        self.bytes
    }

    /// Everything after the common header.
    pub fn payload(&self) -> &'m [u8] {
        &self.bytes[SDT_HEADER_LEN..]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Read only the header at `phys`, without validating the table behind it.
pub fn peek_header<M: PhysMemory + ?Sized>(mem: &M, phys: u64) -> Option<SdtHeader> {
    SdtHeader::parse(mem.slice(phys, SDT_HEADER_LEN)?)
}

/// Map the table at `phys` over its declared length and verify its checksum.
pub fn load_table<'m, M: PhysMemory + ?Sized>(mem: &'m M, phys: u64) -> AcpiResult<AcpiTable<'m>> {
    let header = peek_header(mem, phys).ok_or(AcpiError::NotFound)?;
    let length = header.length as usize;
    if !(SDT_HEADER_LEN..=SDT_MAX_LEN).contains(&length) {
        return Err(AcpiError::InvalidTableLength);
    }
    let bytes = mem
        .slice(phys, length)
        .ok_or(AcpiError::InvalidTableLength)?;
    if checksum(bytes) != 0 {
        return Err(AcpiError::ChecksumInvalid);
    }
    Ok(AcpiTable {
        header,
        address: phys,
        bytes,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootKind {
    Rsdt,
    Xsdt,
}

impl RootKind {
    /// Width in bytes of one pointer in the entry array.
    pub const fn entry_width(self) -> usize {
        match self {
            Self::Rsdt => 4,
            Self::Xsdt => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rsdt => "RSDT",
            Self::Xsdt => "XSDT",
        }
    }
}

/// The validated RSDT or XSDT.
#[derive(Clone, Copy, Debug)]
pub struct RootTable<'m> {
    table: AcpiTable<'m>,
    kind: RootKind,
}

impl<'m> RootTable<'m> {
    /// Pick and validate the root table the descriptor points at.
    ///
    /// A 2.0+ descriptor with a non-zero XSDT address uses the XSDT; anything
    /// else uses the RSDT. There is no retry with the RSDT when the XSDT turns
    /// out to be corrupt.
    pub fn from_descriptor<M: PhysMemory + ?Sized>(
        mem: &'m M,
        root: &RootDescriptor,
    ) -> AcpiResult<Self> {
        let (kind, phys) = match root.xsdt_address() {
            Some(xsdt) if xsdt != 0 => (RootKind::Xsdt, xsdt),
            _ if root.rsdt_address() != 0 => (RootKind::Rsdt, u64::from(root.rsdt_address())),
            _ => {
                klog_warn!("ACPI: root descriptor carries no root table address");
                return Err(AcpiError::NotFound);
            }
        };

        let table = load_table(mem, phys).inspect_err(|err| {
            klog_warn!("ACPI: {} at {:#x} rejected: {}", kind.name(), phys, err);
        })?;

        let root_table = Self { table, kind };
        klog_debug!(
            "ACPI: using {} at {:#x} with {} entries",
            kind.name(),
            phys,
            root_table.entry_count()
        );
        Ok(root_table)
    }

    pub fn kind(&self) -> RootKind {
        self.kind
    }

    pub fn table(&self) -> &AcpiTable<'m> {
        &self.table
    }

    /// Number of pointer slots, null ones included. A trailing partial slot
    /// is ignored.
    pub fn entry_count(&self) -> usize {
        self.table.payload().len() / self.kind.entry_width()
    }

    /// Raw address in slot `index`; zero means an empty slot.
    pub fn entry_address(&self, index: usize) -> Option<u64> {
        let offset = index.checked_mul(self.kind.entry_width())?;
        let payload = self.table.payload();
        match self.kind {
            RootKind::Rsdt => payload.read32(offset).map(u64::from),
            RootKind::Xsdt => payload.read64(offset),
        }
    }

    /// Every slot address in array order, nulls included.
    pub fn entry_addresses(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.entry_count()).filter_map(|i| self.entry_address(i))
    }

    /// `(address, header)` of every non-null, readable entry in array order.
    /// Checksums are not verified.
    pub fn entries<'a, M: PhysMemory + ?Sized>(
        &'a self,
        mem: &'a M,
    ) -> impl Iterator<Item = (u64, SdtHeader)> + 'a {
        self.entry_addresses()
            .filter(|&phys| phys != 0)
            .filter_map(move |phys| peek_header(mem, phys).map(|header| (phys, header)))
    }

    /// First entry with `signature` whose checksum is valid.
    ///
    /// Null slots and tables that fail validation are skipped; a later entry
    /// with the same signature can still satisfy the lookup. When every
    /// matching entry was rejected the last rejection is returned, so
    /// `NotFound` means no entry carried the signature at all.
    pub fn find<M: PhysMemory + ?Sized>(
        &self,
        mem: &'m M,
        signature: &[u8; 4],
    ) -> AcpiResult<AcpiTable<'m>> {
        let mut rejected = None;
        for (index, phys) in self.entry_addresses().enumerate() {
            if phys == 0 {
                klog_debug!("ACPI: {} entry {} is null, skipping", self.kind.name(), index);
                continue;
            }
            let Some(header) = peek_header(mem, phys) else {
                klog_debug!("ACPI: entry {} at {:#x} is not readable", index, phys);
                continue;
            };
            if header.signature != *signature {
                continue;
            }
            match load_table(mem, phys) {
                Ok(table) => return Ok(table),
                Err(err) => {
                    klog_warn!(
                        "ACPI: {} table at {:#x} rejected ({}), continuing",
                        Signature(signature),
                        phys,
                        err
                    );
                    rejected = Some(err);
                }
            }
        }
        Err(rejected.unwrap_or(AcpiError::NotFound))
    }
}

/// Find the table named `signature` under `root`.
pub fn find_table<'m, M: PhysMemory + ?Sized>(
    mem: &'m M,
    root: &RootDescriptor,
    signature: &[u8; 4],
) -> AcpiResult<AcpiTable<'m>> {
    RootTable::from_descriptor(mem, root)?.find(mem, signature)
}

/// Log every table reachable from `root`.
pub fn log_tables<M: PhysMemory + ?Sized>(mem: &M, root: &RootDescriptor) -> AcpiResult<usize> {
    let root_table = RootTable::from_descriptor(mem, root)?;
    let mut count = 0;
    for (phys, header) in root_table.entries(mem) {
        klog_info!(
            "ACPI: {} at {:#x} len {} rev {} oem {}",
            header.signature_str(),
            phys,
            header.length,
            header.revision,
            OemId(&header.oem_id)
        );
        count += 1;
    }
    Ok(count)
}

struct OemId<'a>(&'a [u8; 6]);

impl fmt::Display for OemId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        for &b in self.0.iter().take_while(|&&b| b != 0) {
            f.write_char(if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })?;
        }
        Ok(())
    }
}
