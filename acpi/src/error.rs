use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcpiError {
    /// No root descriptor, root table, or table with the requested signature.
    NotFound,
    /// The structure is there but its bytes do not sum to zero.
    ChecksumInvalid,
    /// A declared length is shorter than the structure it describes, or runs
    /// past readable memory.
    InvalidTableLength,
    /// The firmware never confirmed the switch into ACPI mode.
    EnableTimeout,
    /// A register or value the operation needs is zero or out of range.
    UnsupportedConfiguration,
    /// The power table has not been located yet.
    NotInitialized,
    /// ACPI was turned off on the command line.
    Disabled,
}

impl fmt::Display for AcpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "ACPI structure not found"),
            Self::ChecksumInvalid => write!(f, "ACPI checksum mismatch"),
            Self::InvalidTableLength => write!(f, "ACPI table length invalid"),
            Self::EnableTimeout => write!(f, "timed out waiting for ACPI mode"),
            Self::UnsupportedConfiguration => write!(f, "required ACPI register not provided"),
            Self::NotInitialized => write!(f, "ACPI power table not initialized"),
            Self::Disabled => write!(f, "ACPI disabled by command line"),
        }
    }
}

pub type AcpiResult<T = ()> = Result<T, AcpiError>;
